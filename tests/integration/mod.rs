// tests/integration/mod.rs
// Shared helpers for the integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const FILLER: [&str; 12] = [
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do", "eiusmod", "tempor",
];

/// `words` words of neutral prose, broken into short lines.
pub fn filler(words: usize) -> String {
    let mut out = String::new();
    for i in 0..words {
        out.push_str(FILLER[i % FILLER.len()]);
        out.push_str(if i % 12 == 11 { ".\n" } else { " " });
    }
    out
}

/// A small but well-formed quarterly report: cover page, Part I and Part II
/// items, signatures.
pub fn quarterly_report() -> String {
    format!(
        "UNITED STATES SECURITIES AND EXCHANGE COMMISSION\nFORM 10-Q\n{}\n\
         PART I. FINANCIAL INFORMATION\n\
         Item 1. Financial Statements\n{}\n\
         Item 2. Management's Discussion and Analysis of Financial Condition and Results of Operations\n{}\n\
         Item 3. Quantitative and Qualitative Disclosures About Market Risk\n{}\n\
         Item 4. Controls and Procedures\n{}\n\
         PART II. OTHER INFORMATION\n\
         Item 1A. Risk Factors\n{}\n\
         Item 5. Other Information\n{}\n\
         SIGNATURES\n{}",
        filler(200),
        filler(400),
        filler(800),
        filler(120),
        filler(150),
        filler(300),
        filler(80),
        filler(150)
    )
}

/// Temporary directory with filing files in it.
pub struct FilingFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl FilingFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();
        Self { temp_dir, root_path }
    }

    pub fn write_filing<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root_path.join("output")
    }
}
