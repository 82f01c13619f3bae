// src/edgar/models.rs
use serde::{Deserialize, Serialize};

use crate::extractors::types::FormType;

/// Structure representing the EDGAR company submission index.
/// Only the fields needed to locate filings are kept.
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySubmission {
    pub cik: String,
    pub name: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub struct Filings {
    pub recent: FilingsList,
}

/// Column-oriented list: index `i` of every vector describes the same filing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingsList {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub report_date: Vec<String>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
}

/// A specific filing we want to process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingInfo {
    pub accession_number: String,
    pub filing_date: String,
    pub form_type: FormType,
    pub ticker: String,
    pub company_name: String,
    pub cik: String,
    pub primary_doc: String,
    pub year: u32,
}

impl FilingInfo {
    /// Constructs the URL to access the primary document of this filing
    pub fn primary_doc_url(&self) -> String {
        let acc_no_dashes = self.accession_number.replace('-', "");
        let cik = self.cik.trim_start_matches('0');
        format!("https://www.sec.gov/Archives/edgar/data/{}/{}/{}", cik, acc_no_dashes, self.primary_doc)
    }

    /// Stable identifier used for output directories and reports, e.g. `NVDA_10-Q_2024-05-29`.
    pub fn document_id(&self) -> String {
        format!("{}_{}_{}", self.ticker.to_uppercase(), self.form_type, self.filing_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filing() -> FilingInfo {
        FilingInfo {
            accession_number: "0001045810-24-000124".to_string(),
            filing_date: "2024-05-29".to_string(),
            form_type: FormType::TenQ,
            ticker: "nvda".to_string(),
            company_name: "NVIDIA CORP".to_string(),
            cik: "0001045810".to_string(),
            primary_doc: "nvda-20240428.htm".to_string(),
            year: 2024,
        }
    }

    #[test]
    fn test_primary_doc_url() {
        assert_eq!(
            filing().primary_doc_url(),
            "https://www.sec.gov/Archives/edgar/data/1045810/000104581024000124/nvda-20240428.htm"
        );
    }

    #[test]
    fn test_document_id() {
        assert_eq!(filing().document_id(), "NVDA_10-Q_2024-05-29");
    }

    #[test]
    fn test_submission_parses_camel_case() {
        let json = r#"{
            "cik": "1045810", "name": "NVIDIA CORP", "tickers": ["NVDA"], "sic": "3674",
            "filings": { "recent": {
                "accessionNumber": ["0001045810-24-000124"],
                "filingDate": ["2024-05-29"],
                "reportDate": ["2024-04-28"],
                "form": ["10-Q"],
                "primaryDocument": ["nvda-20240428.htm"]
            }, "files": [] }
        }"#;
        let submission: CompanySubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.filings.recent.form, vec!["10-Q"]);
        assert_eq!(submission.tickers, vec!["NVDA"]);
    }
}
