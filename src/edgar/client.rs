// src/edgar/client.rs
use crate::edgar::models::{CompanySubmission, FilingInfo, FilingsList};
use crate::extractors::types::FormType;
use crate::utils::error::EdgarError;
use reqwest::header;
use std::time::Duration;

// SEC requires a descriptive User-Agent with contact details
const DEFAULT_USER_AGENT: &str = "filing_sections research contact@example.com";
const USER_AGENT_ENV: &str = "SEC_USER_AGENT";
// SEC asks for 10 requests/second max. Be conservative. >100ms delay.
const EDGAR_REQUEST_DELAY_MS: u64 = 150;

fn user_agent() -> String {
    std::env::var(USER_AGENT_ENV).unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string())
}

/// Creates a reqwest client configured for EDGAR interaction.
fn build_edgar_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .timeout(Duration::from_secs(60))
        .build()
}

/// Sends a GET after the courtesy delay and maps error statuses.
async fn get(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, EdgarError> {
    tokio::time::sleep(Duration::from_millis(EDGAR_REQUEST_DELAY_MS)).await;

    let response = client
        .get(url)
        .header(header::ACCEPT, "application/json,application/xml,text/html,text/plain,*/*")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Received {} - check User-Agent ({}) and rate limits.", status, USER_AGENT_ENV);
            return Err(EdgarError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(EdgarError::FilingDocNotFound(url.to_string()));
        }
        return Err(EdgarError::Http(status));
    }
    Ok(response)
}

/// Downloads a specific filing document from its URL.
pub async fn download_filing_doc(url: &str) -> Result<String, EdgarError> {
    let client = build_edgar_client()?;
    tracing::info!("Downloading document from: {}", url);

    let body = get(&client, url).await?.text().await?;
    tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Gets the zero-padded CIK (Central Index Key) for a ticker symbol
pub async fn get_cik_from_ticker(ticker: &str) -> Result<String, EdgarError> {
    let ticker = ticker.to_uppercase();
    let client = build_edgar_client()?;
    let json: serde_json::Value = get(&client, "https://www.sec.gov/files/company_tickers.json").await?.json().await?;

    let companies = json
        .as_object()
        .ok_or_else(|| EdgarError::Parse("Invalid company_tickers.json structure".to_string()))?;
    for company in companies.values() {
        let matches = company
            .get("ticker")
            .and_then(|t| t.as_str())
            .is_some_and(|t| t.eq_ignore_ascii_case(&ticker));
        if matches {
            let cik = company
                .get("cik_str")
                .and_then(|c| c.as_u64())
                .ok_or_else(|| EdgarError::Parse(format!("Invalid CIK for ticker {}", ticker)))?;
            return Ok(format!("{:010}", cik));
        }
    }

    Err(EdgarError::Parse(format!("Could not find CIK for ticker {}", ticker)))
}

/// Fetches the company submission data for a given CIK
pub async fn get_company_submissions(cik: &str) -> Result<CompanySubmission, EdgarError> {
    let url = format!("https://data.sec.gov/submissions/CIK{}.json", cik);
    let client = build_edgar_client()?;
    let submission: CompanySubmission = get(&client, &url).await?.json().await?;
    tracing::debug!("Loaded {} recent filings for {}", submission.filings.recent.form.len(), submission.name);
    Ok(submission)
}

/// Finds filings of one form type for a ticker, filed within the year range, newest first.
pub async fn find_filings(
    ticker: &str,
    form_type: FormType,
    start_year: Option<u32>,
    end_year: Option<u32>,
) -> Result<Vec<FilingInfo>, EdgarError> {
    let cik = get_cik_from_ticker(ticker).await?;
    let submissions = get_company_submissions(&cik).await?;
    let owner = FilingOwner { ticker: ticker.to_uppercase(), company_name: submissions.name.clone(), cik };
    let filings = select_filings(&submissions.filings.recent, &owner, form_type, start_year, end_year)?;
    tracing::info!("Found {} {} filings for {}", filings.len(), form_type, ticker);
    Ok(filings)
}

/// Company-level fields copied into every selected filing.
struct FilingOwner {
    ticker: String,
    company_name: String,
    cik: String,
}

fn select_filings(
    recent: &FilingsList,
    owner: &FilingOwner,
    form_type: FormType,
    start_year: Option<u32>,
    end_year: Option<u32>,
) -> Result<Vec<FilingInfo>, EdgarError> {
    let mut filings = Vec::new();

    for (i, form) in recent.form.iter().enumerate() {
        // Amendments often restate a single item; only original filings are extracted
        if form != form_type.as_str() {
            continue;
        }
        let filing_date = recent
            .filing_date
            .get(i)
            .ok_or_else(|| EdgarError::Parse("Missing filing date".to_string()))?;
        let year = filing_date
            .get(0..4)
            .and_then(|y| y.parse::<u32>().ok())
            .ok_or_else(|| EdgarError::Parse(format!("Invalid date format: {}", filing_date)))?;

        if start_year.is_some_and(|start| year < start) || end_year.is_some_and(|end| year > end) {
            continue;
        }

        let accession_number = recent
            .accession_number
            .get(i)
            .ok_or_else(|| EdgarError::Parse("Missing accession number".to_string()))?;
        let primary_doc = recent
            .primary_document
            .get(i)
            .ok_or_else(|| EdgarError::Parse("Missing primary document".to_string()))?;

        tracing::trace!("Selected filing #{} ({}, {})", i, accession_number, filing_date);
        filings.push(FilingInfo {
            accession_number: accession_number.clone(),
            filing_date: filing_date.clone(),
            form_type,
            ticker: owner.ticker.clone(),
            company_name: owner.company_name.clone(),
            cik: owner.cik.clone(),
            primary_doc: primary_doc.clone(),
            year,
        });
    }

    // Newest first
    filings.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
    Ok(filings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent() -> FilingsList {
        FilingsList {
            accession_number: vec!["a-1".into(), "a-2".into(), "a-3".into(), "a-4".into()],
            filing_date: vec!["2024-05-29".into(), "2024-02-21".into(), "2023-11-21".into(), "2022-08-31".into()],
            report_date: vec![],
            form: vec!["10-Q".into(), "10-K".into(), "10-Q/A".into(), "10-Q".into()],
            primary_document: vec!["q1.htm".into(), "k.htm".into(), "qa.htm".into(), "q2.htm".into()],
        }
    }

    fn owner() -> FilingOwner {
        FilingOwner { ticker: "NVDA".into(), company_name: "NVIDIA CORP".into(), cik: "0001045810".into() }
    }

    #[test]
    fn test_select_filings_by_form_and_year() {
        let all = select_filings(&recent(), &owner(), FormType::TenQ, None, None).unwrap();
        let docs: Vec<&str> = all.iter().map(|f| f.primary_doc.as_str()).collect();
        assert_eq!(docs, vec!["q1.htm", "q2.htm"], "Amendments are skipped");

        let recent_only = select_filings(&recent(), &owner(), FormType::TenQ, Some(2023), None).unwrap();
        assert_eq!(recent_only.len(), 1);
        assert_eq!(recent_only[0].year, 2024);
    }

    #[test]
    fn test_select_filings_reports_bad_dates() {
        let mut list = recent();
        list.filing_date[1] = "n/a".into();
        assert!(matches!(
            select_filings(&list, &owner(), FormType::TenK, None, None),
            Err(EdgarError::Parse(_))
        ));
    }
}
