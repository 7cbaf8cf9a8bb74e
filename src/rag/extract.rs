//! Text extraction for uploaded files and imported web pages.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Json,
    Csv,
    Markdown,
    Text,
    Url,
}

impl DocumentKind {
    /// Parse the `type` form field of an upload. `url` is not accepted
    /// here since pages arrive through the import endpoint.
    pub fn from_upload_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "json" => Some(DocumentKind::Json),
            "csv" => Some(DocumentKind::Csv),
            "markdown" | "md" => Some(DocumentKind::Markdown),
            "text" | "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Json => "json",
            DocumentKind::Csv => "csv",
            DocumentKind::Markdown => "markdown",
            DocumentKind::Text => "text",
            DocumentKind::Url => "url",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn uploaded bytes into plain text. Fails when nothing readable is left.
pub fn extract_document_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ApiError> {
    let text = match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ApiError::BadRequest(format!("PDF extraction failed: {}", e)))?,
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No content could be extracted from the {} file",
            kind
        )));
    }
    Ok(text)
}

/// A fetched page ready for ingestion.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub source_name: String,
    pub text: String,
}

/// Check that `raw` is an absolute http(s) URL with a host.
pub fn parse_import_url(raw: &str) -> Result<Url, ApiError> {
    let invalid = || ApiError::BadRequest(format!("Invalid URL format: {}", raw));
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

/// `<host>_url`, the file name recorded for imported pages.
pub fn source_name_for_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown");
    match url.port() {
        Some(port) => format!("{}:{}_url", host, port),
        None => format!("{}_url", host),
    }
}

pub async fn fetch_url_text(url: &Url, timeout: Duration) -> Result<FetchedPage, ApiError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ApiError::internal)?;

    let not_found = |detail: String| {
        ApiError::NotFound(format!("Failed to fetch content from URL: {} ({})", url, detail))
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| not_found(e.to_string()))?;
    if !response.status().is_success() {
        return Err(not_found(response.status().to_string()));
    }
    let body = response.text().await.map_err(|e| not_found(e.to_string()))?;

    let text = strip_html_tags(&body);
    if text.trim().is_empty() {
        return Err(not_found("empty page".to_string()));
    }

    Ok(FetchedPage {
        source_name: source_name_for_url(url),
        text,
    })
}

/// Drop markup, `<script>` and `<style>` bodies, keep one line per text run.
pub fn strip_html_tags(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len() / 2);
    let mut pos = 0;

    while pos < html.len() {
        let rest = &lower[pos..];
        if rest.starts_with("<script") || rest.starts_with("<style") {
            let close = if rest.starts_with("<script") { "</script>" } else { "</style>" };
            pos = match rest.find(close) {
                Some(end) => pos + end + close.len(),
                None => html.len(),
            };
            continue;
        }
        if rest.starts_with('<') {
            out.push('\n');
            pos = match rest.find('>') {
                Some(end) => pos + end + 1,
                None => html.len(),
            };
            continue;
        }

        let next_tag = rest.find('<').map(|i| pos + i).unwrap_or(html.len());
        out.push_str(&html[pos..next_tag]);
        pos = next_tag;
    }

    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_types_are_case_insensitive() {
        assert_eq!(DocumentKind::from_upload_type("PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_upload_type("markdown"), Some(DocumentKind::Markdown));
        assert_eq!(DocumentKind::from_upload_type("url"), None);
        assert_eq!(DocumentKind::from_upload_type("docx"), None);
    }

    #[test]
    fn blank_documents_are_rejected() {
        assert!(matches!(
            extract_document_text(b"   \n ", DocumentKind::Json),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(
            extract_document_text(b"{\"boss\":\"Margit\"}", DocumentKind::Json).unwrap(),
            "{\"boss\":\"Margit\"}"
        );
    }

    #[test]
    fn import_urls_need_scheme_and_host() {
        assert!(parse_import_url("not a url").is_err());
        assert!(parse_import_url("ftp://example.com/file").is_err());
        let url = parse_import_url("https://eldenring.wiki.fextralife.com/Margit").unwrap();
        assert_eq!(source_name_for_url(&url), "eldenring.wiki.fextralife.com_url");
    }

    #[test]
    fn strips_markup_scripts_and_styles() {
        let html = r#"
            <html>
            <head><style>p { color: red }</style><script>var x = 1;</script></head>
            <body>
                <h1>Margit</h1>
                <p>Weak to <b>bleed</b></p>
            </body>
            </html>
        "#;

        let text = strip_html_tags(html);
        assert!(text.contains("Margit"));
        assert!(text.contains("Weak to"));
        assert!(text.contains("bleed"));
        assert!(!text.contains('<'));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color"));
    }
}
