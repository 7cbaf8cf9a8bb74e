use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, RequestBuilder, Response, Url};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;

use crate::core::config::{get_str, get_u64};
use crate::core::errors::{call_with_timeout, Service, ServiceError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub body: String,
}

/// Live web search, ranked best first.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ServiceError>;
}

/// Result bodies joined by blank lines; the context string built from a
/// web search.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.body.trim())
        .filter(|body| !body.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    DuckDuckGo,
    Brave,
    Bing,
    Google,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub provider: SearchProvider,
    pub brave_api_key: Option<String>,
    pub bing_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub google_engine_id: Option<String>,
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: SearchProvider::DuckDuckGo,
            brave_api_key: None,
            bing_api_key: None,
            google_api_key: None,
            google_engine_id: None,
            timeout: Duration::from_secs(20),
        }
    }
}

impl SearchSettings {
    pub fn from_config(config: &Value) -> Self {
        let key = |path: &str| {
            get_str(config, path)
                .map(str::to_string)
                .filter(|v| !v.trim().is_empty())
        };

        let provider = match get_str(config, "search.provider").unwrap_or("duckduckgo") {
            "brave" => SearchProvider::Brave,
            "bing" => SearchProvider::Bing,
            "google" => SearchProvider::Google,
            _ => SearchProvider::DuckDuckGo,
        };

        Self {
            provider,
            brave_api_key: key("search.brave_api_key"),
            bing_api_key: key("search.bing_api_key"),
            google_api_key: key("search.google_api_key"),
            google_engine_id: key("search.google_engine_id"),
            timeout: get_u64(config, "search.timeout_secs")
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(20)),
        }
    }
}

const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const DUCKDUCKGO_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Web search over the configured provider's HTTP API. Keyed providers
/// fall back to DuckDuckGo's HTML results page when the key is missing or
/// the call fails.
pub struct HttpWebSearch {
    settings: SearchSettings,
    client: Client,
}

impl HttpWebSearch {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    async fn send(&self, request: RequestBuilder, provider: &str) -> Result<Response, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::unavailable(Service::WebSearch, e))?;

        if !response.status().is_success() {
            return Err(ServiceError::unavailable(
                Service::WebSearch,
                format!("{} search failed: {}", provider, response.status()),
            ));
        }
        Ok(response)
    }

    async fn get_json(&self, request: RequestBuilder, provider: &str) -> Result<Value, ServiceError> {
        self.send(request, provider)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::malformed(Service::WebSearch, e.to_string()))
    }

    async fn keyed_search(&self, query: &str) -> Option<Result<Vec<SearchResult>, ServiceError>> {
        let s = &self.settings;
        let encoded = urlencoding::encode(query);
        match s.provider {
            SearchProvider::Brave => {
                let api_key = s.brave_api_key.as_deref()?;
                let url = format!("https://api.search.brave.com/res/v1/web/search?q={}", encoded);
                let request = self
                    .client
                    .get(url)
                    .header("X-Subscription-Token", api_key)
                    .header("Accept", "application/json");
                Some(self.get_json(request, "Brave").await.map(|p| parse_brave(&p)))
            }
            SearchProvider::Bing => {
                let api_key = s.bing_api_key.as_deref()?;
                let url = format!("https://api.bing.microsoft.com/v7.0/search?q={}", encoded);
                let request = self.client.get(url).header("Ocp-Apim-Subscription-Key", api_key);
                Some(self.get_json(request, "Bing").await.map(|p| parse_bing(&p)))
            }
            SearchProvider::Google => {
                let api_key = s.google_api_key.as_deref()?;
                let engine_id = s.google_engine_id.as_deref()?;
                let url = format!(
                    "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}",
                    api_key, engine_id, encoded
                );
                Some(self.get_json(self.client.get(url), "Google").await.map(|p| parse_google(&p)))
            }
            SearchProvider::DuckDuckGo => None,
        }
    }

    async fn duckduckgo(&self, query: &str) -> Result<Vec<SearchResult>, ServiceError> {
        let request = self
            .client
            .get(DUCKDUCKGO_HTML_URL)
            .query(&[("q", query)])
            .header(USER_AGENT, DUCKDUCKGO_USER_AGENT);
        let html = self
            .send(request, "DuckDuckGo")
            .await?
            .text()
            .await
            .map_err(|e| ServiceError::malformed(Service::WebSearch, e.to_string()))?;
        Ok(parse_duckduckgo_html(&html))
    }

    async fn search_inner(&self, query: &str) -> Result<Vec<SearchResult>, ServiceError> {
        match self.keyed_search(query).await {
            Some(Ok(results)) if !results.is_empty() => return Ok(results),
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                tracing::warn!("{:?} search failed, falling back to DuckDuckGo: {}", self.settings.provider, err);
            }
            None => {}
        }
        self.duckduckgo(query).await
    }
}

#[async_trait]
impl WebSearch for HttpWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ServiceError> {
        let mut results =
            call_with_timeout(Service::WebSearch, self.settings.timeout, self.search_inner(query)).await?;
        results.truncate(max_results);
        tracing::debug!(results = results.len(), "web search for {:?}", query);
        Ok(results)
    }
}

fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn collect_items(items: Option<&Vec<Value>>, title: &str, url: &str, body: &str) -> Vec<SearchResult> {
    items
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let (t, u) = (str_field(item, title), str_field(item, url));
                    (!t.is_empty() && !u.is_empty()).then(|| SearchResult {
                        title: t.to_string(),
                        url: u.to_string(),
                        body: str_field(item, body).to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_google(payload: &Value) -> Vec<SearchResult> {
    collect_items(payload.get("items").and_then(|v| v.as_array()), "title", "link", "snippet")
}

fn parse_brave(payload: &Value) -> Vec<SearchResult> {
    collect_items(payload.pointer("/web/results").and_then(|v| v.as_array()), "title", "url", "description")
}

fn parse_bing(payload: &Value) -> Vec<SearchResult> {
    collect_items(payload.pointer("/webPages/value").and_then(|v| v.as_array()), "name", "url", "snippet")
}

/// Organic results from DuckDuckGo's HTML endpoint, ads skipped.
fn parse_duckduckgo_html(html: &str) -> Vec<SearchResult> {
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&result_sel)
        .filter(|result| !result.value().classes().any(|class| class == "result--ad"))
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let title = element_text(link);
            let url = resolve_duckduckgo_link(link.value().attr("href")?)?;
            let body = result
                .select(&snippet_sel)
                .next()
                .map(element_text)
                .unwrap_or_default();
            (!title.is_empty()).then_some(SearchResult { title, url, body })
        })
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result links are wrapped in a `/l/?uddg=<target>` redirect.
fn resolve_duckduckgo_link(href: &str) -> Option<String> {
    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };
    let url = Url::parse(&absolute).ok()?;
    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
