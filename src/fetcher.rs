use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

use crate::config::PollerConfig;
use crate::error::{AppError, Result};
use crate::targets::Target;

/// What one visit to a target page yielded: the response status, the URL
/// after redirects, the values of the located attribute for every element
/// the selector matched, and the page title when one was present.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: String,
    pub matched_values: Vec<String>,
    pub title: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Visit the target's page and collect the availability signal inputs.
    /// Only transport-level failures are errors; a non-200 response still
    /// yields a page (parsed best-effort) so the caller can back off on it.
    async fn fetch(&self, target: &Target) -> Result<FetchedPage>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &PollerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, target: &Target) -> Result<FetchedPage> {
        let response = self.client.get(&target.url).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();

        tracing::debug!(
            "Fetched {} ({}): status {}, {} bytes",
            target.name,
            final_url,
            status,
            body.len()
        );

        parse_page(target, status, final_url, &body)
    }
}

/// Extract the selector matches and page title from a fetched body.
/// Parsing happens outside any await point; `scraper::Html` is not `Send`.
pub(crate) fn parse_page(
    target: &Target,
    status: u16,
    final_url: String,
    body: &str,
) -> Result<FetchedPage> {
    let document = Html::parse_document(body);

    let selector = Selector::parse(&target.selector).map_err(|e| AppError::Selector {
        selector: target.selector.clone(),
        message: e.to_string(),
    })?;

    let matched_values = document
        .select(&selector)
        .filter_map(|element| element.value().attr(&target.attribute))
        .map(|value| value.to_string())
        .collect();

    let title_selector = Selector::parse("head title").map_err(|e| AppError::Selector {
        selector: "head title".to_string(),
        message: e.to_string(),
    })?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string());

    Ok(FetchedPage {
        status,
        final_url,
        matched_values,
        title,
    })
}
