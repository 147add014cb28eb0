//! Feed gateway: fetch the raw feed through ordered fallback transports.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::util::compact_text;

static DENIED_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)access denied|forbidden|not found").expect("Invalid regex"));

/// Fetches feed text through an ordered list of transport templates.
///
/// Each template is tried once, in order. The first transport returning
/// usable content wins.
#[derive(Debug, Clone)]
pub struct FeedGateway {
    client: reqwest::Client,
    templates: Vec<String>,
}

impl FeedGateway {
    /// Build a gateway over transport templates containing `{url}` or `{raw_url}`.
    pub fn new(templates: Vec<String>) -> Result<Self> {
        if templates.is_empty() {
            return Err(Error::Config(
                "feed gateway needs at least one transport".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Config(format!("failed to build feed HTTP client: {error}")))?;
        Ok(Self { client, templates })
    }

    /// Fetch the feed at `target_url`, returning the first non-trivial body.
    pub async fn fetch_feed(&self, target_url: &str) -> Result<String> {
        let mut last_error = String::from("no transport attempted");

        for (index, template) in self.templates.iter().enumerate() {
            let url = transport_url(template, target_url);
            tracing::debug!(transport = index, %url, "Fetching feed");

            match self.try_transport(&url).await {
                Ok(body) => {
                    tracing::debug!(transport = index, bytes = body.len(), "Feed fetched");
                    return Ok(body);
                }
                Err(reason) => {
                    tracing::warn!(transport = index, %reason, "Feed transport rejected");
                    last_error = reason;
                }
            }
        }

        Err(Error::FetchFailed {
            attempts: self.templates.len(),
            last_error,
        })
    }

    async fn try_transport(&self, url: &str) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| format!("request failed: {error}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| format!("failed to read response body: {error}"))?;

        if !status.is_success() {
            return Err(format!(
                "transport returned HTTP {}: {}",
                status.as_u16(),
                compact_text(&body)
            ));
        }

        rejection_reason(&body).map_or(Ok(body), Err)
    }
}

/// Expand one transport template around the target URL.
pub fn transport_url(template: &str, target_url: &str) -> String {
    template
        .replace("{raw_url}", target_url)
        .replace("{url}", &urlencoding::encode(target_url))
}

fn rejection_reason(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Some("transport returned an empty body".to_string());
    }

    let structured = trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with("<?xml");
    if !structured && DENIED_BODY.is_match(trimmed) {
        return Some(format!(
            "transport returned an error page: {}",
            compact_text(trimmed)
        ));
    }
    None
}
