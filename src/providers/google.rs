use async_trait::async_trait;
use crate::error::ProviderError;
use crate::providers::ImageSearchProvider;
use crate::types::ImageResult;

pub const DEFAULT_CSE_ID: &str = "857e3825a08534f43";

// ── Custom Search response types ─────────────────────────

#[derive(serde::Deserialize, Debug, Default)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(serde::Deserialize, Debug)]
struct SearchItem {
    #[serde(default)]
    link:    String,
    #[serde(default)]
    snippet: String,
}

// ── Provider ─────────────────────────────────────────────

/// Image search backed by the Google Custom Search JSON API.
pub struct GoogleImageSearch {
    client:   reqwest::Client,
    api_key:  Option<String>,
    cse_id:   String,
    api_base: String,
}

impl GoogleImageSearch {
    pub fn new(api_key: Option<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client:   reqwest::Client::new(),
            api_key:  api_key.filter(|k| !k.trim().is_empty()),
            cse_id:   cse_id.into(),
            api_base: "https://www.googleapis.com/customsearch/v1".to_string(),
        }
    }

    /// Custom endpoint, e.g. a local stub server.
    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn into_results(response: SearchResponse) -> Vec<ImageResult> {
        response.items
            .into_iter()
            .filter(|item| !item.link.trim().is_empty())
            .map(|item| ImageResult { link: item.link, snippet: item.snippet })
            .collect()
    }
}

#[async_trait]
impl ImageSearchProvider for GoogleImageSearch {
    async fn search(&self, query: &str) -> Result<Vec<ImageResult>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("GOOGLE_API_KEY not set, image search returns no results");
            return Ok(Vec::new());
        };

        let response = self.client
            .get(&self.api_base)
            .query(&[
                ("key",        api_key),
                ("cx",         self.cse_id.as_str()),
                ("q",          query),
                ("searchType", "image"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body   = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let parsed: SearchResponse = response.json().await?;
        let results = Self::into_results(parsed);
        tracing::debug!(query, count = results.len(), "image search results");
        Ok(results)
    }
}
