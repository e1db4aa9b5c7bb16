use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use shelfscan_core::BookMetadata;
use shelfscan_core::config::MetadataConfig;

use crate::error::{IngestError, Result};
use crate::http::RateLimitedClient;
use crate::sources::MetadataResolver;

const BASE_URL: &str = "https://openlibrary.org";

/// Client for the Open Library `api/books` endpoint (`jscmd=data`).
pub struct OpenLibrarySource {
    client: RateLimitedClient,
    base_url: String,
}

impl OpenLibrarySource {
    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        let base_url = if config.base_url.is_empty() {
            BASE_URL.to_string()
        } else {
            config.base_url.clone()
        };
        Ok(Self {
            client: RateLimitedClient::new(
                Duration::from_millis(config.min_interval_ms),
                config.max_retries,
                &config.user_agent,
                Duration::from_secs(config.timeout_secs),
            )?,
            base_url,
        })
    }

    /// `Ok(None)` when the provider has no record for the ISBN.
    pub async fn fetch_by_isbn(&self, isbn13: &str) -> Result<Option<BookMetadata>> {
        let mut url = parse_base_url(&self.base_url)?;
        {
            let mut segs = url.path_segments_mut().map_err(|_| {
                IngestError::ResolverUnavailable("invalid Open Library base URL".to_string())
            })?;
            segs.pop_if_empty();
            segs.push("api");
            segs.push("books");
        }
        let bibkey = format!("ISBN:{isbn13}");
        url.query_pairs_mut()
            .append_pair("bibkeys", &bibkey)
            .append_pair("format", "json")
            .append_pair("jscmd", "data");

        let body = self.client.get(url.as_str()).await?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| IngestError::ResolverUnavailable(format!("malformed response: {e}")))?;

        let Some(raw_book) = json.get(&bibkey) else {
            return Ok(None);
        };
        metadata_from_json(raw_book).map(Some)
    }
}

#[async_trait]
impl MetadataResolver for OpenLibrarySource {
    fn name(&self) -> &str {
        "openlibrary"
    }

    async fn resolve(&self, isbn13: &str) -> Option<BookMetadata> {
        match self.fetch_by_isbn(isbn13).await {
            Ok(Some(metadata)) => Some(metadata),
            Ok(None) => {
                tracing::info!(isbn = isbn13, "no Open Library record");
                None
            }
            Err(err) => {
                tracing::warn!(isbn = isbn13, "Open Library lookup failed: {err}");
                None
            }
        }
    }
}

/// Title, publisher names and publish date are all required; anything less
/// is a malformed record.
fn metadata_from_json(v: &Value) -> Result<BookMetadata> {
    let missing = |field: &str| IngestError::ResolverUnavailable(format!("record has no {field}"));

    let title = v.get("title").and_then(Value::as_str).ok_or_else(|| missing("title"))?;

    let publishers = v
        .get("publishers")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("publishers"))?
        .iter()
        .map(|item| {
            item.get("name")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
                .ok_or_else(|| missing("publishers[].name"))
        })
        .collect::<Result<Vec<_>>>()?;

    let publish_date = v
        .get("publish_date")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("publish_date"))?;

    Ok(BookMetadata::new(title, publishers, publish_date))
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|e| {
        IngestError::ResolverUnavailable(format!("invalid URL {base_url}: {e}"))
    })
}
