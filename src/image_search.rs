// Resolves image keywords to stock photo URLs (Pexels search API)

use crate::error::{BlogError, Result};

use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    src: PhotoSrc,
}

#[derive(Deserialize)]
struct PhotoSrc {
    large: Option<String>,
    medium: Option<String>,
}

#[derive(Clone)]
pub struct ImageSearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ImageSearchClient {
    pub fn new(client: Client, endpoint: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Looks up one landscape photo for `keyword`, preferring the large rendition.
    pub async fn fetch_single_image(&self, keyword: &str) -> Result<String> {
        let failure = |reason: String| BlogError::ImageLookupFailure {
            keyword: keyword.to_string(),
            reason,
        };

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| failure("no image search API key configured".into()))?;

        let response = self
            .client
            .get(&self.endpoint)
            .header("Authorization", api_key)
            .query(&[("query", keyword), ("per_page", "1"), ("orientation", "landscape")])
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure(format!("search returned {}", response.status())));
        }

        let data: SearchResponse = response.json().await.map_err(|e| failure(e.to_string()))?;

        data.photos
            .into_iter()
            .next()
            .and_then(|photo| photo.src.large.or(photo.src.medium))
            .ok_or_else(|| failure("no photos found".into()))
    }
}

/// True for entries that are already usable image URLs.
pub fn is_direct_url(entry: &str) -> bool {
    Url::parse(entry)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Maps each entry to an image URL, one lookup at a time, keeping order and
/// skipping entries that could not be resolved.
pub async fn resolve_images(search: Option<&ImageSearchClient>, entries: Vec<String>) -> Vec<String> {
    let mut urls = Vec::with_capacity(entries.len());

    for entry in entries {
        if is_direct_url(&entry) {
            urls.push(entry);
            continue;
        }

        let Some(search) = search else {
            tracing::warn!("no image search configured, skipping keyword '{}'", entry);
            continue;
        };

        match search.fetch_single_image(&entry).await {
            Ok(url) => urls.push(url),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    urls
}
