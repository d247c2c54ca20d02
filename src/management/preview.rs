use std::{collections::HashMap, sync::Arc};

use reqwest::Url;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    http::{HttpClient, HttpRequest},
    types::Song,
};

pub const ITUNES_SEARCH_URL: &str = "https://itunes.apple.com/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "previewUrl", default)]
    preview_url: Option<String>,
}

/// Resolves a 30-second audio preview for songs that cannot be played
/// remotely.
///
/// Lookups go to the iTunes Search API by "artist title" and are cached per
/// search term, misses included, so a song is looked up at most once.
pub struct PreviewResolver {
    http: Arc<dyn HttpClient>,
    search_url: String,
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl PreviewResolver {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self::with_search_url(http, ITUNES_SEARCH_URL)
    }

    pub fn with_search_url(http: Arc<dyn HttpClient>, search_url: impl Into<String>) -> Self {
        PreviewResolver {
            http,
            search_url: search_url.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, song: &Song) -> Option<String> {
        let term = song.search_term();
        if let Some(cached) = self.cache.lock().await.get(&term) {
            return cached.clone();
        }

        let preview = self.lookup(&term).await;
        self.cache.lock().await.insert(term, preview.clone());
        preview
    }

    async fn lookup(&self, term: &str) -> Option<String> {
        let url = Url::parse_with_params(
            &self.search_url,
            &[("term", term), ("entity", "song"), ("limit", "1")],
        )
        .ok()?;

        let response = match self.http.send(HttpRequest::get(url.as_str())).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                log::debug!("preview lookup for \"{term}\" answered {}", response.status);
                return None;
            }
            Err(e) => {
                log::debug!("preview lookup for \"{term}\" failed: {e}");
                return None;
            }
        };

        response
            .json::<SearchResponse>()
            .ok()?
            .results
            .into_iter()
            .find_map(|result| result.preview_url)
    }
}
