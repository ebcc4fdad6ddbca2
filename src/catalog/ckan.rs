// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CKAN action API client.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::CatalogError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `package_search` result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Every CKAN action answers with this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    result: Option<T>,
}

#[derive(Debug, Clone)]
pub struct CkanClient {
    base_url: String,
    http: Client,
}

impl CkanClient {
    /// `base_url` points at the action API, e.g. `https://host/api/3/action`.
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        Url::parse(base_url)?;
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn package_search(
        &self,
        params: &[(&str, String)],
    ) -> Result<SearchResult, CatalogError> {
        self.call("package_search", params).await
    }

    pub async fn package_show(&self, id: &str) -> Result<Value, CatalogError> {
        self.call("package_show", &[("id", id.to_string())]).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, action);
        tracing::debug!(action, "Calling CKAN");

        let envelope: Envelope<T> = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await?
            .json()
            .await?;

        if !envelope.success {
            return Err(CatalogError::Upstream(format!(
                "{action} returned success=false"
            )));
        }
        envelope
            .result
            .ok_or_else(|| CatalogError::Upstream(format!("{action} returned no result")))
    }
}
