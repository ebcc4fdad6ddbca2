// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Search analytics stored in Elasticsearch.
//!
//! Every dataset returned by a catalog search is recorded as a
//! `dataset_searched` event; the "most searched" ranking is a terms
//! aggregation over those events. Without `ELASTIC_SEARCH_URL` the tracker
//! is disabled: tracking is a no-op and the ranking is empty.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::CatalogError;

pub const SEARCH_INDEX: &str = "search_datasets_id";
pub const SEARCH_EVENT: &str = "dataset_searched";
const AGGREGATION_FIELD: &str = "data.dataset_id.keyword";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: String,
    http: Client,
}

#[derive(Debug, Clone)]
pub struct SearchAnalytics {
    endpoint: Option<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct AggregationResponse {
    #[serde(default)]
    aggregations: Option<Aggregations>,
}

#[derive(Debug, Deserialize)]
struct Aggregations {
    popular_datasets: TermsAggregation,
}

#[derive(Debug, Deserialize)]
struct TermsAggregation {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    key: serde_json::Value,
}

impl SearchAnalytics {
    /// `None` disables analytics.
    pub fn new(base_url: Option<&str>) -> Result<Self, CatalogError> {
        let endpoint = match base_url {
            Some(base_url) => {
                Url::parse(base_url)?;
                Some(Endpoint {
                    base_url: base_url.trim_end_matches('/').to_string(),
                    http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
                })
            }
            None => None,
        };
        Ok(Self { endpoint })
    }

    pub fn disabled() -> Self {
        Self { endpoint: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Record that `dataset_id` appeared in a search. Failures are logged
    /// and swallowed.
    pub async fn track_search(&self, dataset_id: &str) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };

        let event = json!({
            "event_type": SEARCH_EVENT,
            "data": { "dataset_id": dataset_id },
            "timestamp": Utc::now().to_rfc3339(),
        });
        let url = format!("{}/{}/_doc", endpoint.base_url, SEARCH_INDEX);

        match endpoint.http.post(&url).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(dataset_id, "Tracked dataset search");
            }
            Ok(response) => {
                tracing::warn!(
                    dataset_id,
                    status = %response.status(),
                    "Elasticsearch rejected search event"
                );
            }
            Err(e) => {
                tracing::warn!(dataset_id, error = %e, "Failed to send search event");
            }
        }
    }

    /// IDs of the `size` most searched datasets, most frequent first.
    pub async fn most_searched_ids(&self, size: usize) -> Result<Vec<String>, CatalogError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(Vec::new());
        };
        if size == 0 {
            return Ok(Vec::new());
        }

        let query = json!({
            "size": 0,
            "aggs": {
                "popular_datasets": {
                    "terms": { "field": AGGREGATION_FIELD, "size": size }
                }
            }
        });
        let url = format!("{}/{}/_search", endpoint.base_url, SEARCH_INDEX);
        let response = endpoint.http.post(&url).json(&query).send().await?;

        // No search has been tracked yet
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(CatalogError::Upstream(format!(
                "Elasticsearch aggregation failed with {}",
                response.status()
            )));
        }

        let body: AggregationResponse = response.json().await?;
        let ids = body
            .aggregations
            .map(|aggs| aggs.popular_datasets.buckets)
            .unwrap_or_default()
            .into_iter()
            .map(|bucket| match bucket.key {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Ok(ids)
    }
}
