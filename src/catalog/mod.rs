// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Catalog Module
//!
//! Read-only aggregator in front of a CKAN open-data catalog.
//!
//! ## Components
//!
//! - [`CkanClient`] - `package_search` / `package_show` over HTTP
//! - [`SearchAnalytics`] - Elasticsearch event tracking and ranking
//! - [`DatasetCache`] - short-lived LRU of dataset details
//! - [`dataset`] - reshaping of raw CKAN packages
//!
//! Upstream failures surface as [`CatalogError`] and map to `502`.

pub mod analytics;
pub mod cache;
pub mod ckan;
pub mod dataset;

pub use analytics::SearchAnalytics;
pub use cache::DatasetCache;
pub use ckan::CkanClient;
pub use dataset::{DatasetDetail, DatasetList, DatasetPage, DatasetSummary, Tag};

use crate::config::CatalogSettings;

pub const DEFAULT_START: u64 = 0;
pub const DEFAULT_ROWS: u64 = 100;

const SORT_MOST_DOWNLOADED: &str = "views_total desc";
const SORT_LATEST: &str = "metadata_modified desc";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned an error: {0}")]
    Upstream(String),

    #[error("invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Catalog queries as exposed by the HTTP API.
pub struct CatalogService {
    ckan: CkanClient,
    analytics: SearchAnalytics,
    cache: DatasetCache,
    public_base_url: String,
}

impl CatalogService {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
        Ok(Self {
            ckan: CkanClient::new(&settings.ckan_base_url)?,
            analytics: SearchAnalytics::new(settings.elastic_search_url.as_deref())?,
            cache: DatasetCache::default(),
            public_base_url: settings.public_base_url.clone(),
        })
    }

    pub fn analytics_enabled(&self) -> bool {
        self.analytics.is_enabled()
    }

    /// Paged listing of all datasets.
    pub async fn list(&self, start: u64, rows: u64) -> Result<DatasetPage, CatalogError> {
        self.search_page(&[("start", start.to_string()), ("rows", rows.to_string())])
            .await
    }

    pub async fn details(&self, id: &str) -> Result<DatasetDetail, CatalogError> {
        let package = self.ckan.package_show(id).await?;
        let detail = dataset::detail(&package);
        self.cache.put(id, detail.clone());
        Ok(detail)
    }

    pub async fn by_tag(
        &self,
        tag: &str,
        start: u64,
        rows: u64,
    ) -> Result<DatasetPage, CatalogError> {
        self.search_page(&[
            ("fq", format!("tags:{tag}")),
            ("start", start.to_string()),
            ("rows", rows.to_string()),
        ])
        .await
    }

    pub async fn most_downloaded(&self, rows: u64) -> Result<DatasetPage, CatalogError> {
        self.search_page(&[
            ("sort", SORT_MOST_DOWNLOADED.to_string()),
            ("rows", rows.to_string()),
        ])
        .await
    }

    pub async fn latest(&self, rows: u64) -> Result<DatasetPage, CatalogError> {
        self.search_page(&[("sort", SORT_LATEST.to_string()), ("rows", rows.to_string())])
            .await
    }

    /// Free-text search. Every returned dataset is recorded as searched.
    pub async fn search(&self, query: &str) -> Result<DatasetPage, CatalogError> {
        let result = self.ckan.package_search(&[("q", query.to_string())]).await?;

        if self.analytics.is_enabled() {
            let ids: Vec<String> = result
                .results
                .iter()
                .filter_map(|package| package.get("id").and_then(|id| id.as_str()))
                .map(str::to_string)
                .collect();
            let analytics = self.analytics.clone();
            tokio::spawn(async move {
                for id in ids {
                    analytics.track_search(&id).await;
                }
            });
        }

        Ok(self.to_page(result))
    }

    /// Top `rows` datasets by search count. Datasets whose detail cannot be
    /// fetched are skipped.
    pub async fn most_searched(&self, rows: usize) -> Result<DatasetList, CatalogError> {
        let ids = self.analytics.most_searched_ids(rows).await?;

        let mut datasets = Vec::with_capacity(ids.len());
        for id in ids {
            let detail = match self.cache.get(&id) {
                Some(detail) => detail,
                None => match self.details(&id).await {
                    Ok(detail) => detail,
                    Err(e) => {
                        tracing::warn!(dataset_id = %id, error = %e, "Skipping unavailable dataset");
                        continue;
                    }
                },
            };
            datasets.push(dataset::summarize_detail(&detail, &self.public_base_url));
        }
        Ok(DatasetList { datasets })
    }

    async fn search_page(&self, params: &[(&str, String)]) -> Result<DatasetPage, CatalogError> {
        let result = self.ckan.package_search(params).await?;
        Ok(self.to_page(result))
    }

    fn to_page(&self, result: ckan::SearchResult) -> DatasetPage {
        DatasetPage {
            count: result.count,
            datasets: result
                .results
                .iter()
                .map(|package| dataset::summarize(package, &self.public_base_url))
                .collect(),
        }
    }
}
