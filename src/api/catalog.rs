// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CKAN catalog endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    catalog::{DatasetDetail, DatasetList, DatasetPage, DEFAULT_ROWS, DEFAULT_START},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Offset of the first dataset (default 0)
    pub start: Option<u64>,
    /// Page size (default 100)
    pub rows: Option<u64>,
}

impl PageQuery {
    fn start(&self) -> u64 {
        self.start.unwrap_or(DEFAULT_START)
    }

    fn rows(&self) -> u64 {
        self.rows.unwrap_or(DEFAULT_ROWS)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free-text CKAN query
    #[serde(default)]
    pub query: String,
}

#[utoipa::path(
    get,
    path = "/ckan-datasets",
    params(PageQuery),
    tag = "Catalog",
    responses(
        (status = 200, body = DatasetPage),
        (status = 502, description = "CKAN unavailable"),
    )
)]
pub async fn list_datasets(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<DatasetPage>, ApiError> {
    Ok(Json(state.catalog.list(page.start(), page.rows()).await?))
}

#[utoipa::path(
    get,
    path = "/ckan-datasets/details/{id}",
    params(("id" = String, Path, description = "CKAN dataset ID or name")),
    tag = "Catalog",
    responses(
        (status = 200, body = DatasetDetail),
        (status = 502, description = "CKAN unavailable or unknown dataset"),
    )
)]
pub async fn dataset_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DatasetDetail>, ApiError> {
    Ok(Json(state.catalog.details(&id).await?))
}

#[utoipa::path(
    get,
    path = "/ckan-datasets-by-tag/{tag}",
    params(("tag" = String, Path, description = "Tag name"), PageQuery),
    tag = "Catalog",
    responses(
        (status = 200, body = DatasetPage),
        (status = 502, description = "CKAN unavailable"),
    )
)]
pub async fn datasets_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<DatasetPage>, ApiError> {
    Ok(Json(
        state.catalog.by_tag(&tag, page.start(), page.rows()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/ckan-datasets/most_downloaded/{rows}",
    params(("rows" = u64, Path, description = "Number of datasets")),
    tag = "Catalog",
    responses(
        (status = 200, body = DatasetPage),
        (status = 502, description = "CKAN unavailable"),
    )
)]
pub async fn most_downloaded(
    State(state): State<AppState>,
    Path(rows): Path<u64>,
) -> Result<Json<DatasetPage>, ApiError> {
    Ok(Json(state.catalog.most_downloaded(rows).await?))
}

#[utoipa::path(
    get,
    path = "/ckan-datasets/latest/{rows}",
    params(("rows" = u64, Path, description = "Number of datasets")),
    tag = "Catalog",
    responses(
        (status = 200, body = DatasetPage),
        (status = 502, description = "CKAN unavailable"),
    )
)]
pub async fn latest(
    State(state): State<AppState>,
    Path(rows): Path<u64>,
) -> Result<Json<DatasetPage>, ApiError> {
    Ok(Json(state.catalog.latest(rows).await?))
}

/// Ranked by how often each dataset showed up in search results.
#[utoipa::path(
    get,
    path = "/ckan-datasets/most_searched/{rows}",
    params(("rows" = usize, Path, description = "Number of datasets")),
    tag = "Catalog",
    responses(
        (status = 200, body = DatasetList),
        (status = 502, description = "Elasticsearch or CKAN unavailable"),
    )
)]
pub async fn most_searched(
    State(state): State<AppState>,
    Path(rows): Path<usize>,
) -> Result<Json<DatasetList>, ApiError> {
    Ok(Json(state.catalog.most_searched(rows).await?))
}

#[utoipa::path(
    get,
    path = "/ckan-datasets/search",
    params(SearchQuery),
    tag = "Catalog",
    responses(
        (status = 200, body = DatasetPage),
        (status = 502, description = "CKAN unavailable"),
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<DatasetPage>, ApiError> {
    Ok(Json(state.catalog.search(&params.query).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_defaults() {
        let page = PageQuery::default();
        assert_eq!(page.start(), 0);
        assert_eq!(page.rows(), 100);

        let page = PageQuery {
            start: Some(20),
            rows: Some(5),
        };
        assert_eq!((page.start(), page.rows()), (20, 5));
    }

    #[tokio::test]
    async fn unreachable_ckan_is_bad_gateway() {
        // Nothing listens on port 9 of loopback
        let ctx = crate::test_support::TestContext::with_vars(&[(
            crate::config::CKAN_BASE_URL_ENV,
            "http://127.0.0.1:9/api/3/action",
        )]);
        let err = list_datasets(State(ctx.state.clone()), Query(PageQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "Error getting data from CKAN");
    }
}
