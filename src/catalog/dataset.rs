// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reshaping of raw CKAN package objects into API payloads.
//!
//! CKAN packages are loosely typed, so input is handled as
//! `serde_json::Value`. Missing or `null` fields fall back to fixed
//! placeholder strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const UNKNOWN_ID: &str = "Unknown ID";
pub const UNKNOWN_NAME: &str = "Unknown Name";
pub const NO_NOTES: &str = "No Notes Available";
pub const UNKNOWN_FORMAT: &str = "Unknown Format";
pub const NO_TITLE: &str = "No Title";
pub const NO_URL: &str = "No URL";
pub const UNKNOWN_DATE: &str = "Unknown Date";
pub const UNKNOWN_TAG: &str = "Unknown";

/// Path segment used in detail links when a package has no ID.
const UNKNOWN_ID_SEGMENT: &str = "unknown_id";

/// Dataset as listed in search results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub notes: String,
    /// Distinct resource formats in first-seen order
    pub resource_formats: Vec<String>,
    /// Link to this gateway's detail endpoint for the dataset
    pub api_detail_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub display_name: String,
}

/// Full dataset detail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DatasetDetail {
    pub id: String,
    pub name: String,
    pub title: String,
    pub notes: String,
    pub url: String,
    pub num_resources: u64,
    pub metadata_created: String,
    pub metadata_modified: String,
    /// Resource objects passed through from CKAN unchanged
    #[schema(value_type = Vec<Object>)]
    pub resources: Vec<Value>,
    pub tags: Vec<Tag>,
}

/// A page of search results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DatasetPage {
    /// Total matches upstream, not the length of `datasets`
    pub count: u64,
    pub datasets: Vec<DatasetSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DatasetList {
    pub datasets: Vec<DatasetSummary>,
}

/// Build a summary from a raw CKAN package.
pub fn summarize(package: &Value, public_base_url: &str) -> DatasetSummary {
    let raw_id = text(package, "id");
    let resources = package
        .get("resources")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    DatasetSummary {
        api_detail_url: detail_url(public_base_url, raw_id.as_deref()),
        id: raw_id.unwrap_or_else(|| UNKNOWN_ID.to_string()),
        name: text_or(package, "name", UNKNOWN_NAME),
        notes: text_or(package, "notes", NO_NOTES),
        resource_formats: resource_formats(resources),
    }
}

/// Build a summary from an already reshaped detail.
pub fn summarize_detail(detail: &DatasetDetail, public_base_url: &str) -> DatasetSummary {
    DatasetSummary {
        id: detail.id.clone(),
        name: detail.name.clone(),
        notes: detail.notes.clone(),
        resource_formats: resource_formats(&detail.resources),
        api_detail_url: detail_url(public_base_url, Some(detail.id.as_str())),
    }
}

/// Build a detail view from a raw CKAN package.
pub fn detail(package: &Value) -> DatasetDetail {
    let resources = package
        .get("resources")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let tags = package
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .map(|tag| Tag {
                    name: text_or(tag, "name", UNKNOWN_TAG),
                    display_name: text_or(tag, "display_name", UNKNOWN_TAG),
                })
                .collect()
        })
        .unwrap_or_default();

    DatasetDetail {
        id: text_or(package, "id", UNKNOWN_ID),
        name: text_or(package, "name", UNKNOWN_NAME),
        title: text_or(package, "title", NO_TITLE),
        notes: text_or(package, "notes", NO_NOTES),
        url: text_or(package, "url", NO_URL),
        num_resources: package
            .get("num_resources")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        metadata_created: text_or(package, "metadata_created", UNKNOWN_DATE),
        metadata_modified: text_or(package, "metadata_modified", UNKNOWN_DATE),
        resources,
        tags,
    }
}

fn resource_formats(resources: &[Value]) -> Vec<String> {
    let mut formats: Vec<String> = Vec::new();
    for resource in resources {
        let format = text_or(resource, "format", UNKNOWN_FORMAT);
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    formats
}

fn detail_url(public_base_url: &str, id: Option<&str>) -> String {
    format!(
        "{}/ckan-datasets/details/{}",
        public_base_url.trim_end_matches('/'),
        id.unwrap_or(UNKNOWN_ID_SEGMENT)
    )
}

/// A field as text; `None` when missing or null. Non-string scalars are
/// rendered as JSON.
fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_or(value: &Value, key: &str, default: &str) -> String {
    text(value, key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "http://localhost:8080";

    #[test]
    fn summary_uses_fields_and_unique_formats() {
        let package = json!({
            "id": "abc",
            "name": "air-quality",
            "notes": "Hourly readings",
            "resources": [
                {"format": "CSV"},
                {"format": "JSON"},
                {"format": "CSV"},
                {}
            ]
        });

        let summary = summarize(&package, BASE);
        assert_eq!(summary.id, "abc");
        assert_eq!(summary.name, "air-quality");
        assert_eq!(summary.notes, "Hourly readings");
        assert_eq!(
            summary.resource_formats,
            vec!["CSV", "JSON", UNKNOWN_FORMAT]
        );
        assert_eq!(
            summary.api_detail_url,
            "http://localhost:8080/ckan-datasets/details/abc"
        );
    }

    #[test]
    fn summary_defaults_for_missing_fields() {
        let summary = summarize(&json!({"notes": null}), "http://gw.example/");
        assert_eq!(summary.id, UNKNOWN_ID);
        assert_eq!(summary.name, UNKNOWN_NAME);
        assert_eq!(summary.notes, NO_NOTES);
        assert!(summary.resource_formats.is_empty());
        assert_eq!(
            summary.api_detail_url,
            "http://gw.example/ckan-datasets/details/unknown_id"
        );
    }

    #[test]
    fn empty_notes_are_kept() {
        let summary = summarize(&json!({"id": "x", "notes": ""}), BASE);
        assert_eq!(summary.notes, "");
    }

    #[test]
    fn detail_defaults() {
        let detail = detail(&json!({"tags": [{"name": "air"}, {}]}));
        assert_eq!(detail.id, UNKNOWN_ID);
        assert_eq!(detail.title, NO_TITLE);
        assert_eq!(detail.url, NO_URL);
        assert_eq!(detail.num_resources, 0);
        assert_eq!(detail.metadata_created, UNKNOWN_DATE);
        assert_eq!(detail.metadata_modified, UNKNOWN_DATE);
        assert!(detail.resources.is_empty());
        assert_eq!(
            detail.tags,
            vec![
                Tag {
                    name: "air".to_string(),
                    display_name: UNKNOWN_TAG.to_string()
                },
                Tag {
                    name: UNKNOWN_TAG.to_string(),
                    display_name: UNKNOWN_TAG.to_string()
                },
            ]
        );
    }

    #[test]
    fn detail_passes_resources_through() {
        let package = json!({
            "id": "abc",
            "num_resources": 2,
            "resources": [{"format": "CSV", "url": "http://x/a.csv"}, {"format": "PDF"}]
        });
        let detail = detail(&package);
        assert_eq!(detail.num_resources, 2);
        assert_eq!(detail.resources[0]["url"], "http://x/a.csv");

        let summary = summarize_detail(&detail, BASE);
        assert_eq!(summary.resource_formats, vec!["CSV", "PDF"]);
        assert_eq!(summary.api_detail_url, format!("{BASE}/ckan-datasets/details/abc"));
    }
}
