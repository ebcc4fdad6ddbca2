// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Open Data Gateway - Auth & Catalog API
//!
//! Email/password authentication issuing short-lived JWT access tokens
//! and single-use rotating refresh tokens, plus a read-only aggregator in
//! front of a CKAN open-data catalog.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credentials, token issuing and the session state machine
//! - `catalog` - CKAN client, dataset reshaping and search analytics
//! - `storage` - Embedded database (redb) for users and refresh tokens

pub mod api;
pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
