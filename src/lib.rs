// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token Gate - Client Credentials Token Service
//!
//! Provisioned clients exchange their id and secret for a short-lived signed
//! access token. Protected routes ask an authorizer for an allow/deny
//! decision on the presented bearer token; decisions are cached per token.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Secret access, token signing, issuance and authorization
//! - `registry` - Client provisioning and credential checks
//! - `storage` - Client record stores (in-memory and redb)

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod state;
pub mod storage;
