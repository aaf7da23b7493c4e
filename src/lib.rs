//! # Holidex
//!
//! A multi-source holiday calendar reconciliation and lookup engine.
//!
//! Holidex ingests scraper dumps (JSONL, one file per source site) into a
//! deduplicated SQLite calendar: one row per holiday identity, one row per
//! holiday-on-a-date, and an append-only log of which source said what.
//! Mentions that arrive link-only get their descriptions backfilled by a
//! polite concurrent fetch pass. Lookups (by date, by occurrence, by title
//! substring) are served from the same database via a CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ JSONL dumps │──▶│   Ingest     │──▶│  SQLite   │
//! │ per source  │   │ clean+dedupe │   │ calendar  │
//! └─────────────┘   └──────────────┘   └─────┬─────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │  Enrich  │       │   CLI    │
//!                   │  (HTTP)  │       │  (hdx)   │
//!                   └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hdx init                      # create database
//! hdx ingest                    # load every configured source
//! hdx enrich                    # backfill missing descriptions
//! hdx date 2025-01-01           # list holidays on a date
//! hdx show 42                   # one occurrence, all sources
//! hdx search "новый год"
//! hdx stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Read-side data types |
//! | [`records`] | Raw record parsing and validation |
//! | [`normalize`] | Title normalization and language detection |
//! | [`filter`] | Non-holiday noise rejection |
//! | [`resolve`] | Holiday/occurrence identity resolution |
//! | [`ingest`] | JSONL ingestion pipeline |
//! | [`fetch`] | HTTP page fetching |
//! | [`extract`] | Description extraction from HTML |
//! | [`enrich`] | Concurrent description backfill |
//! | [`query`] | Date, occurrence, and title lookups |
//! | [`stats`] | Database statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod enrich;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod query;
pub mod records;
pub mod resolve;
pub mod stats;
