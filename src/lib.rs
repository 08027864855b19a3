//! # MMCoQA Explorer
//!
//! Browse the MMCoQA multimodal conversational QA dataset turn by turn and
//! inspect the evidence (text passages, tables, images) behind each answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────────────┐
//! │ JSONL files  │──▶│   prepare    │──▶│ Dataset (mmcoqa-core) │
//! │ q/img/tab/txt│   │ load+group+  │   │ conversations + three │
//! └──────────────┘   │ index        │   │ evidence lookups      │
//!                    └──────────────┘   └──────────┬────────────┘
//!                                                  │
//!                    ┌─────────────────┬───────────┴─────┐
//!                    ▼                 ▼                 ▼
//!               ┌──────────┐     ┌──────────┐     ┌─────────────┐
//!               │   CLI    │     │   HTTP   │     │ CLIP scores │
//!               │  (mmqa)  │     │ (serve)  │     │ (analysis)  │
//!               └──────────┘     └──────────┘     └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`loader`] | Newline-delimited JSON record loading |
//! | [`prepare`] | Dataset preparation from the four corpora |
//! | [`explore`] | Terminal exploration commands |
//! | [`server`] | Read-only JSON HTTP server |
//! | [`similarity`] | Image–question similarity scoring |
//! | [`progress`] | Scoring progress on stderr |

pub mod config;
pub mod explore;
pub mod loader;
pub mod prepare;
pub mod progress;
pub mod server;
pub mod similarity;
