//! # docqa-mistralrs
//!
//! Runs the docqa answer model in-process with
//! [mistral.rs](https://github.com/EricLBuehler/mistral.rs) instead of
//! talking to a llama.cpp server.
//!
//! > **Note:** This crate is NOT published to crates.io because mistral.rs depends on
//! > unpublished git dependencies. Build it explicitly with
//! > `cargo build --manifest-path docqa-mistralrs/Cargo.toml`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_mistralrs::MistralRsModel;
//! use docqa_rag::AnswerGenerator;
//!
//! let model = MistralRsModel::from_hf("microsoft/Phi-3.5-mini-instruct").await?;
//! let generator = AnswerGenerator::new(Arc::new(model));
//! ```

mod client;
mod config;
mod error;

pub use client::*;
pub use config::*;
pub use error::*;
