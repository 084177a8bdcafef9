//! Typed client for the local Home Assistant REST API.
//!
//! This crate provides:
//! - A thin `reqwest` wrapper for the state and service endpoints
//! - A startup connectivity probe
//! - The capability policy gating which domains may be acted upon

mod client;
mod error;
pub mod policy;

pub use client::{EntitySummary, HaClient};
pub use error::{HaError, HaResult};
