//! Keygate - device-binding license gate.
//!
//! Enforces a one-device-per-license, one-owner-per-license policy with
//! optional time-boxed expiry encoded in the key itself. The decision core
//! lives in [`engine`]; everything else is HTTP and storage plumbing around
//! a sqlite-backed store.

pub mod config;
pub mod crypto;
pub mod db;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod util;
