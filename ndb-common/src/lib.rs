//! # ndb common library
//!
//! Shared code for the neuron database crates including:
//! - Store initialization and table definitions for all four stores
//! - Sharing, search scope and atlas version types
//! - Configuration loading
//! - Error type and timestamp/id helpers

pub mod atlas;
pub mod config;
pub mod db;
pub mod error;
pub mod sharing;
pub mod time;
pub mod uuid_utils;

pub use atlas::AtlasVersion;
pub use error::{Error, Result};
pub use sharing::{SearchScope, Sharing, Visibility};
