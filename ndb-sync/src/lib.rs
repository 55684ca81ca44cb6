//! ndb-sync: search store reconciliation
//!
//! Incrementally rebuilds the denormalized search store from the sample,
//! raw tracing and registered tracing stores. See [`services::Reconciler`].

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

pub use config::ReconcileOptions;
pub use db::Stores;
pub use services::reconciler::{ContentStats, RunStatistics};
pub use services::Reconciler;
