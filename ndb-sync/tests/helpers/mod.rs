//! Test Helper Utilities
//!
//! Shared fixtures for reconciliation tests

#![allow(dead_code)]

pub mod db_utils;
pub mod seed;

pub use db_utils::{content_rows, count_rows, create_test_stores, search_neuron, search_tracing, test_options, TestStores};
pub use seed::{t, Catalog, TracingIds, TracingSpec};
