//! Utility modules

pub mod chunks;
pub mod db_retry;

pub use chunks::partition_into_chunks;
pub use db_retry::retry_on_lock;
