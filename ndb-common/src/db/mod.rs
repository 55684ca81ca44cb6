//! Store access shared by all ndb crates

pub mod init;
pub mod row;
pub mod schema;

pub use init::*;
pub use schema::create_schema;
