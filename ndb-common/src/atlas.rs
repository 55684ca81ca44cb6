//! Atlas versions
//!
//! Every registered node carries one region assignment per atlas version.
//! The two versions share all logic; only the columns and tables differ.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtlasVersion {
    CcfV25,
    CcfV30,
}

impl AtlasVersion {
    pub const ALL: [AtlasVersion; 2] = [AtlasVersion::CcfV25, AtlasVersion::CcfV30];

    /// Region column on `tracing_node` (registered and search stores)
    pub fn node_region_column(self) -> &'static str {
        match self {
            AtlasVersion::CcfV25 => "brain_area_id_ccf_v25",
            AtlasVersion::CcfV30 => "brain_area_id_ccf_v30",
        }
    }

    /// Pre-aggregated compartment table in the registered tracing store
    pub fn source_content_table(self) -> &'static str {
        match self {
            AtlasVersion::CcfV25 => "tracing_compartment_ccf_v25",
            AtlasVersion::CcfV30 => "tracing_compartment_ccf_v30",
        }
    }

    /// Derived compartment content table in the search store
    pub fn search_content_table(self) -> &'static str {
        match self {
            AtlasVersion::CcfV25 => "ccf_v25_search_content",
            AtlasVersion::CcfV30 => "ccf_v30_search_content",
        }
    }
}

impl fmt::Display for AtlasVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtlasVersion::CcfV25 => f.write_str("ccf-v2.5"),
            AtlasVersion::CcfV30 => f.write_str("ccf-v3.0"),
        }
    }
}
