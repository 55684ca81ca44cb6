//! Sharing levels and search scopes
//!
//! Upstream stores record a `sharing` code per Sample and Neuron. The search
//! store records the derived `search_scope` code. Both are stored as integers
//! so unknown codes survive decoding and are handled at resolution time.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw sharing value as stored on a Sample or Neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sharing {
    DoNotShare,
    ShareAllInternal,
    ShareAllExternal,
    /// Neuron-only sentinel: take the owning Sample's sharing
    Inherited,
}

impl Sharing {
    pub const DO_NOT_SHARE: i64 = 0;
    pub const SHARE_ALL_INTERNAL: i64 = 1;
    pub const SHARE_ALL_EXTERNAL: i64 = 2;
    pub const INHERITED: i64 = 3;

    /// Decode a stored sharing code; `None` for unrecognized codes
    pub fn from_code(code: i64) -> Option<Sharing> {
        match code {
            Self::DO_NOT_SHARE => Some(Sharing::DoNotShare),
            Self::SHARE_ALL_INTERNAL => Some(Sharing::ShareAllInternal),
            Self::SHARE_ALL_EXTERNAL => Some(Sharing::ShareAllExternal),
            Self::INHERITED => Some(Sharing::Inherited),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Sharing::DoNotShare => Self::DO_NOT_SHARE,
            Sharing::ShareAllInternal => Self::SHARE_ALL_INTERNAL,
            Sharing::ShareAllExternal => Self::SHARE_ALL_EXTERNAL,
            Sharing::Inherited => Self::INHERITED,
        }
    }

    /// Concrete visibility, or `None` for the inherit sentinel
    pub fn visibility(self) -> Option<Visibility> {
        match self {
            Sharing::DoNotShare => Some(Visibility::DoNotShare),
            Sharing::ShareAllInternal => Some(Visibility::ShareAllInternal),
            Sharing::ShareAllExternal => Some(Visibility::ShareAllExternal),
            Sharing::Inherited => None,
        }
    }
}

/// Ordered visibility level used for thresholds
///
/// `DoNotShare < ShareAllInternal < ShareAllExternal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    DoNotShare,
    ShareAllInternal,
    ShareAllExternal,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::ShareAllExternal
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Visibility::DoNotShare => "do-not-share",
            Visibility::ShareAllInternal => "share-all-internal",
            Visibility::ShareAllExternal => "share-all-external",
        };
        f.write_str(name)
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "do-not-share" | "none" => Ok(Visibility::DoNotShare),
            "share-all-internal" | "internal" => Ok(Visibility::ShareAllInternal),
            "share-all-external" | "external" | "public" => Ok(Visibility::ShareAllExternal),
            other => Err(Error::InvalidInput(format!(
                "unknown visibility '{}' (expected do-not-share, share-all-internal or share-all-external)",
                other
            ))),
        }
    }
}

/// Search-store exposure level derived from visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SearchScope {
    Private,
    Team,
    Internal,
    Public,
}

impl SearchScope {
    pub fn code(self) -> i64 {
        match self {
            SearchScope::Private => 0,
            SearchScope::Team => 1,
            SearchScope::Internal => 2,
            SearchScope::Public => 3,
        }
    }

    /// Decode a stored scope code; unknown codes read as `Private`
    pub fn from_code(code: i64) -> SearchScope {
        match code {
            1 => SearchScope::Team,
            2 => SearchScope::Internal,
            3 => SearchScope::Public,
            _ => SearchScope::Private,
        }
    }
}

impl From<Visibility> for SearchScope {
    fn from(visibility: Visibility) -> Self {
        match visibility {
            Visibility::ShareAllExternal => SearchScope::Public,
            Visibility::ShareAllInternal => SearchScope::Internal,
            Visibility::DoNotShare => SearchScope::Team,
        }
    }
}
