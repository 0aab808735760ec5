//! Offset pagination and sort order for goods listings.
//!
//! A `ListQuery` is the full identity of a list page: the cache fingerprints
//! it and the store turns it into `LIMIT/OFFSET` plus an `ORDER BY`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::ProjectId;

pub const DEFAULT_LIMIT: i64 = 20;
pub const DEFAULT_OFFSET: i64 = 0;

/// Ordering of a list page by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a sort value other than `asc`/`desc`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sort")]
pub struct InvalidSort;

impl FromStr for SortDirection {
    type Err = InvalidSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(InvalidSort),
        }
    }
}

/// A single page request for one project's goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub project_id: ProjectId,
    pub limit: i64,
    pub offset: i64,
    pub sort: SortDirection,
}

impl ListQuery {
    pub fn new(project_id: ProjectId, limit: i64, offset: i64, sort: SortDirection) -> Self {
        Self {
            project_id,
            limit,
            offset,
            sort,
        }
    }

    /// First page with default window and ascending order.
    pub fn first_page(project_id: ProjectId) -> Self {
        Self::new(project_id, DEFAULT_LIMIT, DEFAULT_OFFSET, SortDirection::Asc)
    }

    /// Returns the reason this page request is unusable, if any.
    pub fn validation_error(&self) -> Option<&'static str> {
        if !self.project_id.is_valid() {
            Some("invalid project id")
        } else if self.limit <= 0 {
            Some("invalid limit")
        } else if self.offset < 0 {
            Some("invalid offset")
        } else {
            None
        }
    }
}
