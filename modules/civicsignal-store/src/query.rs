//! Query vocabulary for the issue store: equality filters, a structured
//! near-query, sort specs parseable from `-createdAt`-style strings, and
//! 1-based pagination.

use serde::{Deserialize, Serialize};

use civicsignal_common::{Category, Issue, IssueStatus, Priority};

// --- Filter ---

/// Recognized filter options. All present options apply as an intersection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFilter {
    pub category: Option<Category>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub near: Option<NearQuery>,
}

impl IssueFilter {
    /// Equality-filter match. Geo containment is resolved separately
    /// through the index.
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(category) = self.category {
            if issue.category != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if issue.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if issue.priority != priority {
                return false;
            }
        }
        true
    }
}

/// Radius search around a point. A missing radius falls back to the
/// configured default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NearQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
}

impl NearQuery {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            radius_km: None,
        }
    }

    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.radius_km = Some(radius_km);
        self
    }
}

// --- Sort ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    UpvoteCount,
    CommentsCount,
    Priority,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl Default for SortSpec {
    /// Newest first.
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            descending: true,
        }
    }
}

impl SortSpec {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            descending: false,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            descending: true,
        }
    }

    /// Parse the wire form: a field name with an optional leading `-` for
    /// descending, e.g. `-createdAt`. Unknown fields yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let key = match name {
            "createdAt" | "created_at" => SortKey::CreatedAt,
            "updatedAt" | "updated_at" => SortKey::UpdatedAt,
            "upvoteCount" | "upvote_count" | "upvotes" => SortKey::UpvoteCount,
            "commentsCount" | "comments_count" => SortKey::CommentsCount,
            "priority" => SortKey::Priority,
            "title" => SortKey::Title,
            _ => return None,
        };
        Some(Self { key, descending })
    }
}

/// Sort in place by the spec's key and direction, ties broken by id so
/// pagination over equal keys stays stable.
pub(crate) fn sort_issues(items: &mut [(Issue, Option<f64>)], spec: SortSpec) {
    items.sort_by(|(a, _), (b, _)| {
        let ord = match spec.key {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortKey::UpvoteCount => a.upvote_count.cmp(&b.upvote_count),
            SortKey::CommentsCount => a.comments_count.cmp(&b.comments_count),
            SortKey::Priority => a.priority.cmp(&b.priority),
            SortKey::Title => a.title.cmp(&b.title),
        };
        let ord = if spec.descending { ord.reverse() } else { ord };
        ord.then_with(|| a.id.cmp(&b.id))
    });
}

// --- Pagination ---

/// 1-based page request. Pages below 1 clamp to 1; a zero page size is a
/// validation error at query time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Total page count for `total` matching records.
    pub fn pages_for(&self, total: u64) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        total.div_ceil(self.page_size as u64) as u32
    }
}
