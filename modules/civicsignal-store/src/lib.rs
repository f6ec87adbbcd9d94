//! Issue storage and query engine.
//!
//! The store keeps every issue in an in-process map with optimistic
//! versioned commits: mutations snapshot, apply a pure closure, and commit
//! only when the record is unchanged underneath them. Mutations on
//! different issues never wait on each other; conflicting commits on the
//! same issue retry internally.
//!
//! Queries and stats read snapshots and never block writers.

pub mod comments;
pub mod engagement;
pub mod geo;
pub mod issues;
pub mod query;
pub mod stats;

pub use comments::CommentLog;
pub use engagement::UpvoteReceipt;
pub use geo::GeoIndex;
pub use issues::{IssueDraft, IssuePatch, IssueStore};
pub use query::{IssueFilter, NearQuery, PageRequest, SortKey, SortSpec};
pub use stats::{CategoryCount, IssueStats};
