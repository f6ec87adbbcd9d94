//! Issue service orchestration.
//!
//! Composes the issue store, comment log, and geospatial index behind the
//! public operation surface, maps domain errors to stable externally
//! visible categories, and hands status-change events to the notification
//! collaborator without ever waiting on delivery.

pub mod notify;
pub mod response;
pub mod service;

pub use notify::{RecordingNotifier, StatusNotifier};
pub use response::{ApiError, ApiResponse, IssuePage, Pagination};
pub use service::IssueService;
