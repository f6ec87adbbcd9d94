//! Per-user upvote toggling.
//!
//! Membership flip and counter update commit as one versioned write, so
//! `upvote_count` always equals the size of the upvote set no matter how
//! many togglers race. Any authenticated user may upvote, including the
//! reporter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use civicsignal_common::CivicSignalError;

use crate::issues::IssueStore;

/// Outcome of a toggle: the caller's new membership and the new count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpvoteReceipt {
    pub upvoted: bool,
    pub upvote_count: u32,
}

impl IssueStore {
    /// Flip `user_id`'s membership in the issue's upvote set. A second
    /// toggle from the same user undoes the first.
    pub fn toggle_upvote(
        &self,
        issue_id: Uuid,
        user_id: Uuid,
    ) -> Result<UpvoteReceipt, CivicSignalError> {
        let (_, receipt) = self.mutate(issue_id, |issue| {
            let upvoted = if issue.upvotes.remove(&user_id) {
                issue.upvote_count -= 1;
                false
            } else {
                issue.upvotes.insert(user_id);
                issue.upvote_count += 1;
                true
            };
            Ok(UpvoteReceipt {
                upvoted,
                upvote_count: issue.upvote_count,
            })
        })?;
        Ok(receipt)
    }
}
