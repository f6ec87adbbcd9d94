//! Append-only comment and audit log.
//!
//! A comment carrying a from→to status pair is an audit annotation of the
//! discussion trail; it does not change the issue's status field. Changing
//! the status is a separate `IssueStore::update` call.
//!
//! `add` keeps `comments_count` coupled to the log: the counter increment
//! is the only fallible step and commits before the append, under the
//! log's write lock, so a failed call never leaves a phantom count and a
//! successful call is visible in both places.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use civicsignal_common::{
    Actor, CivicSignalError, Comment, CommentAuthor, StatusChange,
};

use crate::issues::IssueStore;

pub(crate) const MAX_COMMENT_CHARS: usize = 300;

pub struct CommentLog {
    issues: Arc<IssueStore>,
    entries: RwLock<Vec<Comment>>,
}

impl CommentLog {
    pub fn new(issues: Arc<IssueStore>) -> Self {
        Self {
            issues,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append a comment on behalf of `actor`. A present `status_change`
    /// tags the comment as a status update; it is official only when the
    /// author holds a staff role.
    pub fn add(
        &self,
        issue_id: Uuid,
        actor: Actor,
        content: &str,
        status_change: Option<StatusChange>,
    ) -> Result<Comment, CivicSignalError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CivicSignalError::Validation(
                "comment content is required".to_string(),
            ));
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(CivicSignalError::Validation(format!(
                "comment exceeds {MAX_COMMENT_CHARS} characters"
            )));
        }

        let mut entries = self.entries.write().expect("comment log lock poisoned");
        self.issues.mutate(issue_id, |issue| {
            issue.comments_count += 1;
            Ok(())
        })?;

        let comment = Comment {
            id: Uuid::new_v4(),
            issue_id,
            author: CommentAuthor {
                id: actor.id,
                role: actor.role,
            },
            content: content.to_string(),
            is_status_update: status_change.is_some(),
            status_from: status_change.map(|c| c.from),
            status_to: status_change.map(|c| c.to),
            is_official: status_change.is_some() && actor.role.is_staff(),
            created_at: Utc::now(),
        };
        entries.push(comment.clone());
        Ok(comment)
    }

    /// Comments for one issue, newest first.
    pub fn list(&self, issue_id: Uuid) -> Vec<Comment> {
        let entries = self.entries.read().expect("comment log lock poisoned");
        let mut items: Vec<Comment> = entries
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        items
    }
}
