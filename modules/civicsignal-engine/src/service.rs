//! The issue service: the externally visible operation surface.
//!
//! Thin orchestration over the store and comment log. The one policy that
//! lives here rather than in the store is notification routing: a status
//! change performed by staff is forwarded to the notification collaborator
//! on a detached task, and a failed delivery never fails the mutation.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use civicsignal_common::{
    Actor, CivicSignalError, Comment, Config, ImageRef, Issue, StatusChange, StatusChanged,
};
use civicsignal_store::{
    CommentLog, IssueDraft, IssueFilter, IssuePatch, IssueStats, IssueStore, PageRequest,
    SortSpec, UpvoteReceipt,
};

use crate::notify::StatusNotifier;
use crate::response::{IssuePage, Pagination};

pub struct IssueService<N: StatusNotifier> {
    store: Arc<IssueStore>,
    comments: CommentLog,
    notifier: Arc<N>,
    max_page_size: u32,
}

impl<N: StatusNotifier> IssueService<N> {
    pub fn new(notifier: N, config: &Config) -> Self {
        let store = Arc::new(IssueStore::new(config));
        let comments = CommentLog::new(store.clone());
        Self {
            store,
            comments,
            notifier: Arc::new(notifier),
            max_page_size: config.max_page_size,
        }
    }

    /// Filtered, sorted, paginated listing. The pagination block is always
    /// present, even on an empty result.
    pub async fn list_issues(
        &self,
        filter: &IssueFilter,
        sort: Option<SortSpec>,
        page: PageRequest,
    ) -> Result<IssuePage, CivicSignalError> {
        let page = PageRequest {
            page: page.page.max(1),
            page_size: page.page_size.min(self.max_page_size),
        };
        let (items, total) = self.store.query(filter, sort, page)?;
        Ok(IssuePage {
            count: items.len(),
            pagination: Pagination {
                page: page.page,
                pages: page.pages_for(total),
                total,
            },
            items,
        })
    }

    pub async fn get_issue(&self, id: Uuid) -> Result<Issue, CivicSignalError> {
        self.store.get(id)
    }

    /// Create an issue owned by `owner`. `images` is the opaque reference
    /// list the upload collaborator produced.
    pub async fn create_issue(
        &self,
        mut draft: IssueDraft,
        owner: Uuid,
        images: Vec<ImageRef>,
    ) -> Result<Issue, CivicSignalError> {
        draft.images = images;
        let issue = self.store.create(draft, owner)?;
        info!(issue_id = %issue.id, category = %issue.category, "issue created");
        Ok(issue)
    }

    /// Partial update by the owner or an admin. A status change performed
    /// by staff is forwarded to the reporter's notification channel.
    pub async fn update_issue(
        &self,
        id: Uuid,
        patch: IssuePatch,
        actor: Actor,
    ) -> Result<Issue, CivicSignalError> {
        let (issue, event) = self.store.update(id, patch, actor)?;
        if let Some(event) = event {
            info!(
                issue_id = %id,
                old = %event.old,
                new = %event.new,
                "issue status changed"
            );
            if actor.role.is_staff() {
                self.dispatch_notification(event);
            }
        }
        Ok(issue)
    }

    pub async fn toggle_upvote(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<UpvoteReceipt, CivicSignalError> {
        self.store.toggle_upvote(id, user_id)
    }

    pub async fn get_stats(&self) -> IssueStats {
        self.store.stats()
    }

    pub async fn list_comments(&self, issue_id: Uuid) -> Vec<Comment> {
        self.comments.list(issue_id)
    }

    pub async fn add_comment(
        &self,
        issue_id: Uuid,
        actor: Actor,
        content: &str,
        status_change: Option<StatusChange>,
    ) -> Result<Comment, CivicSignalError> {
        self.comments.add(issue_id, actor, content, status_change)
    }

    /// Fire-and-forget delivery on a detached task. The triggering
    /// mutation has already committed; delivery failures are logged and
    /// swallowed.
    fn dispatch_notification(&self, event: StatusChanged) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.status_changed(event).await {
                warn!(
                    error = %e,
                    issue_id = %event.issue_id,
                    "status notification delivery failed"
                );
            }
        });
    }
}
