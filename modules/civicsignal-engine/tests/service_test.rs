//! Service-level scenarios: the full report → engage → triage flow,
//! authorization boundaries, and notification routing.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use civicsignal_common::{
    Actor, Category, CivicSignalError, Config, ImageRef, IssueStatus, Location, Priority, Role,
    StatusChange,
};
use civicsignal_engine::{ApiResponse, IssueService, RecordingNotifier};
use civicsignal_store::{IssueDraft, IssueFilter, IssuePatch, PageRequest};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn service() -> (IssueService<Arc<RecordingNotifier>>, Arc<RecordingNotifier>) {
    init_tracing();
    let notifier = Arc::new(RecordingNotifier::new());
    (
        IssueService::new(notifier.clone(), &Config::default()),
        notifier,
    )
}

fn pothole_draft() -> IssueDraft {
    let mut draft = IssueDraft::new(
        "Crater opening up near Silk Board junction",
        "Half the left lane is gone; buses are merging into oncoming traffic.",
        Category::Pothole,
        Location::at(12.9172, 77.6228),
    );
    draft.priority = Some(Priority::Critical);
    draft
}

/// Give detached notification tasks a chance to run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn report_engage_triage_flow() {
    let (service, _) = service();
    let reporter = Uuid::new_v4();

    let issue = service
        .create_issue(
            pothole_draft(),
            reporter,
            vec![ImageRef {
                url: "https://cdn.example/pothole-1.jpg".to_string(),
                reference_id: "img-7f3a".to_string(),
            }],
        )
        .await
        .unwrap();
    assert_eq!(issue.category, Category::Pothole);
    assert_eq!(issue.priority, Priority::Critical);
    assert_eq!(issue.images.len(), 1);

    // Two distinct supporters, then one retracts.
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    service.toggle_upvote(issue.id, alice).await.unwrap();
    let receipt = service.toggle_upvote(issue.id, bob).await.unwrap();
    assert_eq!(receipt.upvote_count, 2);
    let receipt = service.toggle_upvote(issue.id, alice).await.unwrap();
    assert!(!receipt.upvoted);
    assert_eq!(receipt.upvote_count, 1);

    // Admin leaves an official status-update annotation.
    let admin = Actor::new(Uuid::new_v4(), Role::Admin);
    let comment = service
        .add_comment(
            issue.id,
            admin,
            "Road crew scheduled for tomorrow morning.",
            Some(StatusChange {
                from: IssueStatus::Pending,
                to: IssueStatus::InProgress,
            }),
        )
        .await
        .unwrap();
    assert!(comment.is_status_update);
    assert!(comment.is_official);

    let fetched = service.get_issue(issue.id).await.unwrap();
    assert_eq!(fetched.comments_count, 1);
    assert_eq!(fetched.upvote_count, 1);
    // The annotation alone does not move the status field.
    assert_eq!(fetched.status, IssueStatus::Pending);

    let stats = service.get_stats().await;
    assert_eq!(stats.by_status.get(&IssueStatus::Pending), Some(&1));
    assert_eq!(stats.by_priority.get(&Priority::Critical), Some(&1));
    assert_eq!(stats.by_category[0].category, Category::Pothole);
}

#[tokio::test]
async fn update_authorization_boundary() {
    let (service, _) = service();
    let reporter = Uuid::new_v4();
    let issue = service
        .create_issue(pothole_draft(), reporter, Vec::new())
        .await
        .unwrap();

    let stranger = Actor::new(Uuid::new_v4(), Role::Citizen);
    let err = service
        .update_issue(issue.id, IssuePatch::status(IssueStatus::Closed), stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, CivicSignalError::Forbidden(_)));

    let admin = Actor::new(Uuid::new_v4(), Role::Admin);
    let updated = service
        .update_issue(issue.id, IssuePatch::status(IssueStatus::Closed), admin)
        .await
        .unwrap();
    assert_eq!(updated.status, IssueStatus::Closed);
}

#[tokio::test]
async fn staff_status_change_notifies_reporter() {
    let (service, notifier) = service();
    let reporter = Uuid::new_v4();
    let issue = service
        .create_issue(pothole_draft(), reporter, Vec::new())
        .await
        .unwrap();

    let moderator = Actor::new(Uuid::new_v4(), Role::Admin);
    service
        .update_issue(
            issue.id,
            IssuePatch::status(IssueStatus::InProgress),
            moderator,
        )
        .await
        .unwrap();
    settle().await;

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].issue_id, issue.id);
    assert_eq!(events[0].old, IssueStatus::Pending);
    assert_eq!(events[0].new, IssueStatus::InProgress);
    assert_eq!(events[0].recipient_user_id, reporter);
}

#[tokio::test]
async fn owner_status_change_does_not_notify() {
    let (service, notifier) = service();
    let reporter = Uuid::new_v4();
    let issue = service
        .create_issue(pothole_draft(), reporter, Vec::new())
        .await
        .unwrap();

    service
        .update_issue(
            issue.id,
            IssuePatch::status(IssueStatus::Closed),
            Actor::new(reporter, Role::Citizen),
        )
        .await
        .unwrap();
    settle().await;

    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn unchanged_status_does_not_notify() {
    let (service, notifier) = service();
    let issue = service
        .create_issue(pothole_draft(), Uuid::new_v4(), Vec::new())
        .await
        .unwrap();

    let admin = Actor::new(Uuid::new_v4(), Role::Admin);
    let patch = IssuePatch {
        priority: Some(Priority::High),
        ..IssuePatch::default()
    };
    service.update_issue(issue.id, patch, admin).await.unwrap();
    settle().await;

    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn failed_delivery_never_fails_the_mutation() {
    init_tracing();
    let service = IssueService::new(RecordingNotifier::failing(), &Config::default());
    let issue = service
        .create_issue(pothole_draft(), Uuid::new_v4(), Vec::new())
        .await
        .unwrap();

    let admin = Actor::new(Uuid::new_v4(), Role::Admin);
    let updated = service
        .update_issue(
            issue.id,
            IssuePatch::status(IssueStatus::InProgress),
            admin,
        )
        .await
        .unwrap();
    settle().await;

    assert_eq!(updated.status, IssueStatus::InProgress);
    assert_eq!(
        service.get_issue(issue.id).await.unwrap().status,
        IssueStatus::InProgress
    );
}

#[tokio::test]
async fn listing_carries_pagination_even_when_empty() {
    let (service, _) = service();
    let page = service
        .list_issues(&IssueFilter::default(), None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.count, 0);
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.pages, 0);
    assert_eq!(page.pagination.total, 0);
}

#[tokio::test]
async fn listing_clamps_oversized_page_size() {
    let (service, _) = service();
    for _ in 0..3 {
        service
            .create_issue(pothole_draft(), Uuid::new_v4(), Vec::new())
            .await
            .unwrap();
    }

    // Default max_page_size is 100; an absurd request degrades gracefully.
    let page = service
        .list_issues(
            &IssueFilter::default(),
            None,
            PageRequest::new(1, 1_000_000),
        )
        .await
        .unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(page.pagination.pages, 1);
}

#[tokio::test]
async fn envelope_maps_missing_issue_to_not_found() {
    let (service, _) = service();
    let response: ApiResponse<_> = service.get_issue(Uuid::new_v4()).await.into();
    assert!(!response.success);
    let err = response.error.unwrap();
    assert_eq!(err.kind, civicsignal_common::ErrorKind::NotFound);
}

#[tokio::test]
async fn concurrent_toggles_through_the_service() {
    let (service, _) = service();
    let service = Arc::new(service);
    let issue = service
        .create_issue(pothole_draft(), Uuid::new_v4(), Vec::new())
        .await
        .unwrap();

    let toggles = (0..10).map(|_| {
        let service = service.clone();
        let issue_id = issue.id;
        tokio::spawn(async move {
            service.toggle_upvote(issue_id, Uuid::new_v4()).await.unwrap();
        })
    });
    futures::future::join_all(toggles).await;

    let fetched = service.get_issue(issue.id).await.unwrap();
    assert_eq!(fetched.upvote_count, 10);
    assert_eq!(fetched.upvotes.len(), 10);
}
