//! The issue store: durable CRUD plus the combined filter/geo/paginate
//! query path.
//!
//! Mutations go through `mutate`: snapshot the record, run a pure closure
//! against the copy, then commit only if the stored version is unchanged.
//! A lost race retries with a fresh snapshot; exhausting the bounded retry
//! budget surfaces `Conflict`. The commit critical section is a brief map
//! write lock, so mutations on different issues proceed in parallel and a
//! caller-side timeout can never observe a half-applied mutation.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use civicsignal_common::{
    Actor, Category, CivicSignalError, Config, Department, Issue, IssueStatus, ImageRef, Location,
    Priority, StatusChanged,
};

use crate::geo::GeoIndex;
use crate::query::{sort_issues, IssueFilter, PageRequest, SortSpec};

pub(crate) const MAX_TITLE_CHARS: usize = 100;
pub(crate) const MAX_DESCRIPTION_CHARS: usize = 500;

struct Versioned {
    version: u64,
    issue: Issue,
}

pub struct IssueStore {
    issues: RwLock<HashMap<Uuid, Versioned>>,
    geo: GeoIndex,
    commit_retries: u32,
    default_radius_km: f64,
}

impl IssueStore {
    pub fn new(config: &Config) -> Self {
        Self {
            issues: RwLock::new(HashMap::new()),
            geo: GeoIndex::new(),
            commit_retries: config.commit_retries,
            default_radius_km: config.default_radius_km,
        }
    }

    /// Validate the draft, assign identity and timestamps, and store the
    /// issue. The point is registered in the geospatial index before the
    /// call returns, so an immediate near-query finds it.
    pub fn create(&self, draft: IssueDraft, owner: Uuid) -> Result<Issue, CivicSignalError> {
        draft.validate()?;

        let now = Utc::now();
        let issue = Issue {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            category: draft.category,
            status: draft.status.unwrap_or(IssueStatus::Pending),
            priority: draft.priority.unwrap_or(Priority::Medium),
            location: draft.location,
            images: draft.images,
            reported_by: owner,
            assigned_to: draft.assigned_to,
            department: draft.department,
            upvotes: HashSet::new(),
            upvote_count: 0,
            comments_count: 0,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };

        let point = issue.location.point;
        self.geo.insert(issue.id, point.lat, point.lng)?;
        let mut map = self.issues.write().expect("issues map lock poisoned");
        map.insert(
            issue.id,
            Versioned {
                version: 1,
                issue: issue.clone(),
            },
        );
        Ok(issue)
    }

    pub fn get(&self, id: Uuid) -> Result<Issue, CivicSignalError> {
        let map = self.issues.read().expect("issues map lock poisoned");
        map.get(&id)
            .map(|v| v.issue.clone())
            .ok_or_else(|| CivicSignalError::NotFound(format!("issue {id}")))
    }

    /// Apply a partial update on behalf of `actor`. Only the owner or an
    /// admin may modify an issue. When the status field actually changes,
    /// the returned event lets the orchestrator notify the reporter; the
    /// store itself never talks to the notification collaborator.
    pub fn update(
        &self,
        id: Uuid,
        patch: IssuePatch,
        actor: Actor,
    ) -> Result<(Issue, Option<StatusChanged>), CivicSignalError> {
        patch.validate()?;

        let (issue, (event, moved)) = self.mutate(id, |issue| {
            if !actor.can_modify(issue.reported_by) {
                return Err(CivicSignalError::Forbidden(format!(
                    "user {} may not modify issue {id}",
                    actor.id
                )));
            }

            let old_status = issue.status;
            let old_point = issue.location.point;
            patch.apply(issue);

            if issue.status == IssueStatus::Resolved
                && old_status != IssueStatus::Resolved
                && issue.resolved_at.is_none()
            {
                issue.resolved_at = Some(Utc::now());
            }

            let event = (issue.status != old_status).then_some(StatusChanged {
                issue_id: id,
                old: old_status,
                new: issue.status,
                recipient_user_id: issue.reported_by,
            });
            let moved = issue.location.point != old_point;
            Ok((event, moved))
        })?;

        if moved {
            let point = issue.location.point;
            self.geo.insert(id, point.lat, point.lng)?;
        }
        Ok((issue, event))
    }

    /// Combined filter/geo/paginated read. Returns the page of issues and
    /// the total match count; `pages = ceil(total / page_size)` on the
    /// caller's side.
    pub fn query(
        &self,
        filter: &IssueFilter,
        sort: Option<SortSpec>,
        page: PageRequest,
    ) -> Result<(Vec<Issue>, u64), CivicSignalError> {
        if page.page_size == 0 {
            return Err(CivicSignalError::Validation(
                "page_size must be at least 1".to_string(),
            ));
        }
        let page_num = page.page.max(1);

        let mut matched: Vec<(Issue, Option<f64>)> = match &filter.near {
            Some(near) => {
                civicsignal_common::GeoPoint::new(near.lat, near.lng).validate()?;
                let radius_km = near.radius_km.unwrap_or(self.default_radius_km);
                let hits = self.geo.nearby(near.lat, near.lng, radius_km);
                let map = self.issues.read().expect("issues map lock poisoned");
                hits.into_iter()
                    .filter_map(|(id, dist)| {
                        let v = map.get(&id)?;
                        filter
                            .matches(&v.issue)
                            .then(|| (v.issue.clone(), Some(dist)))
                    })
                    .collect()
            }
            None => {
                let map = self.issues.read().expect("issues map lock poisoned");
                map.values()
                    .filter(|v| filter.matches(&v.issue))
                    .map(|v| (v.issue.clone(), None))
                    .collect()
            }
        };

        let total = matched.len() as u64;

        match sort {
            Some(spec) => sort_issues(&mut matched, spec),
            // A near-query without an explicit sort keeps the index's
            // distance-ascending order.
            None if filter.near.is_some() => {}
            None => sort_issues(&mut matched, SortSpec::default()),
        }

        let start = (page_num as usize - 1) * page.page_size as usize;
        let items = matched
            .into_iter()
            .skip(start)
            .take(page.page_size as usize)
            .map(|(issue, _)| issue)
            .collect();
        Ok((items, total))
    }

    /// Read-modify-write with an optimistic version check. The closure must
    /// be pure: it can run more than once when a commit loses the race.
    pub(crate) fn mutate<T>(
        &self,
        id: Uuid,
        op: impl Fn(&mut Issue) -> Result<T, CivicSignalError>,
    ) -> Result<(Issue, T), CivicSignalError> {
        for attempt in 0..=self.commit_retries {
            let (base_version, mut candidate) = {
                let map = self.issues.read().expect("issues map lock poisoned");
                let v = map
                    .get(&id)
                    .ok_or_else(|| CivicSignalError::NotFound(format!("issue {id}")))?;
                (v.version, v.issue.clone())
            };

            let out = op(&mut candidate)?;
            candidate.updated_at = Utc::now();

            let mut map = self.issues.write().expect("issues map lock poisoned");
            match map.get_mut(&id) {
                Some(v) if v.version == base_version => {
                    v.version += 1;
                    v.issue = candidate.clone();
                    return Ok((candidate, out));
                }
                Some(_) => {
                    debug!(issue_id = %id, attempt, "optimistic commit lost the race, retrying");
                }
                None => {
                    return Err(CivicSignalError::NotFound(format!("issue {id}")));
                }
            }
        }
        Err(CivicSignalError::Conflict(format!(
            "issue {id}: commit contention exhausted {} retries",
            self.commit_retries
        )))
    }

    /// Snapshot of every issue, for the stats aggregator.
    pub(crate) fn snapshot(&self) -> Vec<Issue> {
        let map = self.issues.read().expect("issues map lock poisoned");
        map.values().map(|v| v.issue.clone()).collect()
    }
}

// --- Draft & patch ---

/// Caller-supplied fields for a new issue. Identity, ownership, counters,
/// and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub location: Location,
    pub images: Vec<ImageRef>,
    pub assigned_to: Option<Uuid>,
    pub department: Option<Department>,
}

impl IssueDraft {
    pub fn new(title: &str, description: &str, category: Category, location: Location) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category,
            status: None,
            priority: None,
            location,
            images: Vec::new(),
            assigned_to: None,
            department: None,
        }
    }

    fn validate(&self) -> Result<(), CivicSignalError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        self.location.point.validate()
    }
}

/// Partial update. Absent fields stay untouched; present fields are
/// re-validated against the same constraints as creation.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub location: Option<Location>,
    pub assigned_to: Option<Uuid>,
    pub department: Option<Department>,
}

impl IssuePatch {
    pub fn status(status: IssueStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), CivicSignalError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(location) = &self.location {
            location.point.validate()?;
        }
        Ok(())
    }

    fn apply(&self, issue: &mut Issue) {
        if let Some(title) = &self.title {
            issue.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            issue.description = description.clone();
        }
        if let Some(category) = self.category {
            issue.category = category;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(location) = &self.location {
            issue.location = location.clone();
        }
        if let Some(assigned_to) = self.assigned_to {
            issue.assigned_to = Some(assigned_to);
        }
        if let Some(department) = self.department {
            issue.department = Some(department);
        }
    }
}

fn validate_title(title: &str) -> Result<(), CivicSignalError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CivicSignalError::Validation("title is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(CivicSignalError::Validation(format!(
            "title exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), CivicSignalError> {
    if description.trim().is_empty() {
        return Err(CivicSignalError::Validation(
            "description is required".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(CivicSignalError::Validation(format!(
            "description exceeds {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}
