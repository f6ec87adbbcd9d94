//! Grouped counts over a snapshot of the issue store. Read-only; never
//! blocks writers and never mutates state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use civicsignal_common::{Category, IssueStatus, Priority};

use crate::issues::IssueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

/// Grouped counts at a point in time. Only observed groups appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStats {
    pub by_status: BTreeMap<IssueStatus, u64>,
    /// Sorted descending by count, ties broken by category for determinism.
    pub by_category: Vec<CategoryCount>,
    pub by_priority: BTreeMap<Priority, u64>,
}

impl IssueStore {
    pub fn stats(&self) -> IssueStats {
        let issues = self.snapshot();

        let mut by_status: BTreeMap<IssueStatus, u64> = BTreeMap::new();
        let mut categories: BTreeMap<Category, u64> = BTreeMap::new();
        let mut by_priority: BTreeMap<Priority, u64> = BTreeMap::new();

        for issue in &issues {
            *by_status.entry(issue.status).or_default() += 1;
            *categories.entry(issue.category).or_default() += 1;
            *by_priority.entry(issue.priority).or_default() += 1;
        }

        let mut by_category: Vec<CategoryCount> = categories
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        by_category.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));

        IssueStats {
            by_status,
            by_category,
            by_priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{IssueDraft, IssueStore};
    use civicsignal_common::{Config, Location};
    use uuid::Uuid;

    fn seed(store: &IssueStore, category: Category, priority: Priority) {
        let mut draft = IssueDraft::new(
            "Seed issue",
            "Seed description for aggregation.",
            category,
            Location::at(12.9716, 77.5946),
        );
        draft.priority = Some(priority);
        store.create(draft, Uuid::new_v4()).unwrap();
    }

    #[test]
    fn empty_store_has_empty_stats() {
        let store = IssueStore::new(&Config::default());
        let stats = store.stats();
        assert!(stats.by_status.is_empty());
        assert!(stats.by_category.is_empty());
        assert!(stats.by_priority.is_empty());
    }

    #[test]
    fn groups_and_orders_by_count() {
        let store = IssueStore::new(&Config::default());
        seed(&store, Category::Pothole, Priority::High);
        seed(&store, Category::Pothole, Priority::Low);
        seed(&store, Category::Pothole, Priority::High);
        seed(&store, Category::Garbage, Priority::Critical);
        seed(&store, Category::Drainage, Priority::High);

        let stats = store.stats();

        assert_eq!(stats.by_status.get(&IssueStatus::Pending), Some(&5));
        assert_eq!(stats.by_status.len(), 1);

        assert_eq!(stats.by_category[0].category, Category::Pothole);
        assert_eq!(stats.by_category[0].count, 3);
        // Garbage and Drainage tie at 1; declaration order breaks the tie.
        assert_eq!(stats.by_category[1].category, Category::Garbage);
        assert_eq!(stats.by_category[2].category, Category::Drainage);

        assert_eq!(stats.by_priority.get(&Priority::High), Some(&3));
        assert_eq!(stats.by_priority.get(&Priority::Low), Some(&1));
        assert_eq!(stats.by_priority.get(&Priority::Critical), Some(&1));
    }
}
