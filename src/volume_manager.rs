//! Registry of pending multi-volume groups.
//!
//! Entries marked with [`Entry::set_multi_volume_group`](crate::Entry::set_multi_volume_group)
//! collect here, keyed by the hierarchy of the parent scope the parts live
//! in. Groups with the same base name and ordering under one parent join;
//! a different base name or a different ordering forms a separate group.
//! Groups are popped first-marked-first.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::hierarchy::{PartOrdering, PathHierarchy};

#[derive(Debug, Clone)]
pub(crate) struct PendingGroup {
    pub base_name: String,
    pub ordering: PartOrdering,
    /// Part hierarchies in marking order.
    pub parts: Vec<PathHierarchy>,
}

#[derive(Debug, Default)]
pub(crate) struct MultiVolumeManager {
    pending: Vec<(PathHierarchy, VecDeque<PendingGroup>)>,
}

impl MultiVolumeManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `entry_hierarchy` as a part of the group `base_name` under
    /// its parent scope. Marking the same entry twice is a no-op.
    pub(crate) fn mark(
        &mut self,
        entry_hierarchy: &PathHierarchy,
        base_name: &str,
        ordering: PartOrdering,
    ) -> Result<()> {
        if entry_hierarchy.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot mark an empty hierarchy as a multi-volume part".into(),
            ));
        }
        let parent = entry_hierarchy.parent();

        let bucket = match self.pending.iter_mut().find(|(key, _)| *key == parent) {
            Some((_, bucket)) => bucket,
            None => {
                self.pending.push((parent, VecDeque::new()));
                &mut self.pending.last_mut().expect("just pushed").1
            }
        };

        if let Some(group) = bucket
            .iter_mut()
            .find(|group| group.base_name == base_name && group.ordering == ordering)
        {
            if !group.parts.contains(entry_hierarchy) {
                group.parts.push(entry_hierarchy.clone());
            }
        } else {
            bucket.push_back(PendingGroup {
                base_name: base_name.to_string(),
                ordering,
                parts: vec![entry_hierarchy.clone()],
            });
        }
        Ok(())
    }

    /// Removes and returns the next ready group under `parent`.
    pub(crate) fn pop(&mut self, parent: &PathHierarchy) -> Option<PendingGroup> {
        let index = self.pending.iter().position(|(key, _)| key == parent)?;
        let group = self.pending[index].1.pop_front();
        if self.pending[index].1.is_empty() {
            self.pending.remove(index);
        }
        group
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::make_single_path;

    fn entry(parent: &str, name: &str) -> PathHierarchy {
        let mut hierarchy = make_single_path(parent);
        hierarchy.push_single(name);
        hierarchy
    }

    #[test]
    fn test_same_base_joins_one_group() {
        let mut manager = MultiVolumeManager::new();
        manager
            .mark(&entry("outer", "a.part001"), "a", PartOrdering::Natural)
            .unwrap();
        manager
            .mark(&entry("outer", "a.part002"), "a", PartOrdering::Natural)
            .unwrap();

        let parent = make_single_path("outer");
        let group = manager.pop(&parent).unwrap();
        assert_eq!(group.parts.len(), 2);
        assert_eq!(
            group.parts[0].last().unwrap().as_single(),
            Some("a.part001")
        );
        assert!(manager.pop(&parent).is_none());
    }

    #[test]
    fn test_different_bases_form_separate_groups() {
        let mut manager = MultiVolumeManager::new();
        manager
            .mark(&entry("outer", "a.part001"), "a", PartOrdering::Natural)
            .unwrap();
        manager
            .mark(&entry("outer", "b.part001"), "b", PartOrdering::Natural)
            .unwrap();

        let parent = make_single_path("outer");
        let first = manager.pop(&parent).unwrap();
        assert_eq!(first.base_name, "a");
        let second = manager.pop(&parent).unwrap();
        assert_eq!(second.base_name, "b");
    }

    #[test]
    fn test_different_orderings_are_independent_groups() {
        let mut manager = MultiVolumeManager::new();
        manager
            .mark(&entry("outer", "a.part001"), "a", PartOrdering::Natural)
            .unwrap();
        manager
            .mark(&entry("outer", "a.part002"), "a", PartOrdering::Given)
            .unwrap();

        let parent = make_single_path("outer");
        let first = manager.pop(&parent).unwrap();
        assert_eq!(first.ordering, PartOrdering::Natural);
        assert_eq!(first.parts.len(), 1);
        let second = manager.pop(&parent).unwrap();
        assert_eq!(second.ordering, PartOrdering::Given);
    }

    #[test]
    fn test_parent_scopes_are_independent() {
        let mut manager = MultiVolumeManager::new();
        manager
            .mark(&entry("outer1", "a.part001"), "a", PartOrdering::Natural)
            .unwrap();
        manager
            .mark(&entry("outer2", "a.part001"), "a", PartOrdering::Natural)
            .unwrap();

        assert!(manager.pop(&make_single_path("outer1")).is_some());
        assert!(manager.pop(&make_single_path("outer2")).is_some());
        assert!(manager.pop(&make_single_path("outer1")).is_none());
    }

    #[test]
    fn test_root_level_parts_group_under_empty_parent() {
        let mut manager = MultiVolumeManager::new();
        manager
            .mark(&make_single_path("p1"), "base", PartOrdering::Natural)
            .unwrap();
        manager
            .mark(&make_single_path("p2"), "base", PartOrdering::Natural)
            .unwrap();

        let group = manager.pop(&PathHierarchy::new()).unwrap();
        assert_eq!(group.parts.len(), 2);
    }

    #[test]
    fn test_duplicate_marks_are_ignored() {
        let mut manager = MultiVolumeManager::new();
        let part = entry("outer", "a.part001");
        manager.mark(&part, "a", PartOrdering::Natural).unwrap();
        manager.mark(&part, "a", PartOrdering::Natural).unwrap();

        let group = manager.pop(&make_single_path("outer")).unwrap();
        assert_eq!(group.parts.len(), 1);
    }

    #[test]
    fn test_empty_hierarchy_rejected() {
        let mut manager = MultiVolumeManager::new();
        let err = manager
            .mark(&PathHierarchy::new(), "a", PartOrdering::Natural)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_fifo_pop_order() {
        let mut manager = MultiVolumeManager::new();
        manager
            .mark(&entry("outer", "z.part001"), "z", PartOrdering::Natural)
            .unwrap();
        manager
            .mark(&entry("outer", "a.part001"), "a", PartOrdering::Natural)
            .unwrap();

        let parent = make_single_path("outer");
        // First marked pops first, regardless of name order.
        assert_eq!(manager.pop(&parent).unwrap().base_name, "z");
        assert_eq!(manager.pop(&parent).unwrap().base_name, "a");
    }
}
