//! Path hierarchies: canonical identity of traversal entries.
//!
//! Every entry observed during a traversal is addressed by a
//! [`PathHierarchy`]: an ordered sequence of [`PathEntry`] components.
//! Component 0 names the root (a filesystem path, a multi-volume group, or a
//! nested composite); each following component names an archive entry within
//! the decoder at that depth.
//!
//! Hierarchies are plain values with total equality and ordering, so they can
//! serve as map keys, be sorted, and round-trip through entry copies.
//!
//! # Examples
//!
//! ```
//! use archive_r::{make_single_path, PathEntry, PathHierarchy};
//!
//! let mut hierarchy = make_single_path("outer.tar.gz");
//! hierarchy.push_single("inner.tar.gz");
//! hierarchy.push_single("file.txt");
//!
//! assert_eq!(hierarchy.to_string(), "outer.tar.gz/inner.tar.gz/file.txt");
//! assert_eq!(hierarchy.len(), 3);
//!
//! let parts = PathEntry::multi_volume(vec!["a.part2".into(), "a.part1".into()]).unwrap();
//! // Natural ordering sorts the parts at construction.
//! assert_eq!(parts.to_string(), "[a.part1|a.part2]");
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// How the parts of a multi-volume component are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartOrdering {
    /// Sort the parts lexicographically at construction.
    #[default]
    Natural,
    /// Preserve the caller-supplied part order.
    Given,
}

/// One component of a [`PathHierarchy`].
///
/// A component is either a *single* name (an archive entry name, a
/// filesystem path segment, or a full root path), a *multi-volume* part
/// list, or a *nested* composite supplied by the caller as a root.
///
/// The default component behaves as `Single("")`; equality treats the two
/// identically because the default *is* the empty single.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathEntry {
    /// A single name.
    Single(String),
    /// An ordered list of multi-volume part names.
    MultiVolume {
        /// The part names, already in their effective order.
        parts: Vec<String>,
        /// The ordering tag; participates in identity.
        ordering: PartOrdering,
    },
    /// A caller-supplied composite of child components.
    Nested(Vec<PathEntry>),
}

impl Default for PathEntry {
    fn default() -> Self {
        PathEntry::Single(String::new())
    }
}

impl PathEntry {
    /// Creates a single-name component.
    pub fn single(value: impl Into<String>) -> Self {
        PathEntry::Single(value.into())
    }

    /// Creates a multi-volume component with [`PartOrdering::Natural`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `parts` is empty.
    pub fn multi_volume(parts: Vec<String>) -> Result<Self> {
        Self::multi_volume_ordered(parts, PartOrdering::Natural)
    }

    /// Creates a multi-volume component with an explicit ordering tag.
    ///
    /// `Natural` sorts the parts lexicographically here, once; `Given`
    /// preserves the caller's order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `parts` is empty.
    pub fn multi_volume_ordered(mut parts: Vec<String>, ordering: PartOrdering) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::InvalidArgument(
                "multi-volume component requires at least one part".into(),
            ));
        }
        if ordering == PartOrdering::Natural {
            parts.sort();
        }
        Ok(PathEntry::MultiVolume { parts, ordering })
    }

    /// Creates a nested composite component.
    pub fn nested(children: Vec<PathEntry>) -> Self {
        PathEntry::Nested(children)
    }

    /// Returns `true` for single-name components (including the default).
    pub fn is_single(&self) -> bool {
        matches!(self, PathEntry::Single(_))
    }

    /// Returns `true` for multi-volume components.
    pub fn is_multi_volume(&self) -> bool {
        matches!(self, PathEntry::MultiVolume { .. })
    }

    /// Returns `true` for nested composites.
    pub fn is_nested(&self) -> bool {
        matches!(self, PathEntry::Nested(_))
    }

    /// Returns the single name, if this is a single component.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            PathEntry::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the multi-volume part list, if any.
    pub fn parts(&self) -> Option<&[String]> {
        match self {
            PathEntry::MultiVolume { parts, .. } => Some(parts),
            _ => None,
        }
    }

    /// Returns the ordering tag of a multi-volume component.
    pub fn ordering(&self) -> Option<PartOrdering> {
        match self {
            PathEntry::MultiVolume { ordering, .. } => Some(*ordering),
            _ => None,
        }
    }

    /// Returns the nested children, if this is a composite.
    pub fn children(&self) -> Option<&[PathEntry]> {
        match self {
            PathEntry::Nested(children) => Some(children),
            _ => None,
        }
    }

    /// Number of addressable parts: 1 for singles, the part count for
    /// multi-volume components, 1 for composites.
    pub fn part_count(&self) -> usize {
        match self {
            PathEntry::Single(_) | PathEntry::Nested(_) => 1,
            PathEntry::MultiVolume { parts, .. } => parts.len(),
        }
    }

    /// Returns part `index`: singles expose their value at index 0,
    /// multi-volume components expose their parts, composites none.
    pub fn component_at(&self, index: usize) -> Option<&str> {
        match self {
            PathEntry::Single(value) => (index == 0).then_some(value.as_str()),
            PathEntry::MultiVolume { parts, .. } => parts.get(index).map(String::as_str),
            PathEntry::Nested(_) => None,
        }
    }

    /// Flattens this component into a single name.
    ///
    /// Only single components flatten; the default entry flattens to the
    /// empty string.
    pub fn flatten(&self) -> Option<&str> {
        self.as_single()
    }

    /// Returns the name a decoder would look up for this component: the
    /// single value, the first part of a multi-volume component, or the
    /// first name of the first nested child.
    pub fn first_name(&self) -> Option<&str> {
        match self {
            PathEntry::Single(value) => Some(value),
            PathEntry::MultiVolume { parts, .. } => parts.first().map(String::as_str),
            PathEntry::Nested(children) => children.first().and_then(PathEntry::first_name),
        }
    }

    fn single_parts(&self) -> Option<&[String]> {
        match self {
            PathEntry::Single(value) => Some(std::slice::from_ref(value)),
            PathEntry::MultiVolume { parts, .. } => Some(parts),
            PathEntry::Nested(_) => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            PathEntry::Single(_) => 0,
            PathEntry::MultiVolume { .. } => 1,
            PathEntry::Nested(_) => 2,
        }
    }
}

impl Ord for PathEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.single_parts(), other.single_parts()) {
            (Some(lhs), Some(rhs)) => {
                // Componentwise over parts; the component with more parts is
                // greater; the ordering tag participates in identity.
                for (a, b) in lhs.iter().zip(rhs.iter()) {
                    match a.cmp(b) {
                        Ordering::Equal => continue,
                        unequal => return unequal,
                    }
                }
                lhs.len()
                    .cmp(&rhs.len())
                    .then_with(|| {
                        let tag = |e: &PathEntry| e.ordering().unwrap_or(PartOrdering::Natural);
                        (tag(self) as u8).cmp(&(tag(other) as u8))
                    })
                    .then_with(|| self.kind_rank().cmp(&other.kind_rank()))
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self, other) {
                (PathEntry::Nested(a), PathEntry::Nested(b)) => a.cmp(b),
                _ => unreachable!("non-nested components always expose parts"),
            },
        }
    }
}

impl PartialOrd for PathEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathEntry::Single(value) => f.write_str(value),
            PathEntry::MultiVolume { parts, .. } => {
                f.write_str("[")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    f.write_str(part)?;
                }
                f.write_str("]")
            }
            PathEntry::Nested(children) => {
                f.write_str("{")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// An ordered sequence of [`PathEntry`] components identifying one entry.
///
/// Component 0 is the traversal root; each later component is an archive
/// entry name within the decoder at that depth. Ordering is lexicographic
/// over components, so a hierarchy sorts before any hierarchy it prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathHierarchy(Vec<PathEntry>);

impl PathHierarchy {
    /// Creates an empty hierarchy.
    ///
    /// Empty hierarchies are invalid as traversal roots but appear
    /// transiently inside the cursor.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a hierarchy from components.
    pub fn from_components(components: Vec<PathEntry>) -> Self {
        Self(components)
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The components as a slice.
    pub fn components(&self) -> &[PathEntry] {
        &self.0
    }

    /// First component, if any.
    pub fn first(&self) -> Option<&PathEntry> {
        self.0.first()
    }

    /// Last component, if any.
    pub fn last(&self) -> Option<&PathEntry> {
        self.0.last()
    }

    /// Component at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&PathEntry> {
        self.0.get(index)
    }

    /// Appends a component.
    pub fn push(&mut self, entry: PathEntry) {
        self.0.push(entry);
    }

    /// Appends a single-name component.
    pub fn push_single(&mut self, value: impl Into<String>) {
        self.0.push(PathEntry::single(value));
    }

    /// Appends a multi-volume component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `parts` is empty.
    pub fn push_multi_volume(
        &mut self,
        parts: Vec<String>,
        ordering: PartOrdering,
    ) -> Result<()> {
        self.0
            .push(PathEntry::multi_volume_ordered(parts, ordering)?);
        Ok(())
    }

    /// Returns components `[0..=inclusive_index]`, or an empty hierarchy
    /// when the index is out of range.
    pub fn prefix_until(&self, inclusive_index: usize) -> PathHierarchy {
        if inclusive_index >= self.0.len() {
            return PathHierarchy::new();
        }
        PathHierarchy(self.0[..=inclusive_index].to_vec())
    }

    /// The hierarchy with the tail component removed.
    pub fn parent(&self) -> PathHierarchy {
        match self.0.len() {
            0 | 1 => PathHierarchy::new(),
            n => PathHierarchy(self.0[..n - 1].to_vec()),
        }
    }

    /// Replaces a multi-volume tail by the single part at `index`,
    /// preserving depth. Hierarchies with a single (or default) tail are
    /// returned unchanged for index 0.
    pub fn select_single_part(&self, index: usize) -> PathHierarchy {
        let Some(tail) = self.0.last() else {
            return PathHierarchy::new();
        };
        let Some(name) = tail.component_at(index) else {
            return PathHierarchy::new();
        };
        let mut selected = self.parent();
        selected.push_single(name);
        selected
    }

    /// Number of addressable parts in the tail component: 0 for empty
    /// hierarchies, the tail's part count otherwise.
    pub fn volume_size(&self) -> usize {
        self.0.last().map_or(0, PathEntry::part_count)
    }

    /// Name of part `index` of the tail component, empty when out of range
    /// or when the tail has no flat name.
    pub fn volume_entry_name(&self, index: usize) -> String {
        self.0
            .last()
            .and_then(|tail| tail.component_at(index))
            .unwrap_or_default()
            .to_string()
    }

    /// Returns `true` when the tail component is a multi-volume group.
    pub fn is_multi_volume(&self) -> bool {
        self.0.last().is_some_and(PathEntry::is_multi_volume)
    }
}

impl fmt::Display for PathHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

impl From<Vec<PathEntry>> for PathHierarchy {
    fn from(components: Vec<PathEntry>) -> Self {
        Self(components)
    }
}

/// Creates a one-component hierarchy from a single name.
pub fn make_single_path(value: impl Into<String>) -> PathHierarchy {
    PathHierarchy(vec![PathEntry::single(value)])
}

/// Merges hierarchies that differ only in their final single component into
/// one hierarchy whose tail is a multi-volume group, using
/// [`PartOrdering::Given`].
///
/// Returns an empty hierarchy when the inputs do not form a mergeable set:
/// fewer than one input, length mismatches, prefix mismatches, non-single
/// tails, or no difference at the final position.
pub fn merge_multi_volume_sources(sources: &[PathHierarchy]) -> PathHierarchy {
    merge_multi_volume_sources_ordered(sources, PartOrdering::Given)
}

/// [`merge_multi_volume_sources`] with an explicit ordering tag for the
/// synthesized tail.
pub fn merge_multi_volume_sources_ordered(
    sources: &[PathHierarchy],
    ordering: PartOrdering,
) -> PathHierarchy {
    let Some(reference) = sources.first() else {
        return PathHierarchy::new();
    };
    if reference.is_empty() {
        return PathHierarchy::new();
    }
    if sources.len() == 1 {
        return reference.clone();
    }

    let depth = reference.len();
    let prefix_len = depth - 1;
    let mut parts = Vec::with_capacity(sources.len());
    let mut difference_found = false;

    for source in sources {
        if source.len() != depth {
            return PathHierarchy::new();
        }
        if source.components()[..prefix_len] != reference.components()[..prefix_len] {
            return PathHierarchy::new();
        }
        let Some(tail) = source.last().and_then(PathEntry::as_single) else {
            return PathHierarchy::new();
        };
        if tail != reference.last().and_then(PathEntry::as_single).unwrap_or("") {
            difference_found = true;
        }
        parts.push(tail.to_string());
    }

    if !difference_found {
        return PathHierarchy::new();
    }

    let Ok(tail) = PathEntry::multi_volume_ordered(parts, ordering) else {
        return PathHierarchy::new();
    };
    let mut merged = reference.prefix_until(prefix_len.wrapping_sub(1));
    if prefix_len == 0 {
        merged = PathHierarchy::new();
    }
    merged.push(tail);
    merged
}

/// Stable sort of hierarchies by their lexicographic order.
pub fn sort_hierarchies(hierarchies: &mut [PathHierarchy]) {
    hierarchies.sort();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(parts: &[&str]) -> PathEntry {
        PathEntry::multi_volume(parts.iter().map(|p| p.to_string()).collect()).unwrap()
    }

    fn mv_given(parts: &[&str]) -> PathEntry {
        PathEntry::multi_volume_ordered(
            parts.iter().map(|p| p.to_string()).collect(),
            PartOrdering::Given,
        )
        .unwrap()
    }

    #[test]
    fn test_default_entry_is_empty_single() {
        let default_entry = PathEntry::default();
        assert!(default_entry.is_single());
        assert_eq!(default_entry, PathEntry::single(""));
        assert_eq!(default_entry.flatten(), Some(""));
        assert_eq!(default_entry.to_string(), "");
    }

    #[test]
    fn test_component_at() {
        let single = PathEntry::single("file.txt");
        assert_eq!(single.component_at(0), Some("file.txt"));
        assert_eq!(single.component_at(1), None);

        let parts = mv(&["a.part1", "a.part2"]);
        assert_eq!(parts.component_at(0), Some("a.part1"));
        assert_eq!(parts.component_at(1), Some("a.part2"));
        assert_eq!(parts.component_at(2), None);

        let default_entry = PathEntry::default();
        assert_eq!(default_entry.component_at(0), Some(""));
        assert_eq!(default_entry.component_at(1), None);
    }

    #[test]
    fn test_empty_part_list_rejected() {
        let err = PathEntry::multi_volume(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_natural_ordering_sorts_parts() {
        let entry = mv(&["x.part003", "x.part001", "x.part002"]);
        assert_eq!(
            entry.parts().unwrap(),
            &["x.part001", "x.part002", "x.part003"]
        );
    }

    #[test]
    fn test_given_ordering_preserves_parts() {
        let entry = mv_given(&["x.part003", "x.part001"]);
        assert_eq!(entry.parts().unwrap(), &["x.part003", "x.part001"]);
    }

    #[test]
    fn test_ordering_tag_participates_in_identity() {
        let natural = mv(&["a", "b"]);
        let given = mv_given(&["a", "b"]);
        assert_ne!(natural, given);
        assert_ne!(natural.cmp(&given), Ordering::Equal);
        assert_eq!(natural.cmp(&given), given.cmp(&natural).reverse());
    }

    #[test]
    fn test_single_vs_multi_volume_ordering() {
        // The component with more parts is greater when the common prefix
        // matches.
        let single = PathEntry::single("a");
        let parts = mv(&["a", "b"]);
        assert!(single < parts);
        assert!(parts > single);
    }

    #[test]
    fn test_entry_display_forms() {
        assert_eq!(PathEntry::single("hello").to_string(), "hello");
        assert_eq!(mv(&["a", "b"]).to_string(), "[a|b]");
        let nested = PathEntry::nested(vec![PathEntry::single("x"), mv(&["p1", "p2"])]);
        assert_eq!(nested.to_string(), "{x|[p1|p2]}");
    }

    #[test]
    fn test_flatten() {
        assert_eq!(PathEntry::single("hello").flatten(), Some("hello"));
        assert_eq!(mv(&["a", "b"]).flatten(), None);
        assert_eq!(PathEntry::default().flatten(), Some(""));
    }

    #[test]
    fn test_first_name() {
        assert_eq!(PathEntry::single("x").first_name(), Some("x"));
        assert_eq!(mv(&["a", "b"]).first_name(), Some("a"));
        assert_eq!(PathEntry::default().first_name(), Some(""));
        let nested = PathEntry::nested(vec![PathEntry::single("inner")]);
        assert_eq!(nested.first_name(), Some("inner"));
    }

    #[test]
    fn test_hierarchy_display() {
        let mut hierarchy = make_single_path("root");
        hierarchy.push(mv(&["a", "b"]));
        assert_eq!(hierarchy.to_string(), "root/[a|b]");
    }

    #[test]
    fn test_volume_helpers() {
        assert_eq!(PathHierarchy::new().volume_size(), 0);

        let single = make_single_path("root.zip");
        assert_eq!(single.volume_size(), 1);
        assert_eq!(single.volume_entry_name(0), "root.zip");
        assert_eq!(single.volume_entry_name(1), "");

        let mut multi = make_single_path("outer");
        multi.push(mv(&["x.part001", "x.part002", "x.part003"]));
        assert!(multi.is_multi_volume());
        assert_eq!(multi.volume_size(), 3);
        assert_eq!(multi.volume_entry_name(2), "x.part003");
        assert_eq!(multi.volume_entry_name(3), "");

        let mut default_tail = PathHierarchy::new();
        default_tail.push(PathEntry::default());
        assert_eq!(default_tail.volume_size(), 1);
        assert_eq!(default_tail.volume_entry_name(0), "");
    }

    #[test]
    fn test_select_single_part() {
        let mut hierarchy = make_single_path("outer");
        hierarchy.push(mv(&["x.part001", "x.part002", "x.part003"]));

        let selected = hierarchy.select_single_part(1);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.last().unwrap().as_single(), Some("x.part002"));

        assert!(hierarchy.select_single_part(3).is_empty());
    }

    #[test]
    fn test_prefix_until() {
        let mut hierarchy = make_single_path("a");
        hierarchy.push_single("b");
        hierarchy.push_single("c");

        assert_eq!(hierarchy.prefix_until(0), make_single_path("a"));
        assert_eq!(hierarchy.prefix_until(2), hierarchy);
        assert!(hierarchy.prefix_until(3).is_empty());
    }

    #[test]
    fn test_parent() {
        let mut hierarchy = make_single_path("a");
        hierarchy.push_single("b");
        assert_eq!(hierarchy.parent(), make_single_path("a"));
        assert!(make_single_path("a").parent().is_empty());
        assert!(PathHierarchy::new().parent().is_empty());
    }

    #[test]
    fn test_hierarchy_compare_identities() {
        let a = make_single_path("a");
        let b = make_single_path("b");
        let mut ab = make_single_path("a");
        ab.push_single("b");

        assert_eq!(a.cmp(&a), Ordering::Equal);
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        // Shorter sorts before longer when the common prefix matches.
        assert!(a < ab);
        // Transitivity over a disjoint chain.
        assert!(a < ab && ab < b && a < b);
    }

    #[test]
    fn test_merge_two_sources() {
        let mut h1 = make_single_path("outer.tar.gz");
        h1.push_single("inner.part001");
        let mut h2 = make_single_path("outer.tar.gz");
        h2.push_single("inner.part002");

        let merged = merge_multi_volume_sources(&[h1, h2]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.first().unwrap().as_single(), Some("outer.tar.gz"));
        let tail = merged.last().unwrap();
        assert!(tail.is_multi_volume());
        assert_eq!(tail.parts().unwrap(), &["inner.part001", "inner.part002"]);
        assert_eq!(tail.ordering(), Some(PartOrdering::Given));
    }

    #[test]
    fn test_merge_single_source_is_identity() {
        let mut h = make_single_path("outer");
        h.push_single("inner.part001");
        assert_eq!(merge_multi_volume_sources(std::slice::from_ref(&h)), h);
    }

    #[test]
    fn test_merge_root_level_sources() {
        let merged =
            merge_multi_volume_sources(&[make_single_path("p1"), make_single_path("p2")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.last().unwrap().parts().unwrap(), &["p1", "p2"]);
    }

    #[test]
    fn test_merge_failure_cases() {
        let mut h1 = make_single_path("outer.tar.gz");
        h1.push_single("inner.part001");

        // Empty input.
        assert!(merge_multi_volume_sources(&[]).is_empty());

        // Empty reference hierarchy.
        assert!(
            merge_multi_volume_sources(&[PathHierarchy::new(), h1.clone()]).is_empty()
        );

        // Mismatched lengths.
        assert!(
            merge_multi_volume_sources(&[h1.clone(), make_single_path("outer.tar.gz")])
                .is_empty()
        );

        // All components equal, no difference at the final position.
        assert!(merge_multi_volume_sources(&[h1.clone(), h1.clone()]).is_empty());

        // Tail must be a single component.
        let mut non_single = make_single_path("outer.tar.gz");
        non_single.push(mv(&["inner.part002", "inner.part003"]));
        assert!(merge_multi_volume_sources(&[h1.clone(), non_single]).is_empty());

        // Differing prefix.
        let mut h3 = make_single_path("outer.tar.gz");
        h3.push_single("inner.part001");
        h3.push_single("suffix-a");
        let mut h4 = make_single_path("outer.tar.gz");
        h4.push_single("inner.part002");
        h4.push_single("suffix-b");
        assert!(merge_multi_volume_sources(&[h3, h4]).is_empty());
    }

    #[test]
    fn test_merge_natural_sorts_tail() {
        let mut h1 = make_single_path("outer");
        h1.push_single("a.part002");
        let mut h2 = make_single_path("outer");
        h2.push_single("a.part001");

        let merged = merge_multi_volume_sources_ordered(&[h1, h2], PartOrdering::Natural);
        assert_eq!(
            merged.last().unwrap().parts().unwrap(),
            &["a.part001", "a.part002"]
        );
    }

    #[test]
    fn test_sort_hierarchies() {
        let a = make_single_path("a");
        let b = make_single_path("b");
        let mut parts = PathHierarchy::new();
        parts.push(mv(&["x1", "x2"]));

        let mut list = vec![b.clone(), parts.clone(), a.clone()];
        sort_hierarchies(&mut list);
        assert_eq!(list[0], a);
        assert_eq!(list[1], b);
        assert_eq!(list[2], parts);
    }

    #[test]
    fn test_hash_consistency() {
        use std::collections::HashSet;

        let mut h1 = make_single_path("dir");
        h1.push_single("file.txt");
        let mut h2 = make_single_path("dir");
        h2.push_single("file.txt");

        let mut set = HashSet::new();
        set.insert(h1.clone());
        assert!(set.contains(&h2));
    }
}
