//! Ordered collection with stable identities.
//!
//! [`IdentifiedArray`] keeps its entries in insertion order and indexes them by
//! identity. Positional access and identity-keyed access go through the same
//! backing [`IndexMap`], so the position ↔ id index can never diverge.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::ops::{Bound, Index, RangeBounds};
use thiserror::Error;

/// Errors from positional or identity-keyed mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A position or range end lies outside the collection.
    #[error("Position {index} is out of bounds for a collection of length {len}")]
    OutOfBounds {
        /// The offending position
        index: usize,
        /// Current length
        len: usize,
    },

    /// An id would appear twice.
    #[error("Identifier {0} is already present")]
    DuplicateId(String),
}

/// A sequence of entries, each tagged with a unique identifier.
///
/// # Examples
///
/// ```
/// use composable_stack_core::IdentifiedArray;
///
/// let mut screens = IdentifiedArray::new();
/// screens.push(1, "home")?;
/// screens.push(2, "detail")?;
///
/// assert_eq!(screens[1], "detail");
/// assert_eq!(screens.get(&1), Some(&"home"));
///
/// screens.remove(&1);
/// assert_eq!(screens.ids().copied().collect::<Vec<_>>(), vec![2]);
/// # Ok::<(), composable_stack_core::PathError>(())
/// ```
#[derive(Clone)]
pub struct IdentifiedArray<Id, T> {
    entries: IndexMap<Id, T>,
}

impl<Id, T> IdentifiedArray<Id, T> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `position`.
    #[must_use]
    pub fn get_at(&self, position: usize) -> Option<(&Id, &T)> {
        self.entries.get_index(position)
    }

    /// Mutable element at `position`. The id at that position cannot change.
    #[must_use]
    pub fn get_at_mut(&mut self, position: usize) -> Option<(&Id, &mut T)> {
        self.entries.get_index_mut(position)
    }

    /// First entry.
    #[must_use]
    pub fn first(&self) -> Option<(&Id, &T)> {
        self.entries.first()
    }

    /// Last entry.
    #[must_use]
    pub fn last(&self) -> Option<(&Id, &T)> {
        self.entries.last()
    }

    /// Ids in order.
    pub fn ids(&self) -> indexmap::map::Keys<'_, Id, T> {
        self.entries.keys()
    }

    /// Elements in order.
    pub fn values(&self) -> indexmap::map::Values<'_, Id, T> {
        self.entries.values()
    }

    /// `(id, element)` pairs in order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Id, T> {
        self.entries.iter()
    }

    /// Remove and return the last entry.
    pub fn pop(&mut self) -> Option<(Id, T)> {
        self.entries.pop()
    }

    /// Keep only the first `len` entries.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn bounds(&self, range: impl RangeBounds<usize>) -> Result<(usize, usize), PathError> {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };

        if end > len {
            return Err(PathError::OutOfBounds { index: end, len });
        }
        if start > end {
            return Err(PathError::OutOfBounds { index: start, len });
        }
        Ok((start, end))
    }
}

impl<Id, T> IdentifiedArray<Id, T>
where
    Id: Hash + Eq + fmt::Debug,
{
    /// Build a collection, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::DuplicateId`] if an id appears more than once.
    pub fn try_from_iter<I>(entries: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = (Id, T)>,
    {
        let mut array = Self::new();
        for (id, element) in entries {
            array.push(id, element)?;
        }
        Ok(array)
    }

    /// Element with the given id.
    #[must_use]
    pub fn get(&self, id: &Id) -> Option<&T> {
        self.entries.get(id)
    }

    /// Mutable element with the given id.
    #[must_use]
    pub fn get_mut(&mut self, id: &Id) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    /// Whether an entry with this id exists.
    #[must_use]
    pub fn contains(&self, id: &Id) -> bool {
        self.entries.contains_key(id)
    }

    /// Current position of the entry with this id.
    #[must_use]
    pub fn position(&self, id: &Id) -> Option<usize> {
        self.entries.get_index_of(id)
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::DuplicateId`] if the id is already present.
    pub fn push(&mut self, id: Id, element: T) -> Result<(), PathError> {
        if self.entries.contains_key(&id) {
            return Err(PathError::DuplicateId(format!("{id:?}")));
        }
        self.entries.insert(id, element);
        Ok(())
    }

    /// Replace the element stored under `id`, returning the previous one.
    ///
    /// Does nothing and returns `None` when `id` is absent; use [`Self::push`]
    /// to add new entries.
    pub fn update(&mut self, id: &Id, element: T) -> Option<T> {
        self.entries
            .get_mut(id)
            .map(|slot| std::mem::replace(slot, element))
    }

    /// Remove the entry with this id, closing the gap.
    ///
    /// The relative order of the remaining entries is preserved.
    pub fn remove(&mut self, id: &Id) -> Option<T> {
        self.entries.shift_remove(id)
    }

    /// Replace the entry at `position` (id and element).
    ///
    /// # Errors
    ///
    /// - [`PathError::OutOfBounds`] if `position >= len`
    /// - [`PathError::DuplicateId`] if `id` already lives at another position
    pub fn replace_at(&mut self, position: usize, id: Id, element: T) -> Result<(), PathError> {
        if position >= self.len() {
            return Err(PathError::OutOfBounds {
                index: position,
                len: self.len(),
            });
        }
        self.replace_range(position..=position, [(id, element)])
    }

    /// Replace a contiguous positional range with `entries`.
    ///
    /// Covers appending (`len..len`), removing (empty `entries`) and
    /// inserting (empty range). The collection is left untouched on error.
    ///
    /// # Errors
    ///
    /// - [`PathError::OutOfBounds`] if the range does not lie within the collection
    /// - [`PathError::DuplicateId`] if an id would appear twice afterwards
    pub fn replace_range<R, I>(&mut self, range: R, entries: I) -> Result<(), PathError>
    where
        R: RangeBounds<usize>,
        I: IntoIterator<Item = (Id, T)>,
    {
        let (start, end) = self.bounds(range)?;
        let replacement: Vec<(Id, T)> = entries.into_iter().collect();

        let mut seen = HashSet::with_capacity(replacement.len());
        for (id, _) in &replacement {
            let kept_elsewhere = self
                .entries
                .get_index_of(id)
                .is_some_and(|position| position < start || position >= end);
            if kept_elsewhere || !seen.insert(id) {
                return Err(PathError::DuplicateId(format!("{id:?}")));
            }
        }

        let tail: Vec<(Id, T)> = self.entries.drain(end..).collect();
        self.entries.truncate(start);
        self.entries.extend(replacement);
        self.entries.extend(tail);
        Ok(())
    }
}

impl<Id, T> IdentifiedArray<Id, T>
where
    Id: Hash + Eq + Clone,
    T: Clone,
{
    /// A copy with the last `k` entries removed.
    ///
    /// `k == 0` is the identity; `k >= len` yields an empty collection.
    #[must_use]
    pub fn drop_last(&self, k: usize) -> Self {
        let keep = self.len().saturating_sub(k);
        Self {
            entries: self
                .entries
                .iter()
                .take(keep)
                .map(|(id, element)| (id.clone(), element.clone()))
                .collect(),
        }
    }
}

impl<Id, T> IdentifiedArray<Id, T>
where
    Id: PartialEq,
{
    /// Route-compatible equality.
    ///
    /// Equal when counts match and every position holds the same id and the same
    /// enum alternative, ignoring payloads. Meant for change detection only.
    ///
    /// `T` is expected to be an enum of screens. For any other type the
    /// alternative comparison is unspecified, so only the ids are meaningful.
    #[must_use]
    pub fn same_routes(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((a, x), (b, y))| {
                    a == b && std::mem::discriminant(x) == std::mem::discriminant(y)
                })
    }
}

impl<Id, T> Default for IdentifiedArray<Id, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id, T> fmt::Debug for IdentifiedArray<Id, T>
where
    Id: fmt::Debug,
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

// Positional: unlike `IndexMap`, order matters.
impl<Id, T> PartialEq for IdentifiedArray<Id, T>
where
    Id: PartialEq,
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl<Id: Eq, T: Eq> Eq for IdentifiedArray<Id, T> {}

/// Positional access. Panics when out of range, like slice indexing.
impl<Id, T> Index<usize> for IdentifiedArray<Id, T> {
    type Output = T;

    fn index(&self, position: usize) -> &T {
        &self.entries[position]
    }
}

impl<'a, Id, T> IntoIterator for &'a IdentifiedArray<Id, T> {
    type Item = (&'a Id, &'a T);
    type IntoIter = indexmap::map::Iter<'a, Id, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<Id, T> IntoIterator for IdentifiedArray<Id, T> {
    type Item = (Id, T);
    type IntoIter = indexmap::map::IntoIter<Id, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
