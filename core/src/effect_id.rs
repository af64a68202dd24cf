//! Hierarchical cancellation identities.
//!
//! An [`EffectId`] is an ordered list of segments such as `path/3/timer`.
//! Ids form a tree: `path/3` is an ancestor of `path/3/timer`, and cancelling
//! an id cancels every effect registered under it or any of its descendants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cancellation identity for effects.
///
/// # Examples
///
/// ```
/// use composable_stack_core::EffectId;
///
/// let route = EffectId::new("path").child(3);
/// let timer = route.child("timer");
///
/// assert!(route.is_prefix_of(&timer));
/// assert!(!timer.is_prefix_of(&route));
/// assert_eq!(timer.to_string(), "path/3/timer");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId {
    segments: Vec<String>,
}

impl EffectId {
    /// Create a root-level id with a single segment.
    #[must_use]
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Build an id from its segments, root-most first.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Id of a child scope nested beneath this one.
    #[must_use]
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Re-root `other` beneath this id.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + other.segments.len());
        segments.extend(self.segments.iter().cloned());
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// The segments of this id, root-most first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The enclosing scope, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.segments.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Self {
                segments: rest.to_vec(),
            }),
            _ => None,
        }
    }

    /// Whether `other` is this id or nested beneath it.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// This id and all its ancestors, root-most first.
    pub fn lineage(&self) -> impl Iterator<Item = EffectId> + '_ {
        (1..=self.segments.len()).map(|depth| Self {
            segments: self.segments[..depth].to_vec(),
        })
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl From<&str> for EffectId {
    fn from(segment: &str) -> Self {
        Self::new(segment)
    }
}

impl From<String> for EffectId {
    fn from(segment: String) -> Self {
        Self::new(segment)
    }
}

impl From<&EffectId> for EffectId {
    fn from(id: &EffectId) -> Self {
        id.clone()
    }
}
