//! Proptest strategies for navigation paths.

use composable_stack_core::{NavigationPath, RouteId};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::fmt::Debug;

/// Largest raw route id generated.
pub const MAX_ROUTE_ID: u64 = 64;

/// Paths of up to `max_len` routes with distinct ids in arbitrary order.
///
/// Ids are drawn from `0..MAX_ROUTE_ID`, so two generated paths share ids often
/// enough to exercise partial overlap.
pub fn path_strategy<S>(element: S, max_len: usize) -> impl Strategy<Value = NavigationPath<S::Value>>
where
    S: Strategy + Clone,
    S::Value: Debug + Clone,
{
    btree_set(0..MAX_ROUTE_ID, 0..=max_len)
        .prop_map(|ids| ids.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
        .prop_flat_map(move |ids| {
            let len = ids.len();
            vec(element.clone(), len).prop_map(move |elements| build_path(&ids, elements))
        })
}

/// A path together with a route id that is not on it.
pub fn path_with_absent_id<S>(
    element: S,
    max_len: usize,
) -> impl Strategy<Value = (NavigationPath<S::Value>, RouteId)>
where
    S: Strategy + Clone,
    S::Value: Debug + Clone,
{
    path_strategy(element, max_len).prop_flat_map(|path| {
        let absent: Vec<RouteId> = (0..=MAX_ROUTE_ID)
            .map(RouteId::new)
            .filter(|id| !path.contains(id))
            .collect();
        (Just(path), proptest::sample::select(absent))
    })
}

fn build_path<T>(ids: &[u64], elements: Vec<T>) -> NavigationPath<T> {
    let mut path = NavigationPath::new();
    for (id, element) in ids.iter().zip(elements) {
        // Ids come from a set, so none repeats
        let _ = path.push(RouteId::new(*id), element);
    }
    path
}
