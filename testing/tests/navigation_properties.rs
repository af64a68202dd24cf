//! Property tests for navigation paths and routed reduction.

#![allow(clippy::unwrap_used)]

use composable_stack_core::composition::{from_fn, scope, scope_variant};
use composable_stack_core::navigation::for_each_route;
use composable_stack_core::{
    smallvec, Effect, NavigationAction, NavigationPath, Reducer, RouteId, SmallVec,
};
use composable_stack_testing::assertions::{assert_no_effects, cancelled_ids};
use composable_stack_testing::capture_diagnostics;
use composable_stack_testing::properties::{path_strategy, path_with_absent_id};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq)]
struct App {
    path: NavigationPath<u8>,
}

#[derive(Clone, Debug, PartialEq)]
enum AppAction {
    Path(NavigationAction<u8, u8>),
}

fn app() -> impl Reducer<State = App, Action = AppAction, Environment = ()> {
    for_each_route(
        from_fn(|_: &mut App, _: AppAction, _: &()| smallvec![]),
        "path",
        |app: &mut App| &mut app.path,
        |action| match action {
            AppAction::Path(action) => Some(action),
        },
        AppAction::Path,
        from_fn(|value: &mut u8, add: u8, _: &()| {
            *value = value.wrapping_add(add);
            smallvec![Effect::cancel("tick")]
        }),
    )
}

fn route_ids(path: &NavigationPath<u8>) -> BTreeSet<String> {
    path.ids().map(|id| format!("path/{id}")).collect()
}

proptest! {
    #[test]
    fn set_path_lands_exactly_and_cancels_the_difference(
        before in path_strategy(any::<u8>(), 10),
        after in path_strategy(any::<u8>(), 10),
    ) {
        let mut state = App { path: before.clone() };
        let effects = app().reduce(&mut state, AppAction::Path(NavigationAction::SetPath(after.clone())), &());

        prop_assert_eq!(&state.path, &after);

        let cancelled: BTreeSet<String> = cancelled_ids(&effects).iter().map(ToString::to_string).collect();
        let expected: BTreeSet<String> = route_ids(&before).difference(&route_ids(&after)).cloned().collect();
        prop_assert_eq!(cancelled, expected);
    }

    #[test]
    fn drop_last_removes_exactly_the_tail(path in path_strategy(any::<u8>(), 12), k in 0_usize..16) {
        let dropped = path.drop_last(k);
        let keep = path.len().saturating_sub(k);

        prop_assert_eq!(dropped.len(), keep);
        let kept: Vec<_> = path.iter().take(keep).collect();
        let remaining: Vec<_> = dropped.iter().collect();
        prop_assert_eq!(kept, remaining);

        prop_assert_eq!(path.drop_last(0), path.clone());
        prop_assert!(path.drop_last(path.len()).is_empty());
    }

    #[test]
    fn element_for_absent_route_changes_nothing(
        (path, absent) in path_with_absent_id(any::<u8>(), 10),
        add in any::<u8>(),
    ) {
        let mut state = App { path: path.clone() };

        let (effects, diagnostics) = capture_diagnostics(|| {
            app().reduce(&mut state, AppAction::Path(NavigationAction::element(absent, add)), &())
        });

        prop_assert_eq!(&state.path, &path);
        prop_assert!(effects.iter().all(Effect::is_none));
        prop_assert_eq!(diagnostics.len(), 1);
        prop_assert_eq!(diagnostics[0].kind.as_str(), "stale_route");
    }

    #[test]
    fn element_for_present_route_touches_only_that_route(
        path in path_strategy(any::<u8>(), 10).prop_filter("non-empty", |p| !p.is_empty()),
        pick in any::<prop::sample::Index>(),
        add in any::<u8>(),
    ) {
        let position = pick.index(path.len());
        let (id, value) = path.get_at(position).map(|(id, value)| (*id, *value)).unwrap();
        let mut state = App { path: path.clone() };

        let effects = app().reduce(&mut state, AppAction::Path(NavigationAction::element(id, add)), &());

        for (other, original) in &path {
            let expected = if *other == id { value.wrapping_add(add) } else { *original };
            prop_assert_eq!(state.path.get(other), Some(&expected));
        }
        // The child's own id is re-rooted under its route
        let cancelled: Vec<String> = cancelled_ids(&effects).iter().map(ToString::to_string).collect();
        prop_assert_eq!(cancelled, vec![format!("path/{id}/tick")]);
    }

    #[test]
    fn paths_of_different_length_are_never_equal(
        a in path_strategy(any::<u8>(), 8),
        b in path_strategy(any::<u8>(), 8),
    ) {
        if a.len() != b.len() {
            prop_assert_ne!(&a, &b);
        }
        let positional = a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y);
        prop_assert_eq!(a == b, positional);
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Parent {
    child: u32,
    other: u32,
}

#[derive(Clone, Debug, PartialEq)]
enum ParentAction {
    Child(u32),
    Other,
}

fn counting_child(calls: &Arc<AtomicUsize>) -> impl Reducer<State = u32, Action = u32, Environment = ()> {
    let calls = Arc::clone(calls);
    from_fn(move |state: &mut u32, add: u32, _: &()| -> SmallVec<[Effect<u32>; 4]> {
        calls.fetch_add(1, Ordering::SeqCst);
        *state = state.wrapping_add(add);
        smallvec![]
    })
}

proptest! {
    #[test]
    fn structural_embedding_never_drops_a_matching_action(
        actions in prop::collection::vec(prop_oneof![any::<u32>().prop_map(ParentAction::Child), Just(ParentAction::Other)], 0..20),
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let reducer = scope(
            counting_child(&calls),
            |parent: &Parent| &parent.child,
            |parent: &mut Parent, child| parent.child = child,
            |action| match action {
                ParentAction::Child(add) => Some(add),
                ParentAction::Other => None,
            },
            ParentAction::Child,
        );

        let mut state = Parent { child: 0, other: 7 };
        let mut expected = 0_u32;
        for action in &actions {
            if let ParentAction::Child(add) = action {
                expected = expected.wrapping_add(*add);
            }
            let _ = reducer.reduce(&mut state, action.clone(), &());
        }

        let matching = actions.iter().filter(|a| matches!(a, ParentAction::Child(_))).count();
        prop_assert_eq!(calls.load(Ordering::SeqCst), matching);
        prop_assert_eq!(state, Parent { child: expected, other: 7 });
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Screen {
    Counter(u32),
    Settings,
}

proptest! {
    #[test]
    fn variant_embedding_commits_on_match_and_drops_otherwise(
        start_on_counter in any::<bool>(),
        add in any::<u32>(),
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let reducer = scope_variant(
            counting_child(&calls),
            |screen: &Screen| match screen {
                Screen::Counter(count) => Some(*count),
                Screen::Settings => None,
            },
            Screen::Counter,
            |action: u32| Some(action),
            |action| action,
        );

        let mut state = if start_on_counter { Screen::Counter(1) } else { Screen::Settings };
        let (effects, diagnostics) = capture_diagnostics(|| reducer.reduce(&mut state, add, &()));
        assert_no_effects(&effects);

        if start_on_counter {
            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            prop_assert_eq!(state, Screen::Counter(1_u32.wrapping_add(add)));
            prop_assert!(diagnostics.is_empty());
        } else {
            prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
            prop_assert_eq!(state, Screen::Settings);
            prop_assert_eq!(diagnostics.len(), 1);
            prop_assert_eq!(diagnostics[0].kind.as_str(), "variant_mismatch");
        }
    }
}

#[test]
fn scenario_set_path_cancels_only_the_removed_route() {
    let mut state = App::default();
    state.path.push(RouteId::new(1), b'A').unwrap();
    state.path.push(RouteId::new(2), b'B').unwrap();

    let target = NavigationPath::try_from_iter([(RouteId::new(1), b'A')]).unwrap();
    let effects = app().reduce(&mut state, AppAction::Path(NavigationAction::SetPath(target.clone())), &());

    assert_eq!(state.path, target);
    let cancelled: Vec<String> = cancelled_ids(&effects).iter().map(ToString::to_string).collect();
    assert_eq!(cancelled, vec!["path/2".to_string()]);
}
