//! Precedence tags and the order resolver.
//!
//! # Responsibility
//! - Model the three-way precedence tag carried by extension definitions.
//! - Provide the single total order used by every invocation phase.
//!
//! # Invariants
//! - `Priority` sorts before `Ordered`, which sorts before `Untagged`.
//! - Within `Priority`/`Ordered`, lower order values sort first.
//! - Sorting is stable: ties and `Untagged` entries keep discovery order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Coarse ordering class of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Priority,
    Ordered,
    Untagged,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Ordered => "ordered",
            Self::Untagged => "untagged",
        }
    }
}

/// Precedence tag: tier plus explicit order value where the tier has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tier", content = "order")]
pub enum Precedence {
    Priority(i32),
    Ordered(i32),
    #[default]
    Untagged,
}

impl Precedence {
    pub fn tier(self) -> Tier {
        match self {
            Self::Priority(_) => Tier::Priority,
            Self::Ordered(_) => Tier::Ordered,
            Self::Untagged => Tier::Untagged,
        }
    }

    /// Explicit order value, `None` for untagged extensions.
    pub fn order(self) -> Option<i32> {
        match self {
            Self::Priority(order) | Self::Ordered(order) => Some(order),
            Self::Untagged => None,
        }
    }
}

/// Total order between two precedence tags.
///
/// `Untagged` entries compare equal to each other so a stable sort keeps
/// their discovery order.
pub fn compare(left: Precedence, right: Precedence) -> Ordering {
    left.tier()
        .cmp(&right.tier())
        .then_with(|| match (left.order(), right.order()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        })
}

/// Anything the order resolver can sort.
pub trait HasPrecedence {
    fn precedence(&self) -> Precedence;
}

impl HasPrecedence for Precedence {
    fn precedence(&self) -> Precedence {
        *self
    }
}

/// Sorts `items` in place by precedence.
///
/// Slices with at most one element are left untouched and the comparator
/// is never called.
pub fn sort_by_precedence<T: HasPrecedence>(items: &mut [T]) {
    if items.len() <= 1 {
        return;
    }
    items.sort_by(|left, right| compare(left.precedence(), right.precedence()));
}

#[cfg(test)]
mod tests {
    use super::{compare, sort_by_precedence, HasPrecedence, Precedence, Tier};
    use std::cell::Cell;
    use std::cmp::Ordering;

    struct Named {
        name: &'static str,
        precedence: Precedence,
    }

    impl HasPrecedence for Named {
        fn precedence(&self) -> Precedence {
            self.precedence
        }
    }

    struct Counting<'a> {
        calls: &'a Cell<usize>,
    }

    impl HasPrecedence for Counting<'_> {
        fn precedence(&self) -> Precedence {
            self.calls.set(self.calls.get() + 1);
            Precedence::Untagged
        }
    }

    fn names(items: &[Named]) -> Vec<&'static str> {
        items.iter().map(|item| item.name).collect()
    }

    #[test]
    fn orders_tiers_then_order_values() {
        let mut items = vec![
            Named { name: "d", precedence: Precedence::Untagged },
            Named { name: "b", precedence: Precedence::Ordered(5) },
            Named { name: "a", precedence: Precedence::Priority(100) },
            Named { name: "c", precedence: Precedence::Ordered(1) },
        ];
        sort_by_precedence(&mut items);
        assert_eq!(names(&items), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn keeps_discovery_order_for_ties_and_untagged() {
        let mut items = vec![
            Named { name: "u1", precedence: Precedence::Untagged },
            Named { name: "o1", precedence: Precedence::Ordered(3) },
            Named { name: "u2", precedence: Precedence::Untagged },
            Named { name: "o2", precedence: Precedence::Ordered(3) },
            Named { name: "u3", precedence: Precedence::Untagged },
        ];
        sort_by_precedence(&mut items);
        assert_eq!(names(&items), vec!["o1", "o2", "u1", "u2", "u3"]);
    }

    #[test]
    fn priority_with_large_order_still_beats_ordered() {
        assert_eq!(
            compare(Precedence::Priority(i32::MAX), Precedence::Ordered(i32::MIN)),
            Ordering::Less
        );
        assert_eq!(compare(Precedence::Untagged, Precedence::Untagged), Ordering::Equal);
    }

    #[test]
    fn single_item_is_not_compared() {
        let calls = Cell::new(0);
        let mut items = vec![Counting { calls: &calls }];
        sort_by_precedence(&mut items);
        assert_eq!(calls.get(), 0);

        let mut empty: Vec<Counting<'_>> = vec![];
        sort_by_precedence(&mut empty);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn precedence_exposes_tier_and_order() {
        assert_eq!(Precedence::Priority(-1).tier(), Tier::Priority);
        assert_eq!(Precedence::Ordered(7).order(), Some(7));
        assert_eq!(Precedence::default(), Precedence::Untagged);
        assert_eq!(Precedence::Untagged.order(), None);
    }

    #[test]
    fn precedence_serializes_with_tier_tag() {
        let value = serde_json::to_value(Precedence::Ordered(3)).expect("serialize");
        assert_eq!(value, serde_json::json!({ "tier": "ordered", "order": 3 }));

        let parsed: Precedence =
            serde_json::from_str(r#"{"tier":"untagged"}"#).expect("untagged");
        assert_eq!(parsed, Precedence::Untagged);
    }
}
