//! Linearization repair for fragment sequences.
//!
//! A composite type is synthesized from an ordered list of fragments. The
//! list is consistent when a single precedence chain exists that honors both
//! every fragment's own ancestry and the list order itself. Preset and
//! customization authors append mixins in an intended precedence, so an
//! already-consistent list is returned unchanged; an inconsistent one is
//! repaired by inserting each fragment as far right as possible, which keeps
//! the fewest relative positions away from the declared order.

use tracing::debug;

use crate::error::LinearizeError;
use crate::fragment::{FragmentRef, linearize_bases};

/// Check whether a composite can be synthesized from `order` as given.
///
/// The order is consistent when the C3 merge succeeds and the merged chain,
/// filtered down to the listed fragments, preserves the list order.
pub fn is_order_consistent(order: &[FragmentRef]) -> bool {
    match linearize_bases(order) {
        Some(merged) => {
            let listed: Vec<&str> = order.iter().map(|f| f.name()).collect();
            let filtered: Vec<&str> = merged
                .iter()
                .map(|f| f.name())
                .filter(|name| listed.contains(name))
                .collect();
            filtered == listed
        }
        None => false,
    }
}

/// Drop repeated fragments, keeping the first (most specific) occurrence.
pub fn collapse_duplicates(order: &[FragmentRef]) -> Vec<FragmentRef> {
    let mut seen: Vec<&str> = Vec::new();
    let mut collapsed = Vec::with_capacity(order.len());
    for fragment in order {
        if !seen.contains(&fragment.name()) {
            seen.push(fragment.name());
            collapsed.push(fragment.clone());
        }
    }
    collapsed
}

/// Reorder `order` minimally so that a composite can be synthesized from it.
///
/// Consistent input is returned unchanged. Otherwise each fragment after the
/// first is inserted at the right-most position that still synthesizes; if no
/// position works the sequence cannot be merged and the full candidate list
/// is reported in the error.
pub fn repair(order: &[FragmentRef]) -> Result<Vec<FragmentRef>, LinearizeError> {
    let order = collapse_duplicates(order);
    if order.len() <= 1 {
        return Ok(order);
    }
    if is_order_consistent(&order) {
        return Ok(order);
    }

    let mut result = vec![order[0].clone()];
    for candidate in &order[1..] {
        let mut inserted = false;
        for position in (0..=result.len()).rev() {
            let mut tentative = result.clone();
            tentative.insert(position, candidate.clone());
            if linearize_bases(&tentative).is_some() {
                result = tentative;
                inserted = true;
                break;
            }
        }
        if !inserted {
            return Err(LinearizeError::CannotMergeBases {
                sequence: order.iter().map(|f| f.name().to_string()).collect(),
            });
        }
    }

    debug!(
        from = ?order.iter().map(|f| f.name()).collect::<Vec<_>>(),
        to = ?result.iter().map(|f| f.name()).collect::<Vec<_>>(),
        "repaired fragment order"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragment;

    fn names(chain: &[FragmentRef]) -> Vec<&str> {
        chain.iter().map(|f| f.name()).collect()
    }

    #[test]
    fn test_empty_sequence() {
        assert!(is_order_consistent(&[]));
        assert_eq!(repair(&[]).unwrap(), Vec::<FragmentRef>::new());
    }

    #[test]
    fn test_single_element_unchanged() {
        let a = Fragment::root("a");
        let repaired = repair(&[a.clone()]).unwrap();
        assert_eq!(names(&repaired), vec!["a"]);
    }

    #[test]
    fn test_consistent_order_is_noop() {
        let a = Fragment::root("a");
        let b = Fragment::root("b");
        let order = [a.clone(), b.clone()];
        assert!(is_order_consistent(&order));
        assert_eq!(names(&repair(&order).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_superclass_before_subclass_is_repaired() {
        let base = Fragment::root("base");
        let sub = Fragment::new("sub", &[base.clone()]).unwrap();
        let order = [base.clone(), sub.clone()];
        assert!(!is_order_consistent(&order));

        let repaired = repair(&order).unwrap();
        assert_eq!(names(&repaired), vec!["sub", "base"]);
        assert!(is_order_consistent(&repaired));
    }

    #[test]
    fn test_unrelated_fragments_keep_relative_order() {
        // y conflicts with x; a and b are unrelated and must stay in input order
        let x = Fragment::root("x");
        let y = Fragment::new("y", &[x.clone()]).unwrap();
        let a = Fragment::root("a");
        let b = Fragment::root("b");
        let order = [a.clone(), x.clone(), b.clone(), y.clone()];

        let repaired = repair(&order).unwrap();
        assert!(is_order_consistent(&repaired));
        let repaired_names = names(&repaired);
        let pos = |n: &str| repaired_names.iter().position(|c| *c == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("y") < pos("x"));
    }

    #[test]
    fn test_duplicates_collapse_to_first_occurrence() {
        let a = Fragment::root("a");
        let b = Fragment::root("b");
        let order = [a.clone(), b.clone(), a.clone()];
        let repaired = repair(&order).unwrap();
        assert_eq!(names(&repaired), vec!["a", "b"]);
    }

    #[test]
    fn test_impossible_merge_reports_sequence() {
        // c1 wants a before b, c2 wants b before a; both constraints cannot hold
        let a = Fragment::root("a");
        let b = Fragment::root("b");
        let c1 = Fragment::new("c1", &[a.clone(), b.clone()]).unwrap();
        let c2 = Fragment::new("c2", &[b.clone(), a.clone()]).unwrap();

        let err = repair(&[c1.clone(), c2.clone()]).unwrap_err();
        match err {
            LinearizeError::CannotMergeBases { sequence } => {
                assert_eq!(sequence, vec!["c1".to_string(), "c2".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_diamond_tail_insertion() {
        let o = Fragment::root("o");
        let a = Fragment::new("a", &[o.clone()]).unwrap();
        let b = Fragment::new("b", &[o.clone()]).unwrap();
        // o listed first is the least specific and must end up last
        let repaired = repair(&[o.clone(), a.clone(), b.clone()]).unwrap();
        assert!(is_order_consistent(&repaired));
        let repaired_names = names(&repaired);
        assert_eq!(repaired_names.last(), Some(&"o"));
        let pos = |n: &str| repaired_names.iter().position(|c| *c == n).unwrap();
        assert!(pos("a") < pos("b"));
    }
}
