//! Capability fragments.
//!
//! A `Fragment` is a named unit of capability with declared precedence over
//! its base fragments and an optional set of literal attributes. Fragments
//! form the ordered base lists of composite types; the engine resolves an
//! attribute through a composite's fragment chain most specific first.
//!
//! Constructing a fragment computes its ancestry up front with the C3 merge
//! over the base fragments' own ancestries. Construction fails if the
//! declared bases admit no consistent precedence order, so every fragment in
//! circulation is internally consistent. Fragments are identified by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::LinearizeError;
use crate::value::Value;

pub type FragmentRef = Arc<Fragment>;

#[derive(Debug)]
pub struct Fragment {
    name: String,
    bases: Vec<FragmentRef>,
    /// C3 merge of the bases' linearizations; excludes the fragment itself.
    ancestry: Vec<FragmentRef>,
    attrs: BTreeMap<String, Value>,
}

impl Fragment {
    /// Create a fragment with no bases.
    pub fn root(name: &str) -> FragmentRef {
        Arc::new(Self {
            name: name.to_string(),
            bases: Vec::new(),
            ancestry: Vec::new(),
            attrs: BTreeMap::new(),
        })
    }

    /// Create a fragment deriving from the given bases, most specific first.
    pub fn new(name: &str, bases: &[FragmentRef]) -> Result<FragmentRef, LinearizeError> {
        Self::with_attrs(name, bases, BTreeMap::new())
    }

    /// Create a fragment with bases and literal attributes.
    pub fn with_attrs(
        name: &str,
        bases: &[FragmentRef],
        attrs: BTreeMap<String, Value>,
    ) -> Result<FragmentRef, LinearizeError> {
        let ancestry =
            linearize_bases(bases).ok_or_else(|| LinearizeError::InconsistentBases {
                name: name.to_string(),
                bases: bases.iter().map(|b| b.name().to_string()).collect(),
            })?;
        Ok(Arc::new(Self {
            name: name.to_string(),
            bases: bases.to_vec(),
            ancestry,
            attrs,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[FragmentRef] {
        &self.bases
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Ancestors in precedence order, excluding the fragment itself.
    pub fn ancestry(&self) -> &[FragmentRef] {
        &self.ancestry
    }

    /// The fragment followed by its ancestors, in precedence order.
    pub fn linearization(fragment: &FragmentRef) -> Vec<FragmentRef> {
        let mut chain = Vec::with_capacity(1 + fragment.ancestry.len());
        chain.push(fragment.clone());
        chain.extend(fragment.ancestry.iter().cloned());
        chain
    }

    /// Whether `self` is `other` or declares it (transitively) as a base.
    pub fn derives_from(&self, other: &Fragment) -> bool {
        self.name == other.name || self.ancestry.iter().any(|a| a.name() == other.name)
    }
}

/// C3-merge an ordered base list into a single precedence chain.
///
/// Merges each base's linearization together with the base order itself.
/// Returns `None` when no consistent order exists. The result excludes any
/// synthetic head, so it is exactly the ancestry a fragment or composite
/// derives from `bases`.
pub(crate) fn linearize_bases(bases: &[FragmentRef]) -> Option<Vec<FragmentRef>> {
    let mut sequences: Vec<Vec<FragmentRef>> =
        bases.iter().map(Fragment::linearization).collect();
    sequences.push(bases.to_vec());
    c3_merge(sequences)
}

/// The C3 merge: repeatedly take the head of the first sequence whose head
/// does not appear in the tail of any sequence.
fn c3_merge(mut sequences: Vec<Vec<FragmentRef>>) -> Option<Vec<FragmentRef>> {
    let mut merged = Vec::new();

    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(merged);
        }

        let head = sequences.iter().find_map(|seq| {
            let candidate = &seq[0];
            let in_some_tail = sequences
                .iter()
                .any(|s| s[1..].iter().any(|f| f.name() == candidate.name()));
            (!in_some_tail).then(|| candidate.clone())
        })?;

        for seq in &mut sequences {
            if seq[0].name() == head.name() {
                seq.remove(0);
            }
        }
        merged.push(head);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(chain: &[FragmentRef]) -> Vec<&str> {
        chain.iter().map(|f| f.name()).collect()
    }

    #[test]
    fn test_root_fragment_has_empty_ancestry() {
        let base = Fragment::root("base");
        assert_eq!(base.name(), "base");
        assert!(base.ancestry().is_empty());
        assert_eq!(names(&Fragment::linearization(&base)), vec!["base"]);
    }

    #[test]
    fn test_single_inheritance_chain() {
        let a = Fragment::root("a");
        let b = Fragment::new("b", &[a.clone()]).unwrap();
        let c = Fragment::new("c", &[b.clone()]).unwrap();
        assert_eq!(names(&Fragment::linearization(&c)), vec!["c", "b", "a"]);
        assert!(c.derives_from(&a));
        assert!(!a.derives_from(&c));
    }

    #[test]
    fn test_diamond_linearization() {
        let o = Fragment::root("o");
        let a = Fragment::new("a", &[o.clone()]).unwrap();
        let b = Fragment::new("b", &[o.clone()]).unwrap();
        let d = Fragment::new("d", &[a.clone(), b.clone()]).unwrap();
        assert_eq!(names(&Fragment::linearization(&d)), vec!["d", "a", "b", "o"]);
    }

    #[test]
    fn test_inconsistent_bases_rejected() {
        let a = Fragment::root("a");
        let b = Fragment::new("b", &[a.clone()]).unwrap();
        // a before b contradicts b deriving from a
        let err = Fragment::new("bad", &[a.clone(), b.clone()]).unwrap_err();
        assert!(matches!(err, LinearizeError::InconsistentBases { .. }));
    }

    #[test]
    fn test_attrs_are_reachable() {
        let mut attrs = BTreeMap::new();
        attrs.insert("kind".to_string(), Value::from("draft"));
        let f = Fragment::with_attrs("draftable", &[], attrs).unwrap();
        assert_eq!(f.attr("kind"), Some(&Value::from("draft")));
        assert_eq!(f.attr("missing"), None);
    }
}
