//! Built composite types.
//!
//! A `Composite` is the finalized form of a composite-type partial: one
//! concrete type synthesized from an ordered, already-repaired fragment list
//! plus literal fields. There is no runtime type synthesis here; the
//! composite holds the full precedence chain and dispatches attribute lookup
//! through it explicitly, most specific first.

use std::collections::BTreeMap;

use crate::error::LinearizeError;
use crate::fragment::{Fragment, FragmentRef, linearize_bases};
use crate::value::Value;

#[derive(Debug)]
pub struct Composite {
    name: String,
    bases: Vec<FragmentRef>,
    /// Full precedence chain: the bases and all their ancestors, merged.
    chain: Vec<FragmentRef>,
    fields: BTreeMap<String, Value>,
}

impl Composite {
    /// Synthesize a composite from an ordered base list.
    ///
    /// The bases are expected to already be in a consistent order (the
    /// builder repairs them first); an inconsistent list is rejected.
    pub fn new(
        name: &str,
        bases: Vec<FragmentRef>,
        fields: BTreeMap<String, Value>,
    ) -> Result<Self, LinearizeError> {
        let chain = linearize_bases(&bases).ok_or_else(|| LinearizeError::CannotMergeBases {
            sequence: bases.iter().map(|f| f.name().to_string()).collect(),
        })?;
        Ok(Self {
            name: name.to_string(),
            bases,
            chain,
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The direct base list the composite was synthesized from.
    pub fn bases(&self) -> &[FragmentRef] {
        &self.bases
    }

    /// The full precedence chain, most specific first.
    pub fn chain(&self) -> &[FragmentRef] {
        &self.chain
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Resolve an attribute: literal fields shadow fragment attributes,
    /// fragment attributes resolve through the chain in precedence order.
    pub fn resolve(&self, attr: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(attr) {
            return Some(value);
        }
        self.chain.iter().find_map(|fragment| fragment.attr(attr))
    }

    /// Whether the composite carries the given fragment's capability.
    pub fn satisfies(&self, fragment: &Fragment) -> bool {
        self.chain.iter().any(|f| f.name() == fragment.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_includes_ancestors() {
        let base = Fragment::root("base");
        let record = Fragment::new("record", &[base.clone()]).unwrap();
        let composite =
            Composite::new("TestRecord", vec![record.clone()], BTreeMap::new()).unwrap();

        let chain: Vec<&str> = composite.chain().iter().map(|f| f.name()).collect();
        assert_eq!(chain, vec!["record", "base"]);
        assert!(composite.satisfies(&base));
        assert!(composite.satisfies(&record));
    }

    #[test]
    fn test_resolution_is_most_specific_first() {
        let mut base_attrs = BTreeMap::new();
        base_attrs.insert("pid_type".to_string(), Value::from("generic"));
        base_attrs.insert("searchable".to_string(), Value::from(false));
        let base = Fragment::with_attrs("base", &[], base_attrs).unwrap();

        let mut record_attrs = BTreeMap::new();
        record_attrs.insert("pid_type".to_string(), Value::from("rec"));
        let record = Fragment::with_attrs("record", &[base.clone()], record_attrs).unwrap();

        let composite = Composite::new("TestRecord", vec![record], BTreeMap::new()).unwrap();
        assert_eq!(composite.resolve("pid_type"), Some(&Value::from("rec")));
        assert_eq!(composite.resolve("searchable"), Some(&Value::from(false)));
        assert_eq!(composite.resolve("missing"), None);
    }

    #[test]
    fn test_literal_fields_shadow_fragments() {
        let mut attrs = BTreeMap::new();
        attrs.insert("kind".to_string(), Value::from("fragment"));
        let f = Fragment::with_attrs("f", &[], attrs).unwrap();

        let mut fields = BTreeMap::new();
        fields.insert("kind".to_string(), Value::from("literal"));
        let composite = Composite::new("Shadowed", vec![f], fields).unwrap();
        assert_eq!(composite.resolve("kind"), Some(&Value::from("literal")));
    }

    #[test]
    fn test_inconsistent_bases_rejected() {
        let base = Fragment::root("base");
        let sub = Fragment::new("sub", &[base.clone()]).unwrap();
        let err = Composite::new("Bad", vec![base, sub], BTreeMap::new()).unwrap_err();
        assert!(matches!(err, LinearizeError::CannotMergeBases { .. }));
    }
}
