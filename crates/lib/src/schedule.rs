//! Preset scheduling.
//!
//! Orders a set of presets so that every preset runs after all providers and
//! modifiers of its `depends_on` names and after the provider of every name
//! it modifies, while modifiers of one artifact keep the order in which they
//! were supplied.
//!
//! The production algorithm is a multi-pass counting scan: a multiplicity
//! map counts providers and modifiers per name, and each round emits every
//! preset whose dependencies are fully resolved, whose modify targets exist,
//! and which is the next unrun modifier in every same-name modifier chain it
//! belongs to. The tie-break is stable and input-order preserving: presets that
//! become eligible in the same round are emitted in the order they were
//! supplied. A round that makes no progress is fatal; the remaining presets
//! are loaded into a dependency graph and its strongly connected components
//! are reported so the author can see the cycle.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::ScheduleError;
use crate::preset::Preset;

struct PresetMeta {
  name: String,
  provides: Vec<String>,
  depends_on: Vec<String>,
  modifies: Vec<String>,
}

impl PresetMeta {
  fn of(preset: &dyn Preset) -> Self {
    Self {
      name: preset.name().to_string(),
      provides: preset.provides(),
      depends_on: preset.depends_on(),
      modifies: preset.modifies(),
    }
  }
}

/// Order presets into a valid application sequence.
pub fn sort_presets(
  presets: Vec<Box<dyn Preset>>,
) -> Result<Vec<Box<dyn Preset>>, ScheduleError> {
  let metas: Vec<PresetMeta> = presets.iter().map(|p| PresetMeta::of(p.as_ref())).collect();
  validate(&metas)?;

  // How many presets provide or modify each name; a name is fully resolved
  // once that many have run.
  let mut multiplicity: HashMap<&str, usize> = HashMap::new();
  for meta in &metas {
    for name in meta.provides.iter().chain(&meta.modifies) {
      *multiplicity.entry(name.as_str()).or_insert(0) += 1;
    }
  }

  // Modifiers of each name in the order they were supplied; a modifier may
  // only run when it is the next unrun entry of every chain it is part of.
  let mut chains: HashMap<&str, Vec<usize>> = HashMap::new();
  for (idx, meta) in metas.iter().enumerate() {
    for name in &meta.modifies {
      chains.entry(name.as_str()).or_default().push(idx);
    }
  }
  let mut chain_progress: HashMap<&str, usize> = HashMap::new();

  let mut seen: HashMap<&str, usize> = HashMap::new();
  let mut created: HashSet<&str> = HashSet::new();
  let mut fully_resolved: HashSet<&str> = HashSet::new();

  let mut remaining: Vec<usize> = (0..metas.len()).collect();
  let mut order: Vec<usize> = Vec::new();

  while !remaining.is_empty() {
    let mut next_remaining = Vec::new();
    let mut progressed = false;

    for idx in remaining {
      let meta = &metas[idx];
      let blocked = meta
        .depends_on
        .iter()
        .any(|dep| !fully_resolved.contains(dep.as_str()))
        || meta
          .modifies
          .iter()
          .any(|target| !created.contains(target.as_str()))
        || meta.modifies.iter().any(|target| {
          let position = chain_progress.get(target.as_str()).copied().unwrap_or(0);
          chains[target.as_str()][position] != idx
        });
      if blocked {
        next_remaining.push(idx);
        continue;
      }

      order.push(idx);
      progressed = true;

      for name in &meta.provides {
        created.insert(name.as_str());
      }
      for name in &meta.modifies {
        *chain_progress.entry(name.as_str()).or_insert(0) += 1;
      }
      for name in meta.provides.iter().chain(&meta.modifies) {
        let count = seen.entry(name.as_str()).or_insert(0);
        *count += 1;
        if *count == multiplicity[name.as_str()] {
          fully_resolved.insert(name.as_str());
        }
      }
    }

    if !progressed {
      return Err(stall_error(&metas, &next_remaining));
    }
    remaining = next_remaining;
  }

  debug!("sorted presets:");
  for &idx in &order {
    let meta = &metas[idx];
    debug!(
      preset = %meta.name,
      provides = ?meta.provides,
      modifies = ?meta.modifies,
      depends_on = ?meta.depends_on,
      "scheduled"
    );
  }

  let mut slots: Vec<Option<Box<dyn Preset>>> = presets.into_iter().map(Some).collect();
  let mut sorted = Vec::with_capacity(order.len());
  for &idx in &order {
    if let Some(preset) = slots[idx].take() {
      sorted.push(preset);
    }
  }
  Ok(sorted)
}

/// Up-front checks: a name must have exactly one provider, and every
/// `depends_on` / `modifies` name must have a provider somewhere in the set.
fn validate(metas: &[PresetMeta]) -> Result<(), ScheduleError> {
  let mut providers: HashMap<&str, &str> = HashMap::new();
  for meta in metas {
    for name in &meta.provides {
      if let Some(first) = providers.get(name.as_str()) {
        return Err(ScheduleError::DuplicateProvider {
          name: name.clone(),
          first: first.to_string(),
          second: meta.name.clone(),
        });
      }
      providers.insert(name, &meta.name);
    }
  }

  for meta in metas {
    for name in &meta.modifies {
      if !providers.contains_key(name.as_str()) {
        return Err(ScheduleError::UnknownModifyTarget {
          preset: meta.name.clone(),
          name: name.clone(),
        });
      }
    }
    for name in &meta.depends_on {
      if !providers.contains_key(name.as_str()) {
        return Err(ScheduleError::UnknownDependency {
          preset: meta.name.clone(),
          name: name.clone(),
        });
      }
    }
  }
  Ok(())
}

/// Diagnose a no-progress round.
///
/// Builds the graph formulation of the constraints over the stuck presets
/// (edges run from a predecessor to its dependent, including the same-name
/// modifier chain) and reports any strongly connected component as the
/// cycle. With up-front validation in place a stall implies a cycle, but a
/// full dump of the stuck presets is kept as the fallback report.
fn stall_error(metas: &[PresetMeta], remaining: &[usize]) -> ScheduleError {
  let mut graph: DiGraph<usize, ()> = DiGraph::new();
  let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();
  for &idx in remaining {
    nodes.insert(idx, graph.add_node(idx));
  }

  // name -> stuck presets providing or modifying it, in input order
  let mut contributors: HashMap<&str, Vec<usize>> = HashMap::new();
  for &idx in remaining {
    for name in metas[idx].provides.iter().chain(&metas[idx].modifies) {
      contributors.entry(name.as_str()).or_default().push(idx);
    }
  }

  for &idx in remaining {
    for dep in &metas[idx].depends_on {
      if let Some(list) = contributors.get(dep.as_str()) {
        for &src in list {
          if src != idx {
            graph.add_edge(nodes[&src], nodes[&idx], ());
          }
        }
      }
    }
    for target in &metas[idx].modifies {
      if let Some(list) = contributors.get(target.as_str()) {
        for &src in list {
          if src != idx && metas[src].provides.contains(target) {
            graph.add_edge(nodes[&src], nodes[&idx], ());
          }
        }
      }
    }
  }
  for list in contributors.values() {
    for pair in list.windows(2) {
      graph.add_edge(nodes[&pair[0]], nodes[&pair[1]], ());
    }
  }

  let members: Vec<String> = tarjan_scc(&graph)
    .into_iter()
    .filter(|component| component.len() > 1)
    .flatten()
    .map(|node| metas[graph[node]].name.clone())
    .collect();
  if !members.is_empty() {
    return ScheduleError::Cycle { members };
  }

  let mut details = Vec::new();
  for &idx in remaining {
    let meta = &metas[idx];
    details.push(format!(
      "{}\n    provides: {:?}\n    depends on: {:?}\n    modifies: {:?}",
      meta.name, meta.provides, meta.depends_on, meta.modifies
    ));
  }
  ScheduleError::Unresolvable(details.join("\n"))
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use tracing_test::traced_test;

  use forge_core::{ModelInfo, Value};

  use super::*;
  use crate::builder::ModelBuilder;
  use crate::customization::Customization;
  use crate::error::BuildError;

  #[derive(Debug)]
  struct Fake {
    name: &'static str,
    provides: Vec<String>,
    depends_on: Vec<String>,
    modifies: Vec<String>,
  }

  impl Fake {
    fn new(name: &'static str) -> Self {
      Self {
        name,
        provides: Vec::new(),
        depends_on: Vec::new(),
        modifies: Vec::new(),
      }
    }

    fn provides(mut self, names: &[&str]) -> Self {
      self.provides = names.iter().map(|n| n.to_string()).collect();
      self
    }

    fn depends_on(mut self, names: &[&str]) -> Self {
      self.depends_on = names.iter().map(|n| n.to_string()).collect();
      self
    }

    fn modifies(mut self, names: &[&str]) -> Self {
      self.modifies = names.iter().map(|n| n.to_string()).collect();
      self
    }
  }

  impl Preset for Fake {
    fn name(&self) -> &str {
      self.name
    }

    fn provides(&self) -> Vec<String> {
      self.provides.clone()
    }

    fn depends_on(&self) -> Vec<String> {
      self.depends_on.clone()
    }

    fn modifies(&self) -> Vec<String> {
      self.modifies.clone()
    }

    fn apply(
      &self,
      _builder: &mut ModelBuilder,
      _model: &ModelInfo,
      _dependencies: &BTreeMap<String, Value>,
    ) -> Result<Vec<Box<dyn Customization>>, BuildError> {
      Ok(Vec::new())
    }
  }

  fn names(presets: &[Box<dyn Preset>]) -> Vec<&str> {
    presets.iter().map(|p| p.name()).collect()
  }

  #[test]
  fn provider_runs_before_modifier_and_dependent() {
    let presets: Vec<Box<dyn Preset>> = vec![
      Box::new(Fake::new("needs_foo").depends_on(&["foo"])),
      Box::new(Fake::new("modifies_foo").modifies(&["foo"])),
      Box::new(Fake::new("provides_foo").provides(&["foo"])),
    ];
    let sorted = sort_presets(presets).unwrap();
    assert_eq!(names(&sorted), vec!["provides_foo", "modifies_foo", "needs_foo"]);
  }

  #[test]
  fn modifier_chain_keeps_supplied_order() {
    let presets: Vec<Box<dyn Preset>> = vec![
      Box::new(Fake::new("m1").modifies(&["x"])),
      Box::new(Fake::new("m2").modifies(&["x"])),
      Box::new(Fake::new("p").provides(&["x"])),
      Box::new(Fake::new("m3").modifies(&["x"])),
      Box::new(Fake::new("reader").depends_on(&["x"])),
    ];
    let sorted = sort_presets(presets).unwrap();
    let order = names(&sorted);
    let pos = |n: &str| order.iter().position(|c| *c == n).unwrap();
    assert_eq!(pos("p"), 0);
    assert!(pos("m1") < pos("m2"));
    assert!(pos("m2") < pos("m3"));
    assert_eq!(pos("reader"), order.len() - 1);
  }

  #[test]
  fn independent_presets_keep_input_order() {
    let presets: Vec<Box<dyn Preset>> = vec![
      Box::new(Fake::new("c").provides(&["c"])),
      Box::new(Fake::new("a").provides(&["a"])),
      Box::new(Fake::new("b").provides(&["b"])),
    ];
    let sorted = sort_presets(presets).unwrap();
    assert_eq!(names(&sorted), vec!["c", "a", "b"]);
  }

  #[test]
  fn empty_relations_are_eligible_immediately() {
    let presets: Vec<Box<dyn Preset>> = vec![
      Box::new(Fake::new("dependent").depends_on(&["x"])),
      Box::new(Fake::new("plain")),
      Box::new(Fake::new("provider").provides(&["x"])),
    ];
    let sorted = sort_presets(presets).unwrap();
    assert_eq!(names(&sorted), vec!["plain", "provider", "dependent"]);
  }

  #[test]
  fn duplicate_provider_is_fatal() {
    let presets: Vec<Box<dyn Preset>> = vec![
      Box::new(Fake::new("first").provides(&["x"])),
      Box::new(Fake::new("second").provides(&["x"])),
    ];
    let err = sort_presets(presets).unwrap_err();
    match err {
      ScheduleError::DuplicateProvider { name, first, second } => {
        assert_eq!(name, "x");
        assert_eq!(first, "first");
        assert_eq!(second, "second");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn unknown_dependency_is_fatal() {
    let presets: Vec<Box<dyn Preset>> =
      vec![Box::new(Fake::new("dangling").depends_on(&["nowhere"]))];
    let err = sort_presets(presets).unwrap_err();
    assert!(matches!(err, ScheduleError::UnknownDependency { .. }));
  }

  #[test]
  fn unknown_modify_target_is_fatal() {
    let presets: Vec<Box<dyn Preset>> =
      vec![Box::new(Fake::new("dangling").modifies(&["nowhere"]))];
    let err = sort_presets(presets).unwrap_err();
    assert!(matches!(err, ScheduleError::UnknownModifyTarget { .. }));
  }

  #[test]
  fn dependency_cycle_is_reported_with_members() {
    // a depends on x provided by b; b depends on y provided by a
    let presets: Vec<Box<dyn Preset>> = vec![
      Box::new(Fake::new("a").provides(&["y"]).depends_on(&["x"])),
      Box::new(Fake::new("b").provides(&["x"]).depends_on(&["y"])),
    ];
    let err = sort_presets(presets).unwrap_err();
    match err {
      ScheduleError::Cycle { members } => {
        assert!(members.contains(&"a".to_string()));
        assert!(members.contains(&"b".to_string()));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn cycle_never_returns_truncated_order() {
    let presets: Vec<Box<dyn Preset>> = vec![
      Box::new(Fake::new("free").provides(&["z"])),
      Box::new(Fake::new("a").provides(&["y"]).depends_on(&["x"])),
      Box::new(Fake::new("b").provides(&["x"]).depends_on(&["y"])),
    ];
    assert!(sort_presets(presets).is_err());
  }

  #[traced_test]
  #[test]
  fn sorted_order_is_logged() {
    let presets: Vec<Box<dyn Preset>> = vec![Box::new(Fake::new("solo").provides(&["s"]))];
    sort_presets(presets).unwrap();
    assert!(logs_contain("sorted presets"));
  }
}
