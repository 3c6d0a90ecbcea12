//! Trait registry: declared traits, their arities, and super-trait edges
//!
//! Declarations are append-only; a trait definition is immutable once it is
//! in the registry. Super-trait references must name already-declared traits
//! and the resulting edge set must stay a DAG, validated with petgraph.

use crate::error::DeclarationError;
use crate::types::{TraitId, TraitInst, TypeTerm};
use indexmap::IndexMap;
use petgraph::{algo, graph::NodeIndex, Graph as PetGraph};
use std::collections::HashMap;

/// Reference from a trait to one of its super-traits.
///
/// `param_map[i]` names the declaring trait's parameter that fills the
/// super-trait's i-th parameter, so a super-trait may be applied to a subset
/// or reordering of the declaring trait's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupertraitRef {
    pub trait_id: TraitId,
    pub param_map: Vec<usize>,
}

impl SupertraitRef {
    pub fn new(trait_id: impl Into<String>, param_map: Vec<usize>) -> Self {
        Self {
            trait_id: TraitId::new(trait_id),
            param_map,
        }
    }

    /// Reference a super-trait over the same parameters, in order
    pub fn same_params(trait_id: impl Into<String>, arity: usize) -> Self {
        Self::new(trait_id, (0..arity).collect())
    }

    /// Instantiate the super-trait with the projected type arguments
    pub fn project(&self, args: &[TypeTerm]) -> TraitInst {
        TraitInst {
            trait_id: self.trait_id.clone(),
            args: self.param_map.iter().map(|&i| args[i].clone()).collect(),
        }
    }
}

/// An immutable trait definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitDef {
    pub trait_id: TraitId,
    pub arity: usize,
    pub supertraits: Vec<SupertraitRef>,
}

/// Registry of declared traits
#[derive(Debug, Clone, Default)]
pub struct TraitRegistry {
    traits: IndexMap<TraitId, TraitDef>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a trait with its type-parameter arity and super-trait list.
    ///
    /// Fails without mutating the registry when the name is already declared,
    /// a super-trait reference is malformed, or the declaration would make
    /// the super-trait graph cyclic.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        supertraits: Vec<SupertraitRef>,
    ) -> Result<TraitId, DeclarationError> {
        let trait_id = TraitId::new(name);

        if self.traits.contains_key(&trait_id) {
            return Err(DeclarationError::DuplicateTrait {
                trait_name: trait_id.name().to_string(),
            });
        }

        for sref in &supertraits {
            // The trait being declared is visible to its own super-trait
            // list, so a self-reference reaches the cycle check below.
            let sup_arity = if sref.trait_id == trait_id {
                arity
            } else {
                self.traits
                    .get(&sref.trait_id)
                    .map(|def| def.arity)
                    .ok_or_else(|| DeclarationError::UndeclaredSupertrait {
                        trait_name: trait_id.name().to_string(),
                        supertrait_name: sref.trait_id.name().to_string(),
                    })?
            };

            if sref.param_map.len() != sup_arity {
                return Err(DeclarationError::SupertraitArityMismatch {
                    trait_name: trait_id.name().to_string(),
                    supertrait_name: sref.trait_id.name().to_string(),
                    expected: sup_arity,
                    found: sref.param_map.len(),
                });
            }

            if let Some(&index) = sref.param_map.iter().find(|&&i| i >= arity) {
                return Err(DeclarationError::SupertraitParamOutOfRange {
                    trait_name: trait_id.name().to_string(),
                    supertrait_name: sref.trait_id.name().to_string(),
                    index,
                    arity,
                });
            }
        }

        if let Some(cycle) = self.supertrait_cycle(&trait_id, &supertraits) {
            return Err(DeclarationError::SupertraitCycle { cycle });
        }

        let def = TraitDef {
            trait_id: trait_id.clone(),
            arity,
            supertraits,
        };
        self.traits.insert(trait_id.clone(), def);
        Ok(trait_id)
    }

    pub fn get(&self, trait_id: &TraitId) -> Option<&TraitDef> {
        self.traits.get(trait_id)
    }

    pub fn is_declared(&self, trait_id: &TraitId) -> bool {
        self.traits.contains_key(trait_id)
    }

    pub fn arity_of(&self, trait_id: &TraitId) -> Option<usize> {
        self.traits.get(trait_id).map(|def| def.arity)
    }

    /// Super-trait references recorded at declaration, used by the
    /// membership-assertion check
    pub fn supertraits_of(&self, trait_id: &TraitId) -> Result<&[SupertraitRef], DeclarationError> {
        self.traits
            .get(trait_id)
            .map(|def| def.supertraits.as_slice())
            .ok_or_else(|| DeclarationError::UndeclaredTrait {
                trait_name: trait_id.name().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Check whether adding `candidate` with the given super-trait edges
    /// would make the graph cyclic; returns a rendered cycle if so.
    ///
    /// Super-traits must already be declared, so the only reachable cycles
    /// are self-references, but the check is over the whole edge set.
    fn supertrait_cycle(
        &self,
        candidate: &TraitId,
        supertraits: &[SupertraitRef],
    ) -> Option<String> {
        let mut graph: PetGraph<String, ()> = PetGraph::new();
        let mut nodes: HashMap<TraitId, NodeIndex> = HashMap::new();

        let node_for = |graph: &mut PetGraph<String, ()>,
                        nodes: &mut HashMap<TraitId, NodeIndex>,
                        id: &TraitId| {
            *nodes
                .entry(id.clone())
                .or_insert_with(|| graph.add_node(id.name().to_string()))
        };

        for def in self.traits.values() {
            let from = node_for(&mut graph, &mut nodes, &def.trait_id);
            for sref in &def.supertraits {
                let to = node_for(&mut graph, &mut nodes, &sref.trait_id);
                graph.add_edge(from, to, ());
            }
        }
        let from = node_for(&mut graph, &mut nodes, candidate);
        for sref in supertraits {
            let to = node_for(&mut graph, &mut nodes, &sref.trait_id);
            graph.add_edge(from, to, ());
        }

        if algo::toposort(&graph, None).is_ok() {
            return None;
        }

        // Extract the participants for the error message
        for scc in algo::tarjan_scc(&graph) {
            let cyclic = scc.len() > 1
                || (scc.len() == 1 && graph.find_edge(scc[0], scc[0]).is_some());
            if cyclic {
                let mut names: Vec<String> =
                    scc.iter().map(|&n| graph[n].clone()).collect();
                names.push(names[0].clone());
                return Some(names.join(" -> "));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_look_up() {
        let mut registry = TraitRegistry::new();

        let nice = registry.declare("Nice", 1, vec![]).unwrap();
        assert!(registry.is_declared(&nice));
        assert_eq!(registry.arity_of(&nice), Some(1));
        assert!(registry.supertraits_of(&nice).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_declaration_is_rejected() {
        let mut registry = TraitRegistry::new();
        registry.declare("Nice", 1, vec![]).unwrap();

        let result = registry.declare("Nice", 2, vec![]);
        assert!(matches!(
            result,
            Err(DeclarationError::DuplicateTrait { ref trait_name }) if trait_name == "Nice"
        ));

        // The original definition is untouched
        assert_eq!(registry.arity_of(&TraitId::new("Nice")), Some(1));
    }

    #[test]
    fn test_undeclared_supertrait_is_malformed() {
        let mut registry = TraitRegistry::new();

        let result = registry.declare("Sub", 1, vec![SupertraitRef::new("Nice", vec![0])]);
        assert!(matches!(
            result,
            Err(DeclarationError::UndeclaredSupertrait { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_supertrait_projection_is_validated() {
        let mut registry = TraitRegistry::new();
        registry.declare("Pair", 2, vec![]).unwrap();

        let too_few = registry.declare("Sub", 2, vec![SupertraitRef::new("Pair", vec![0])]);
        assert!(matches!(
            too_few,
            Err(DeclarationError::SupertraitArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));

        let out_of_range =
            registry.declare("Sub", 1, vec![SupertraitRef::new("Pair", vec![0, 3])]);
        assert!(matches!(
            out_of_range,
            Err(DeclarationError::SupertraitParamOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut registry = TraitRegistry::new();

        let result = registry.declare("Loop", 1, vec![SupertraitRef::new("Loop", vec![0])]);
        match result {
            Err(DeclarationError::SupertraitCycle { cycle }) => {
                assert!(cycle.contains("Loop"));
            }
            other => panic!("expected a super-trait cycle, got {other:?}"),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_projection_builds_supertrait_instantiation() {
        let sref = SupertraitRef::new("Ordered", vec![1]);
        let args = vec![TypeTerm::concrete("String"), TypeTerm::concrete("Int64")];
        let projected = sref.project(&args);

        assert_eq!(projected.trait_id, TraitId::new("Ordered"));
        assert_eq!(projected.args, vec![TypeTerm::concrete("Int64")]);
    }
}
