//! The engine facade: one process-scoped service object owning the trait
//! registry, the classifier, and the dispatch table
//!
//! Every surface operation funnels through here so ordering and invariant
//! checks live in one place. There is no ambient singleton; clients hold the
//! engine and pass it where it is needed. `V` is the client's value
//! representation, connected through the `Typed` seam.

use crate::classifier::{Classifier, PredicateFn};
use crate::dispatch::{normalize, BranchBody, DefineOutcome, DispatchTable, FnDecl};
use crate::error::{DeclarationError, EngineError, QueryError};
use crate::registry::{SupertraitRef, TraitRegistry};
use crate::types::{Sign, TraitBound, TraitId, TraitInst, Typed};

pub struct TraitEngine<V> {
    registry: TraitRegistry,
    classifier: Classifier,
    dispatch: DispatchTable<V>,
}

impl<V> Default for TraitEngine<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TraitEngine<V> {
    pub fn new() -> Self {
        Self {
            registry: TraitRegistry::new(),
            classifier: Classifier::new(),
            dispatch: DispatchTable::new(),
        }
    }

    pub fn registry(&self) -> &TraitRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn dispatch(&self) -> &DispatchTable<V> {
        &self.dispatch
    }

    /// Declare a trait with its arity and super-trait list
    pub fn declare_trait(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        supertraits: Vec<SupertraitRef>,
    ) -> Result<TraitId, EngineError> {
        Ok(self.registry.declare(name, arity, supertraits)?)
    }

    /// Assert membership: record that `inst` classifies as `sign`.
    ///
    /// Every super-trait of the instantiation's trait must already classify
    /// `Confirmed` for the projected type arguments; on failure nothing is
    /// recorded. Re-asserting the same pattern with a different sign
    /// overwrites the previous entry; a documented override, not an error.
    pub fn implement(&mut self, inst: TraitInst, sign: Sign) -> Result<(), EngineError> {
        let def = self.registry.get(&inst.trait_id).ok_or_else(|| {
            DeclarationError::UndeclaredTrait {
                trait_name: inst.trait_id.name().to_string(),
            }
        })?;

        if inst.args.len() != def.arity {
            return Err(DeclarationError::TraitArityMismatch {
                trait_name: inst.trait_id.name().to_string(),
                expected: def.arity,
                found: inst.args.len(),
            }
            .into());
        }

        for sref in &def.supertraits {
            let sup = sref.project(&inst.args);
            if self.classifier.classify(&TraitBound::Positive(sup.clone())) != Sign::Confirmed {
                return Err(DeclarationError::SupertraitUnsatisfied {
                    instantiation: inst.to_string(),
                    supertrait: sup.to_string(),
                }
                .into());
            }
        }

        self.classifier.install_static(&inst, sign);
        self.classifier.cache_membership(&inst, sign);
        Ok(())
    }

    /// Assert `Confirmed` membership
    pub fn implement_positive(&mut self, inst: TraitInst) -> Result<(), EngineError> {
        self.implement(inst, Sign::Confirmed)
    }

    /// Install a programmatic predicate as the trait's general classifier
    /// entry, replacing any previous predicate. Explicit assertions still
    /// take precedence for their exact patterns.
    pub fn install_predicate(
        &mut self,
        trait_id: TraitId,
        pred: PredicateFn,
    ) -> Result<(), EngineError> {
        if !self.registry.is_declared(&trait_id) {
            return Err(DeclarationError::UndeclaredTrait {
                trait_name: trait_id.name().to_string(),
            }
            .into());
        }
        self.classifier.install_predicate(trait_id, pred);
        Ok(())
    }

    /// The classifier's verdict for a bound, without the query-side
    /// preconditions
    pub fn classify(&self, bound: &TraitBound) -> Sign {
        self.classifier.classify(bound)
    }

    /// Membership query for one signed bound.
    ///
    /// Requires a declared trait, matching arity, and fully concrete type
    /// arguments; returns true iff the bound classifies `Confirmed`.
    pub fn query_one(&self, bound: &TraitBound) -> Result<bool, EngineError> {
        let inst = bound.inst();

        let arity = self
            .registry
            .arity_of(&inst.trait_id)
            .ok_or_else(|| QueryError::NotATrait {
                name: inst.trait_id.name().to_string(),
            })?;
        if inst.args.len() != arity {
            return Err(DeclarationError::TraitArityMismatch {
                trait_name: inst.trait_id.name().to_string(),
                expected: arity,
                found: inst.args.len(),
            }
            .into());
        }
        if let Some(variable) = inst.first_variable() {
            return Err(QueryError::NotConcrete {
                instantiation: inst.to_string(),
                variable: variable.to_string(),
            }
            .into());
        }

        // Assertions pin their answer on this path; fall back to the
        // general classifier only when nothing is cached
        let interior = self
            .classifier
            .cached(inst)
            .unwrap_or_else(|| self.classifier.classify(&TraitBound::Positive(inst.clone())));
        let verdict = if bound.is_positive() {
            interior
        } else {
            interior.negate()
        };
        Ok(verdict == Sign::Confirmed)
    }

    /// Membership query over a tuple of bounds: logical AND, short-circuiting
    /// on the first unsatisfied member
    pub fn query(&self, bounds: &[TraitBound]) -> Result<bool, EngineError> {
        for bound in bounds {
            if !self.query_one(bound)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Install a trait-conditioned function declaration.
    ///
    /// Performs the dispatch rewrite: the declaration is normalized, its
    /// constraint validated against the registry, and the site installed
    /// with replace-on-insert semantics.
    pub fn define_fn(
        &mut self,
        decl: FnDecl,
        body: BranchBody<V>,
    ) -> Result<DefineOutcome, EngineError> {
        let norm = normalize(decl)?;

        let inst = norm.bound.inst();
        let arity = self
            .registry
            .arity_of(&inst.trait_id)
            .ok_or_else(|| QueryError::NotATrait {
                name: inst.trait_id.name().to_string(),
            })?;
        if inst.args.len() != arity {
            if let Some(param) = &norm.inline_param {
                return Err(DeclarationError::InlineBoundNotUnary {
                    trait_name: inst.trait_id.name().to_string(),
                    param: param.clone(),
                }
                .into());
            }
            return Err(DeclarationError::TraitArityMismatch {
                trait_name: inst.trait_id.name().to_string(),
                expected: arity,
                found: inst.args.len(),
            }
            .into());
        }

        Ok(self.dispatch.define(&norm, body))
    }

    /// Resolve and invoke a trait-conditioned function over actual values
    pub fn call(&self, scope: &[&str], name: &str, args: &[V]) -> Result<V, EngineError>
    where
        V: Typed,
    {
        self.dispatch.call(&self.classifier, scope, name, args)
    }
}
