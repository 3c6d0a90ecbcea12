//! taxon trait engine
//!
//! Traits here are named groups of types, orthogonal to any nominal
//! hierarchy: a trait is declared with an arity and super-trait
//! dependencies, membership is asserted explicitly (or derived from a
//! programmatic predicate), and functions conditioned on a trait are
//! installed as dispatch sites that route each call to the branch matching
//! the classifier's verdict.
//!
//! ## Architecture
//!
//! - **Trait Registry**: declared traits, arities, and the super-trait DAG
//! - **Classifier**: the single membership oracle; explicit entries first,
//!   then predicates, then the default `Negated`; negation by involution
//! - **Dispatch Rewriter**: trait-conditioned declarations become an outer
//!   resolver plus sign-keyed branches, idempotent under redeclaration
//! - **Engine facade**: one service object owning all of the above; no
//!   ambient singleton, no locking, since declaration processing is sequential
//!
//! Membership is always an explicit assertion or predicate answer; the
//! engine never inspects a type's structure to decide conformance.

pub mod classifier;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod registry;
pub mod types;

// Re-export public API
pub use classifier::{Classifier, ClassifierEntry, PredicateFn};
pub use dispatch::{
    normalize, Branch, BranchBody, DefineOutcome, DispatchKey, DispatchSite, DispatchTable,
    FnDecl, Handler, NormalizedFn, ParamAnnotation, ParamSpec, StagedFactory,
};
pub use engine::TraitEngine;
pub use error::{DeclarationError, DispatchError, EngineError, QueryError};
pub use registry::{SupertraitRef, TraitDef, TraitRegistry};
pub use types::{Bindings, Sign, TraitBound, TraitId, TraitInst, TypeId, TypeTerm, Typed};

#[cfg(test)]
mod tests;
