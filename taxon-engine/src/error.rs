//! Error types for the taxon trait engine
//!
//! One sub-enum per concern (declaration, query, dispatch), folded into a
//! single `EngineError` for the facade API. Every error is raised
//! synchronously during declaration or query processing; none are retried.

use crate::types::Sign;
use miette::Diagnostic;
use thiserror::Error;

/// Top-level engine error combining the per-concern sub-enums
#[derive(Error, Diagnostic, Debug)]
pub enum EngineError {
    #[error("Trait declaration failed")]
    #[diagnostic(code(taxon::engine::declaration_failed))]
    Declaration(#[from] DeclarationError),

    #[error("Membership query failed")]
    #[diagnostic(code(taxon::engine::query_failed))]
    Query(#[from] QueryError),

    #[error("Dispatch site processing failed")]
    #[diagnostic(code(taxon::engine::dispatch_failed))]
    Dispatch(#[from] DispatchError),
}

/// Errors raised while declaring traits or asserting membership
#[derive(Error, Diagnostic, Debug)]
pub enum DeclarationError {
    #[error("duplicate trait: {trait_name} is already declared")]
    #[diagnostic(
        code(taxon::declare::duplicate_trait),
        help("each trait name may be declared exactly once; fix and redeclare under a new name")
    )]
    DuplicateTrait { trait_name: String },

    #[error("malformed declaration: super-trait {supertrait_name} of {trait_name} is not declared")]
    #[diagnostic(
        code(taxon::declare::malformed),
        help("declare {supertrait_name} before naming it as a super-trait")
    )]
    UndeclaredSupertrait {
        trait_name: String,
        supertrait_name: String,
    },

    #[error("malformed declaration: super-trait {supertrait_name} expects {expected} type parameters, {trait_name} maps {found}")]
    #[diagnostic(
        code(taxon::declare::malformed),
        help("the parameter projection must cover the super-trait's full arity")
    )]
    SupertraitArityMismatch {
        trait_name: String,
        supertrait_name: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed declaration: super-trait {supertrait_name} maps parameter {index} of {trait_name}, which has arity {arity}")]
    #[diagnostic(
        code(taxon::declare::malformed),
        help("projection indices must name parameters of the declaring trait")
    )]
    SupertraitParamOutOfRange {
        trait_name: String,
        supertrait_name: String,
        index: usize,
        arity: usize,
    },

    #[error("malformed declaration: super-trait cycle {cycle}")]
    #[diagnostic(
        code(taxon::declare::malformed),
        help("super-traits must form a DAG")
    )]
    SupertraitCycle { cycle: String },

    #[error("malformed declaration: inline bound {trait_name} on parameter {param} must be a unary trait")]
    #[diagnostic(
        code(taxon::declare::malformed),
        help("attach non-unary constraints in the separate constraint list instead")
    )]
    InlineBoundNotUnary { trait_name: String, param: String },

    #[error("undeclared trait: {trait_name}")]
    #[diagnostic(
        code(taxon::declare::undeclared_trait),
        help("declare the trait before asserting membership for it")
    )]
    UndeclaredTrait { trait_name: String },

    #[error("trait arity mismatch: {trait_name} expects {expected} type arguments, found {found}")]
    #[diagnostic(code(taxon::declare::arity_mismatch))]
    TraitArityMismatch {
        trait_name: String,
        expected: usize,
        found: usize,
    },

    #[error("super-trait unsatisfied: {supertrait} must be confirmed before asserting {instantiation}")]
    #[diagnostic(
        code(taxon::declare::supertrait_unsatisfied),
        help("assert {supertrait} first; membership requires every super-trait to already hold")
    )]
    SupertraitUnsatisfied {
        instantiation: String,
        supertrait: String,
    },
}

/// Errors raised by membership queries
#[derive(Error, Diagnostic, Debug)]
pub enum QueryError {
    #[error("not a trait: {name}")]
    #[diagnostic(
        code(taxon::query::not_a_trait),
        help("membership can only be queried for declared traits")
    )]
    NotATrait { name: String },

    #[error("membership query requires concrete type arguments: {instantiation} still contains {variable}")]
    #[diagnostic(
        code(taxon::query::not_concrete),
        help("resolve every type argument before querying; classification never guesses")
    )]
    NotConcrete {
        instantiation: String,
        variable: String,
    },
}

/// Errors raised while rewriting or calling trait-conditioned functions
#[derive(Error, Diagnostic, Debug)]
pub enum DispatchError {
    #[error("no trait constraint in signature of {function}")]
    #[diagnostic(
        code(taxon::dispatch::no_trait_in_signature),
        help("a trait function needs exactly one constraint, listed or attached inline to a parameter")
    )]
    NoTraitInSignature { function: String },

    #[error("ambiguous trait site: {function} constrains both {first} and {second}")]
    #[diagnostic(
        code(taxon::dispatch::ambiguous_trait_site),
        help("a dispatch site supports a single trait; split the declaration")
    )]
    AmbiguousTraitSite {
        function: String,
        first: String,
        second: String,
    },

    #[error("unknown function: {function}")]
    #[diagnostic(code(taxon::dispatch::unknown_function))]
    UnknownFunction { function: String },

    #[error("no signature of {function} matches argument types ({found})")]
    #[diagnostic(code(taxon::dispatch::signature_mismatch))]
    SignatureMismatch { function: String, found: String },

    #[error("trait parameter {parameter} of {function} is not bound by any argument")]
    #[diagnostic(
        code(taxon::dispatch::unbound_trait_parameter),
        help("every type parameter must occur in at least one argument shape")
    )]
    UnboundTraitParameter {
        function: String,
        parameter: String,
    },

    #[error("no branch of {function} for the {sign} form of {constraint}")]
    #[diagnostic(
        code(taxon::dispatch::no_matching_branch),
        help("declare a sibling branch for the complementary sign")
    )]
    NoMatchingBranch {
        function: String,
        sign: Sign,
        constraint: String,
    },
}
