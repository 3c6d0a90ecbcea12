//! Built-in property predicates for the taxon trait engine
//!
//! The engine never inspects type structure itself; this crate supplies the
//! common built-in properties as ordinary programmatic classifiers over a
//! catalog of type facts. Installing the library declares one unary trait
//! per property and wires a predicate for it, so membership queries and
//! trait functions can condition on properties like bit-representability
//! without enumerating every type by hand.

pub mod facts;
pub mod install;

pub use facts::{facts_for, TypeFacts, BUILTIN_FACTS};
pub use install::{
    install, is_bits, IS_BITS, IS_CALLABLE, IS_CONTIGUOUS, IS_IMMUTABLE, IS_INDEX_LINEAR,
    IS_ITERATOR,
};
