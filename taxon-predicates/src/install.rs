//! Declaration and wiring of the built-in property traits

use crate::facts::facts_for;
use std::sync::Arc;
use taxon_engine::{EngineError, TraitEngine, TraitId, TypeTerm};

pub const IS_BITS: &str = "IsBits";
pub const IS_IMMUTABLE: &str = "IsImmutable";
pub const IS_CONTIGUOUS: &str = "IsContiguous";
pub const IS_CALLABLE: &str = "IsCallable";
pub const IS_ITERATOR: &str = "IsIterator";
pub const IS_INDEX_LINEAR: &str = "IsIndexLinear";

const PROPERTY_TRAITS: [&str; 6] = [
    IS_BITS,
    IS_IMMUTABLE,
    IS_CONTIGUOUS,
    IS_CALLABLE,
    IS_ITERATOR,
    IS_INDEX_LINEAR,
];

/// Bit-representability is the one recursive property: a parameterized head
/// is bits only when every type argument is bits as well
pub fn is_bits(term: &TypeTerm) -> bool {
    match term {
        TypeTerm::Concrete { args, .. } => {
            facts_for(term).map(|f| f.bits.is_some()).unwrap_or(false)
                && args.iter().all(is_bits)
        }
        TypeTerm::Variable { .. } => false,
    }
}

/// Declare the property traits and install their predicates into an engine.
///
/// Call once per engine; the traits are ordinary declarations, so a second
/// install fails with a duplicate-trait error.
pub fn install<V>(engine: &mut TraitEngine<V>) -> Result<(), EngineError> {
    for name in PROPERTY_TRAITS {
        engine.declare_trait(name, 1, vec![])?;
    }

    engine.install_predicate(TraitId::new(IS_BITS), Arc::new(|args| is_bits(&args[0])))?;
    engine.install_predicate(
        TraitId::new(IS_IMMUTABLE),
        Arc::new(|args| facts_for(&args[0]).map(|f| f.immutable).unwrap_or(false)),
    )?;
    engine.install_predicate(
        TraitId::new(IS_CONTIGUOUS),
        Arc::new(|args| facts_for(&args[0]).map(|f| f.contiguous).unwrap_or(false)),
    )?;
    engine.install_predicate(
        TraitId::new(IS_CALLABLE),
        Arc::new(|args| facts_for(&args[0]).map(|f| f.callable).unwrap_or(false)),
    )?;
    engine.install_predicate(
        TraitId::new(IS_ITERATOR),
        Arc::new(|args| facts_for(&args[0]).map(|f| f.iterable).unwrap_or(false)),
    )?;
    engine.install_predicate(
        TraitId::new(IS_INDEX_LINEAR),
        Arc::new(|args| facts_for(&args[0]).map(|f| f.linear_index).unwrap_or(false)),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use taxon_engine::{Sign, TraitBound, TraitInst};

    fn installed_engine() -> TraitEngine<()> {
        let mut engine = TraitEngine::new();
        install(&mut engine).unwrap();
        engine
    }

    fn positive(trait_name: &str, term: TypeTerm) -> TraitBound {
        TraitBound::Positive(TraitInst::new(trait_name, vec![term]))
    }

    #[test]
    fn test_scalars_are_bits_but_strings_are_not() {
        let engine = installed_engine();

        assert!(engine
            .query_one(&positive(IS_BITS, TypeTerm::concrete("Int64")))
            .unwrap());
        assert!(engine
            .query_one(&positive(IS_BITS, TypeTerm::concrete("Float64")))
            .unwrap());
        assert!(!engine
            .query_one(&positive(IS_BITS, TypeTerm::concrete("String")))
            .unwrap());
        assert!(!engine
            .query_one(&positive(IS_BITS, TypeTerm::concrete("Vec")))
            .unwrap());
    }

    #[test]
    fn test_bits_is_recursive_over_type_arguments() {
        // A Range is bits on its own...
        assert!(is_bits(&TypeTerm::concrete("Range")));
        // ...but a Range parameterized by a non-bits element is not
        assert!(!is_bits(&TypeTerm::parameterized(
            "Range",
            vec![TypeTerm::concrete("String")],
        )));
    }

    #[test]
    fn test_containers_report_storage_properties() {
        let engine = installed_engine();
        let vec_of_int = TypeTerm::parameterized("Vec", vec![TypeTerm::concrete("Int64")]);

        assert!(engine
            .query_one(&positive(IS_CONTIGUOUS, vec_of_int.clone()))
            .unwrap());
        assert!(engine
            .query_one(&positive(IS_ITERATOR, vec_of_int.clone()))
            .unwrap());
        assert!(engine
            .query_one(&positive(IS_INDEX_LINEAR, vec_of_int))
            .unwrap());

        let map = TypeTerm::parameterized(
            "Map",
            vec![TypeTerm::concrete("String"), TypeTerm::concrete("Int64")],
        );
        assert!(!engine.query_one(&positive(IS_CONTIGUOUS, map.clone())).unwrap());
        assert!(engine.query_one(&positive(IS_ITERATOR, map)).unwrap());
    }

    #[test]
    fn test_callables() {
        let engine = installed_engine();

        assert!(engine
            .query_one(&positive(IS_CALLABLE, TypeTerm::concrete("Closure")))
            .unwrap());
        assert!(!engine
            .query_one(&positive(IS_CALLABLE, TypeTerm::concrete("Int64")))
            .unwrap());
    }

    #[test]
    fn test_explicit_assertions_override_the_catalog() {
        let mut engine = installed_engine();

        // Pin an exception: this engine treats String as immutable bits
        engine
            .implement(
                TraitInst::new(IS_BITS, vec![TypeTerm::concrete("String")]),
                Sign::Confirmed,
            )
            .unwrap();

        assert!(engine
            .query_one(&positive(IS_BITS, TypeTerm::concrete("String")))
            .unwrap());
        // Other types still answer through the predicate
        assert!(!engine
            .query_one(&positive(IS_BITS, TypeTerm::concrete("Vec")))
            .unwrap());
    }

    #[test]
    fn test_double_install_is_a_duplicate_declaration() {
        let mut engine = installed_engine();
        let result = install(&mut engine);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_types_default_to_negated() {
        let engine = installed_engine();
        for name in PROPERTY_TRAITS {
            assert_eq!(
                engine
                    .query_one(&positive(name, TypeTerm::concrete("Mystery")))
                    .unwrap(),
                false
            );
        }
    }
}
