//! Dispatch rewriting end to end: trait-conditioned functions route every
//! call through the classifier's verdict, and redeclaration replaces rather
//! than duplicates

use super::Value;
use crate::dispatch::{BranchBody, DefineOutcome, FnDecl, ParamSpec};
use crate::engine::TraitEngine;
use crate::error::{DispatchError, EngineError, QueryError};
use crate::types::{Sign, TraitBound, TraitInst, TypeTerm};
use pretty_assertions::assert_eq;

fn nice_over(var: &str) -> TraitBound {
    TraitBound::Positive(TraitInst::new("Nice", vec![TypeTerm::variable(var)]))
}

fn greet_decl(var: &str, bound: TraitBound) -> FnDecl {
    FnDecl::new("greet")
        .type_param(var)
        .constraint(bound)
        .param(ParamSpec::shaped("x", TypeTerm::variable(var)))
}

/// Engine with `Nice<Int64>` confirmed and both greet branches installed
fn greeting_engine() -> TraitEngine<Value> {
    let mut engine = TraitEngine::new();
    engine.declare_trait("Nice", 1, vec![]).unwrap();
    engine
        .implement_positive(TraitInst::new("Nice", vec![TypeTerm::concrete("Int64")]))
        .unwrap();

    engine
        .define_fn(
            greet_decl("X", nice_over("X")),
            BranchBody::expr(|_| Value::str("nice")),
        )
        .unwrap();
    engine
        .define_fn(
            greet_decl("X", nice_over("X").negate()),
            BranchBody::expr(|_| Value::str("not nice")),
        )
        .unwrap();
    engine
}

#[test]
fn test_two_branch_dispatch_is_exhaustive() {
    let engine = greeting_engine();

    // Confirmed types route to the positive branch
    assert_eq!(
        engine.call(&[], "greet", &[Value::Int(5)]).unwrap(),
        Value::str("nice")
    );
    // Negated types route to the negative branch; there is no third outcome
    assert_eq!(
        engine.call(&[], "greet", &[Value::Float(5.0)]).unwrap(),
        Value::str("not nice")
    );
    assert_eq!(
        engine.call(&[], "greet", &[Value::str("hello")]).unwrap(),
        Value::str("not nice")
    );
}

#[test]
fn test_redeclaration_replaces_the_branch() {
    let mut engine = greeting_engine();
    assert_eq!(engine.dispatch().len(), 1);

    let outcome = engine
        .define_fn(
            greet_decl("X", nice_over("X")),
            BranchBody::expr(|_| Value::str("very nice")),
        )
        .unwrap();
    assert_eq!(outcome, DefineOutcome::BranchReplaced);

    // Still one site, and the new body answers
    assert_eq!(engine.dispatch().len(), 1);
    assert_eq!(
        engine.call(&[], "greet", &[Value::Int(5)]).unwrap(),
        Value::str("very nice")
    );
    // The sibling branch survives the replacement
    assert_eq!(
        engine.call(&[], "greet", &[Value::Float(5.0)]).unwrap(),
        Value::str("not nice")
    );
}

#[test]
fn test_alpha_renamed_redeclaration_lands_on_the_same_site() {
    let mut engine = greeting_engine();

    let outcome = engine
        .define_fn(
            greet_decl("Y", nice_over("Y")),
            BranchBody::expr(|_| Value::str("renamed")),
        )
        .unwrap();
    assert_eq!(outcome, DefineOutcome::BranchReplaced);
    assert_eq!(engine.dispatch().len(), 1);
    assert_eq!(
        engine.call(&[], "greet", &[Value::Int(5)]).unwrap(),
        Value::str("renamed")
    );
}

#[test]
fn test_inline_surface_form_dispatches_like_the_listed_form() {
    let mut engine = TraitEngine::new();
    engine.declare_trait("Nice", 1, vec![]).unwrap();
    engine
        .implement_positive(TraitInst::new("Nice", vec![TypeTerm::concrete("Int64")]))
        .unwrap();

    engine
        .define_fn(
            FnDecl::new("greet").param(ParamSpec::bound("x", "Nice")),
            BranchBody::expr(|_| Value::str("nice")),
        )
        .unwrap();
    engine
        .define_fn(
            FnDecl::new("greet").param(ParamSpec::bound_negated("x", "Nice")),
            BranchBody::expr(|_| Value::str("not nice")),
        )
        .unwrap();

    assert_eq!(engine.dispatch().len(), 1);
    assert_eq!(
        engine.call(&[], "greet", &[Value::Int(5)]).unwrap(),
        Value::str("nice")
    );
    assert_eq!(
        engine.call(&[], "greet", &[Value::Float(5.0)]).unwrap(),
        Value::str("not nice")
    );
}

#[test]
fn test_single_branch_site_rejects_the_other_sign() {
    let mut engine = TraitEngine::new();
    engine.declare_trait("Nice", 1, vec![]).unwrap();
    engine
        .implement_positive(TraitInst::new("Nice", vec![TypeTerm::concrete("Int64")]))
        .unwrap();
    engine
        .define_fn(
            greet_decl("X", nice_over("X")),
            BranchBody::expr(|_| Value::str("nice")),
        )
        .unwrap();

    let result = engine.call(&[], "greet", &[Value::Float(5.0)]);
    assert!(matches!(
        result,
        Err(EngineError::Dispatch(DispatchError::NoMatchingBranch {
            sign: Sign::Negated,
            ..
        }))
    ));
}

#[test]
fn test_declaring_against_an_undeclared_trait_fails() {
    let mut engine: TraitEngine<Value> = TraitEngine::new();
    let result = engine.define_fn(
        greet_decl("X", TraitBound::Positive(TraitInst::new(
            "Ghost",
            vec![TypeTerm::variable("X")],
        ))),
        BranchBody::expr(|_| Value::Int(0)),
    );

    assert!(matches!(
        result,
        Err(EngineError::Query(QueryError::NotATrait { ref name })) if name == "Ghost"
    ));
}

#[test]
fn test_scoped_sites_are_distinct() {
    let mut engine = TraitEngine::new();
    engine.declare_trait("Nice", 1, vec![]).unwrap();
    engine
        .implement_positive(TraitInst::new("Nice", vec![TypeTerm::concrete("Int64")]))
        .unwrap();

    engine
        .define_fn(
            greet_decl("X", nice_over("X")).in_scope(&["alpha"]),
            BranchBody::expr(|_| Value::str("from alpha")),
        )
        .unwrap();
    engine
        .define_fn(
            greet_decl("X", nice_over("X")).in_scope(&["beta"]),
            BranchBody::expr(|_| Value::str("from beta")),
        )
        .unwrap();

    assert_eq!(engine.dispatch().len(), 2);
    assert_eq!(
        engine.call(&["alpha"], "greet", &[Value::Int(1)]).unwrap(),
        Value::str("from alpha")
    );
    assert_eq!(
        engine.call(&["beta"], "greet", &[Value::Int(1)]).unwrap(),
        Value::str("from beta")
    );

    let unknown = engine.call(&["gamma"], "greet", &[Value::Int(1)]);
    assert!(matches!(
        unknown,
        Err(EngineError::Dispatch(DispatchError::UnknownFunction { .. }))
    ));
}

#[test]
fn test_mismatched_arguments_report_signature_mismatch() {
    let engine = greeting_engine();

    let result = engine.call(&[], "greet", &[Value::Int(1), Value::Int(2)]);
    assert!(matches!(
        result,
        Err(EngineError::Dispatch(DispatchError::SignatureMismatch { .. }))
    ));
}

#[test]
fn test_dispatch_reads_classifier_state_at_call_time() {
    let mut engine = greeting_engine();

    assert_eq!(
        engine.call(&[], "greet", &[Value::Float(5.0)]).unwrap(),
        Value::str("not nice")
    );

    // A later assertion flips the verdict for subsequent calls
    engine
        .implement_positive(TraitInst::new("Nice", vec![TypeTerm::concrete("Float64")]))
        .unwrap();
    assert_eq!(
        engine.call(&[], "greet", &[Value::Float(5.0)]).unwrap(),
        Value::str("nice")
    );
}

#[test]
fn test_parameterized_shapes_participate_in_binding() {
    let mut engine = TraitEngine::new();
    engine.declare_trait("Nice", 1, vec![]).unwrap();
    engine
        .implement_positive(TraitInst::new("Nice", vec![TypeTerm::concrete("Int64")]))
        .unwrap();

    // first(xs: Vec<X>) with Nice<X>: the trait parameter binds through
    // the container's element type
    engine
        .define_fn(
            FnDecl::new("first")
                .type_param("X")
                .constraint(nice_over("X"))
                .param(ParamSpec::shaped(
                    "xs",
                    TypeTerm::parameterized("Vec", vec![TypeTerm::variable("X")]),
                )),
            BranchBody::expr(|args| match &args[0] {
                Value::List(items) => items[0].clone(),
                other => other.clone(),
            }),
        )
        .unwrap();
    engine
        .define_fn(
            FnDecl::new("first")
                .type_param("X")
                .constraint(nice_over("X").negate())
                .param(ParamSpec::shaped(
                    "xs",
                    TypeTerm::parameterized("Vec", vec![TypeTerm::variable("X")]),
                )),
            BranchBody::expr(|_| Value::str("element type is not nice")),
        )
        .unwrap();

    assert_eq!(
        engine
            .call(&[], "first", &[Value::List(vec![Value::Int(7), Value::Int(8)])])
            .unwrap(),
        Value::Int(7)
    );
    assert_eq!(
        engine
            .call(&[], "first", &[Value::List(vec![Value::Float(1.0)])])
            .unwrap(),
        Value::str("element type is not nice")
    );
}
