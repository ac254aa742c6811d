use super::{build_pattern_context, PatternContext};
use crate::{
    context::{Assumption, Context},
    error::{Error, ErrorInfo, LinearityInfo},
    predicate::{Constraint, Predicate},
    primitives::Primitives,
    state::{Quantifier, State},
    Env,
};
use fnv::FnvHashMap;
use graded_syntax::{
    Coeffect, CoeffectKind, Kind, Pattern, Spanned, Type, TypeOperator,
};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn with_env_and_state<A>(f: &dyn Fn(Env, &mut State) -> A) -> A {
    let primitives = Primitives::default();
    let definitions = FnvHashMap::default();
    let mut state = State::new();
    f(
        Env {
            primitives: &primitives,
            definitions: &definitions,
        },
        &mut state,
    )
}

fn int() -> Type {
    Type::mk_name("Int")
}

fn bind(bindings: Vec<(&str, Assumption)>) -> Context {
    bindings
        .into_iter()
        .map(|(var, assumption)| (Rc::from(var), assumption))
        .collect()
}

#[test]
fn variable_pattern() {
    with_env_and_state(&|env, state| {
        let expected = Ok(PatternContext {
            context: bind(vec![("x", Assumption::Linear(int()))]),
            existentials: Vec::new(),
            subst: Vec::new(),
        });
        let actual =
            build_pattern_context(env, state, &int(), &Spanned::new(0, Pattern::mk_var("x")));
        assert_eq!(expected, actual)
    })
}

#[test]
fn box_pattern_discharges() {
    with_env_and_state(&|env, state| {
        state.bind_type_variable(
            Rc::from("r"),
            Kind::Coeffect(CoeffectKind::Nat),
            Quantifier::Universal,
        );
        let grade = Coeffect::mk_var("r");
        let expected = Ok(PatternContext {
            context: bind(vec![("x", Assumption::Discharged(int(), grade.clone()))]),
            existentials: Vec::new(),
            subst: Vec::new(),
        });
        let actual = build_pattern_context(
            env,
            state,
            &Type::mk_box(grade.clone(), int()),
            &Spanned::new(0, Pattern::mk_box(Spanned::new(1, Pattern::mk_var("x")))),
        );
        assert_eq!(expected, actual)
    })
}

#[test]
fn cons_pattern_refines_length() {
    with_env_and_state(&|env, state| {
        state.bind_type_variable(
            Rc::from("n"),
            Kind::Coeffect(CoeffectKind::Nat),
            Quantifier::Universal,
        );
        let pattern = Spanned::new(
            0,
            Pattern::mk_constructor(
                "Cons",
                vec![
                    Spanned::new(5, Pattern::mk_var("x")),
                    Spanned::new(7, Pattern::mk_var("xs")),
                ],
            ),
        );
        let length = Type::mk_infix(TypeOperator::Plus, Type::mk_var("n.1"), Type::Int(1));
        let expected = Ok(PatternContext {
            context: bind(vec![
                ("x", Assumption::Linear(int())),
                (
                    "xs",
                    Assumption::Linear(Type::mk_list(Type::mk_var("n.1"), int())),
                ),
            ]),
            existentials: vec![
                (Rc::from("a.0"), Kind::Type),
                (Rc::from("n.1"), Kind::Coeffect(CoeffectKind::Nat)),
            ],
            subst: vec![(Rc::from("n"), length.clone()), (Rc::from("a.0"), int())],
        });
        let actual = build_pattern_context(
            env,
            state,
            &Type::mk_list(Type::mk_var("n"), int()),
            &pattern,
        );
        assert_eq!(expected, actual);
        assert_eq!(
            Predicate::Conj(vec![Predicate::Constraint(Constraint::eq(
                0,
                Coeffect::mk_var("n"),
                Coeffect::mk_plus(Coeffect::mk_var("n.1"), Coeffect::Nat(1)),
                CoeffectKind::Nat
            ))]),
            state.predicate()
        );
        assert_eq!(
            Some((
                &Kind::Coeffect(CoeffectKind::Nat),
                Quantifier::PatternBound
            )),
            state.lookup_type_variable("n.1")
        );
    })
}

#[test]
fn literal_pattern_mismatch() {
    with_env_and_state(&|env, state| {
        let expected = Err(Error::new(
            2,
            ErrorInfo::PatternMismatch {
                pattern: Pattern::Int(3),
                ty: Type::mk_name("Bool"),
            },
        ));
        let actual = build_pattern_context(
            env,
            state,
            &Type::mk_name("Bool"),
            &Spanned::new(2, Pattern::Int(3)),
        );
        assert_eq!(expected, actual)
    })
}

#[test]
fn pair_pattern_rejects_duplicates() {
    with_env_and_state(&|env, state| {
        let expected = Err(Error::linearity(
            0,
            vec![Rc::from("x")],
            LinearityInfo::Duplicated,
        ));
        let actual = build_pattern_context(
            env,
            state,
            &Type::mk_pair(int(), int()),
            &Spanned::new(
                0,
                Pattern::Pair(
                    Rc::new(Spanned::new(1, Pattern::mk_var("x"))),
                    Rc::new(Spanned::new(4, Pattern::mk_var("x"))),
                ),
            ),
        );
        assert_eq!(expected, actual)
    })
}

#[test]
fn unknown_constructor() {
    with_env_and_state(&|env, state| {
        let expected = Err(Error::not_in_scope(0, &Rc::from("Just")));
        let actual = build_pattern_context(
            env,
            state,
            &int(),
            &Spanned::new(0, Pattern::mk_constructor("Just", Vec::new())),
        );
        assert_eq!(expected, actual)
    })
}
