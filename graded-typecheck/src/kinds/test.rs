use super::{infer_coeffect_kind, infer_kind, kind_check, mgu_coeffect_kinds};
use crate::{
    error::{Error, ErrorInfo},
    primitives::Primitives,
    state::{Quantifier, State},
    Env,
};
use fnv::FnvHashMap;
use graded_syntax::{Coeffect, CoeffectKind, Kind, Type, TypeOperator, TypeScheme};
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

#[test]
fn mgu_1() {
    with_env_and_state(&|_, state| {
        let var = state.fresh_coeffect_kind("k");
        let expected = Ok(CoeffectKind::Float);
        let actual = mgu_coeffect_kinds(state, 0, &var, &CoeffectKind::Float);
        assert_eq!(expected, actual);
        assert_eq!(CoeffectKind::Float, state.resolve_coeffect_kind(&var));
    })
}

#[test]
fn mgu_2() {
    with_env_and_state(&|_, state| {
        let expected = Err(Error::new(
            3,
            ErrorInfo::CoeffectKindMismatch {
                expected: CoeffectKind::Nat,
                actual: CoeffectKind::Level,
            },
        ));
        let actual = mgu_coeffect_kinds(state, 3, &CoeffectKind::Nat, &CoeffectKind::Level);
        assert_eq!(expected, actual)
    })
}

#[test]
fn infer_coeffect_1() {
    with_env_and_state(&|_, state| {
        state.bind_type_variable(
            Rc::from("r"),
            Kind::Coeffect(CoeffectKind::Float),
            Quantifier::Universal,
        );
        let expected = Ok(CoeffectKind::Float);
        let actual = infer_coeffect_kind(
            state,
            0,
            &Coeffect::mk_times(Coeffect::mk_var("r"), Coeffect::Float(2.0)),
        );
        assert_eq!(expected, actual)
    })
}

#[test]
fn infer_coeffect_2() {
    with_env_and_state(&|_, state| {
        state.bind_type_variable(Rc::from("a"), Kind::Type, Quantifier::Universal);
        let expected = Err(Error::new(
            0,
            ErrorInfo::NotAGrade {
                name: Rc::from("a"),
                kind: Kind::Type,
            },
        ));
        let actual = infer_coeffect_kind(state, 0, &Coeffect::mk_var("a"));
        assert_eq!(expected, actual)
    })
}

#[test]
fn infer_kind_1() {
    with_env_and_state(&|env, state| {
        state.bind_type_variable(
            Rc::from("n"),
            Kind::Coeffect(CoeffectKind::Nat),
            Quantifier::Universal,
        );
        let expected = Ok(Kind::Type);
        let actual = infer_kind(
            env,
            state,
            0,
            &Type::mk_list(
                Type::mk_infix(TypeOperator::Plus, Type::mk_var("n"), Type::Int(1)),
                Type::mk_name("Int"),
            ),
        );
        assert_eq!(expected, actual)
    })
}

#[test]
fn infer_kind_2() {
    with_env_and_state(&|env, state| {
        let expected = Err(Error::new(
            0,
            ErrorInfo::KindMismatch {
                expected: Kind::Coeffect(CoeffectKind::Nat),
                actual: Kind::Type,
            },
        ));
        let actual = infer_kind(
            env,
            state,
            0,
            &Type::mk_list(Type::mk_name("Bool"), Type::mk_name("Int")),
        );
        assert_eq!(expected, actual)
    })
}

#[test]
fn infer_kind_3() {
    with_env_and_state(&|env, state| {
        let expected = Err(Error::not_in_scope(0, &Rc::from("Maybe")));
        let actual = infer_kind(env, state, 0, &Type::mk_name("Maybe"));
        assert_eq!(expected, actual)
    })
}

#[test]
fn kind_check_1() {
    with_env_and_state(&|env, state| {
        let scheme = TypeScheme {
            vars: vec![
                (Rc::from("a"), Kind::Type),
                (Rc::from("n"), Kind::Coeffect(CoeffectKind::Nat)),
            ],
            ty: Type::mk_fun(
                Type::mk_list(Type::mk_var("n"), Type::mk_var("a")),
                Type::mk_name("Int"),
            ),
        };
        assert_eq!(Ok(()), kind_check(env, state, 0, &scheme));
        assert_eq!(None, state.lookup_type_variable("a"));
    })
}

#[test]
fn kind_check_2() {
    with_env_and_state(&|env, state| {
        let scheme = TypeScheme::mono(Type::mk_fun(Type::mk_var("a"), Type::mk_var("a")));
        let expected = Err(Error::new(
            5,
            ErrorInfo::UnboundTypeVariable {
                name: Rc::from("a"),
            },
        ));
        assert_eq!(expected, kind_check(env, state, 5, &scheme));
    })
}
