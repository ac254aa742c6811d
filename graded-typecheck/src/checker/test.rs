use super::{check, synthesize, Polarity};
use crate::{
    context::{Assumption, Context},
    error::{Error, ErrorInfo},
    predicate::{Constraint, Predicate, Relation},
    primitives::Primitives,
    state::{Quantifier, State},
    Env,
};
use fnv::FnvHashMap;
use graded_syntax::{Binop, Branch, Coeffect, CoeffectKind, Expr, Kind, Pattern, Spanned, Type};
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

fn float() -> Type {
    Type::mk_name("Float")
}

fn at(pos: usize, expr: Expr) -> Spanned<Expr> {
    Spanned::new(pos, expr)
}

#[test]
fn synthesize_cons() {
    with_env_and_state(&|env, state| {
        let expected = Type::mk_fun(
            Type::mk_var("a.2"),
            Type::mk_fun(
                Type::mk_list(Type::mk_var("n.0"), Type::mk_var("a.2")),
                Type::mk_list(Type::mk_var("m.1"), Type::mk_var("a.2")),
            ),
        );
        assert_eq!(
            Ok((expected, Context::new())),
            synthesize(
                env,
                state,
                &Context::new(),
                Polarity::Positive,
                &at(0, Expr::mk_constructor("Cons"))
            )
        );
        assert_eq!(
            Predicate::Conj(vec![Predicate::Constraint(Constraint::eq(
                0,
                Coeffect::mk_var("m.1"),
                Coeffect::mk_plus(Coeffect::mk_var("n.0"), Coeffect::Nat(1)),
                CoeffectKind::Nat
            ))]),
            state.predicate()
        );
    })
}

#[test]
fn synthesize_case_without_upper_bound() {
    with_env_and_state(&|env, state| {
        let context = Context::new().bind(&Rc::from("b"), Assumption::Linear(Type::mk_name("Bool")));
        let expr = at(
            0,
            Expr::mk_case(
                at(1, Expr::mk_var("b")),
                vec![
                    Branch {
                        pattern: Spanned::new(2, Pattern::mk_constructor("True", Vec::new())),
                        body: at(3, Expr::Int(1)),
                    },
                    Branch {
                        pattern: Spanned::new(4, Pattern::mk_constructor("False", Vec::new())),
                        body: at(5, Expr::Float(2.0)),
                    },
                ],
            ),
        );
        assert_eq!(
            Err(Error::new(
                5,
                ErrorInfo::NoUpperBound {
                    left: int(),
                    right: float()
                }
            )),
            synthesize(env, state, &context, Polarity::Positive, &expr)
        );
    })
}

#[test]
fn check_case_joins_branch_usage() {
    with_env_and_state(&|env, state| {
        let context = Context::new()
            .bind(&Rc::from("b"), Assumption::Linear(Type::mk_name("Bool")))
            .bind(&Rc::from("y"), Assumption::Linear(int()));
        let expr = at(
            0,
            Expr::mk_case(
                at(1, Expr::mk_var("b")),
                vec![
                    Branch {
                        pattern: Spanned::new(2, Pattern::mk_constructor("True", Vec::new())),
                        body: at(3, Expr::mk_var("y")),
                    },
                    Branch {
                        pattern: Spanned::new(4, Pattern::mk_constructor("False", Vec::new())),
                        body: at(5, Expr::mk_var("y")),
                    },
                ],
            ),
        );
        let (used, subst) = check(env, state, &context, Polarity::Positive, true, &int(), &expr)
            .unwrap();
        assert_eq!(
            Context::new()
                .bind(&Rc::from("y"), Assumption::Linear(int()))
                .bind(&Rc::from("b"), Assumption::Linear(Type::mk_name("Bool"))),
            used
        );
        assert_eq!(Vec::<(Rc<str>, Type)>::new(), subst);
    })
}

#[test]
fn check_promotion_scales_usage() {
    with_env_and_state(&|env, state| {
        let x = Rc::from("x");
        let context = Context::new().bind(&x, Assumption::Discharged(int(), Coeffect::Nat(2)));
        let expected = Type::mk_box(Coeffect::Nat(3), int());
        let expr = at(0, Expr::mk_promote(at(1, Expr::mk_var("x"))));
        let fresh = Coeffect::mk_var("x.0");
        assert_eq!(
            Ok((
                Context::new().bind(
                    &x,
                    Assumption::Discharged(int(), Coeffect::mk_times(Coeffect::Nat(3), fresh.clone()))
                ),
                Vec::new()
            )),
            check(env, state, &context, Polarity::Positive, false, &expected, &expr)
        );
        assert_eq!(
            Predicate::Conj(vec![Predicate::Constraint(Constraint::leq(
                0,
                Coeffect::One(CoeffectKind::Nat),
                fresh,
                CoeffectKind::Nat
            ))]),
            state.predicate()
        );
    })
}

#[test]
fn check_lambda_annotation_mismatch() {
    with_env_and_state(&|env, state| {
        let expr = at(
            0,
            Expr::mk_lam(Spanned::new(1, "x"), Some(float()), at(2, Expr::mk_var("x"))),
        );
        assert_eq!(
            Err(Error::mismatch(1, &int(), &float())),
            check(
                env,
                state,
                &Context::new(),
                Polarity::Positive,
                true,
                &Type::mk_fun(int(), int()),
                &expr
            )
        );
    })
}

#[test]
fn synthesize_let_diamond_sequences_effects() {
    with_env_and_state(&|env, state| {
        let expr = at(
            0,
            Expr::mk_let_diamond(
                Spanned::new(1, "x"),
                None,
                at(2, Expr::mk_var("readInt")),
                at(
                    3,
                    Expr::mk_app(
                        at(4, Expr::mk_var("writeInt")),
                        at(5, Expr::mk_var("x")),
                    ),
                ),
            ),
        );
        assert_eq!(
            Ok((Type::mk_diamond(&["R", "W"], Type::mk_name("Unit")), Context::new())),
            synthesize(env, state, &Context::new(), Polarity::Positive, &expr)
        );
    })
}

#[test]
fn synthesize_let_box_unused() {
    with_env_and_state(&|env, state| {
        let expr = at(
            0,
            Expr::mk_let_box(
                Spanned::new(1, "y"),
                int(),
                at(2, Expr::mk_promote(at(3, Expr::Int(1)))),
                at(4, Expr::Int(5)),
            ),
        );
        assert_eq!(
            Ok((int(), Context::new())),
            synthesize(env, state, &Context::new(), Polarity::Positive, &expr)
        );
        let kind = CoeffectKind::Var(Rc::from("k.0"));
        assert_eq!(
            Predicate::Conj(vec![Predicate::Constraint(Constraint::eq(
                1,
                Coeffect::mk_var("y.1"),
                Coeffect::Zero(kind.clone()),
                kind
            ))]),
            state.predicate()
        );
    })
}

#[test]
fn synthesize_operator_first_match() {
    with_env_and_state(&|env, state| {
        let ints = at(
            0,
            Expr::mk_binop(Binop::Add, at(1, Expr::Int(1)), at(2, Expr::Int(2))),
        );
        assert_eq!(
            Ok((int(), Context::new())),
            synthesize(env, state, &Context::new(), Polarity::Positive, &ints)
        );

        let floats = at(
            0,
            Expr::mk_binop(Binop::Lt, at(1, Expr::Float(1.0)), at(2, Expr::Float(2.0))),
        );
        assert_eq!(
            Ok((Type::mk_name("Bool"), Context::new())),
            synthesize(env, state, &Context::new(), Polarity::Positive, &floats)
        );
        assert_eq!(Predicate::Conj(Vec::new()), state.predicate());
    })
}

#[test]
fn synthesize_operator_without_candidate() {
    with_env_and_state(&|env, state| {
        let expr = at(
            0,
            Expr::mk_binop(
                Binop::Add,
                at(1, Expr::Int(1)),
                at(2, Expr::mk_constructor("True")),
            ),
        );
        assert_eq!(
            Err(Error::new(
                0,
                ErrorInfo::NoMatchingOperator {
                    op: Binop::Add,
                    left: int(),
                    right: Type::mk_name("Bool")
                }
            )),
            synthesize(env, state, &Context::new(), Polarity::Positive, &expr)
        );
    })
}

#[test]
fn synthesize_application_of_non_function() {
    with_env_and_state(&|env, state| {
        let expr = at(0, Expr::mk_app(at(1, Expr::Int(1)), at(2, Expr::Int(2))));
        assert_eq!(
            Err(Error::new(1, ErrorInfo::NotAFunction { ty: int() })),
            synthesize(env, state, &Context::new(), Polarity::Positive, &expr)
        );
    })
}

#[test]
fn check_universal_index_against_literal() {
    with_env_and_state(&|env, state| {
        state.bind_type_variable(
            Rc::from("n"),
            Kind::Coeffect(CoeffectKind::Nat),
            Quantifier::Universal,
        );
        let xs = Rc::from("xs");
        let actual_ty = Type::mk_list(Type::mk_var("n"), int());
        let context = Context::new().bind(&xs, Assumption::Linear(actual_ty.clone()));
        let expected = Type::mk_list(Type::Int(0), int());

        let used = check(
            env,
            state,
            &context,
            Polarity::Positive,
            true,
            &expected,
            &at(0, Expr::mk_var("xs")),
        )
        .map(|(used, _)| used);
        assert_eq!(Ok(Context::new().bind(&xs, Assumption::Linear(actual_ty))), used);

        // Left to the prover rather than rejected as a rigid variable.
        let predicate = state.predicate();
        let constraints: Vec<_> = predicate
            .constraints()
            .into_iter()
            .map(|constraint| {
                (
                    constraint.relation,
                    constraint.left.clone(),
                    constraint.right.clone(),
                    constraint.kind.clone(),
                )
            })
            .collect();
        assert_eq!(
            vec![(
                Relation::Eq,
                Coeffect::mk_var("n"),
                Coeffect::Nat(0),
                CoeffectKind::Nat
            )],
            constraints
        );
    })
}
