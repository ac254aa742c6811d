use super::{
    bounded::BoundedProver,
    compile, evaluate, is_trivially_false,
    smt::{interpret, render_script, SmtProver},
    Formula, Prover, Query, Value, Verdict,
};
use crate::{
    predicate::{Constraint, Predicate},
    state::Quantifier,
};
use graded_syntax::{Coeffect, CoeffectKind, Kind, Level};
use pretty_assertions::assert_eq;
use std::{path::PathBuf, rc::Rc};

fn nat_leq(left: Coeffect, right: Coeffect) -> Predicate {
    Predicate::Constraint(Constraint::leq(0, left, right, CoeffectKind::Nat))
}

fn nat_eq(left: Coeffect, right: Coeffect) -> Predicate {
    Predicate::Constraint(Constraint::eq(0, left, right, CoeffectKind::Nat))
}

fn var(name: &str, kind: CoeffectKind, quantifier: Quantifier) -> (Rc<str>, CoeffectKind, Quantifier) {
    (Rc::from(name), kind, quantifier)
}

fn plus_one(name: &str) -> Coeffect {
    Coeffect::mk_plus(Coeffect::mk_var(name), Coeffect::Nat(1))
}

#[test]
fn compile_places_quantifiers() {
    let predicate = Predicate::Conj(vec![
        nat_leq(Coeffect::mk_var("r"), Coeffect::Nat(3)),
        Predicate::mk_impl(
            vec![(Rc::from("p"), Kind::Coeffect(CoeffectKind::Nat))],
            Predicate::Conj(vec![nat_eq(Coeffect::mk_var("n"), plus_one("p"))]),
            Predicate::Conj(vec![nat_leq(Coeffect::mk_var("e"), Coeffect::mk_var("p"))]),
        ),
    ]);
    let vars = vec![
        var("r", CoeffectKind::Nat, Quantifier::Universal),
        var("n", CoeffectKind::Nat, Quantifier::Universal),
        var("p", CoeffectKind::Nat, Quantifier::PatternBound),
        var("e", CoeffectKind::Nat, Quantifier::Instantiated),
        var("unused", CoeffectKind::Nat, Quantifier::Instantiated),
    ];
    let atom = |predicate: Predicate| match predicate {
        Predicate::Constraint(constraint) => Formula::Atom(constraint),
        _ => unreachable!(),
    };
    let expected = Query {
        universals: vec![
            (Rc::from("r"), CoeffectKind::Nat),
            (Rc::from("n"), CoeffectKind::Nat),
        ],
        body: Formula::And(vec![
            atom(nat_leq(Coeffect::mk_var("r"), Coeffect::Nat(3))),
            Formula::Forall(
                vec![(Rc::from("p"), CoeffectKind::Nat)],
                Rc::new(Formula::Implies(
                    Rc::new(Formula::And(vec![atom(nat_eq(
                        Coeffect::mk_var("n"),
                        plus_one("p"),
                    ))])),
                    Rc::new(Formula::Exists(
                        vec![(Rc::from("e"), CoeffectKind::Nat)],
                        Rc::new(Formula::And(vec![atom(nat_leq(
                            Coeffect::mk_var("e"),
                            Coeffect::mk_var("p"),
                        ))])),
                    )),
                )),
            ),
        ]),
    };
    assert_eq!(expected, compile(&predicate, &vars))
}

#[test]
fn existential_shared_across_branches_stays_outside() {
    let branch = |bound: &str| {
        Predicate::mk_impl(
            vec![(Rc::from(bound), Kind::Coeffect(CoeffectKind::Nat))],
            Predicate::Conj(Vec::new()),
            Predicate::Conj(vec![nat_leq(Coeffect::mk_var(bound), Coeffect::mk_var("j"))]),
        )
    };
    let predicate = Predicate::Conj(vec![branch("a"), branch("b")]);
    let vars = vec![
        var("a", CoeffectKind::Nat, Quantifier::PatternBound),
        var("b", CoeffectKind::Nat, Quantifier::PatternBound),
        var("j", CoeffectKind::Nat, Quantifier::Instantiated),
    ];
    let query = compile(&predicate, &vars);
    assert_eq!(Vec::<(Rc<str>, CoeffectKind)>::new(), query.universals);
    match query.body {
        Formula::Exists(vars, _) => {
            assert_eq!(vec![(Rc::from("j"), CoeffectKind::Nat)], vars)
        }
        other => panic!("expected an existential, got {}", other.render()),
    }
}

#[test]
fn bounded_valid() {
    let mut prover = BoundedProver::default();
    let predicate = Predicate::Conj(vec![nat_leq(Coeffect::Nat(2), Coeffect::Nat(3))]);
    assert_eq!(Verdict::Valid, prover.solve(&predicate, &[]))
}

#[test]
fn bounded_counterexample() {
    let mut prover = BoundedProver::default();
    let predicate = Predicate::Conj(vec![nat_leq(Coeffect::mk_var("r"), Coeffect::Nat(3))]);
    let vars = vec![var("r", CoeffectKind::Nat, Quantifier::Universal)];
    assert_eq!(
        Verdict::Invalid(vec![(Rc::from("r"), Value::Nat(4))]),
        prover.solve(&predicate, &vars)
    )
}

#[test]
fn bounded_solves_existentials_by_equation() {
    let mut prover = BoundedProver {
        nat_bound: 3,
        ..BoundedProver::default()
    };
    let predicate = Predicate::Conj(vec![
        nat_eq(Coeffect::mk_var("m"), Coeffect::Nat(40)),
        nat_leq(Coeffect::Nat(39), Coeffect::mk_var("m")),
    ]);
    let vars = vec![var("m", CoeffectKind::Nat, Quantifier::Instantiated)];
    assert_eq!(Verdict::Valid, prover.solve(&predicate, &vars))
}

#[test]
fn bounded_universal_nat_is_inconclusive() {
    let mut prover = BoundedProver {
        nat_bound: 3,
        ..BoundedProver::default()
    };
    let predicate = Predicate::Conj(vec![
        nat_eq(Coeffect::mk_var("m"), plus_one("n")),
        nat_leq(plus_one("n"), Coeffect::mk_var("m")),
    ]);
    let vars = vec![
        var("n", CoeffectKind::Nat, Quantifier::Universal),
        var("m", CoeffectKind::Nat, Quantifier::Instantiated),
    ];
    assert_eq!(
        Verdict::Error(String::from(
            "bounded search inconclusive: no counterexample with naturals up to 3"
        )),
        prover.solve(&predicate, &vars)
    )
}

#[test]
fn bounded_counterexample_above_bound() {
    let mut prover = BoundedProver::default();
    let predicate = Predicate::Conj(vec![nat_leq(Coeffect::mk_var("n"), Coeffect::Nat(9))]);
    let vars = vec![var("n", CoeffectKind::Nat, Quantifier::Universal)];
    assert!(matches!(
        prover.solve(&predicate, &vars),
        Verdict::Error(_)
    ))
}

#[test]
fn bounded_implication() {
    let mut prover = BoundedProver::default();
    let vars = vec![
        var("n", CoeffectKind::Nat, Quantifier::Universal),
        var("p", CoeffectKind::Nat, Quantifier::PatternBound),
    ];
    let implication = |consequent| {
        Predicate::Conj(vec![Predicate::mk_impl(
            vec![(Rc::from("p"), Kind::Coeffect(CoeffectKind::Nat))],
            Predicate::Conj(vec![nat_eq(Coeffect::mk_var("n"), plus_one("p"))]),
            Predicate::Conj(vec![consequent]),
        )])
    };
    assert!(matches!(
        prover.solve(
            &implication(nat_leq(Coeffect::mk_var("p"), Coeffect::mk_var("n"))),
            &vars
        ),
        Verdict::Error(_)
    ));
    assert_eq!(
        Verdict::Invalid(vec![(Rc::from("n"), Value::Nat(1))]),
        prover.solve(
            &implication(nat_leq(Coeffect::mk_var("n"), Coeffect::mk_var("p"))),
            &vars
        )
    );
}

#[test]
fn bounded_levels() {
    let mut prover = BoundedProver::default();
    let vars = vec![var("l", CoeffectKind::Level, Quantifier::Universal)];
    let level = |left, right| {
        Predicate::Conj(vec![Predicate::Constraint(Constraint::leq(
            0,
            left,
            right,
            CoeffectKind::Level,
        ))])
    };
    assert_eq!(
        Verdict::Valid,
        prover.solve(
            &level(
                Coeffect::Level(Level::Public),
                Coeffect::mk_plus(Coeffect::mk_var("l"), Coeffect::One(CoeffectKind::Level)),
            ),
            &vars
        )
    );
    assert_eq!(
        Verdict::Invalid(vec![(Rc::from("l"), Value::Level(Level::Unused))]),
        prover.solve(
            &level(Coeffect::Level(Level::Private), Coeffect::mk_var("l")),
            &vars
        )
    );
}

#[test]
fn bounded_floats() {
    let mut prover = BoundedProver::default();
    let vars = vec![var("r", CoeffectKind::Float, Quantifier::Universal)];
    let predicate = Predicate::Conj(vec![Predicate::Constraint(Constraint::leq(
        0,
        Coeffect::mk_times(Coeffect::mk_var("r"), Coeffect::Float(2.0)),
        Coeffect::Float(4.0),
        CoeffectKind::Float,
    ))]);
    assert_eq!(
        Verdict::Invalid(vec![(Rc::from("r"), Value::Float(2.5))]),
        prover.solve(&predicate, &vars)
    )
}

#[test]
fn bounded_search_limit() {
    let mut prover = BoundedProver {
        search_limit: 3,
        ..BoundedProver::default()
    };
    let vars = vec![var("r", CoeffectKind::Nat, Quantifier::Universal)];
    let predicate = Predicate::Conj(vec![nat_leq(Coeffect::mk_var("r"), Coeffect::Nat(100))]);
    assert!(matches!(
        prover.solve(&predicate, &vars),
        Verdict::Error(_)
    ))
}

#[test]
fn level_times_unused_absorbs() {
    let grade = Coeffect::mk_times(
        Coeffect::Level(Level::Private),
        Coeffect::Zero(CoeffectKind::Level),
    );
    assert_eq!(
        Ok(Value::Level(Level::Unused)),
        evaluate(&CoeffectKind::Level, &grade, &[])
    )
}

#[test]
fn trivially_false() {
    assert!(is_trivially_false(&Constraint::leq(
        0,
        Coeffect::Nat(3),
        Coeffect::Nat(2),
        CoeffectKind::Nat
    )));
    assert!(!is_trivially_false(&Constraint::leq(
        0,
        Coeffect::mk_var("r"),
        Coeffect::Nat(2),
        CoeffectKind::Nat
    )));
}

fn single_universal_query() -> Query {
    compile(
        &Predicate::Conj(vec![nat_leq(Coeffect::mk_var("r"), Coeffect::Nat(3))]),
        &[var("r", CoeffectKind::Nat, Quantifier::Universal)],
    )
}

#[test]
fn smt_script() {
    let expected = "(declare-const |r| Int)\n\
                    (assert (>= |r| 0))\n\
                    (assert (not (and (<= |r| 3))))\n\
                    (check-sat)\n\
                    (get-value (|r|))\n";
    assert_eq!(expected, render_script(&single_universal_query()))
}

#[test]
fn smt_answers() {
    let query = single_universal_query();
    assert_eq!(
        Verdict::Invalid(vec![(Rc::from("r"), Value::Nat(4))]),
        interpret(&query, "sat\n((|r| 4))\n")
    );
    assert_eq!(
        Verdict::Valid,
        interpret(&query, "unsat\n(error \"model is not available\")\n")
    );
    assert_eq!(
        Verdict::Error(String::from("solver answered \"unknown\"")),
        interpret(&query, "unknown\n")
    );
}

#[test]
fn smt_missing_solver() {
    let mut prover = SmtProver {
        command: PathBuf::from("/nonexistent/graded-z3"),
        timeout: None,
    };
    let predicate = Predicate::Conj(vec![nat_leq(Coeffect::Nat(2), Coeffect::Nat(3))]);
    assert!(matches!(prover.solve(&predicate, &[]), Verdict::Error(_)))
}

#[test]
fn smt_solver_exiting_early_is_reaped() {
    let mut prover = SmtProver {
        command: PathBuf::from("/bin/echo"),
        timeout: None,
    };
    // Large enough to overflow the pipe buffer of a process that never reads it.
    let predicate = Predicate::Conj(
        (0..20_000)
            .map(|n| nat_leq(Coeffect::mk_var("r"), Coeffect::Nat(n)))
            .collect(),
    );
    let vars = vec![var("r", CoeffectKind::Nat, Quantifier::Universal)];
    assert_eq!(
        Verdict::Error(String::from("solver answered \"-in -smt2\"")),
        prover.solve(&predicate, &vars)
    )
}
