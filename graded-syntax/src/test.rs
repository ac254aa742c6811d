use crate::{
    Binop, Branch, Coeffect, CoeffectKind, Expr, Kind, Pattern, Spanned, Type, TypeOperator,
    TypeScheme,
};
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;
use std::rc::Rc;

fn spanned<A>(item: A) -> Spanned<A> {
    Spanned { pos: 0, item }
}

#[test]
fn render_type_1() {
    let ty = Type::mk_fun(
        Type::mk_box(Coeffect::Nat(2), Type::mk_name("Int")),
        Type::mk_list(
            Type::mk_infix(TypeOperator::Plus, Type::mk_var("n"), Type::Int(1)),
            Type::mk_var("a"),
        ),
    );
    assert_eq!(ty.render(), "Int [2] -> List (n + 1) a")
}

#[test]
fn render_type_2() {
    let ty = Type::mk_fun(
        Type::mk_fun(Type::mk_name("Int"), Type::mk_name("Int")),
        Type::mk_diamond(&["R", "W"], Type::mk_pair(Type::mk_name("Int"), Type::mk_name("Bool"))),
    );
    assert_eq!(ty.render(), "(Int -> Int) -> (Int, Bool) <R, W>")
}

#[test]
fn render_coeffect() {
    let grade = Coeffect::mk_times(
        Coeffect::mk_plus(Coeffect::mk_var("r"), Coeffect::One(CoeffectKind::Nat)),
        Coeffect::Zero(CoeffectKind::Level),
    );
    assert_eq!(grade.render(), "(r + 1) * Unused")
}

#[test]
fn render_scheme() {
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
    assert_eq!(
        scheme.render(),
        "forall (a : Type) (n : Nat). List n a -> Int"
    )
}

#[test]
fn to_coeffect_1() {
    assert_eq!(
        Type::mk_infix(TypeOperator::Plus, Type::mk_var("n"), Type::Int(1)).to_coeffect(),
        Some(Coeffect::mk_plus(Coeffect::mk_var("n"), Coeffect::Nat(1)))
    );
    assert_eq!(Type::mk_name("Int").to_coeffect(), None)
}

#[test]
fn substitute_reaches_grades() {
    let ty = Type::mk_box(
        Coeffect::mk_plus(Coeffect::mk_var("n"), Coeffect::Nat(1)),
        Type::mk_list(Type::mk_var("n"), Type::mk_var("a")),
    );
    let subst = vec![
        (Rc::from("n"), Type::Int(3)),
        (Rc::from("a"), Type::mk_name("Bool")),
    ];
    assert_eq!(
        ty.substitute(&subst),
        Type::mk_box(
            Coeffect::mk_plus(Coeffect::Nat(3), Coeffect::Nat(1)),
            Type::mk_list(Type::Int(3), Type::mk_name("Bool")),
        )
    )
}

#[test]
fn type_vars_in_order() {
    let ty = Type::mk_fun(
        Type::mk_box(Coeffect::mk_var("r"), Type::mk_var("a")),
        Type::mk_list(Type::mk_var("n"), Type::mk_var("a")),
    );
    let expected: Vec<Rc<str>> = vec![Rc::from("r"), Rc::from("a"), Rc::from("n")];
    assert_eq!(ty.vars(), expected)
}

#[quickcheck]
fn prop_closed_types_are_substitution_invariant(ty: Type) -> bool {
    ty.substitute(&[(Rc::from("a"), Type::mk_name("Int"))]) == ty
}

#[quickcheck]
fn prop_empty_substitution_is_identity(grade: Coeffect) -> bool {
    grade.substitute(&[]) == grade
}

#[test]
fn free_vars_respects_binders() {
    // \x -> case x of [y] -> f y z
    let expr = Expr::mk_lam(
        spanned("x"),
        None,
        spanned(Expr::mk_case(
            spanned(Expr::mk_var("x")),
            vec![Branch {
                pattern: spanned(Pattern::mk_box(spanned(Pattern::mk_var("y")))),
                body: spanned(Expr::mk_app(
                    spanned(Expr::mk_app(
                        spanned(Expr::mk_var("f")),
                        spanned(Expr::mk_var("y")),
                    )),
                    spanned(Expr::mk_binop(
                        Binop::Add,
                        spanned(Expr::mk_var("z")),
                        spanned(Expr::mk_var("x")),
                    )),
                )),
            }],
        )),
    );
    let expected: Vec<Rc<str>> = vec![Rc::from("f"), Rc::from("z")];
    assert_eq!(expr.free_vars(), expected)
}

#[test]
fn render_pattern() {
    let pattern = Pattern::mk_constructor(
        "Cons",
        vec![
            spanned(Pattern::mk_box(spanned(Pattern::Wildcard))),
            spanned(Pattern::mk_constructor("Nil", vec![])),
        ],
    );
    assert_eq!(pattern.render(), "Cons [_] Nil")
}

#[test]
fn definition_from_json() {
    let json = r#"{
        "name": { "pos": 0, "item": "id" },
        "patterns": [ { "pos": 3, "item": { "Var": "x" } } ],
        "body": { "pos": 7, "item": { "Var": "x" } },
        "scheme": {
            "vars": [],
            "ty": { "Fun": [ { "Name": "Int" }, { "Name": "Int" } ] }
        }
    }"#;
    let definition: crate::Definition = serde_json::from_str(json).unwrap();
    assert_eq!(definition.scheme.ty.render(), "Int -> Int");
    assert_eq!(definition.patterns[0].item, Pattern::mk_var("x"));
    assert_eq!(definition.body, Spanned { pos: 7, item: Expr::mk_var("x") })
}
