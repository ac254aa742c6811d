//! Type equality, approximation and joins.
//!
//! Comparing two types yields whether they agree, the left type with any
//! solved variables, and the substitution that was learned. Grades are never
//! compared structurally. Comparing boxes emits a constraint between their
//! grades instead, which is discharged later.


use crate::{
    error::{Error, ErrorInfo},
    kinds,
    predicate::{Constraint, Relation},
    state::{Quantifier, State},
    Env,
};
use graded_syntax::{Coeffect, Kind, Substitution, Type};
use std::rc::Rc;

pub type Unified = (bool, Type, Substitution);

/// Strict equality: box grades must be equal.
pub fn equal(
    env: Env,
    state: &mut State,
    pos: usize,
    left: &Type,
    right: &Type,
) -> Result<Unified, Error> {
    relate(env, state, pos, Relation::Eq, left, right)
}

/// Approximation: `left`'s box grades must be approximated by `right`'s.
pub fn approx(
    env: Env,
    state: &mut State,
    pos: usize,
    left: &Type,
    right: &Type,
) -> Result<Unified, Error> {
    relate(env, state, pos, Relation::Leq, left, right)
}

/// Merge two substitutions. A variable bound by both must be bound to equal types.
pub fn combine_substitutions(
    env: Env,
    state: &mut State,
    pos: usize,
    mut first: Substitution,
    second: Substitution,
) -> Result<Substitution, Error> {
    for (var, ty) in second {
        let existing = first
            .iter()
            .find(|(other, _)| *other == var)
            .map(|(_, existing)| existing.clone());
        match existing {
            None => first.push((var, ty)),
            Some(existing) => {
                let (equal, _, _) = equal(env, state, pos, &existing, &ty)?;
                if !equal {
                    return Err(Error::mismatch(pos, &existing, &ty));
                }
            }
        }
    }
    Ok(first)
}

pub fn relate(
    env: Env,
    state: &mut State,
    pos: usize,
    relation: Relation,
    left: &Type,
    right: &Type,
) -> Result<Unified, Error> {
    tracing::trace!(
        left = %left.render(),
        right = %right.render(),
        relation = relation.render(),
        "comparing types"
    );
    match (left, right) {
        (Type::Fun(left_arg, left_result), Type::Fun(right_arg, right_result)) => {
            let (args_equal, _, arg_subst) =
                relate(env, state, pos, Relation::Leq, right_arg, left_arg)?;
            let left_result = left_result.substitute(&arg_subst);
            let right_result = right_result.substitute(&arg_subst);
            let (results_equal, _, result_subst) =
                relate(env, state, pos, relation, &left_result, &right_result)?;
            let subst = combine_substitutions(env, state, pos, arg_subst, result_subst)?;
            Ok((
                args_equal && results_equal,
                Type::mk_fun(left_arg.as_ref().clone(), left_result),
                subst,
            ))
        }
        (Type::Name(left_name), Type::Name(right_name)) => {
            Ok((left_name == right_name, left.clone(), Vec::new()))
        }
        (Type::Diamond(left_effects, left_ty), Type::Diamond(right_effects, right_ty)) => {
            let (equal, ty, subst) = relate(env, state, pos, relation, left_ty, right_ty)?;
            if right_effects.starts_with(left_effects) {
                Ok((equal, Type::Diamond(left_effects.clone(), Rc::new(ty)), subst))
            } else {
                Err(Error::new(
                    pos,
                    ErrorInfo::EffectMismatch {
                        expected: right_effects.clone(),
                        actual: left_effects.clone(),
                    },
                ))
            }
        }
        (Type::Box(left_grade, left_ty), Type::Box(right_grade, right_ty)) => {
            let left_kind = kinds::infer_coeffect_kind(state, pos, left_grade)?;
            let right_kind = kinds::infer_coeffect_kind(state, pos, right_grade)?;
            let kind = kinds::mgu_coeffect_kinds(state, pos, &left_kind, &right_kind)?;
            state.add_constraint(Constraint {
                pos,
                relation,
                left: left_grade.clone(),
                right: right_grade.clone(),
                kind,
            });
            let (equal, ty, subst) = relate(env, state, pos, Relation::Eq, left_ty, right_ty)?;
            Ok((equal, Type::mk_box(left_grade.clone(), ty), subst))
        }
        (Type::App(left_a, left_b), Type::App(right_a, right_b)) => {
            let (a_equal, a, b, b_equal, subst) =
                relate_pairwise(env, state, pos, relation, (left_a, left_b), (right_a, right_b))?;
            Ok((a_equal && b_equal, Type::mk_app(a, b), subst))
        }
        (Type::Pair(left_a, left_b), Type::Pair(right_a, right_b)) => {
            let (a_equal, a, b, b_equal, subst) =
                relate_pairwise(env, state, pos, relation, (left_a, left_b), (right_a, right_b))?;
            Ok((a_equal && b_equal, Type::mk_pair(a, b), subst))
        }
        (Type::Var(left_name), Type::Var(right_name)) if left_name == right_name => {
            match state.lookup_type_variable(left_name) {
                Some(_) => Ok((true, left.clone(), Vec::new())),
                None => Err(Error::new(
                    pos,
                    ErrorInfo::UnboundTypeVariable {
                        name: left_name.clone(),
                    },
                )),
            }
        }
        (Type::Var(left_name), Type::Var(right_name)) => {
            unify_variables(state, pos, left_name, right_name)
        }
        (Type::Var(name), _) => unify_variable(env, state, pos, name, right, left),
        (_, Type::Var(name)) => unify_variable(env, state, pos, name, left, left),
        _ => relate_indices(env, state, pos, left, right),
    }
}

#[allow(clippy::type_complexity)]
fn relate_pairwise(
    env: Env,
    state: &mut State,
    pos: usize,
    relation: Relation,
    (left_a, left_b): (&Rc<Type>, &Rc<Type>),
    (right_a, right_b): (&Rc<Type>, &Rc<Type>),
) -> Result<(bool, Type, Type, bool, Substitution), Error> {
    let (a_equal, a, a_subst) = relate(env, state, pos, relation, left_a, right_a)?;
    let left_b = left_b.substitute(&a_subst);
    let right_b = right_b.substitute(&a_subst);
    let (b_equal, b, b_subst) = relate(env, state, pos, relation, &left_b, &right_b)?;
    let subst = combine_substitutions(env, state, pos, a_subst, b_subst)?;
    Ok((a_equal, a, b, b_equal, subst))
}

fn lookup_variable(state: &State, pos: usize, name: &Rc<str>) -> Result<(Kind, Quantifier), Error> {
    match state.lookup_type_variable(name) {
        Some((kind, quantifier)) => Ok((kind.clone(), quantifier)),
        None => Err(Error::new(
            pos,
            ErrorInfo::UnboundTypeVariable { name: name.clone() },
        )),
    }
}

/// Two distinct variables. Universal variables are never solved.
fn unify_variables(
    state: &mut State,
    pos: usize,
    left: &Rc<str>,
    right: &Rc<str>,
) -> Result<Unified, Error> {
    let (left_kind, left_quantifier) = lookup_variable(state, pos, left)?;
    let (right_kind, right_quantifier) = lookup_variable(state, pos, right)?;

    let (kept, solved) = match (left_quantifier, right_quantifier) {
        (Quantifier::Universal, Quantifier::Universal) => {
            return Ok((false, Type::Var(left.clone()), Vec::new()))
        }
        (_, Quantifier::Universal) => (right, left),
        _ => (left, right),
    };

    match (&left_kind, &right_kind) {
        (Kind::Coeffect(left_kind), Kind::Coeffect(right_kind)) => {
            let kind = kinds::mgu_coeffect_kinds(state, pos, left_kind, right_kind)?;
            state.add_constraint(Constraint::eq(
                pos,
                Coeffect::Var(kept.clone()),
                Coeffect::Var(solved.clone()),
                kind,
            ));
        }
        _ => {
            kinds::unify_kinds(state, pos, &left_kind, &right_kind)?;
        }
    }

    Ok((
        true,
        Type::Var(left.clone()),
        vec![(solved.clone(), Type::Var(kept.clone()))],
    ))
}

/**
A variable against a type that is not a variable.

Instantiated and pattern-bound variables are solved. A universal variable only
unifies when it is a type-level index, by constraining it to equal the index
expression; anything else would make a caller-supplied type concrete.
*/
fn unify_variable(
    env: Env,
    state: &mut State,
    pos: usize,
    name: &Rc<str>,
    ty: &Type,
    left: &Type,
) -> Result<Unified, Error> {
    let (var_kind, quantifier) = lookup_variable(state, pos, name)?;
    let ty_kind = kinds::infer_kind(env, state, pos, ty)?;

    match (quantifier, &var_kind, &ty_kind) {
        (_, Kind::Coeffect(var_kind), Kind::Coeffect(ty_kind)) => {
            let kind = kinds::mgu_coeffect_kinds(state, pos, var_kind, ty_kind)?;
            match ty.to_coeffect() {
                Some(grade) => state.add_constraint(Constraint::eq(
                    pos,
                    Coeffect::Var(name.clone()),
                    grade,
                    kind,
                )),
                None => {
                    return Err(Error::new(
                        pos,
                        ErrorInfo::RigidTypeVariable {
                            name: name.clone(),
                            ty: ty.clone(),
                        },
                    ))
                }
            }
        }
        (Quantifier::Universal, _, _) => {
            return Err(Error::new(
                pos,
                ErrorInfo::RigidTypeVariable {
                    name: name.clone(),
                    ty: ty.clone(),
                },
            ))
        }
        (Quantifier::Instantiated, _, _) | (Quantifier::PatternBound, _, _) => {
            kinds::unify_kinds(state, pos, &var_kind, &ty_kind)?;
        }
    }

    Ok((true, left.clone(), vec![(name.clone(), ty.clone())]))
}

/// No structural rule applies: compare type-level indices by constraint.
fn relate_indices(
    env: Env,
    state: &mut State,
    pos: usize,
    left: &Type,
    right: &Type,
) -> Result<Unified, Error> {
    let left_kind = kinds::infer_kind(env, state, pos, left)?;
    let right_kind = kinds::infer_kind(env, state, pos, right)?;
    match (
        &left_kind,
        &right_kind,
        left.to_coeffect(),
        right.to_coeffect(),
    ) {
        (
            Kind::Coeffect(left_kind),
            Kind::Coeffect(right_kind),
            Some(left_grade),
            Some(right_grade),
        ) => {
            let kind = kinds::mgu_coeffect_kinds(state, pos, left_kind, right_kind)?;
            state.add_constraint(Constraint::eq(pos, left_grade, right_grade, kind));
            Ok((true, left.clone(), Vec::new()))
        }
        _ => Err(Error::mismatch(pos, right, left)),
    }
}

fn no_upper_bound(pos: usize, left: &Type, right: &Type) -> Error {
    Error::new(
        pos,
        ErrorInfo::NoUpperBound {
            left: left.clone(),
            right: right.clone(),
        },
    )
}

/// The least upper bound of two branch types.
pub fn join(
    env: Env,
    state: &mut State,
    pos: usize,
    left: &Type,
    right: &Type,
) -> Result<Type, Error> {
    match (left, right) {
        (Type::Fun(left_arg, left_result), Type::Fun(right_arg, right_result)) => {
            let arg = join(env, state, pos, right_arg, left_arg)?;
            let result = join(env, state, pos, left_result, right_result)?;
            Ok(Type::mk_fun(arg, result))
        }
        (Type::Name(left_name), Type::Name(right_name)) => {
            if left_name == right_name {
                Ok(left.clone())
            } else {
                Err(no_upper_bound(pos, left, right))
            }
        }
        (Type::Diamond(left_effects, left_ty), Type::Diamond(right_effects, right_ty)) => {
            let ty = join(env, state, pos, left_ty, right_ty)?;
            if right_effects.starts_with(left_effects) {
                Ok(Type::Diamond(right_effects.clone(), Rc::new(ty)))
            } else if left_effects.starts_with(right_effects) {
                Ok(Type::Diamond(left_effects.clone(), Rc::new(ty)))
            } else {
                Err(Error::new(
                    pos,
                    ErrorInfo::EffectMismatch {
                        expected: left_effects.clone(),
                        actual: right_effects.clone(),
                    },
                ))
            }
        }
        (Type::Box(left_grade, left_ty), Type::Box(right_grade, right_ty)) => {
            let left_kind = kinds::infer_coeffect_kind(state, pos, left_grade)?;
            let right_kind = kinds::infer_coeffect_kind(state, pos, right_grade)?;
            let kind = kinds::mgu_coeffect_kinds(state, pos, &left_kind, &right_kind)?;
            let upper = state.fresh_coeffect_variable("join", kind.clone());
            state.add_constraint(Constraint::leq(
                pos,
                left_grade.clone(),
                upper.clone(),
                kind.clone(),
            ));
            state.add_constraint(Constraint::leq(pos, right_grade.clone(), upper.clone(), kind));
            let ty = join(env, state, pos, left_ty, right_ty)?;
            Ok(Type::mk_box(upper, ty))
        }
        (Type::App(left_a, left_b), Type::App(right_a, right_b)) => {
            let a = join(env, state, pos, left_a, right_a)?;
            let b = join(env, state, pos, left_b, right_b)?;
            Ok(Type::mk_app(a, b))
        }
        (Type::Pair(left_a, left_b), Type::Pair(right_a, right_b)) => {
            let a = join(env, state, pos, left_a, right_a)?;
            let b = join(env, state, pos, left_b, right_b)?;
            Ok(Type::mk_pair(a, b))
        }
        (Type::Var(left_name), Type::Var(right_name)) if left_name != right_name => {
            let (left_kind, _) = lookup_variable(state, pos, left_name)?;
            let (right_kind, _) = lookup_variable(state, pos, right_name)?;
            match (&left_kind, &right_kind) {
                (Kind::Coeffect(left_kind), Kind::Coeffect(right_kind)) => {
                    let kind = kinds::mgu_coeffect_kinds(state, pos, left_kind, right_kind)?;
                    state.add_constraint(Constraint::leq(
                        pos,
                        Coeffect::Var(left_name.clone()),
                        Coeffect::Var(right_name.clone()),
                        kind,
                    ));
                    Ok(right.clone())
                }
                _ => join_by_equality(env, state, pos, left, right),
            }
        }
        (Type::Var(_), _) | (_, Type::Var(_)) | (Type::Int(_), _) | (Type::Infix(_, _, _), _) => {
            join_by_equality(env, state, pos, left, right)
        }
        _ => Err(no_upper_bound(pos, left, right)),
    }
}

fn join_by_equality(
    env: Env,
    state: &mut State,
    pos: usize,
    left: &Type,
    right: &Type,
) -> Result<Type, Error> {
    let (equal, _, _) = equal(env, state, pos, left, right)?;
    if !equal {
        return Err(no_upper_bound(pos, left, right));
    }
    Ok(match left {
        Type::Var(_) => right.clone(),
        _ => left.clone(),
    })
}
