//! Kind inference for types and grades.

#[cfg(test)]
mod test;

use crate::{
    error::{Error, ErrorInfo},
    state::{Quantifier, State},
    Env,
};
use graded_syntax::{Coeffect, CoeffectKind, Kind, Type, TypeScheme};

/**
Find the most general coeffect kind that both arguments can be.

An undetermined kind is solved by the other side. Two distinct concrete kinds
are incompatible.
*/
pub fn mgu_coeffect_kinds(
    state: &mut State,
    pos: usize,
    expected: &CoeffectKind,
    actual: &CoeffectKind,
) -> Result<CoeffectKind, Error> {
    let expected = state.resolve_coeffect_kind(expected);
    let actual = state.resolve_coeffect_kind(actual);
    match (&expected, &actual) {
        _ if expected == actual => Ok(expected),
        (CoeffectKind::Var(name), _) => {
            state.bind_coeffect_kind(name.clone(), actual.clone());
            Ok(actual)
        }
        (_, CoeffectKind::Var(name)) => {
            state.bind_coeffect_kind(name.clone(), expected.clone());
            Ok(expected)
        }
        _ => Err(Error::new(
            pos,
            ErrorInfo::CoeffectKindMismatch { expected, actual },
        )),
    }
}

pub fn infer_coeffect_kind(
    state: &mut State,
    pos: usize,
    grade: &Coeffect,
) -> Result<CoeffectKind, Error> {
    match grade {
        Coeffect::Var(name) => match state.lookup_type_variable(name) {
            None => Err(Error::new(
                pos,
                ErrorInfo::UnboundTypeVariable { name: name.clone() },
            )),
            Some((Kind::Coeffect(kind), _)) => Ok(state.resolve_coeffect_kind(kind)),
            Some((kind, _)) => Err(Error::new(
                pos,
                ErrorInfo::NotAGrade {
                    name: name.clone(),
                    kind: kind.clone(),
                },
            )),
        },
        Coeffect::Nat(_) => Ok(CoeffectKind::Nat),
        Coeffect::Float(_) => Ok(CoeffectKind::Float),
        Coeffect::Level(_) => Ok(CoeffectKind::Level),
        Coeffect::Zero(kind) | Coeffect::One(kind) => Ok(state.resolve_coeffect_kind(kind)),
        Coeffect::Plus(a, b)
        | Coeffect::Times(a, b)
        | Coeffect::Join(a, b)
        | Coeffect::Meet(a, b) => {
            let a = infer_coeffect_kind(state, pos, a)?;
            let b = infer_coeffect_kind(state, pos, b)?;
            mgu_coeffect_kinds(state, pos, &a, &b)
        }
    }
}

/// Unify two kinds, solving coeffect kinds where needed.
pub fn unify_kinds(
    state: &mut State,
    pos: usize,
    expected: &Kind,
    actual: &Kind,
) -> Result<Kind, Error> {
    match (expected, actual) {
        (Kind::Coeffect(a), Kind::Coeffect(b)) => {
            Ok(Kind::Coeffect(mgu_coeffect_kinds(state, pos, a, b)?))
        }
        (Kind::Arrow(a1, b1), Kind::Arrow(a2, b2)) => {
            let a = unify_kinds(state, pos, a1, a2)?;
            let b = unify_kinds(state, pos, b1, b2)?;
            Ok(Kind::mk_arrow(a, b))
        }
        _ if expected == actual => Ok(expected.clone()),
        _ => Err(Error::new(
            pos,
            ErrorInfo::KindMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            },
        )),
    }
}

pub fn infer_kind(env: Env, state: &mut State, pos: usize, ty: &Type) -> Result<Kind, Error> {
    match ty {
        Type::Name(name) => match env.primitives.type_constructors.get(name) {
            Some(kind) => Ok(kind.clone()),
            None => Err(Error::not_in_scope(pos, name)),
        },
        Type::Var(name) => match state.lookup_type_variable(name) {
            Some((kind, _)) => Ok(kind.clone()),
            None => Err(Error::new(
                pos,
                ErrorInfo::UnboundTypeVariable { name: name.clone() },
            )),
        },
        Type::Int(_) => Ok(Kind::Coeffect(CoeffectKind::Nat)),
        Type::Infix(_, a, b) => {
            let a_kind = infer_kind(env, state, pos, a)?;
            let b_kind = infer_kind(env, state, pos, b)?;
            match (&a_kind, &b_kind) {
                (Kind::Coeffect(a), Kind::Coeffect(b)) => {
                    Ok(Kind::Coeffect(mgu_coeffect_kinds(state, pos, a, b)?))
                }
                (Kind::Coeffect(_), _) => Err(Error::new(
                    pos,
                    ErrorInfo::KindMismatch {
                        expected: a_kind.clone(),
                        actual: b_kind.clone(),
                    },
                )),
                _ => Err(Error::new(
                    pos,
                    ErrorInfo::KindMismatch {
                        expected: Kind::Coeffect(CoeffectKind::Nat),
                        actual: a_kind.clone(),
                    },
                )),
            }
        }
        Type::Fun(a, b) | Type::Pair(a, b) => {
            check_kind(env, state, pos, a, &Kind::Type)?;
            check_kind(env, state, pos, b, &Kind::Type)?;
            Ok(Kind::Type)
        }
        Type::Box(grade, ty) => {
            infer_coeffect_kind(state, pos, grade)?;
            check_kind(env, state, pos, ty, &Kind::Type)?;
            Ok(Kind::Type)
        }
        Type::Diamond(_, ty) => {
            check_kind(env, state, pos, ty, &Kind::Type)?;
            Ok(Kind::Type)
        }
        Type::App(a, b) => {
            let a_kind = infer_kind(env, state, pos, a)?;
            let b_kind = infer_kind(env, state, pos, b)?;
            match a_kind {
                Kind::Arrow(input, output) => {
                    unify_kinds(state, pos, &input, &b_kind)?;
                    Ok(output.as_ref().clone())
                }
                a_kind => Err(Error::new(
                    pos,
                    ErrorInfo::KindMismatch {
                        expected: Kind::mk_arrow(b_kind, Kind::Type),
                        actual: a_kind,
                    },
                )),
            }
        }
    }
}

pub fn check_kind(
    env: Env,
    state: &mut State,
    pos: usize,
    ty: &Type,
    expected: &Kind,
) -> Result<(), Error> {
    let actual = infer_kind(env, state, pos, ty)?;
    unify_kinds(state, pos, expected, &actual).map(|_| ())
}

/**
Check that a signature describes a type.

The signature's variables are only in scope for the duration of the check.
*/
pub fn kind_check(
    env: Env,
    state: &mut State,
    pos: usize,
    scheme: &TypeScheme,
) -> Result<(), Error> {
    for (var, kind) in &scheme.vars {
        state.bind_type_variable(var.clone(), kind.clone(), Quantifier::Universal);
    }
    let result = check_kind(env, state, pos, &scheme.ty, &Kind::Type);
    state.reset();
    result
}
