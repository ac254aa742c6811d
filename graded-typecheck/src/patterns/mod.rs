//! Pattern matching against a scrutinee type.

#[cfg(test)]
mod test;

use crate::{
    context::{self, Assumption, Context},
    equality,
    error::{Error, ErrorInfo},
    state::{Quantifier, State},
    Env,
};
use graded_syntax::{Kind, Pattern, Spanned, Substitution, Type};
use std::rc::Rc;

/// What matching a pattern introduces.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PatternContext {
    /// The variables the pattern binds.
    pub context: Context,
    /// Variables invented for the constructors' quantified variables.
    pub existentials: Vec<(Rc<str>, Kind)>,
    /// Refinements of the scrutinee type's variables.
    pub subst: Substitution,
}

fn mismatch(pattern: &Spanned<Pattern>, ty: &Type) -> Error {
    Error::new(
        pattern.pos,
        ErrorInfo::PatternMismatch {
            pattern: pattern.item.clone(),
            ty: ty.clone(),
        },
    )
}

fn merge(
    env: Env,
    state: &mut State,
    pos: usize,
    left: PatternContext,
    right: PatternContext,
) -> Result<PatternContext, Error> {
    let context = context::combine(state, pos, &left.context, &right.context)?;
    let mut existentials = left.existentials;
    existentials.extend(right.existentials);
    let subst = equality::combine_substitutions(env, state, pos, left.subst, right.subst)?;
    Ok(PatternContext {
        context,
        existentials,
        subst,
    })
}

fn match_literal(
    env: Env,
    state: &mut State,
    pattern: &Spanned<Pattern>,
    ty: &Type,
    expected: &str,
) -> Result<PatternContext, Error> {
    let (equal, _, subst) = equality::equal(env, state, pattern.pos, &Type::mk_name(expected), ty)
        .map_err(|_| mismatch(pattern, ty))?;
    if equal {
        Ok(PatternContext {
            subst,
            ..PatternContext::default()
        })
    } else {
        Err(mismatch(pattern, ty))
    }
}

/**
Compute the bindings introduced by matching `pattern` against a value of type `ty`.

Constructor patterns instantiate the constructor's quantified variables as
pattern-bound variables and unify its result type with `ty`. Any index
constraints this produces belong to the antecedent of the enclosing implication
scope, so this must run before the scope's consequent is entered.
*/
pub fn build_pattern_context(
    env: Env,
    state: &mut State,
    ty: &Type,
    pattern: &Spanned<Pattern>,
) -> Result<PatternContext, Error> {
    let pos = pattern.pos;
    match &pattern.item {
        Pattern::Var(name) => Ok(PatternContext {
            context: Context::new().bind(name, Assumption::Linear(ty.clone())),
            ..PatternContext::default()
        }),
        Pattern::Wildcard => {
            let name = state.fresh_name("_");
            Ok(PatternContext {
                context: Context::new().bind(&name, Assumption::Linear(ty.clone())),
                ..PatternContext::default()
            })
        }
        Pattern::Int(_) => match_literal(env, state, pattern, ty, "Int"),
        Pattern::Float(_) => match_literal(env, state, pattern, ty, "Float"),
        Pattern::Box(inner) => match ty {
            Type::Box(grade, inner_ty) => {
                let inner = build_pattern_context(env, state, inner_ty, inner)?;
                let names = inner.context.names();
                Ok(PatternContext {
                    context: inner.context.scale(&names, grade),
                    ..inner
                })
            }
            _ => Err(mismatch(pattern, ty)),
        },
        Pattern::Pair(a, b) => match ty {
            Type::Pair(a_ty, b_ty) => {
                let left = build_pattern_context(env, state, a_ty, a)?;
                let b_ty = b_ty.substitute(&left.subst);
                let right = build_pattern_context(env, state, &b_ty, b)?;
                merge(env, state, pos, left, right)
            }
            _ => Err(mismatch(pattern, ty)),
        },
        Pattern::Constructor { name, args } => {
            let scheme = env
                .primitives
                .data_constructors
                .get(name)
                .ok_or_else(|| Error::not_in_scope(pos, name))?;

            let mut existentials = Vec::with_capacity(scheme.vars.len());
            let mut instantiation = Vec::with_capacity(scheme.vars.len());
            for (var, kind) in &scheme.vars {
                let fresh = state.fresh_type_variable(var, kind.clone(), Quantifier::PatternBound);
                existentials.push((fresh.clone(), kind.clone()));
                instantiation.push((var.clone(), Type::Var(fresh)));
            }
            let constructor_ty = scheme.ty.substitute(&instantiation);
            let (arg_tys, result_ty) = constructor_ty.unwrap_fun();
            if arg_tys.len() != args.len() {
                return Err(mismatch(pattern, ty));
            }

            let (equal, _, subst) = equality::equal(env, state, pos, result_ty, ty)?;
            if !equal {
                return Err(mismatch(pattern, ty));
            }
            tracing::debug!(
                constructor = %name,
                scrutinee = %ty.render(),
                "matched constructor pattern"
            );

            let mut acc = PatternContext {
                context: Context::new(),
                existentials,
                subst,
            };
            for (arg, arg_ty) in args.iter().zip(arg_tys) {
                let arg_ty = arg_ty.substitute(&acc.subst);
                let matched = build_pattern_context(env, state, &arg_ty, arg)?;
                acc = merge(env, state, pos, acc, matched)?;
            }
            Ok(acc)
        }
    }
}
