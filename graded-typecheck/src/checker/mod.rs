//! Bidirectional checking and synthesis of expressions.
//!
//! Both directions thread the typing context of the enclosing term and return
//! the context of what the expression actually used. Grade obligations are
//! pushed into the [`State`] as constraints.

#[cfg(test)]
mod test;

use crate::{
    context::{self, Assumption, Context},
    equality,
    error::{Error, ErrorHint, ErrorInfo, LinearityInfo},
    kinds,
    patterns::{self, PatternContext},
    predicate::Constraint,
    state::{Quantifier, State},
    Env,
};
use graded_syntax::{
    Branch, Coeffect, CoeffectKind, Expr, Kind, Spanned, Substitution, Type, TypeScheme,
};
use std::rc::Rc;

/// Which side of a comparison may over-approximate the other.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn flip(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

fn is_named(ty: &Type, name: &str) -> bool {
    matches!(ty, Type::Name(other) if other.as_ref() == name)
}

/// Replace a scheme's quantified variables with fresh instantiated ones.
pub fn instantiate(state: &mut State, scheme: &TypeScheme) -> Type {
    let subst: Substitution = scheme
        .vars
        .iter()
        .map(|(var, kind)| {
            let fresh = state.fresh_type_variable(var, kind.clone(), Quantifier::Instantiated);
            (var.clone(), Type::Var(fresh))
        })
        .collect();
    scheme.ty.substitute(&subst)
}

/// The linear variable `name` must have been used by `used`.
fn check_linear_use(
    pos: usize,
    name: &Rc<str>,
    ty: &Type,
    used: &Context,
) -> Result<(), Error> {
    let unused = Context::new()
        .bind(name, Assumption::Linear(ty.clone()))
        .remaining_linear(used);
    if unused.is_empty() {
        Ok(())
    } else {
        Err(Error::linearity(pos, unused, LinearityInfo::Unused))
    }
}

/// Errors meaning that an operator signature does not fit its operands.
fn is_shape_error(error: &Error) -> bool {
    matches!(
        error.info,
        ErrorInfo::TypeMismatch { .. }
            | ErrorInfo::RigidTypeVariable { .. }
            | ErrorInfo::NoUpperBound { .. }
            | ErrorInfo::KindMismatch { .. }
            | ErrorInfo::CoeffectKindMismatch { .. }
            | ErrorInfo::NotAFunction { .. }
            | ErrorInfo::PatternMismatch { .. }
    )
}

/// `scale r e`, with a float literal `r`.
fn scale_factor(context: &Context, function: &Expr) -> Option<f64> {
    match function {
        Expr::App(scale, factor) => match (&scale.item, &factor.item) {
            (Expr::Var(name), Expr::Float(factor))
                if name.as_ref() == "scale" && !context.contains(name) =>
            {
                Some(*factor)
            }
            _ => None,
        },
        _ => None,
    }
}

/**
Check `expr` against `expected`.

Returns the context of the variables `expr` used and a substitution for any
instantiated variables that were solved along the way. `top_level` forbids
approximating the expected type when the expression's type is synthesized
instead.
*/
pub fn check(
    env: Env,
    state: &mut State,
    context: &Context,
    polarity: Polarity,
    top_level: bool,
    expected: &Type,
    expr: &Spanned<Expr>,
) -> Result<(Context, Substitution), Error> {
    let pos = expr.pos;
    match (&expr.item, expected) {
        (Expr::Int(_), ty) if is_named(ty, "Int") || is_named(ty, "Float") => {
            Ok((Context::new(), Vec::new()))
        }
        (Expr::Float(_), ty) if is_named(ty, "Float") => Ok((Context::new(), Vec::new())),
        (Expr::Lam { name, ty, body }, Type::Fun(arg, result)) => {
            if let Some(annotation) = ty {
                let (equal, _, _) = equality::equal(env, state, name.pos, annotation, arg)?;
                if !equal {
                    return Err(Error::mismatch(name.pos, arg, annotation));
                }
            }
            let inner = context.bind(&name.item, Assumption::Linear(arg.as_ref().clone()));
            let (used, subst) = check(env, state, &inner, polarity, top_level, result, body)?;
            check_linear_use(name.pos, &name.item, arg, &used)?;
            Ok((used.remove(&name.item), subst))
        }
        (Expr::App(function, arg), ty) if is_named(ty, "Float") => {
            match scale_factor(context, &function.item) {
                Some(factor) => {
                    let boxed = Type::mk_box(Coeffect::Float(factor), Type::mk_name("Float"));
                    check(env, state, context, polarity, false, &boxed, arg)
                }
                None => check_application(env, state, context, polarity, expected, function, arg),
            }
        }
        (Expr::App(function, arg), _) => {
            check_application(env, state, context, polarity, expected, function, arg)
        }
        (Expr::Promote(inner), Type::Box(demand, inner_ty)) => {
            let vars: Vec<Rc<str>> = inner
                .item
                .free_vars()
                .into_iter()
                .filter(|var| context.contains(var))
                .collect();
            let freshened = context::freshen_discharged(state, pos, &vars, context, demand)?;
            let (used, subst) = check(env, state, &freshened, polarity, false, inner_ty, inner)?;
            match polarity {
                Polarity::Positive => context::leq(state, pos, &used, &freshened)?,
                Polarity::Negative => context::leq(state, pos, &freshened, &used)?,
            }
            Ok((freshened.scale(&vars, demand), subst))
        }
        (Expr::Pure(inner), Type::Diamond(_, inner_ty)) => {
            check(env, state, context, polarity, false, inner_ty, inner)
        }
        (Expr::Pair(a, b), Type::Pair(a_ty, b_ty)) => {
            let (a_used, a_subst) = check(env, state, context, polarity, false, a_ty, a)?;
            let b_ty = b_ty.substitute(&a_subst);
            let (b_used, b_subst) = check(env, state, context, polarity, false, &b_ty, b)?;
            let used = context::combine(state, pos, &a_used, &b_used)?;
            let subst = equality::combine_substitutions(env, state, pos, a_subst, b_subst)?;
            Ok((used, subst))
        }
        (Expr::Case(scrutinee, branches), _) => {
            let (_, used) = case(
                env,
                state,
                context,
                polarity,
                pos,
                scrutinee,
                branches,
                Some(expected),
            )?;
            Ok((used, Vec::new()))
        }
        _ => {
            let (actual, used) = synthesize(env, state, context, polarity, expr)?;
            let (left, right) = match polarity {
                Polarity::Positive => (&actual, expected),
                Polarity::Negative => (expected, &actual),
            };
            let hint = ErrorHint::WhileComparing {
                expected: expected.clone(),
                actual: actual.clone(),
            };
            let (equal, _, subst) = if top_level {
                equality::equal(env, state, pos, left, right)
            } else {
                equality::approx(env, state, pos, left, right)
            }
            .map_err(|error| error.with_hint(hint.clone()))?;
            if equal {
                Ok((used, subst))
            } else {
                Err(Error::mismatch(pos, expected, &actual).with_hint(hint))
            }
        }
    }
}

fn check_application(
    env: Env,
    state: &mut State,
    context: &Context,
    polarity: Polarity,
    expected: &Type,
    function: &Spanned<Expr>,
    arg: &Spanned<Expr>,
) -> Result<(Context, Substitution), Error> {
    let (arg_ty, arg_used) = synthesize(env, state, context, polarity, arg)?;
    let function_ty = Type::mk_fun(arg_ty, expected.clone());
    let (function_used, subst) = check(
        env,
        state,
        context,
        polarity.flip(),
        false,
        &function_ty,
        function,
    )?;
    let used = context::combine(state, function.pos, &function_used, &arg_used)?;
    Ok((used, subst))
}

/// Fresh upper bounds for the graded variables shared by a case's branches.
fn shared_baseline(
    state: &mut State,
    pos: usize,
    context: &Context,
    branches: &[Branch],
) -> Result<Context, Error> {
    let mut vars: Vec<Rc<str>> = Vec::new();
    for branch in branches {
        let bound = branch.pattern.item.bound_vars();
        for var in branch.body.item.free_vars() {
            if !bound.contains(&var) && !vars.contains(&var) {
                vars.push(var);
            }
        }
    }

    let mut baseline = Context::new();
    for (var, assumption) in context.discharged_only().restrict(&vars).iter() {
        if let Assumption::Discharged(ty, grade) = assumption {
            let kind = kinds::infer_coeffect_kind(state, pos, grade)?;
            let upper = state.fresh_coeffect_variable(var, kind);
            baseline = baseline.bind(var, Assumption::Discharged(ty.clone(), upper));
        }
    }
    Ok(baseline)
}

/**
Check or synthesize a case expression.

Each branch is checked inside its own implication scope: the constraints that
matching its pattern produces imply the constraints of its body. Graded
variables shared by the branches are bounded by a common baseline, and the
remaining usage of the branches is joined.
*/
#[allow(clippy::too_many_arguments)]
fn case(
    env: Env,
    state: &mut State,
    context: &Context,
    polarity: Polarity,
    pos: usize,
    scrutinee: &Spanned<Expr>,
    branches: &[Branch],
    goal: Option<&Type>,
) -> Result<(Option<Type>, Context), Error> {
    let (scrutinee_ty, scrutinee_used) = synthesize(env, state, context, polarity, scrutinee)?;
    let baseline = shared_baseline(state, pos, context, branches)?;

    let mut result_ty: Option<Type> = None;
    let mut joined: Option<Context> = None;
    for branch in branches {
        state.open_implication_scope();
        let PatternContext {
            context: bound,
            existentials,
            subst,
        } = patterns::build_pattern_context(env, state, &scrutinee_ty, &branch.pattern)?;
        state.enter_consequent();

        let inner = context.bind_all(&bound);
        let used = match goal {
            Some(goal) => {
                let goal = goal.substitute(&subst);
                let (used, _) = check(env, state, &inner, polarity, false, &goal, &branch.body)?;
                used
            }
            None => {
                let (ty, used) = synthesize(env, state, &inner, polarity, &branch.body)?;
                result_ty = Some(match result_ty {
                    None => ty,
                    Some(previous) => {
                        equality::join(env, state, branch.body.pos, &previous, &ty)?
                    }
                });
                used
            }
        };

        let unused = bound.remaining_linear(&used);
        if !unused.is_empty() {
            return Err(Error::linearity(
                branch.pattern.pos,
                unused,
                LinearityInfo::Unused,
            ));
        }
        context::leq(state, branch.pattern.pos, &used.intersect(&bound), &bound)?;
        context::leq(state, branch.body.pos, &used.intersect(&baseline), &baseline)?;
        state.close_implication_scope(existentials);

        let net = used.subtract(&baseline).subtract(&bound);
        joined = Some(match joined {
            None => net,
            Some(previous) => context::join(state, pos, &previous, &net)?,
        });
    }

    let joined = joined.unwrap_or_default();
    let used = context::combine(state, pos, &joined, &scrutinee_used)?;
    let used = context::combine(state, pos, &used, &baseline)?;
    Ok((result_ty, used))
}

fn synthesize_constructor(
    env: Env,
    state: &mut State,
    pos: usize,
    name: &Rc<str>,
) -> Result<Type, Error> {
    match name.as_ref() {
        "Cons" | "S" => {
            let nat = Kind::Coeffect(CoeffectKind::Nat);
            let arg_size = state.fresh_type_variable("n", nat.clone(), Quantifier::Instantiated);
            let result_size = state.fresh_type_variable("m", nat, Quantifier::Instantiated);
            state.add_constraint(Constraint::eq(
                pos,
                Coeffect::Var(result_size.clone()),
                Coeffect::mk_plus(Coeffect::Var(arg_size.clone()), Coeffect::Nat(1)),
                CoeffectKind::Nat,
            ));
            let (arg_size, result_size) = (Type::Var(arg_size), Type::Var(result_size));
            if name.as_ref() == "Cons" {
                let elem = Type::Var(state.fresh_type_variable(
                    "a",
                    Kind::Type,
                    Quantifier::Instantiated,
                ));
                Ok(Type::mk_fun(
                    elem.clone(),
                    Type::mk_fun(
                        Type::mk_list(arg_size, elem.clone()),
                        Type::mk_list(result_size, elem),
                    ),
                ))
            } else {
                let n = |size| Type::mk_app(Type::mk_name("N"), size);
                Ok(Type::mk_fun(n(arg_size), n(result_size)))
            }
        }
        _ => match env.primitives.data_constructors.get(name) {
            Some(scheme) => Ok(instantiate(state, scheme)),
            None => Err(Error::not_in_scope(pos, name)),
        },
    }
}

/// Synthesize the type of `expr`, with the context of the variables it used.
pub fn synthesize(
    env: Env,
    state: &mut State,
    context: &Context,
    polarity: Polarity,
    expr: &Spanned<Expr>,
) -> Result<(Type, Context), Error> {
    let pos = expr.pos;
    match &expr.item {
        Expr::Int(_) => Ok((Type::mk_name("Int"), Context::new())),
        Expr::Float(_) => Ok((Type::mk_name("Float"), Context::new())),
        Expr::Constructor(name) => Ok((
            synthesize_constructor(env, state, pos, name)?,
            Context::new(),
        )),
        Expr::Var(name) => match context.lookup(name) {
            Some(Assumption::Linear(ty)) => Ok((
                ty.clone(),
                Context::new().bind(name, Assumption::Linear(ty.clone())),
            )),
            Some(Assumption::Discharged(ty, grade)) => {
                let kind = kinds::infer_coeffect_kind(state, pos, grade)?;
                Ok((
                    ty.clone(),
                    Context::new().bind(name, Assumption::Discharged(ty.clone(), Coeffect::One(kind))),
                ))
            }
            None => {
                let scheme = env
                    .definitions
                    .get(name)
                    .or_else(|| env.primitives.definitions.get(name))
                    .ok_or_else(|| Error::not_in_scope(pos, name))?;
                Ok((instantiate(state, scheme), Context::new()))
            }
        },
        Expr::App(function, arg) => {
            let (function_ty, function_used) =
                synthesize(env, state, context, polarity, function)?;
            match function_ty {
                Type::Fun(arg_ty, result_ty) => {
                    let (arg_used, subst) =
                        check(env, state, context, polarity, false, &arg_ty, arg)?;
                    let used = context::combine(state, pos, &function_used, &arg_used)?;
                    Ok((result_ty.substitute(&subst), used))
                }
                ty => Err(Error::new(function.pos, ErrorInfo::NotAFunction { ty })),
            }
        }
        Expr::Promote(inner) => {
            let kind = state.fresh_coeffect_kind("k");
            let grade = state.fresh_coeffect_variable("r", kind);
            let (ty, used) = synthesize(env, state, context, polarity, inner)?;
            let vars = inner.item.free_vars();
            Ok((Type::mk_box(grade.clone(), ty), used.scale(&vars, &grade)))
        }
        Expr::Pure(inner) => {
            let (ty, used) = synthesize(env, state, context, polarity, inner)?;
            Ok((Type::Diamond(Vec::new(), Rc::new(ty)), used))
        }
        Expr::Pair(a, b) => {
            let (a_ty, a_used) = synthesize(env, state, context, polarity, a)?;
            let (b_ty, b_used) = synthesize(env, state, context, polarity, b)?;
            let used = context::combine(state, pos, &a_used, &b_used)?;
            Ok((Type::mk_pair(a_ty, b_ty), used))
        }
        Expr::Lam {
            name,
            ty: Some(arg_ty),
            body,
        } => {
            let inner = context.bind(&name.item, Assumption::Linear(arg_ty.clone()));
            let (result_ty, used) = synthesize(env, state, &inner, polarity, body)?;
            check_linear_use(name.pos, &name.item, arg_ty, &used)?;
            Ok((
                Type::mk_fun(arg_ty.clone(), result_ty),
                used.remove(&name.item),
            ))
        }
        Expr::Case(scrutinee, branches) => {
            match case(
                env, state, context, polarity, pos, scrutinee, branches, None,
            )? {
                (Some(ty), used) => Ok((ty, used)),
                (None, _) => Err(Error::new(pos, ErrorInfo::CannotSynthesize)),
            }
        }
        Expr::LetDiamond {
            name,
            ty,
            value,
            rest,
        } => {
            let (value_ty, value_used) = synthesize(env, state, context, polarity, value)?;
            let (value_effects, value_inner) = match value_ty {
                Type::Diamond(effects, inner) => (effects, inner.as_ref().clone()),
                ty => return Err(Error::new(value.pos, ErrorInfo::NotEffectful { ty })),
            };
            if let Some(annotation) = ty {
                let (equal, _, _) =
                    equality::equal(env, state, name.pos, annotation, &value_inner)?;
                if !equal {
                    return Err(Error::mismatch(name.pos, annotation, &value_inner));
                }
            }

            let inner = context.bind(&name.item, Assumption::Linear(value_inner.clone()));
            let (rest_ty, rest_used) = synthesize(env, state, &inner, polarity, rest)?;
            let (rest_effects, rest_inner) = match rest_ty {
                Type::Diamond(effects, inner) => (effects, inner),
                ty => return Err(Error::new(rest.pos, ErrorInfo::NotEffectful { ty })),
            };
            check_linear_use(name.pos, &name.item, &value_inner, &rest_used)?;

            let used = context::combine(state, pos, &value_used, &rest_used.remove(&name.item))?;
            let mut effects = value_effects;
            effects.extend(rest_effects);
            Ok((Type::Diamond(effects, rest_inner), used))
        }
        Expr::LetBox {
            name,
            ty,
            value,
            rest,
        } => {
            let kind = state.fresh_coeffect_kind("k");
            let grade = state.fresh_coeffect_variable(&name.item, kind.clone());
            let inner = context.bind(&name.item, Assumption::Discharged(ty.clone(), grade.clone()));
            let (rest_ty, rest_used) = synthesize(env, state, &inner, polarity, rest)?;

            let demand = match rest_used.lookup(&name.item) {
                Some(Assumption::Discharged(_, usage)) => usage.clone(),
                Some(Assumption::Linear(_)) => Coeffect::One(kind),
                None => {
                    state.add_constraint(Constraint::eq(
                        name.pos,
                        grade.clone(),
                        Coeffect::Zero(kind.clone()),
                        kind,
                    ));
                    grade
                }
            };
            let boxed = Type::mk_box(demand, ty.clone());
            let (value_used, _) = check(env, state, context, polarity, false, &boxed, value)?;
            let used = context::combine(state, pos, &value_used, &rest_used.remove(&name.item))?;
            Ok((rest_ty, used))
        }
        Expr::Binop(op, left, right) => {
            let candidates = env
                .primitives
                .operators
                .get(op)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut rejection: Option<Error> = None;
            for candidate in candidates {
                let (args, result) = candidate.unwrap_fun();
                if let [left_ty, right_ty] = args.as_slice() {
                    let mut trial = state.clone();
                    let attempt = check(env, &mut trial, context, polarity, false, left_ty, left)
                        .and_then(|(left_used, _)| {
                            let (right_used, _) =
                                check(env, &mut trial, context, polarity, false, right_ty, right)?;
                            context::combine(&mut trial, pos, &left_used, &right_used)
                        });
                    match attempt {
                        Ok(used) => {
                            tracing::debug!(
                                op = op.render(),
                                signature = %candidate.render(),
                                "selected operator"
                            );
                            *state = trial;
                            return Ok((result.clone(), used));
                        }
                        Err(error) => {
                            tracing::debug!(
                                op = op.render(),
                                signature = %candidate.render(),
                                reason = %error.message(),
                                "rejected operator"
                            );
                            if rejection.is_none() && !is_shape_error(&error) {
                                rejection = Some(error);
                            }
                        }
                    }
                }
            }
            // The operands fit some signature but are used wrongly.
            if let Some(error) = rejection {
                return Err(error);
            }

            let mut trial = state.clone();
            let (left_ty, _) = synthesize(env, &mut trial, context, polarity, left)?;
            let (right_ty, _) = synthesize(env, &mut trial, context, polarity, right)?;
            Err(Error::new(
                pos,
                ErrorInfo::NoMatchingOperator {
                    op: *op,
                    left: left_ty,
                    right: right_ty,
                },
            ))
        }
        Expr::Lam { ty: None, .. } => Err(Error::new(pos, ErrorInfo::CannotSynthesize)),
    }
}
