//! Typing contexts and their algebra.
//!
//! A [`Context`] records how a term uses its free variables. Checking a term
//! produces the context of what it consumed; the operations here combine those
//! contexts and emit the grade constraints that relate them.


use crate::{
    error::{Error, LinearityInfo},
    kinds,
    predicate::Constraint,
    state::State,
};
use graded_syntax::{Coeffect, Type};
use std::{iter::FromIterator, rc::Rc};

#[derive(PartialEq, Clone, Debug)]
pub enum Assumption {
    /// Must be used exactly once.
    Linear(Type),
    /// May be used as the grade allows.
    Discharged(Type, Coeffect),
}

impl Assumption {
    pub fn ty(&self) -> &Type {
        match self {
            Assumption::Linear(ty) | Assumption::Discharged(ty, _) => ty,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Assumption::Linear(_))
    }

    pub fn render(&self) -> String {
        match self {
            Assumption::Linear(ty) => ty.render(),
            Assumption::Discharged(ty, grade) => format!("{} [{}]", ty.render(), grade.render()),
        }
    }
}

/// An ordered mapping from variables to assumptions. Equality ignores order.
#[derive(Clone, Debug, Default)]
pub struct Context {
    bindings: Vec<(Rc<str>, Assumption)>,
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.bindings.len() == other.bindings.len()
            && self
                .bindings
                .iter()
                .all(|(var, assumption)| other.lookup(var) == Some(assumption))
    }
}

impl FromIterator<(Rc<str>, Assumption)> for Context {
    fn from_iter<I: IntoIterator<Item = (Rc<str>, Assumption)>>(iter: I) -> Self {
        let mut context = Context::new();
        for (var, assumption) in iter {
            context = context.bind(&var, assumption);
        }
        context
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            bindings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Rc<str>, Assumption)> {
        self.bindings.iter()
    }

    pub fn names(&self) -> Vec<Rc<str>> {
        self.bindings.iter().map(|(var, _)| var.clone()).collect()
    }

    pub fn lookup(&self, var: &str) -> Option<&Assumption> {
        self.bindings
            .iter()
            .find(|(other, _)| other.as_ref() == var)
            .map(|(_, assumption)| assumption)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.lookup(var).is_some()
    }

    /// Bind `var`, shadowing any existing binding.
    pub fn bind(&self, var: &Rc<str>, assumption: Assumption) -> Context {
        let mut bindings: Vec<(Rc<str>, Assumption)> = self
            .bindings
            .iter()
            .filter(|(other, _)| other != var)
            .cloned()
            .collect();
        bindings.push((var.clone(), assumption));
        Context { bindings }
    }

    /// Bind every variable of `other`, shadowing existing bindings.
    pub fn bind_all(&self, other: &Context) -> Context {
        other
            .bindings
            .iter()
            .fold(self.clone(), |acc, (var, assumption)| {
                acc.bind(var, assumption.clone())
            })
    }

    pub fn remove(&self, var: &str) -> Context {
        Context {
            bindings: self
                .bindings
                .iter()
                .filter(|(other, _)| other.as_ref() != var)
                .cloned()
                .collect(),
        }
    }

    /// The bindings for `vars`, in this context's order.
    pub fn restrict(&self, vars: &[Rc<str>]) -> Context {
        Context {
            bindings: self
                .bindings
                .iter()
                .filter(|(var, _)| vars.contains(var))
                .cloned()
                .collect(),
        }
    }

    pub fn discharged_only(&self) -> Context {
        Context {
            bindings: self
                .bindings
                .iter()
                .filter(|(_, assumption)| !assumption.is_linear())
                .cloned()
                .collect(),
        }
    }

    /// Remove every binding whose variable is bound in `other`.
    pub fn subtract(&self, other: &Context) -> Context {
        Context {
            bindings: self
                .bindings
                .iter()
                .filter(|(var, _)| !other.contains(var))
                .cloned()
                .collect(),
        }
    }

    /// Keep only the bindings whose variable is also bound in `other`.
    pub fn intersect(&self, other: &Context) -> Context {
        Context {
            bindings: self
                .bindings
                .iter()
                .filter(|(var, _)| other.contains(var))
                .cloned()
                .collect(),
        }
    }

    /**
    Multiply the grades of `vars` by `grade`, dropping every other binding.

    A linear binding is promoted to one graded by `grade`.
    */
    pub fn scale(&self, vars: &[Rc<str>], grade: &Coeffect) -> Context {
        Context {
            bindings: self
                .bindings
                .iter()
                .filter(|(var, _)| vars.contains(var))
                .map(|(var, assumption)| {
                    let assumption = match assumption {
                        Assumption::Linear(ty) => Assumption::Discharged(ty.clone(), grade.clone()),
                        Assumption::Discharged(ty, used) => Assumption::Discharged(
                            ty.clone(),
                            Coeffect::mk_times(grade.clone(), used.clone()),
                        ),
                    };
                    (var.clone(), assumption)
                })
                .collect(),
        }
    }

    /**
    The variables that are linear in `self` and not consumed in `after`.

    A zero-graded counterpart in `after` also counts as consumed.
    */
    pub fn remaining_linear(&self, after: &Context) -> Vec<Rc<str>> {
        self.bindings
            .iter()
            .filter(|(var, assumption)| {
                assumption.is_linear()
                    && !matches!(
                        after.lookup(var),
                        Some(Assumption::Linear(_))
                    )
                    && !matches!(
                        after.lookup(var),
                        Some(Assumption::Discharged(_, grade)) if grade.is_zero()
                    )
            })
            .map(|(var, _)| var.clone())
            .collect()
    }

    pub fn render(&self) -> String {
        let items: Vec<String> = self
            .bindings
            .iter()
            .map(|(var, assumption)| format!("{} : {}", var, assumption.render()))
            .collect();
        format!("[{}]", items.join(", "))
    }
}

/**
Add one more use of `var` to a context.

A fresh variable is appended. Uses of an already-bound variable add up; two
linear uses are a linearity error.
*/
pub fn extend(
    state: &mut State,
    pos: usize,
    context: &Context,
    var: &Rc<str>,
    assumption: Assumption,
) -> Result<Context, Error> {
    let existing = match context.lookup(var) {
        None => {
            let mut bindings = context.bindings.clone();
            bindings.push((var.clone(), assumption));
            return Ok(Context { bindings });
        }
        Some(existing) => existing,
    };

    if existing.ty() != assumption.ty() {
        return Err(Error::mismatch(pos, existing.ty(), assumption.ty()));
    }

    let merged = match (existing, &assumption) {
        (Assumption::Linear(_), Assumption::Linear(_)) => {
            return Err(Error::linearity(
                pos,
                vec![var.clone()],
                LinearityInfo::Duplicated,
            ))
        }
        (Assumption::Discharged(ty, used), Assumption::Discharged(_, grade)) => {
            Assumption::Discharged(ty.clone(), Coeffect::mk_plus(used.clone(), grade.clone()))
        }
        (Assumption::Discharged(ty, grade), Assumption::Linear(_))
        | (Assumption::Linear(_), Assumption::Discharged(ty, grade)) => {
            let kind = kinds::infer_coeffect_kind(state, pos, grade)?;
            Assumption::Discharged(ty.clone(), Coeffect::mk_plus(grade.clone(), Coeffect::One(kind)))
        }
    };

    Ok(Context {
        bindings: context
            .bindings
            .iter()
            .map(|(other, assumption)| {
                if other == var {
                    (other.clone(), merged.clone())
                } else {
                    (other.clone(), assumption.clone())
                }
            })
            .collect(),
    })
}

/// The usage of two terms evaluated together.
pub fn combine(
    state: &mut State,
    pos: usize,
    left: &Context,
    right: &Context,
) -> Result<Context, Error> {
    left.bindings
        .iter()
        .try_fold(right.clone(), |acc, (var, assumption)| {
            extend(state, pos, &acc, var, assumption.clone())
        })
}

/**
Require every shared graded variable's grade in `left` to be approximated by
its grade in `right`.
*/
pub fn leq(state: &mut State, pos: usize, left: &Context, right: &Context) -> Result<(), Error> {
    for (var, assumption) in left.bindings.iter() {
        match (assumption, right.lookup(var)) {
            (_, None) | (Assumption::Linear(_), Some(Assumption::Linear(_))) => {}
            (Assumption::Discharged(_, small), Some(Assumption::Discharged(_, big))) => {
                let small_kind = kinds::infer_coeffect_kind(state, pos, small)?;
                let big_kind = kinds::infer_coeffect_kind(state, pos, big)?;
                let kind = kinds::mgu_coeffect_kinds(state, pos, &small_kind, &big_kind)?;
                state.add_constraint(Constraint::leq(pos, small.clone(), big.clone(), kind));
            }
            _ => {
                return Err(Error::linearity(
                    pos,
                    vec![var.clone()],
                    LinearityInfo::Mixed,
                ))
            }
        }
    }
    Ok(())
}

fn weaken(
    state: &mut State,
    pos: usize,
    assumption: Option<&Assumption>,
) -> Result<Option<Assumption>, Error> {
    match assumption {
        Some(Assumption::Discharged(ty, grade)) => {
            let kind = kinds::infer_coeffect_kind(state, pos, grade)?;
            Ok(Some(Assumption::Discharged(ty.clone(), Coeffect::Zero(kind))))
        }
        Some(Assumption::Linear(_)) | None => Ok(None),
    }
}

/**
The least upper bound of two branches' usage.

A graded variable missing from one side counts as used zero times there. A
linear variable missing from one side is dropped. Each surviving graded
variable gets a fresh grade bounding both sides.
*/
pub fn join(
    state: &mut State,
    pos: usize,
    left: &Context,
    right: &Context,
) -> Result<Context, Error> {
    let mut names = left.names();
    names.extend(right.names().into_iter().filter(|var| !left.contains(var)));

    let mut bindings = Vec::new();
    for var in names {
        let left_assumption = match left.lookup(&var) {
            Some(assumption) => Some(assumption.clone()),
            None => weaken(state, pos, right.lookup(&var))?,
        };
        let right_assumption = match right.lookup(&var) {
            Some(assumption) => Some(assumption.clone()),
            None => weaken(state, pos, left.lookup(&var))?,
        };
        match (left_assumption, right_assumption) {
            (None, _) | (_, None) => {}
            (Some(Assumption::Linear(ty)), Some(Assumption::Linear(_))) => {
                bindings.push((var, Assumption::Linear(ty)))
            }
            (
                Some(Assumption::Discharged(ty, left_grade)),
                Some(Assumption::Discharged(_, right_grade)),
            ) => {
                let left_kind = kinds::infer_coeffect_kind(state, pos, &left_grade)?;
                let right_kind = kinds::infer_coeffect_kind(state, pos, &right_grade)?;
                let kind = kinds::mgu_coeffect_kinds(state, pos, &left_kind, &right_kind)?;
                let upper = state.fresh_coeffect_variable(&var, kind.clone());
                state.add_constraint(Constraint::leq(pos, left_grade, upper.clone(), kind.clone()));
                state.add_constraint(Constraint::leq(pos, right_grade, upper.clone(), kind));
                bindings.push((var, Assumption::Discharged(ty, upper)))
            }
            _ => return Err(Error::linearity(pos, vec![var], LinearityInfo::Mixed)),
        }
    }
    Ok(Context { bindings })
}

/**
Prepare the bindings of `vars` for use under a box graded by `demand`.

Graded bindings get a fresh grade of `demand`'s kind; linear bindings become
graded by one.
*/
pub fn freshen_discharged(
    state: &mut State,
    pos: usize,
    vars: &[Rc<str>],
    context: &Context,
    demand: &Coeffect,
) -> Result<Context, Error> {
    let demand_kind = kinds::infer_coeffect_kind(state, pos, demand)?;
    let mut bindings = Vec::new();
    for (var, assumption) in context.restrict(vars).bindings {
        let assumption = match assumption {
            Assumption::Discharged(ty, grade) => {
                let grade_kind = kinds::infer_coeffect_kind(state, pos, &grade)?;
                let kind = kinds::mgu_coeffect_kinds(state, pos, &grade_kind, &demand_kind)?;
                Assumption::Discharged(ty, state.fresh_coeffect_variable(&var, kind))
            }
            Assumption::Linear(ty) => Assumption::Discharged(ty, Coeffect::One(demand_kind.clone())),
        };
        bindings.push((var, assumption));
    }
    Ok(Context { bindings })
}
