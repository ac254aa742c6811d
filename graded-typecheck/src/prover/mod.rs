//! Deciding the validity of accumulated grade predicates.
//!
//! A predicate is first compiled into a closed [`Formula`] that places every
//! variable under the right quantifier. Backends decide whether that formula
//! is true.

#[cfg(test)]
mod test;

pub mod bounded;
pub mod smt;

pub use bounded::BoundedProver;
pub use smt::SmtProver;

use crate::{
    predicate::{Constraint, Predicate, Relation},
    state::Quantifier,
};
use graded_syntax::{Coeffect, CoeffectKind, Level};
use std::rc::Rc;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Value {
    Nat(u64),
    Float(f64),
    Level(Level),
}

impl Value {
    pub fn render(&self) -> String {
        match self {
            Value::Nat(n) => n.to_string(),
            Value::Float(value) => format!("{:?}", value),
            Value::Level(level) => String::from(level.render()),
        }
    }
}

#[derive(PartialEq, Clone, Debug)]
pub enum Verdict {
    /// No assignment falsifies the predicate.
    Valid,
    /// A falsifying assignment of the outermost universal variables.
    Invalid(Vec<(Rc<str>, Value)>),
    /// The backend could not decide.
    Error(String),
}

pub trait Prover {
    /// Decide whether `predicate` holds for every assignment of its universal variables.
    fn solve(
        &mut self,
        predicate: &Predicate,
        vars: &[(Rc<str>, CoeffectKind, Quantifier)],
    ) -> Verdict;
}

pub type Binder = (Rc<str>, CoeffectKind);

#[derive(PartialEq, Clone, Debug)]
pub enum Formula {
    Atom(Constraint),
    And(Vec<Formula>),
    Implies(Rc<Formula>, Rc<Formula>),
    Forall(Vec<Binder>, Rc<Formula>),
    Exists(Vec<Binder>, Rc<Formula>),
}

impl Formula {
    fn forall(vars: Vec<Binder>, body: Formula) -> Self {
        if vars.is_empty() {
            body
        } else {
            Formula::Forall(vars, Rc::new(body))
        }
    }

    fn exists(vars: Vec<Binder>, body: Formula) -> Self {
        if vars.is_empty() {
            body
        } else {
            Formula::Exists(vars, Rc::new(body))
        }
    }

    pub fn render(&self) -> String {
        fn binders(vars: &[Binder]) -> String {
            vars.iter()
                .map(|(var, kind)| format!("({} : {})", var, kind.render()))
                .collect::<Vec<_>>()
                .join(" ")
        }
        match self {
            Formula::Atom(constraint) => constraint.render(),
            Formula::And(items) => {
                if items.is_empty() {
                    String::from("true")
                } else {
                    items
                        .iter()
                        .map(|item| format!("({})", item.render()))
                        .collect::<Vec<_>>()
                        .join(" && ")
                }
            }
            Formula::Implies(a, b) => format!("({}) -> ({})", a.render(), b.render()),
            Formula::Forall(vars, body) => format!("forall {}. {}", binders(vars), body.render()),
            Formula::Exists(vars, body) => format!("exists {}. {}", binders(vars), body.render()),
        }
    }
}

/// A compiled predicate.
#[derive(PartialEq, Clone, Debug)]
pub struct Query {
    /// Outermost universal variables; falsifying assignments are reported over these.
    pub universals: Vec<Binder>,
    /// The formula under the universals.
    pub body: Formula,
}

impl Query {
    pub fn formula(&self) -> Formula {
        Formula::forall(self.universals.clone(), self.body.clone())
    }
}

fn kind_of(vars: &[(Rc<str>, CoeffectKind, Quantifier)], var: &str) -> Option<CoeffectKind> {
    vars.iter()
        .find(|(other, _, _)| other.as_ref() == var)
        .map(|(_, kind, _)| kind.clone())
}

/// Whether `var` can be bound further inside `predicate`.
fn can_sink(predicate: &Predicate, var: &str) -> bool {
    match predicate {
        Predicate::Constraint(_) => false,
        Predicate::Conj(_) => true,
        Predicate::Impl { antecedent, .. } => !antecedent.mentions(var),
    }
}

fn quantify(
    predicate: &Predicate,
    pending: Vec<Rc<str>>,
    vars: &[(Rc<str>, CoeffectKind, Quantifier)],
) -> Formula {
    let (here, body) = match predicate {
        Predicate::Constraint(constraint) => (pending, Formula::Atom(constraint.clone())),
        Predicate::Conj(items) => {
            let mut here = Vec::new();
            let mut sunk: Vec<Vec<Rc<str>>> = vec![Vec::new(); items.len()];
            for var in pending {
                let holders: Vec<usize> = items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| item.mentions(&var))
                    .map(|(ix, _)| ix)
                    .collect();
                match holders.as_slice() {
                    [ix] if can_sink(&items[*ix], &var) => sunk[*ix].push(var),
                    _ => here.push(var),
                }
            }
            let items = items
                .iter()
                .zip(sunk)
                .map(|(item, pending)| quantify(item, pending, vars))
                .collect();
            (here, Formula::And(items))
        }
        Predicate::Impl {
            bound,
            antecedent,
            consequent,
        } => {
            let (into, here): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|var| !antecedent.mentions(var));
            let bound = bound
                .iter()
                .filter(|(var, _)| predicate.mentions(var))
                .filter_map(|(var, _)| kind_of(vars, var).map(|kind| (var.clone(), kind)))
                .collect();
            let implication = Formula::Implies(
                Rc::new(quantify(antecedent, Vec::new(), vars)),
                Rc::new(quantify(consequent, into, vars)),
            );
            (here, Formula::forall(bound, implication))
        }
    };
    let here = here
        .into_iter()
        .filter_map(|var| kind_of(vars, &var).map(|kind| (var, kind)))
        .collect();
    Formula::exists(here, body)
}

/**
Compile a predicate into a closed query.

Universal variables are quantified outermost. Variables bound by an implication
are quantified universally at that implication. Every other variable is
quantified existentially at the innermost implication consequent that contains
all of its occurrences.
*/
pub fn compile(predicate: &Predicate, vars: &[(Rc<str>, CoeffectKind, Quantifier)]) -> Query {
    let implication_bound = predicate.bound_vars();

    let mut mentioned: Vec<(Rc<str>, CoeffectKind, Quantifier)> = Vec::new();
    for constraint in predicate.constraints() {
        for var in constraint.vars() {
            if mentioned.iter().any(|(other, _, _)| *other == var) {
                continue;
            }
            let (kind, quantifier) = match vars.iter().find(|(other, _, _)| *other == var) {
                Some((_, kind, quantifier)) => (kind.clone(), *quantifier),
                None => (constraint.kind.clone(), Quantifier::Instantiated),
            };
            mentioned.push((var, kind, quantifier));
        }
    }

    let universals = mentioned
        .iter()
        .filter(|(var, _, quantifier)| match quantifier {
            Quantifier::Universal => true,
            Quantifier::PatternBound => !implication_bound.contains(var),
            Quantifier::Instantiated => false,
        })
        .map(|(var, kind, _)| (var.clone(), kind.clone()))
        .collect();
    let pending = mentioned
        .iter()
        .filter(|(_, _, quantifier)| *quantifier == Quantifier::Instantiated)
        .map(|(var, _, _)| var.clone())
        .collect();

    Query {
        universals,
        body: quantify(predicate, pending, &mentioned),
    }
}

fn float_of(value: Value) -> Result<f64, String> {
    match value {
        Value::Nat(n) => Ok(n as f64),
        Value::Float(value) => Ok(value),
        Value::Level(level) => Err(format!("{} is not a number", level.render())),
    }
}

fn nat_of(value: Value) -> Result<u64, String> {
    match value {
        Value::Nat(n) => Ok(n),
        other => Err(format!("{} is not a natural number", other.render())),
    }
}

fn level_of(value: Value) -> Result<Level, String> {
    match value {
        Value::Level(level) => Ok(level),
        other => Err(format!("{} is not a security level", other.render())),
    }
}

fn zero(kind: &CoeffectKind) -> Result<Value, String> {
    match kind {
        CoeffectKind::Nat => Ok(Value::Nat(0)),
        CoeffectKind::Float => Ok(Value::Float(0.0)),
        CoeffectKind::Level => Ok(Value::Level(Level::zero())),
        CoeffectKind::Var(_) => Err(format!("unresolved coeffect kind {}", kind.render())),
    }
}

fn one(kind: &CoeffectKind) -> Result<Value, String> {
    match kind {
        CoeffectKind::Nat => Ok(Value::Nat(1)),
        CoeffectKind::Float => Ok(Value::Float(1.0)),
        CoeffectKind::Level => Ok(Value::Level(Level::one())),
        CoeffectKind::Var(_) => Err(format!("unresolved coeffect kind {}", kind.render())),
    }
}

#[derive(Clone, Copy)]
enum Operation {
    Plus,
    Times,
    Join,
    Meet,
}

fn apply(kind: &CoeffectKind, op: Operation, a: Value, b: Value) -> Result<Value, String> {
    match kind {
        CoeffectKind::Nat => {
            let (a, b) = (nat_of(a)?, nat_of(b)?);
            Ok(Value::Nat(match op {
                Operation::Plus => a.saturating_add(b),
                Operation::Times => a.saturating_mul(b),
                Operation::Join => a.max(b),
                Operation::Meet => a.min(b),
            }))
        }
        CoeffectKind::Float => {
            let (a, b) = (float_of(a)?, float_of(b)?);
            Ok(Value::Float(match op {
                Operation::Plus => a + b,
                Operation::Times => a * b,
                Operation::Join => a.max(b),
                Operation::Meet => a.min(b),
            }))
        }
        CoeffectKind::Level => {
            let (a, b) = (level_of(a)?, level_of(b)?);
            Ok(Value::Level(match op {
                Operation::Plus => a.plus(b),
                Operation::Times => a.times(b),
                Operation::Join => a.max(b),
                Operation::Meet => a.min(b),
            }))
        }
        CoeffectKind::Var(_) => Err(format!("unresolved coeffect kind {}", kind.render())),
    }
}

/// Evaluate a grade at kind `kind` under an assignment.
pub fn evaluate(
    kind: &CoeffectKind,
    grade: &Coeffect,
    assignment: &[(Rc<str>, Value)],
) -> Result<Value, String> {
    match grade {
        Coeffect::Var(var) => assignment
            .iter()
            .rev()
            .find(|(other, _)| other == var)
            .map(|(_, value)| *value)
            .ok_or_else(|| format!("no value for {}", var)),
        Coeffect::Nat(n) => match kind {
            CoeffectKind::Float => Ok(Value::Float(*n as f64)),
            _ => Ok(Value::Nat(*n)),
        },
        Coeffect::Float(value) => Ok(Value::Float(*value)),
        Coeffect::Level(level) => Ok(Value::Level(*level)),
        Coeffect::Zero(_) => zero(kind),
        Coeffect::One(_) => one(kind),
        Coeffect::Plus(a, b) => binary(kind, Operation::Plus, a, b, assignment),
        Coeffect::Times(a, b) => binary(kind, Operation::Times, a, b, assignment),
        Coeffect::Join(a, b) => binary(kind, Operation::Join, a, b, assignment),
        Coeffect::Meet(a, b) => binary(kind, Operation::Meet, a, b, assignment),
    }
}

fn binary(
    kind: &CoeffectKind,
    op: Operation,
    a: &Coeffect,
    b: &Coeffect,
    assignment: &[(Rc<str>, Value)],
) -> Result<Value, String> {
    let a = evaluate(kind, a, assignment)?;
    let b = evaluate(kind, b, assignment)?;
    apply(kind, op, a, b)
}

const FLOAT_TOLERANCE: f64 = 1e-9;

/// Decide an atomic constraint under an assignment.
pub fn holds(constraint: &Constraint, assignment: &[(Rc<str>, Value)]) -> Result<bool, String> {
    let kind = &constraint.kind;
    let left = evaluate(kind, &constraint.left, assignment)?;
    let right = evaluate(kind, &constraint.right, assignment)?;
    match kind {
        CoeffectKind::Float => {
            let (left, right) = (float_of(left)?, float_of(right)?);
            Ok(match constraint.relation {
                Relation::Eq => (left - right).abs() <= FLOAT_TOLERANCE,
                Relation::Leq => left <= right + FLOAT_TOLERANCE,
            })
        }
        CoeffectKind::Level => {
            let (left, right) = (level_of(left)?, level_of(right)?);
            Ok(match constraint.relation {
                Relation::Eq => left == right,
                Relation::Leq => left <= right,
            })
        }
        _ => {
            let (left, right) = (nat_of(left)?, nat_of(right)?);
            Ok(match constraint.relation {
                Relation::Eq => left == right,
                Relation::Leq => left <= right,
            })
        }
    }
}

/// A constraint without variables that is false.
pub fn is_trivially_false(constraint: &Constraint) -> bool {
    constraint.vars().is_empty() && holds(constraint, &[]) == Ok(false)
}
