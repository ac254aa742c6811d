//! Exhaustive search over small grade values.
//!
//! Universal variables range over a bounded domain. Exhausting a natural or
//! real domain without finding a counterexample proves nothing about larger
//! values, so that outcome is reported as an inconclusive `Error` rather than
//! `Valid`. Existential variables that a conjunct pins down by an equation are
//! solved directly rather than searched.

use super::{compile, evaluate, holds, Binder, Formula, Prover, Query, Value, Verdict};
use crate::{
    predicate::{Constraint, Predicate, Relation},
    state::Quantifier,
};
use graded_syntax::{Coeffect, CoeffectKind, Level};
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct BoundedProver {
    /// Universal naturals range over `0..=nat_bound`.
    pub nat_bound: u64,
    /// Spacing of the real-valued grid.
    pub float_step: f64,
    /// Maximum number of atomic evaluations before giving up.
    pub search_limit: u64,
}

impl Default for BoundedProver {
    fn default() -> Self {
        BoundedProver {
            nat_bound: 8,
            float_step: 0.5,
            search_limit: 5_000_000,
        }
    }
}

fn float_literals(grade: &Coeffect, acc: &mut Vec<f64>) {
    match grade {
        Coeffect::Float(value) => acc.push(*value),
        Coeffect::Nat(n) => acc.push(*n as f64),
        Coeffect::Plus(a, b) | Coeffect::Times(a, b) | Coeffect::Join(a, b) | Coeffect::Meet(a, b) => {
            float_literals(a, acc);
            float_literals(b, acc);
        }
        Coeffect::Var(_) | Coeffect::Level(_) | Coeffect::Zero(_) | Coeffect::One(_) => {}
    }
}

fn float_formula_literals(formula: &Formula, acc: &mut Vec<f64>) {
    match formula {
        Formula::Atom(constraint) => {
            if constraint.kind == CoeffectKind::Float {
                float_literals(&constraint.left, acc);
                float_literals(&constraint.right, acc);
            }
        }
        Formula::And(items) => items
            .iter()
            .for_each(|item| float_formula_literals(item, acc)),
        Formula::Implies(a, b) => {
            float_formula_literals(a, acc);
            float_formula_literals(b, acc);
        }
        Formula::Forall(_, body) | Formula::Exists(_, body) => float_formula_literals(body, acc),
    }
}

fn float_grid(step: f64, upper: u64, literals: &[f64]) -> Vec<f64> {
    let mut values = literals.to_vec();
    values.push(0.0);
    if step > 0.0 {
        let count = (upper as f64 / step).floor() as u64;
        values.extend((0..=count).map(|k| k as f64 * step));
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON);
    values
}

struct Search<'a> {
    config: &'a BoundedProver,
    universal_floats: Vec<f64>,
    existential_floats: Vec<f64>,
    steps: u64,
    /// Set once a universal over an unbounded kind held for every value tried.
    truncated: bool,
}

impl<'a> Search<'a> {
    fn new(config: &'a BoundedProver, query: &Query) -> Self {
        let mut literals = Vec::new();
        float_formula_literals(&query.body, &mut literals);
        Search {
            config,
            universal_floats: float_grid(config.float_step, config.nat_bound, &literals),
            existential_floats: float_grid(
                config.float_step,
                2 * config.nat_bound + 1,
                &literals,
            ),
            steps: 0,
            truncated: false,
        }
    }

    fn domain(&self, kind: &CoeffectKind, existential: bool) -> Vec<Value> {
        match kind {
            CoeffectKind::Level => vec![
                Value::Level(Level::Unused),
                Value::Level(Level::Public),
                Value::Level(Level::Private),
            ],
            CoeffectKind::Float => {
                let floats = if existential {
                    &self.existential_floats
                } else {
                    &self.universal_floats
                };
                floats.iter().copied().map(Value::Float).collect()
            }
            CoeffectKind::Nat | CoeffectKind::Var(_) => {
                let upper = if existential {
                    2 * self.config.nat_bound + 1
                } else {
                    self.config.nat_bound
                };
                (0..=upper).map(Value::Nat).collect()
            }
        }
    }

    fn exhausted(&mut self, kind: &CoeffectKind) {
        if *kind != CoeffectKind::Level {
            self.truncated = true;
        }
    }

    fn step(&mut self) -> Result<(), String> {
        self.steps += 1;
        if self.steps > self.config.search_limit {
            Err(format!(
                "gave up after {} evaluations",
                self.config.search_limit
            ))
        } else {
            Ok(())
        }
    }

    fn eval(&mut self, formula: &Formula, assignment: &mut Vec<(Rc<str>, Value)>) -> Result<bool, String> {
        match formula {
            Formula::Atom(constraint) => {
                self.step()?;
                holds(constraint, assignment)
            }
            Formula::And(items) => {
                for item in items {
                    if !self.eval(item, assignment)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Formula::Implies(antecedent, consequent) => {
                if self.eval(antecedent, assignment)? {
                    self.eval(consequent, assignment)
                } else {
                    Ok(true)
                }
            }
            Formula::Forall(vars, body) => self.enumerate(vars, body, assignment, false),
            Formula::Exists(vars, body) => {
                let before = assignment.len();
                let rest = self.propagate(vars, body, assignment);
                let result = self.enumerate(&rest, body, assignment, true);
                assignment.truncate(before);
                result
            }
        }
    }

    /// Try every value of `vars`; `existential` decides whether one or all must succeed.
    fn enumerate(
        &mut self,
        vars: &[Binder],
        body: &Formula,
        assignment: &mut Vec<(Rc<str>, Value)>,
        existential: bool,
    ) -> Result<bool, String> {
        match vars.split_first() {
            None => self.eval(body, assignment),
            Some(((var, kind), rest)) => {
                for value in self.domain(kind, existential) {
                    assignment.push((var.clone(), value));
                    let result = self.enumerate(rest, body, assignment, existential);
                    assignment.pop();
                    if result? == existential {
                        return Ok(existential);
                    }
                }
                if !existential {
                    self.exhausted(kind);
                }
                Ok(!existential)
            }
        }
    }

    /**
    Fix the existential variables that a top-level equation determines.

    Returns the variables that still have to be searched.
    */
    fn propagate(
        &mut self,
        vars: &[Binder],
        body: &Formula,
        assignment: &mut Vec<(Rc<str>, Value)>,
    ) -> Vec<Binder> {
        fn equations<'f>(formula: &'f Formula, acc: &mut Vec<&'f Constraint>) {
            match formula {
                Formula::Atom(constraint) if constraint.relation == Relation::Eq => {
                    acc.push(constraint)
                }
                Formula::And(items) => items.iter().for_each(|item| equations(item, acc)),
                _ => {}
            }
        }
        let mut found = Vec::new();
        equations(body, &mut found);

        let mut pending = vars.to_vec();
        loop {
            let solved = found.iter().find_map(|constraint| {
                let sides = [
                    (&constraint.left, &constraint.right),
                    (&constraint.right, &constraint.left),
                ];
                sides.iter().find_map(|(var_side, value_side)| match var_side {
                    Coeffect::Var(var) => {
                        let ix = pending.iter().position(|(other, _)| other == var)?;
                        let value = evaluate(&constraint.kind, value_side, assignment).ok()?;
                        Some((ix, value))
                    }
                    _ => None,
                })
            });
            match solved {
                Some((ix, value)) => {
                    let (var, _) = pending.remove(ix);
                    tracing::trace!(var = %var, value = %value.render(), "solved by equation");
                    assignment.push((var, value));
                }
                None => break,
            }
        }
        pending
    }

    fn falsify(
        &mut self,
        vars: &[Binder],
        body: &Formula,
        assignment: &mut Vec<(Rc<str>, Value)>,
    ) -> Result<Option<Vec<(Rc<str>, Value)>>, String> {
        match vars.split_first() {
            None => {
                if self.eval(body, assignment)? {
                    Ok(None)
                } else {
                    Ok(Some(assignment.clone()))
                }
            }
            Some(((var, kind), rest)) => {
                for value in self.domain(kind, false) {
                    assignment.push((var.clone(), value));
                    let result = self.falsify(rest, body, assignment);
                    assignment.pop();
                    if let Some(counterexample) = result? {
                        return Ok(Some(counterexample));
                    }
                }
                self.exhausted(kind);
                Ok(None)
            }
        }
    }
}

impl BoundedProver {
    pub fn solve_query(&self, query: &Query) -> Verdict {
        let mut search = Search::new(self, query);
        let mut assignment = Vec::new();
        let result = search.falsify(&query.universals, &query.body, &mut assignment);
        tracing::debug!(steps = search.steps, "bounded search finished");
        match result {
            Ok(None) if search.truncated => Verdict::Error(format!(
                "bounded search inconclusive: no counterexample with naturals up to {}",
                self.nat_bound
            )),
            Ok(None) => Verdict::Valid,
            Ok(Some(counterexample)) => Verdict::Invalid(counterexample),
            Err(message) => Verdict::Error(message),
        }
    }
}

impl Prover for BoundedProver {
    fn solve(
        &mut self,
        predicate: &Predicate,
        vars: &[(Rc<str>, CoeffectKind, Quantifier)],
    ) -> Verdict {
        self.solve_query(&compile(predicate, vars))
    }
}
