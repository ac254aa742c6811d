//! Per-run checker state: the growing predicate, open implication scopes,
//! the kind context, and fresh-name supply.

use crate::predicate::{Constraint, Predicate};
use fnv::FnvHashMap;
use graded_syntax::{Coeffect, CoeffectKind, Kind};
use std::rc::Rc;

/// How a type or grade variable came into scope.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Quantifier {
    /// Bound by the signature being checked.
    Universal,
    /// Minted while checking, to be solved.
    Instantiated,
    /// Introduced by a pattern match.
    PatternBound,
}

#[derive(Clone, Debug, Default)]
struct Scope {
    antecedent: Vec<Predicate>,
    consequent: Vec<Predicate>,
    in_consequent: bool,
}

impl Scope {
    fn into_predicate(self) -> Predicate {
        let mut items = self.antecedent;
        items.extend(self.consequent);
        Predicate::Conj(items)
    }
}

#[derive(Clone, Debug, Default)]
pub struct State {
    predicate: Vec<Predicate>,
    scopes: Vec<Scope>,
    kind_context: Vec<(Rc<str>, Kind, Quantifier)>,
    coeffect_kinds: FnvHashMap<Rc<str>, CoeffectKind>,
    next_fresh: usize,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /**
    Forget everything learned while checking a definition.

    The fresh-name counter survives, so names stay unique across the run.
    */
    pub fn reset(&mut self) {
        self.predicate.clear();
        self.scopes.clear();
        self.kind_context.clear();
        self.coeffect_kinds.clear();
    }

    pub fn fresh_name(&mut self, hint: &str) -> Rc<str> {
        let n = self.next_fresh;
        self.next_fresh += 1;
        Rc::from(format!("{}.{}", hint, n))
    }

    pub fn bind_type_variable(&mut self, name: Rc<str>, kind: Kind, quantifier: Quantifier) {
        self.kind_context.push((name, kind, quantifier));
    }

    pub fn fresh_type_variable(&mut self, hint: &str, kind: Kind, quantifier: Quantifier) -> Rc<str> {
        let name = self.fresh_name(hint);
        self.bind_type_variable(name.clone(), kind, quantifier);
        name
    }

    pub fn fresh_coeffect_variable(&mut self, hint: &str, kind: CoeffectKind) -> Coeffect {
        Coeffect::Var(self.fresh_type_variable(hint, Kind::Coeffect(kind), Quantifier::Instantiated))
    }

    pub fn fresh_coeffect_kind(&mut self, hint: &str) -> CoeffectKind {
        CoeffectKind::Var(self.fresh_name(hint))
    }

    pub fn lookup_type_variable(&self, name: &str) -> Option<(&Kind, Quantifier)> {
        self.kind_context
            .iter()
            .rev()
            .find(|(var, _, _)| var.as_ref() == name)
            .map(|(_, kind, quantifier)| (kind, *quantifier))
    }

    pub fn type_variables(&self) -> &[(Rc<str>, Kind, Quantifier)] {
        &self.kind_context
    }

    /// Follow coeffect-kind variable bindings as far as they go.
    pub fn resolve_coeffect_kind(&self, kind: &CoeffectKind) -> CoeffectKind {
        let mut current = kind;
        while let CoeffectKind::Var(name) = current {
            match self.coeffect_kinds.get(name) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    pub fn bind_coeffect_kind(&mut self, name: Rc<str>, kind: CoeffectKind) {
        tracing::debug!(var = %name, kind = %kind.render(), "bound coeffect kind");
        self.coeffect_kinds.insert(name, kind);
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        tracing::debug!(constraint = %constraint.render(), "added constraint");
        let item = Predicate::Constraint(constraint);
        match self.scopes.last_mut() {
            None => self.predicate.push(item),
            Some(scope) if scope.in_consequent => scope.consequent.push(item),
            Some(scope) => scope.antecedent.push(item),
        }
    }

    /// Start collecting the antecedent of a new implication.
    pub fn open_implication_scope(&mut self) {
        tracing::debug!(depth = self.scopes.len() + 1, "opened implication scope");
        self.scopes.push(Scope::default());
    }

    /// Constraints added from now on belong to the innermost consequent.
    pub fn enter_consequent(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.in_consequent = true;
        }
    }

    /// Pop the innermost scope and wrap it in an implication binding `bound`.
    pub fn close_implication_scope(&mut self, bound: Vec<(Rc<str>, Kind)>) {
        if let Some(scope) = self.scopes.pop() {
            tracing::debug!(depth = self.scopes.len() + 1, "closed implication scope");
            let implication = Predicate::mk_impl(
                bound,
                Predicate::Conj(scope.antecedent),
                Predicate::Conj(scope.consequent),
            );
            match self.scopes.last_mut() {
                None => self.predicate.push(implication),
                Some(outer) if outer.in_consequent => outer.consequent.push(implication),
                Some(outer) => outer.antecedent.push(implication),
            }
        }
    }

    /// The accumulated predicate, including any scopes that are still open.
    pub fn predicate(&self) -> Predicate {
        let mut items = self.predicate.clone();
        items.extend(self.scopes.iter().cloned().map(Scope::into_predicate));
        Predicate::Conj(items)
    }

    /**
    The coeffect-kinded part of the kind context, with kinds resolved.

    Coeffect kinds that were never determined default to `Nat`.
    */
    pub fn coeffect_variables(&self) -> Vec<(Rc<str>, CoeffectKind, Quantifier)> {
        self.kind_context
            .iter()
            .filter_map(|(var, kind, quantifier)| match kind {
                Kind::Coeffect(kind) => {
                    let kind = match self.resolve_coeffect_kind(kind) {
                        CoeffectKind::Var(_) => CoeffectKind::Nat,
                        kind => kind,
                    };
                    Some((var.clone(), kind, *quantifier))
                }
                _ => None,
            })
            .collect()
    }
}
