//! Grade constraints and the predicates built from them.

use graded_syntax::{Coeffect, CoeffectKind, Kind};
use std::rc::Rc;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Relation {
    Eq,
    Leq,
}

impl Relation {
    pub fn render(&self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Leq => "<=",
        }
    }
}

/// `left relation right`, at coeffect kind `kind`.
#[derive(PartialEq, Clone, Debug)]
pub struct Constraint {
    pub pos: usize,
    pub relation: Relation,
    pub left: Coeffect,
    pub right: Coeffect,
    pub kind: CoeffectKind,
}

impl Constraint {
    pub fn eq(pos: usize, left: Coeffect, right: Coeffect, kind: CoeffectKind) -> Self {
        Constraint {
            pos,
            relation: Relation::Eq,
            left,
            right,
            kind,
        }
    }

    pub fn leq(pos: usize, left: Coeffect, right: Coeffect, kind: CoeffectKind) -> Self {
        Constraint {
            pos,
            relation: Relation::Leq,
            left,
            right,
            kind,
        }
    }

    pub fn vars(&self) -> Vec<Rc<str>> {
        let mut vars = self.left.vars();
        for var in self.right.vars() {
            if !vars.contains(&var) {
                vars.push(var)
            }
        }
        vars
    }

    pub fn render(&self) -> String {
        format!(
            "{} {} {} : {}",
            self.left.render(),
            self.relation.render(),
            self.right.render(),
            self.kind.render()
        )
    }
}

#[derive(PartialEq, Clone, Debug)]
pub enum Predicate {
    Constraint(Constraint),
    Conj(Vec<Predicate>),
    /// `forall bound. antecedent -> consequent`
    Impl {
        bound: Vec<(Rc<str>, Kind)>,
        antecedent: Rc<Predicate>,
        consequent: Rc<Predicate>,
    },
}

impl Predicate {
    pub fn mk_impl(bound: Vec<(Rc<str>, Kind)>, antecedent: Predicate, consequent: Predicate) -> Self {
        Predicate::Impl {
            bound,
            antecedent: Rc::new(antecedent),
            consequent: Rc::new(consequent),
        }
    }

    pub fn is_trivial(&self) -> bool {
        match self {
            Predicate::Constraint(_) => false,
            Predicate::Conj(items) => items.iter().all(Predicate::is_trivial),
            Predicate::Impl { consequent, .. } => consequent.is_trivial(),
        }
    }

    /// Every atomic constraint, in the order they were emitted.
    pub fn constraints(&self) -> Vec<&Constraint> {
        fn go<'a>(predicate: &'a Predicate, acc: &mut Vec<&'a Constraint>) {
            match predicate {
                Predicate::Constraint(constraint) => acc.push(constraint),
                Predicate::Conj(items) => items.iter().for_each(|item| go(item, acc)),
                Predicate::Impl {
                    antecedent,
                    consequent,
                    ..
                } => {
                    go(antecedent, acc);
                    go(consequent, acc);
                }
            }
        }
        let mut acc = Vec::new();
        go(self, &mut acc);
        acc
    }

    /// Variables bound by implications anywhere in the predicate.
    pub fn bound_vars(&self) -> Vec<Rc<str>> {
        match self {
            Predicate::Constraint(_) => Vec::new(),
            Predicate::Conj(items) => items.iter().flat_map(Predicate::bound_vars).collect(),
            Predicate::Impl {
                bound,
                antecedent,
                consequent,
            } => bound
                .iter()
                .map(|(var, _)| var.clone())
                .chain(antecedent.bound_vars())
                .chain(consequent.bound_vars())
                .collect(),
        }
    }

    pub fn mentions(&self, var: &str) -> bool {
        match self {
            Predicate::Constraint(constraint) => {
                constraint.vars().iter().any(|other| other.as_ref() == var)
            }
            Predicate::Conj(items) => items.iter().any(|item| item.mentions(var)),
            Predicate::Impl {
                antecedent,
                consequent,
                ..
            } => antecedent.mentions(var) || consequent.mentions(var),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Predicate::Constraint(constraint) => constraint.render(),
            Predicate::Conj(items) => {
                if items.is_empty() {
                    String::from("true")
                } else {
                    items
                        .iter()
                        .map(|item| match item {
                            Predicate::Constraint(_) => item.render(),
                            _ => format!("({})", item.render()),
                        })
                        .collect::<Vec<_>>()
                        .join(" && ")
                }
            }
            Predicate::Impl {
                bound,
                antecedent,
                consequent,
            } => {
                let mut s = String::new();
                if !bound.is_empty() {
                    s.push_str("forall");
                    for (var, kind) in bound {
                        s.push_str(&format!(" ({} : {})", var, kind.render()));
                    }
                    s.push_str(". ");
                }
                s.push_str(&format!("{} -> {}", antecedent.render(), consequent.render()));
                s
            }
        }
    }
}
