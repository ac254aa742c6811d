use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// The kind of a grade.
#[derive(PartialEq, Eq, Hash, Clone, Debug, Serialize, Deserialize)]
pub enum CoeffectKind {
    Nat,
    Float,
    Level,
    /// A coeffect kind that is not known yet.
    Var(Rc<str>),
}

impl CoeffectKind {
    pub fn render(&self) -> String {
        match self {
            CoeffectKind::Nat => String::from("Nat"),
            CoeffectKind::Float => String::from("Float"),
            CoeffectKind::Level => String::from("Level"),
            CoeffectKind::Var(name) => format!("?{}", name),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub enum Kind {
    Type,
    Effect,
    /// Grades, and the type-level indices that double as grades.
    Coeffect(CoeffectKind),
    Arrow(Rc<Kind>, Rc<Kind>),
}

impl Kind {
    pub fn mk_arrow(a: Kind, b: Kind) -> Self {
        Kind::Arrow(Rc::new(a), Rc::new(b))
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self, Kind::Arrow(_, _))
    }

    pub fn coeffect_kind(&self) -> Option<&CoeffectKind> {
        match self {
            Kind::Coeffect(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Kind::Type => String::from("Type"),
            Kind::Effect => String::from("Effect"),
            Kind::Coeffect(kind) => kind.render(),
            Kind::Arrow(a, b) => {
                let mut val = String::new();
                if a.is_arrow() {
                    val.push('(')
                }
                val.push_str(a.render().as_str());
                if a.is_arrow() {
                    val.push(')')
                }
                val.push_str(" -> ");
                val.push_str(b.render().as_str());
                val
            }
        }
    }
}
