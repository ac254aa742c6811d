use crate::{kind::CoeffectKind, r#type::Type};
use quickcheck::Arbitrary;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// The security lattice, ordered `Unused < Public < Private`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Level {
    Unused,
    Public,
    Private,
}

impl Level {
    pub fn render(&self) -> &'static str {
        match self {
            Level::Unused => "Unused",
            Level::Public => "Public",
            Level::Private => "Private",
        }
    }

    pub fn zero() -> Self {
        Level::Unused
    }

    pub fn one() -> Self {
        Level::Public
    }

    pub fn plus(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn times(self, other: Self) -> Self {
        if self == Level::Unused || other == Level::Unused {
            Level::Unused
        } else {
            self.max(other)
        }
    }
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Coeffect {
    Var(Rc<str>),
    Nat(u64),
    Float(f64),
    Level(Level),
    Zero(CoeffectKind),
    One(CoeffectKind),
    Plus(Rc<Coeffect>, Rc<Coeffect>),
    Times(Rc<Coeffect>, Rc<Coeffect>),
    Join(Rc<Coeffect>, Rc<Coeffect>),
    Meet(Rc<Coeffect>, Rc<Coeffect>),
}

impl Coeffect {
    pub fn mk_var(name: &str) -> Self {
        Coeffect::Var(Rc::from(name))
    }

    pub fn mk_plus(a: Coeffect, b: Coeffect) -> Self {
        Coeffect::Plus(Rc::new(a), Rc::new(b))
    }

    pub fn mk_times(a: Coeffect, b: Coeffect) -> Self {
        Coeffect::Times(Rc::new(a), Rc::new(b))
    }

    pub fn mk_join(a: Coeffect, b: Coeffect) -> Self {
        Coeffect::Join(Rc::new(a), Rc::new(b))
    }

    pub fn mk_meet(a: Coeffect, b: Coeffect) -> Self {
        Coeffect::Meet(Rc::new(a), Rc::new(b))
    }

    /// Syntactically zero: `0` of any kind, the natural `0`, or `Unused`.
    pub fn is_zero(&self) -> bool {
        match self {
            Coeffect::Zero(_) | Coeffect::Nat(0) | Coeffect::Level(Level::Unused) => true,
            Coeffect::Float(value) => *value == 0.0,
            _ => false,
        }
    }

    fn is_atomic(&self) -> bool {
        !matches!(
            self,
            Coeffect::Plus(_, _) | Coeffect::Times(_, _) | Coeffect::Join(_, _) | Coeffect::Meet(_, _)
        )
    }

    fn render_atom(&self) -> String {
        if self.is_atomic() {
            self.render()
        } else {
            format!("({})", self.render())
        }
    }

    pub fn render(&self) -> String {
        match self {
            Coeffect::Var(name) => name.to_string(),
            Coeffect::Nat(n) => n.to_string(),
            Coeffect::Float(value) => format!("{:?}", value),
            Coeffect::Level(level) => String::from(level.render()),
            Coeffect::Zero(CoeffectKind::Level) => String::from("Unused"),
            Coeffect::One(CoeffectKind::Level) => String::from("Public"),
            Coeffect::Zero(_) => String::from("0"),
            Coeffect::One(_) => String::from("1"),
            Coeffect::Plus(a, b) => format!("{} + {}", a.render_atom(), b.render_atom()),
            Coeffect::Times(a, b) => format!("{} * {}", a.render_atom(), b.render_atom()),
            Coeffect::Join(a, b) => format!("{} \\/ {}", a.render_atom(), b.render_atom()),
            Coeffect::Meet(a, b) => format!("{} /\\ {}", a.render_atom(), b.render_atom()),
        }
    }

    /// Variables in order of first occurrence.
    pub fn vars(&self) -> Vec<Rc<str>> {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        vars
    }

    pub(crate) fn collect_vars(&self, vars: &mut Vec<Rc<str>>) {
        match self {
            Coeffect::Var(name) => {
                if !vars.contains(name) {
                    vars.push(name.clone())
                }
            }
            Coeffect::Nat(_)
            | Coeffect::Float(_)
            | Coeffect::Level(_)
            | Coeffect::Zero(_)
            | Coeffect::One(_) => {}
            Coeffect::Plus(a, b)
            | Coeffect::Times(a, b)
            | Coeffect::Join(a, b)
            | Coeffect::Meet(a, b) => {
                a.collect_vars(vars);
                b.collect_vars(vars);
            }
        }
    }

    /**
    Replace variables bound by a type substitution.

    Only bindings whose type injects into the coeffects (see [`Type::to_coeffect`])
    are applied; the rest leave the variable alone.
    */
    pub fn substitute(&self, subst: &[(Rc<str>, Type)]) -> Coeffect {
        match self {
            Coeffect::Var(name) => match subst.iter().find(|(var, _)| var == name) {
                Some((_, ty)) => ty.to_coeffect().unwrap_or_else(|| self.clone()),
                None => self.clone(),
            },
            Coeffect::Nat(_)
            | Coeffect::Float(_)
            | Coeffect::Level(_)
            | Coeffect::Zero(_)
            | Coeffect::One(_) => self.clone(),
            Coeffect::Plus(a, b) => Coeffect::mk_plus(a.substitute(subst), b.substitute(subst)),
            Coeffect::Times(a, b) => Coeffect::mk_times(a.substitute(subst), b.substitute(subst)),
            Coeffect::Join(a, b) => Coeffect::mk_join(a.substitute(subst), b.substitute(subst)),
            Coeffect::Meet(a, b) => Coeffect::mk_meet(a.substitute(subst), b.substitute(subst)),
        }
    }
}

/// Nat-kinded coeffects over the variables `r`, `s` and `t`.
impl Arbitrary for Coeffect {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        fn go(g: &mut quickcheck::Gen, depth: usize) -> Coeffect {
            let choices: &[u8] = if depth == 0 {
                &[0, 1, 2, 3]
            } else {
                &[0, 1, 2, 3, 4, 5]
            };
            match g.choose(choices).copied().unwrap_or(0) {
                0 => Coeffect::mk_var(g.choose(&["r", "s", "t"]).copied().unwrap_or("r")),
                1 => Coeffect::Nat(u64::arbitrary(g) % 6),
                2 => Coeffect::Zero(CoeffectKind::Nat),
                3 => Coeffect::One(CoeffectKind::Nat),
                4 => Coeffect::mk_plus(go(g, depth - 1), go(g, depth - 1)),
                _ => Coeffect::mk_times(go(g, depth - 1), go(g, depth - 1)),
            }
        }
        go(g, 2)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Coeffect::Plus(a, b)
            | Coeffect::Times(a, b)
            | Coeffect::Join(a, b)
            | Coeffect::Meet(a, b) => {
                Box::new(vec![a.as_ref().clone(), b.as_ref().clone()].into_iter())
            }
            _ => quickcheck::empty_shrinker(),
        }
    }
}
