//! The abstract syntax of the graded language.

#[cfg(test)]
mod test;

pub mod coeffect;
pub mod kind;
pub mod r#type;

pub use coeffect::{Coeffect, Level};
pub use kind::{CoeffectKind, Kind};
pub use r#type::{Substitution, Type, TypeOperator, TypeScheme};

use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Spanned<A> {
    pub pos: usize,
    pub item: A,
}

impl<A> Spanned<A> {
    pub fn new(pos: usize, item: A) -> Self {
        Spanned { pos, item }
    }

    pub fn map<B>(&self, f: impl FnOnce(&A) -> B) -> Spanned<B> {
        Spanned {
            pos: self.pos,
            item: f(&self.item),
        }
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Binop {
    Add,
    Sub,
    Mul,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl Binop {
    pub fn render(&self) -> &'static str {
        match self {
            Binop::Add => "+",
            Binop::Sub => "-",
            Binop::Mul => "*",
            Binop::Eq => "==",
            Binop::Neq => "/=",
            Binop::Lt => "<",
            Binop::Gt => ">",
            Binop::Lte => "<=",
            Binop::Gte => ">=",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Pattern {
    Var(Rc<str>),
    Wildcard,
    Int(i64),
    Float(f64),
    /// `[p]`
    Box(Rc<Spanned<Pattern>>),
    Pair(Rc<Spanned<Pattern>>, Rc<Spanned<Pattern>>),
    Constructor {
        name: Rc<str>,
        args: Vec<Spanned<Pattern>>,
    },
}

impl Pattern {
    pub fn mk_var(name: &str) -> Self {
        Pattern::Var(Rc::from(name))
    }

    pub fn mk_box(pattern: Spanned<Pattern>) -> Self {
        Pattern::Box(Rc::new(pattern))
    }

    pub fn mk_constructor(name: &str, args: Vec<Spanned<Pattern>>) -> Self {
        Pattern::Constructor {
            name: Rc::from(name),
            args,
        }
    }

    pub fn bound_vars(&self) -> Vec<Rc<str>> {
        fn go(pattern: &Pattern, vars: &mut Vec<Rc<str>>) {
            match pattern {
                Pattern::Var(name) => vars.push(name.clone()),
                Pattern::Wildcard | Pattern::Int(_) | Pattern::Float(_) => {}
                Pattern::Box(inner) => go(&inner.item, vars),
                Pattern::Pair(a, b) => {
                    go(&a.item, vars);
                    go(&b.item, vars);
                }
                Pattern::Constructor { args, .. } => {
                    args.iter().for_each(|arg| go(&arg.item, vars))
                }
            }
        }
        let mut vars = Vec::new();
        go(self, &mut vars);
        vars
    }

    pub fn render(&self) -> String {
        match self {
            Pattern::Var(name) => name.to_string(),
            Pattern::Wildcard => String::from("_"),
            Pattern::Int(n) => n.to_string(),
            Pattern::Float(value) => format!("{:?}", value),
            Pattern::Box(inner) => format!("[{}]", inner.item.render()),
            Pattern::Pair(a, b) => format!("({}, {})", a.item.render(), b.item.render()),
            Pattern::Constructor { name, args } => {
                let mut s = name.to_string();
                for arg in args {
                    s.push(' ');
                    match &arg.item {
                        Pattern::Constructor { args, .. } if !args.is_empty() => {
                            s.push('(');
                            s.push_str(&arg.item.render());
                            s.push(')');
                        }
                        item => s.push_str(&item.render()),
                    }
                }
                s
            }
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub pattern: Spanned<Pattern>,
    pub body: Spanned<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Var(Rc<str>),
    Constructor(Rc<str>),
    Lam {
        name: Spanned<Rc<str>>,
        ty: Option<Type>,
        body: Rc<Spanned<Expr>>,
    },
    App(Rc<Spanned<Expr>>, Rc<Spanned<Expr>>),
    /// `[e]`
    Promote(Rc<Spanned<Expr>>),
    /// `<e>`
    Pure(Rc<Spanned<Expr>>),
    Binop(Binop, Rc<Spanned<Expr>>, Rc<Spanned<Expr>>),
    Pair(Rc<Spanned<Expr>>, Rc<Spanned<Expr>>),
    Case(Rc<Spanned<Expr>>, Vec<Branch>),
    /// `let x <- value ; rest`
    LetDiamond {
        name: Spanned<Rc<str>>,
        ty: Option<Type>,
        value: Rc<Spanned<Expr>>,
        rest: Rc<Spanned<Expr>>,
    },
    /// `let [x] : ty = value in rest`
    LetBox {
        name: Spanned<Rc<str>>,
        ty: Type,
        value: Rc<Spanned<Expr>>,
        rest: Rc<Spanned<Expr>>,
    },
}

impl Expr {
    pub fn mk_var(name: &str) -> Self {
        Expr::Var(Rc::from(name))
    }

    pub fn mk_constructor(name: &str) -> Self {
        Expr::Constructor(Rc::from(name))
    }

    pub fn mk_lam(name: Spanned<&str>, ty: Option<Type>, body: Spanned<Expr>) -> Self {
        Expr::Lam {
            name: name.map(|name| Rc::from(*name)),
            ty,
            body: Rc::new(body),
        }
    }

    pub fn mk_app(a: Spanned<Expr>, b: Spanned<Expr>) -> Self {
        Expr::App(Rc::new(a), Rc::new(b))
    }

    pub fn mk_promote(a: Spanned<Expr>) -> Self {
        Expr::Promote(Rc::new(a))
    }

    pub fn mk_pure(a: Spanned<Expr>) -> Self {
        Expr::Pure(Rc::new(a))
    }

    pub fn mk_binop(op: Binop, a: Spanned<Expr>, b: Spanned<Expr>) -> Self {
        Expr::Binop(op, Rc::new(a), Rc::new(b))
    }

    pub fn mk_pair(a: Spanned<Expr>, b: Spanned<Expr>) -> Self {
        Expr::Pair(Rc::new(a), Rc::new(b))
    }

    pub fn mk_case(scrutinee: Spanned<Expr>, branches: Vec<Branch>) -> Self {
        Expr::Case(Rc::new(scrutinee), branches)
    }

    pub fn mk_let_diamond(
        name: Spanned<&str>,
        ty: Option<Type>,
        value: Spanned<Expr>,
        rest: Spanned<Expr>,
    ) -> Self {
        Expr::LetDiamond {
            name: name.map(|name| Rc::from(*name)),
            ty,
            value: Rc::new(value),
            rest: Rc::new(rest),
        }
    }

    pub fn mk_let_box(name: Spanned<&str>, ty: Type, value: Spanned<Expr>, rest: Spanned<Expr>) -> Self {
        Expr::LetBox {
            name: name.map(|name| Rc::from(*name)),
            ty,
            value: Rc::new(value),
            rest: Rc::new(rest),
        }
    }

    /// Free term variables, in order of first occurrence.
    pub fn free_vars(&self) -> Vec<Rc<str>> {
        fn go(expr: &Expr, bound: &mut Vec<Rc<str>>, vars: &mut Vec<Rc<str>>) {
            match expr {
                Expr::Int(_) | Expr::Float(_) | Expr::Constructor(_) => {}
                Expr::Var(name) => {
                    if !bound.contains(name) && !vars.contains(name) {
                        vars.push(name.clone())
                    }
                }
                Expr::Lam { name, body, .. } => {
                    bound.push(name.item.clone());
                    go(&body.item, bound, vars);
                    bound.pop();
                }
                Expr::App(a, b) | Expr::Binop(_, a, b) | Expr::Pair(a, b) => {
                    go(&a.item, bound, vars);
                    go(&b.item, bound, vars);
                }
                Expr::Promote(a) | Expr::Pure(a) => go(&a.item, bound, vars),
                Expr::Case(scrutinee, branches) => {
                    go(&scrutinee.item, bound, vars);
                    for branch in branches {
                        let pattern_vars = branch.pattern.item.bound_vars();
                        let count = pattern_vars.len();
                        bound.extend(pattern_vars);
                        go(&branch.body.item, bound, vars);
                        bound.truncate(bound.len() - count);
                    }
                }
                Expr::LetDiamond {
                    name, value, rest, ..
                }
                | Expr::LetBox {
                    name, value, rest, ..
                } => {
                    go(&value.item, bound, vars);
                    bound.push(name.item.clone());
                    go(&rest.item, bound, vars);
                    bound.pop();
                }
            }
        }
        let mut vars = Vec::new();
        go(self, &mut Vec::new(), &mut vars);
        vars
    }
}

/// A top-level definition: `name pattern* = body`, with its declared signature.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub name: Spanned<Rc<str>>,
    pub patterns: Vec<Spanned<Pattern>>,
    pub body: Spanned<Expr>,
    pub scheme: TypeScheme,
}
