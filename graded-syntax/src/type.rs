use crate::{coeffect::Coeffect, kind::Kind};
use quickcheck::Arbitrary;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Arithmetic on type-level indices.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum TypeOperator {
    Plus,
    Times,
    Join,
    Meet,
}

impl TypeOperator {
    pub fn render(&self) -> &'static str {
        match self {
            TypeOperator::Plus => "+",
            TypeOperator::Times => "*",
            TypeOperator::Join => "\\/",
            TypeOperator::Meet => "/\\",
        }
    }
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Type {
    Name(Rc<str>),
    Fun(Rc<Type>, Rc<Type>),
    App(Rc<Type>, Rc<Type>),
    Var(Rc<str>),
    Box(Coeffect, Rc<Type>),
    Diamond(Vec<Rc<str>>, Rc<Type>),
    Pair(Rc<Type>, Rc<Type>),
    Int(u64),
    Infix(TypeOperator, Rc<Type>, Rc<Type>),
}

/// A finite map from type variables to types. Earlier bindings shadow later ones.
pub type Substitution = Vec<(Rc<str>, Type)>;

impl Type {
    pub fn mk_name(name: &str) -> Self {
        Type::Name(Rc::from(name))
    }

    pub fn mk_var(name: &str) -> Self {
        Type::Var(Rc::from(name))
    }

    pub fn mk_fun(a: Type, b: Type) -> Self {
        Type::Fun(Rc::new(a), Rc::new(b))
    }

    pub fn mk_app(a: Type, b: Type) -> Self {
        Type::App(Rc::new(a), Rc::new(b))
    }

    pub fn mk_box(grade: Coeffect, ty: Type) -> Self {
        Type::Box(grade, Rc::new(ty))
    }

    pub fn mk_diamond(effects: &[&str], ty: Type) -> Self {
        Type::Diamond(effects.iter().map(|effect| Rc::from(*effect)).collect(), Rc::new(ty))
    }

    pub fn mk_pair(a: Type, b: Type) -> Self {
        Type::Pair(Rc::new(a), Rc::new(b))
    }

    pub fn mk_infix(op: TypeOperator, a: Type, b: Type) -> Self {
        Type::Infix(op, Rc::new(a), Rc::new(b))
    }

    /// `List n a`
    pub fn mk_list(size: Type, elem: Type) -> Self {
        Type::mk_app(Type::mk_app(Type::mk_name("List"), size), elem)
    }

    /// The argument types and final result of a curried function type.
    pub fn unwrap_fun(&self) -> (Vec<&Type>, &Type) {
        let mut args = Vec::new();
        let mut current = self;
        while let Type::Fun(a, b) = current {
            args.push(a.as_ref());
            current = b;
        }
        (args, current)
    }

    /**
    Read a Nat-indexed type as a coeffect expression.

    Integer literals, variables and index arithmetic inject; every other
    constructor returns `None`.
    */
    pub fn to_coeffect(&self) -> Option<Coeffect> {
        match self {
            Type::Int(n) => Some(Coeffect::Nat(*n)),
            Type::Var(name) => Some(Coeffect::Var(name.clone())),
            Type::Infix(op, a, b) => {
                let a = a.to_coeffect()?;
                let b = b.to_coeffect()?;
                Some(match op {
                    TypeOperator::Plus => Coeffect::mk_plus(a, b),
                    TypeOperator::Times => Coeffect::mk_times(a, b),
                    TypeOperator::Join => Coeffect::mk_join(a, b),
                    TypeOperator::Meet => Coeffect::mk_meet(a, b),
                })
            }
            Type::Name(_)
            | Type::Fun(_, _)
            | Type::App(_, _)
            | Type::Box(_, _)
            | Type::Diamond(_, _)
            | Type::Pair(_, _) => None,
        }
    }

    /// Type and grade variables in order of first occurrence.
    pub fn vars(&self) -> Vec<Rc<str>> {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut Vec<Rc<str>>) {
        match self {
            Type::Name(_) | Type::Int(_) => {}
            Type::Var(name) => {
                if !vars.contains(name) {
                    vars.push(name.clone())
                }
            }
            Type::Fun(a, b) | Type::App(a, b) | Type::Pair(a, b) | Type::Infix(_, a, b) => {
                a.collect_vars(vars);
                b.collect_vars(vars);
            }
            Type::Box(grade, ty) => {
                grade.collect_vars(vars);
                ty.collect_vars(vars);
            }
            Type::Diamond(_, ty) => ty.collect_vars(vars),
        }
    }

    pub fn substitute(&self, subst: &[(Rc<str>, Type)]) -> Type {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            Type::Name(_) | Type::Int(_) => self.clone(),
            Type::Var(name) => match subst.iter().find(|(var, _)| var == name) {
                Some((_, ty)) => ty.clone(),
                None => self.clone(),
            },
            Type::Fun(a, b) => Type::mk_fun(a.substitute(subst), b.substitute(subst)),
            Type::App(a, b) => Type::mk_app(a.substitute(subst), b.substitute(subst)),
            Type::Pair(a, b) => Type::mk_pair(a.substitute(subst), b.substitute(subst)),
            Type::Infix(op, a, b) => Type::mk_infix(*op, a.substitute(subst), b.substitute(subst)),
            Type::Box(grade, ty) => Type::mk_box(grade.substitute(subst), ty.substitute(subst)),
            Type::Diamond(effects, ty) => {
                Type::Diamond(effects.clone(), Rc::new(ty.substitute(subst)))
            }
        }
    }

    fn is_atomic(&self) -> bool {
        matches!(
            self,
            Type::Name(_) | Type::Var(_) | Type::Int(_) | Type::Pair(_, _)
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
            Type::Name(name) | Type::Var(name) => name.to_string(),
            Type::Int(n) => n.to_string(),
            Type::Fun(a, b) => {
                let a = if matches!(a.as_ref(), Type::Fun(_, _)) {
                    a.render_atom()
                } else {
                    a.render()
                };
                format!("{} -> {}", a, b.render())
            }
            Type::App(a, b) => {
                let a = if matches!(a.as_ref(), Type::App(_, _)) {
                    a.render()
                } else {
                    a.render_atom()
                };
                format!("{} {}", a, b.render_atom())
            }
            Type::Pair(a, b) => format!("({}, {})", a.render(), b.render()),
            Type::Box(grade, ty) => format!("{} [{}]", ty.render_atom(), grade.render()),
            Type::Diamond(effects, ty) => format!("{} <{}>", ty.render_atom(), effects.join(", ")),
            Type::Infix(op, a, b) => {
                format!("{} {} {}", a.render_atom(), op.render(), b.render_atom())
            }
        }
    }
}

/// Closed types over `Int`, `Float` and `Bool`.
impl Arbitrary for Type {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        fn go(g: &mut quickcheck::Gen, depth: usize) -> Type {
            let choices: &[u8] = if depth == 0 { &[0] } else { &[0, 0, 1, 2, 3] };
            match g.choose(choices).copied().unwrap_or(0) {
                0 => Type::mk_name(g.choose(&["Int", "Float", "Bool"]).copied().unwrap_or("Int")),
                1 => Type::mk_fun(go(g, depth - 1), go(g, depth - 1)),
                2 => Type::mk_box(Coeffect::Nat(u64::arbitrary(g) % 4), go(g, depth - 1)),
                _ => Type::mk_pair(go(g, depth - 1), go(g, depth - 1)),
            }
        }
        go(g, 2)
    }
}

/// A universally quantified type signature.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct TypeScheme {
    pub vars: Vec<(Rc<str>, Kind)>,
    pub ty: Type,
}

impl TypeScheme {
    pub fn mono(ty: Type) -> Self {
        TypeScheme {
            vars: Vec::new(),
            ty,
        }
    }

    pub fn render(&self) -> String {
        if self.vars.is_empty() {
            return self.ty.render();
        }
        let mut s = String::from("forall");
        for (var, kind) in &self.vars {
            s.push_str(&format!(" ({} : {})", var, kind.render()));
        }
        s.push_str(". ");
        s.push_str(&self.ty.render());
        s
    }
}
