//! Built-in types, data constructors, operators and definitions.

use fnv::FnvHashMap;
use graded_syntax::{Binop, Coeffect, CoeffectKind, Kind, Type, TypeOperator, TypeScheme};
use std::rc::Rc;

pub struct Primitives {
    pub type_constructors: FnvHashMap<Rc<str>, Kind>,
    pub data_constructors: FnvHashMap<Rc<str>, TypeScheme>,
    /// Candidate signatures are tried in order; the first that fits wins.
    pub operators: FnvHashMap<Binop, Vec<Type>>,
    pub definitions: FnvHashMap<Rc<str>, TypeScheme>,
}

impl Primitives {
    pub fn empty() -> Self {
        Primitives {
            type_constructors: FnvHashMap::default(),
            data_constructors: FnvHashMap::default(),
            operators: FnvHashMap::default(),
            definitions: FnvHashMap::default(),
        }
    }

    pub fn add_type_constructor(&mut self, name: &str, kind: Kind) {
        self.type_constructors.insert(Rc::from(name), kind);
    }

    pub fn add_data_constructor(&mut self, name: &str, scheme: TypeScheme) {
        self.data_constructors.insert(Rc::from(name), scheme);
    }

    pub fn add_operator(&mut self, op: Binop, signature: Type) {
        self.operators.entry(op).or_default().push(signature);
    }

    pub fn add_definition(&mut self, name: &str, scheme: TypeScheme) {
        self.definitions.insert(Rc::from(name), scheme);
    }
}

fn nat() -> Kind {
    Kind::Coeffect(CoeffectKind::Nat)
}

fn binary(a: &str, b: &str, result: &str) -> Type {
    Type::mk_fun(
        Type::mk_name(a),
        Type::mk_fun(Type::mk_name(b), Type::mk_name(result)),
    )
}

impl Default for Primitives {
    fn default() -> Self {
        let mut primitives = Primitives::empty();

        for name in ["Int", "Float", "Bool", "Unit"] {
            primitives.add_type_constructor(name, Kind::Type);
        }
        primitives.add_type_constructor(
            "List",
            Kind::mk_arrow(nat(), Kind::mk_arrow(Kind::Type, Kind::Type)),
        );
        primitives.add_type_constructor("N", Kind::mk_arrow(nat(), Kind::Type));

        let a = || Type::mk_var("a");
        let n = || Type::mk_var("n");
        let succ = |ty: Type| Type::mk_infix(TypeOperator::Plus, ty, Type::Int(1));

        primitives.add_data_constructor("True", TypeScheme::mono(Type::mk_name("Bool")));
        primitives.add_data_constructor("False", TypeScheme::mono(Type::mk_name("Bool")));
        primitives.add_data_constructor("Unit", TypeScheme::mono(Type::mk_name("Unit")));
        primitives.add_data_constructor(
            "Nil",
            TypeScheme {
                vars: vec![(Rc::from("a"), Kind::Type)],
                ty: Type::mk_list(Type::Int(0), a()),
            },
        );
        primitives.add_data_constructor(
            "Cons",
            TypeScheme {
                vars: vec![(Rc::from("a"), Kind::Type), (Rc::from("n"), nat())],
                ty: Type::mk_fun(
                    a(),
                    Type::mk_fun(Type::mk_list(n(), a()), Type::mk_list(succ(n()), a())),
                ),
            },
        );
        primitives.add_data_constructor(
            "Z",
            TypeScheme::mono(Type::mk_app(Type::mk_name("N"), Type::Int(0))),
        );
        primitives.add_data_constructor(
            "S",
            TypeScheme {
                vars: vec![(Rc::from("n"), nat())],
                ty: Type::mk_fun(
                    Type::mk_app(Type::mk_name("N"), n()),
                    Type::mk_app(Type::mk_name("N"), succ(n())),
                ),
            },
        );

        for op in [Binop::Add, Binop::Sub, Binop::Mul] {
            primitives.add_operator(op, binary("Int", "Int", "Int"));
            primitives.add_operator(op, binary("Float", "Float", "Float"));
        }
        for op in [
            Binop::Eq,
            Binop::Neq,
            Binop::Lt,
            Binop::Gt,
            Binop::Lte,
            Binop::Gte,
        ] {
            primitives.add_operator(op, binary("Int", "Int", "Bool"));
            primitives.add_operator(op, binary("Float", "Float", "Bool"));
        }

        primitives.add_definition(
            "scale",
            TypeScheme {
                vars: vec![(Rc::from("r"), Kind::Coeffect(CoeffectKind::Float))],
                ty: Type::mk_fun(
                    Type::mk_name("Float"),
                    Type::mk_fun(
                        Type::mk_box(Coeffect::mk_var("r"), Type::mk_name("Float")),
                        Type::mk_name("Float"),
                    ),
                ),
            },
        );
        primitives.add_definition(
            "readInt",
            TypeScheme::mono(Type::mk_diamond(&["R"], Type::mk_name("Int"))),
        );
        primitives.add_definition(
            "writeInt",
            TypeScheme::mono(Type::mk_fun(
                Type::mk_name("Int"),
                Type::mk_diamond(&["W"], Type::mk_name("Unit")),
            )),
        );

        primitives
    }
}
