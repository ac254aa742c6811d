//! Checking errors.

use crate::{predicate::Constraint, prover::Value};
use graded_syntax::{Binop, CoeffectKind, Kind, Pattern, Type};
use std::rc::Rc;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum LinearityInfo {
    /// A linear variable was never consumed.
    Unused,
    /// A linear variable was consumed more than once.
    Duplicated,
    /// A variable is linear on one side of a comparison and graded on the other.
    Mixed,
}

#[derive(PartialEq, Debug, Clone)]
pub enum ErrorHint {
    WhileComparing { expected: Type, actual: Type },
    WhileChecking { ty: Type },
}

#[derive(PartialEq, Debug, Clone)]
pub enum ErrorInfo {
    NotInScope {
        name: Rc<str>,
    },
    KindMismatch {
        expected: Kind,
        actual: Kind,
    },
    CoeffectKindMismatch {
        expected: CoeffectKind,
        actual: CoeffectKind,
    },
    UnboundTypeVariable {
        name: Rc<str>,
    },
    NotAGrade {
        name: Rc<str>,
        kind: Kind,
    },
    TypeMismatch {
        expected: Type,
        actual: Type,
    },
    RigidTypeVariable {
        name: Rc<str>,
        ty: Type,
    },
    NoUpperBound {
        left: Type,
        right: Type,
    },
    NotAFunction {
        ty: Type,
    },
    NotEffectful {
        ty: Type,
    },
    PatternMismatch {
        pattern: Pattern,
        ty: Type,
    },
    NoMatchingOperator {
        op: Binop,
        left: Type,
        right: Type,
    },
    CannotSynthesize,
    Linearity {
        names: Vec<Rc<str>>,
        info: LinearityInfo,
    },
    EffectMismatch {
        expected: Vec<Rc<str>>,
        actual: Vec<Rc<str>>,
    },
    ConstraintViolation {
        definition: Rc<str>,
        assignment: Vec<(Rc<str>, Value)>,
        falsified: Vec<Constraint>,
    },
    ProverError {
        message: String,
    },
}

#[derive(PartialEq, Debug, Clone)]
pub struct Error {
    pub position: Option<usize>,
    pub info: ErrorInfo,
    pub hint: Option<ErrorHint>,
}

impl From<ErrorInfo> for Error {
    fn from(info: ErrorInfo) -> Self {
        Error {
            position: None,
            info,
            hint: None,
        }
    }
}

fn render_effects(effects: &[Rc<str>]) -> String {
    format!("<{}>", effects.join(", "))
}

impl Error {
    pub fn new(pos: usize, info: ErrorInfo) -> Self {
        Error {
            position: Some(pos),
            info,
            hint: None,
        }
    }

    pub fn with_position(mut self, pos: usize) -> Self {
        self.position = self.position.or(Some(pos));
        self
    }

    /// Keeps the innermost hint.
    pub fn with_hint(mut self, hint: ErrorHint) -> Self {
        if self.hint.is_none() {
            self.hint = Some(hint);
        }
        self
    }

    pub fn not_in_scope(pos: usize, name: &Rc<str>) -> Self {
        Error::new(pos, ErrorInfo::NotInScope { name: name.clone() })
    }

    pub fn mismatch(pos: usize, expected: &Type, actual: &Type) -> Self {
        Error::new(
            pos,
            ErrorInfo::TypeMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            },
        )
    }

    pub fn linearity(pos: usize, names: Vec<Rc<str>>, info: LinearityInfo) -> Self {
        Error::new(pos, ErrorInfo::Linearity { names, info })
    }

    /// Backend failures are the only errors worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self.info, ErrorInfo::ProverError { .. })
    }

    pub fn message(&self) -> String {
        match &self.info {
            ErrorInfo::NotInScope { name } => format!("\"{}\" is not in scope", name),
            ErrorInfo::KindMismatch { expected, actual } => format!(
                "expected kind \"{}\", got kind \"{}\"",
                expected.render(),
                actual.render()
            ),
            ErrorInfo::CoeffectKindMismatch { expected, actual } => format!(
                "cannot use a grade of kind \"{}\" where \"{}\" is expected",
                actual.render(),
                expected.render()
            ),
            ErrorInfo::UnboundTypeVariable { name } => {
                format!("type variable \"{}\" is not in scope", name)
            }
            ErrorInfo::NotAGrade { name, kind } => format!(
                "\"{}\" has kind \"{}\", which is not a grade",
                name,
                kind.render()
            ),
            ErrorInfo::TypeMismatch { expected, actual } => format!(
                "expected type \"{}\", got type \"{}\"",
                expected.render(),
                actual.render()
            ),
            ErrorInfo::RigidTypeVariable { name, ty } => format!(
                "cannot unify universally quantified \"{}\" with \"{}\"",
                name,
                ty.render()
            ),
            ErrorInfo::NoUpperBound { left, right } => format!(
                "types \"{}\" and \"{}\" have no upper bound",
                left.render(),
                right.render()
            ),
            ErrorInfo::NotAFunction { ty } => {
                format!("expected a function, got type \"{}\"", ty.render())
            }
            ErrorInfo::NotEffectful { ty } => {
                format!("expected an effectful type, got type \"{}\"", ty.render())
            }
            ErrorInfo::PatternMismatch { pattern, ty } => format!(
                "pattern \"{}\" cannot match type \"{}\"",
                pattern.render(),
                ty.render()
            ),
            ErrorInfo::NoMatchingOperator { op, left, right } => format!(
                "no instance of \"{}\" for \"{}\" and \"{}\"",
                op.render(),
                left.render(),
                right.render()
            ),
            ErrorInfo::CannotSynthesize => String::from("type cannot be calculated here"),
            ErrorInfo::Linearity { names, info } => {
                let names = names
                    .iter()
                    .map(|name| format!("\"{}\"", name))
                    .collect::<Vec<_>>()
                    .join(", ");
                match info {
                    LinearityInfo::Unused => format!("linear variable {} is not used exactly once", names),
                    LinearityInfo::Duplicated => format!("linear variable {} is used more than once", names),
                    LinearityInfo::Mixed => {
                        format!("variable {} is linear in one place and graded in another", names)
                    }
                }
            }
            ErrorInfo::EffectMismatch { expected, actual } => format!(
                "expected effects \"{}\", got effects \"{}\"",
                render_effects(expected),
                render_effects(actual)
            ),
            ErrorInfo::ConstraintViolation { definition, .. } => {
                format!("grades in \"{}\" are not satisfiable", definition)
            }
            ErrorInfo::ProverError { message } => format!("prover error: {}", message),
        }
    }

    pub fn addendum(&self) -> Option<String> {
        let mut lines: Vec<String> = Vec::new();
        if let ErrorInfo::ConstraintViolation {
            assignment,
            falsified,
            ..
        } = &self.info
        {
            for constraint in falsified {
                lines.push(format!("hint: \"{}\" is false", constraint.render()));
            }
            if !assignment.is_empty() {
                let assignment = assignment
                    .iter()
                    .map(|(var, value)| format!("{} = {}", var, value.render()))
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("falsified when {}", assignment));
            }
        }
        match &self.hint {
            None => {}
            Some(ErrorHint::WhileComparing { expected, actual }) => lines.push(format!(
                "While comparing \"{}\" with \"{}\"",
                actual.render(),
                expected.render()
            )),
            Some(ErrorHint::WhileChecking { ty }) => {
                lines.push(format!("While checking against \"{}\"", ty.render()))
            }
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
