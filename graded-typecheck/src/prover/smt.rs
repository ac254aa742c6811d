//! An SMT-LIB 2 backend driving an external `z3` process.

use super::{compile, Binder, Formula, Prover, Query, Value, Verdict};
use crate::{
    predicate::{Predicate, Relation},
    state::Quantifier,
};
use graded_syntax::{Coeffect, CoeffectKind, Level};
use std::{
    io::{self, Write},
    path::PathBuf,
    process::{Command, Stdio},
    rc::Rc,
    time::Duration,
};

#[derive(Clone, Debug)]
pub struct SmtProver {
    pub command: PathBuf,
    /// Passed to the solver as `-T:<seconds>`. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for SmtProver {
    fn default() -> Self {
        SmtProver {
            command: PathBuf::from("z3"),
            timeout: None,
        }
    }
}

fn symbol(var: &str) -> String {
    format!("|{}|", var)
}

fn sort(kind: &CoeffectKind) -> &'static str {
    match kind {
        CoeffectKind::Float => "Real",
        CoeffectKind::Nat | CoeffectKind::Level | CoeffectKind::Var(_) => "Int",
    }
}

fn range(var: &str, kind: &CoeffectKind) -> String {
    match kind {
        CoeffectKind::Float => format!("(>= {} 0.0)", symbol(var)),
        CoeffectKind::Level => format!("(and (>= {0} 0) (<= {0} 2))", symbol(var)),
        CoeffectKind::Nat | CoeffectKind::Var(_) => format!("(>= {} 0)", symbol(var)),
    }
}

fn ranges(vars: &[Binder]) -> String {
    let items: Vec<String> = vars.iter().map(|(var, kind)| range(var, kind)).collect();
    format!("(and {})", items.join(" "))
}

fn level_number(level: Level) -> u8 {
    match level {
        Level::Unused => 0,
        Level::Public => 1,
        Level::Private => 2,
    }
}

fn literal(kind: &CoeffectKind, value: f64) -> String {
    match kind {
        CoeffectKind::Float => format!("{:.6}", value),
        _ => format!("{}", value as u64),
    }
}

fn max(a: &str, b: &str) -> String {
    format!("(ite (>= {0} {1}) {0} {1})", a, b)
}

fn min(a: &str, b: &str) -> String {
    format!("(ite (<= {0} {1}) {0} {1})", a, b)
}

fn term(kind: &CoeffectKind, grade: &Coeffect) -> String {
    match grade {
        Coeffect::Var(var) => symbol(var),
        Coeffect::Nat(n) => literal(kind, *n as f64),
        Coeffect::Float(value) => literal(&CoeffectKind::Float, *value),
        Coeffect::Level(level) => level_number(*level).to_string(),
        Coeffect::Zero(_) => literal(kind, 0.0),
        Coeffect::One(_) => literal(kind, 1.0),
        Coeffect::Plus(a, b) => {
            let (a, b) = (term(kind, a), term(kind, b));
            match kind {
                CoeffectKind::Level => max(&a, &b),
                _ => format!("(+ {} {})", a, b),
            }
        }
        Coeffect::Times(a, b) => {
            let (a, b) = (term(kind, a), term(kind, b));
            match kind {
                CoeffectKind::Level => format!(
                    "(ite (or (= {0} 0) (= {1} 0)) 0 {2})",
                    a,
                    b,
                    max(&a, &b)
                ),
                _ => format!("(* {} {})", a, b),
            }
        }
        Coeffect::Join(a, b) => max(&term(kind, a), &term(kind, b)),
        Coeffect::Meet(a, b) => min(&term(kind, a), &term(kind, b)),
    }
}

fn binders(vars: &[Binder]) -> String {
    let items: Vec<String> = vars
        .iter()
        .map(|(var, kind)| format!("({} {})", symbol(var), sort(kind)))
        .collect();
    format!("({})", items.join(" "))
}

pub fn render_formula(formula: &Formula) -> String {
    match formula {
        Formula::Atom(constraint) => {
            let op = match constraint.relation {
                Relation::Eq => "=",
                Relation::Leq => "<=",
            };
            format!(
                "({} {} {})",
                op,
                term(&constraint.kind, &constraint.left),
                term(&constraint.kind, &constraint.right)
            )
        }
        Formula::And(items) => {
            if items.is_empty() {
                String::from("true")
            } else {
                let items: Vec<String> = items.iter().map(render_formula).collect();
                format!("(and {})", items.join(" "))
            }
        }
        Formula::Implies(a, b) => format!("(=> {} {})", render_formula(a), render_formula(b)),
        Formula::Forall(vars, body) => format!(
            "(forall {} (=> {} {}))",
            binders(vars),
            ranges(vars),
            render_formula(body)
        ),
        Formula::Exists(vars, body) => format!(
            "(exists {} (and {} {}))",
            binders(vars),
            ranges(vars),
            render_formula(body)
        ),
    }
}

/**
Ask for a counterexample: the outermost universals become constants, and the
negated body is asserted.
*/
pub fn render_script(query: &Query) -> String {
    let mut script = String::new();
    for (var, kind) in &query.universals {
        script.push_str(&format!("(declare-const {} {})\n", symbol(var), sort(kind)));
        script.push_str(&format!("(assert {})\n", range(var, kind)));
    }
    script.push_str(&format!("(assert (not {}))\n", render_formula(&query.body)));
    script.push_str("(check-sat)\n");
    if !query.universals.is_empty() {
        let vars: Vec<String> = query
            .universals
            .iter()
            .map(|(var, _)| symbol(var))
            .collect();
        script.push_str(&format!("(get-value ({}))\n", vars.join(" ")));
    }
    script
}

#[derive(PartialEq, Debug)]
enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' | ')' => tokens.push(c.to_string()),
            '|' => {
                let mut token = String::new();
                for c in chars.by_ref() {
                    if c == '|' {
                        break;
                    }
                    token.push(c);
                }
                tokens.push(token);
            }
            c if c.is_whitespace() => {}
            c => {
                let mut token = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next == '(' || next == ')' || next.is_whitespace() {
                        break;
                    }
                    token.push(next);
                    chars.next();
                }
                tokens.push(token);
            }
        }
    }
    tokens
}

fn parse(tokens: &[String], pos: &mut usize) -> Option<SExpr> {
    let token = tokens.get(*pos)?;
    *pos += 1;
    match token.as_str() {
        "(" => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos).map(String::as_str) {
                    Some(")") => {
                        *pos += 1;
                        return Some(SExpr::List(items));
                    }
                    Some(_) => items.push(parse(tokens, pos)?),
                    None => return None,
                }
            }
        }
        ")" => None,
        atom => Some(SExpr::Atom(String::from(atom))),
    }
}

fn number(expr: &SExpr) -> Option<f64> {
    match expr {
        SExpr::Atom(atom) => atom.parse().ok(),
        SExpr::List(items) => match items.as_slice() {
            [SExpr::Atom(op), value] if op == "-" => number(value).map(|value| -value),
            [SExpr::Atom(op), a, b] if op == "/" => Some(number(a)? / number(b)?),
            _ => None,
        },
    }
}

fn value(kind: &CoeffectKind, number: f64) -> Value {
    match kind {
        CoeffectKind::Float => Value::Float(number),
        CoeffectKind::Level => Value::Level(if number <= 0.0 {
            Level::Unused
        } else if number <= 1.0 {
            Level::Public
        } else {
            Level::Private
        }),
        CoeffectKind::Nat | CoeffectKind::Var(_) => Value::Nat(number.max(0.0) as u64),
    }
}

/// Read the falsifying assignment out of a `get-value` response.
fn model(query: &Query, response: &str) -> Vec<(Rc<str>, Value)> {
    let tokens = tokenize(response);
    let mut pos = 0;
    let pairs = match parse(&tokens, &mut pos) {
        Some(SExpr::List(pairs)) => pairs,
        _ => return Vec::new(),
    };
    pairs
        .iter()
        .filter_map(|pair| match pair {
            SExpr::List(items) => match items.as_slice() {
                [SExpr::Atom(var), expr] => {
                    let (var, kind) = query
                        .universals
                        .iter()
                        .find(|(other, _)| other.as_ref() == var.as_str())?;
                    Some((var.clone(), value(kind, number(expr)?)))
                }
                _ => None,
            },
            SExpr::Atom(_) => None,
        })
        .collect()
}

pub fn interpret(query: &Query, output: &str) -> Verdict {
    let mut lines = output.lines().map(str::trim).filter(|line| !line.is_empty());
    match lines.next() {
        Some("unsat") => Verdict::Valid,
        Some("sat") => {
            let rest: Vec<&str> = lines.collect();
            Verdict::Invalid(model(query, &rest.join(" ")))
        }
        Some(answer) => Verdict::Error(format!("solver answered \"{}\"", answer)),
        None => Verdict::Error(String::from("solver produced no output")),
    }
}

impl SmtProver {
    fn run(&self, script: &str) -> io::Result<String> {
        let mut command = Command::new(&self.command);
        command.args(["-in", "-smt2"]);
        if let Some(timeout) = self.timeout {
            command.arg(format!("-T:{}", timeout.as_secs().max(1)));
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        // The solver may exit before reading the whole script; reap it and
        // prefer whatever it printed over the broken pipe.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(script.as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output()?;
        match written {
            Err(error) if output.stdout.is_empty() => Err(error),
            _ => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        }
    }
}

impl Prover for SmtProver {
    fn solve(
        &mut self,
        predicate: &Predicate,
        vars: &[(Rc<str>, CoeffectKind, Quantifier)],
    ) -> Verdict {
        let query = compile(predicate, vars);
        let script = render_script(&query);
        tracing::trace!(script = %script, "sending query to solver");
        match self.run(&script) {
            Ok(output) => {
                tracing::debug!(output = %output.trim(), "solver answered");
                interpret(&query, &output)
            }
            Err(error) => Verdict::Error(format!(
                "could not run {}: {}",
                self.command.display(),
                error
            )),
        }
    }
}
