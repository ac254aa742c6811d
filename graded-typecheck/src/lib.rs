
pub mod checker;
pub mod context;
pub mod discharge;
pub mod equality;
pub mod error;
pub mod kinds;
pub mod patterns;
pub mod predicate;
pub mod primitives;
pub mod prover;
pub mod state;

use checker::Polarity;
use context::Context;
use error::{Error, ErrorInfo, LinearityInfo};
use fnv::FnvHashMap;
use graded_diagnostic::{Diagnostic, Location, Message, Source};
use graded_syntax::{Definition, Substitution, Type, TypeScheme};
use patterns::PatternContext;
use primitives::Primitives;
use prover::Prover;
use state::{Quantifier, State};
use std::rc::Rc;

/// Read-only lookups shared by every step of a run.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub primitives: &'a Primitives,
    /// The declared signatures of every definition in the file.
    pub definitions: &'a FnvHashMap<Rc<str>, TypeScheme>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Log each definition's predicate before it is discharged.
    pub debug: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TypeError {
    pub source: Source,
    pub error: Error,
}

impl TypeError {
    pub fn source(&self) -> Source {
        self.source.clone()
    }

    pub fn position(&self) -> usize {
        self.error.position.unwrap_or(0)
    }

    pub fn message(&self) -> String {
        self.error.message()
    }

    pub fn addendum(&self) -> Option<String> {
        self.error.addendum()
    }

    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }

    pub fn report(&self, diagnostic: &mut Diagnostic) {
        diagnostic.item(
            Some(Location {
                source: self.source(),
                offset: Some(self.position()),
            }),
            Message {
                content: self.message(),
                addendum: self.addendum(),
            },
        )
    }
}

/// Match a definition's parameter patterns against its argument types.
fn bind_parameters(
    env: Env,
    state: &mut State,
    definition: &Definition,
) -> Result<(PatternContext, Type), Error> {
    let (args, result) = definition.scheme.ty.unwrap_fun();
    if definition.patterns.len() > args.len() {
        return Err(Error::new(
            definition.name.pos,
            ErrorInfo::NotAFunction {
                ty: definition.scheme.ty.clone(),
            },
        ));
    }

    let mut bound = Context::new();
    let mut existentials = Vec::new();
    let mut subst: Substitution = Vec::new();
    for (pattern, arg) in definition.patterns.iter().zip(args.iter()) {
        let arg = arg.substitute(&subst);
        let matched = patterns::build_pattern_context(env, state, &arg, pattern)?;
        bound = context::combine(state, pattern.pos, &bound, &matched.context)?;
        existentials.extend(matched.existentials);
        subst = equality::combine_substitutions(env, state, pattern.pos, subst, matched.subst)?;
    }

    let remaining = args[definition.patterns.len()..]
        .iter()
        .rev()
        .fold(result.clone(), |acc, arg| Type::mk_fun((*arg).clone(), acc));
    Ok((
        PatternContext {
            context: bound,
            existentials,
            subst: subst.clone(),
        },
        remaining.substitute(&subst),
    ))
}

/**
Check one definition's body against its signature, leaving its grade
obligations in `state`.
*/
fn check_definition(env: Env, state: &mut State, definition: &Definition) -> Result<(), Error> {
    for (var, kind) in &definition.scheme.vars {
        state.bind_type_variable(var.clone(), kind.clone(), Quantifier::Universal);
    }

    state.open_implication_scope();
    let (
        PatternContext {
            context: bound,
            existentials,
            ..
        },
        expected,
    ) = bind_parameters(env, state, definition)?;
    state.enter_consequent();

    let (used, _) = checker::check(
        env,
        state,
        &bound,
        Polarity::Positive,
        true,
        &expected,
        &definition.body,
    )?;

    let unused = bound.remaining_linear(&used);
    if !unused.is_empty() {
        return Err(Error::linearity(
            definition.name.pos,
            unused,
            LinearityInfo::Unused,
        ));
    }
    context::leq(state, definition.body.pos, &used.intersect(&bound), &bound)?;
    state.close_implication_scope(existentials);
    Ok(())
}

/**
Check every definition of a file, in order.

All signatures are kind checked before any body, so definitions may refer to
each other in any order. The first failing definition stops the run.
*/
pub fn check_definitions(
    source: &Source,
    primitives: &Primitives,
    definitions: &[Definition],
    prover: &mut dyn Prover,
    config: Config,
) -> Result<(), TypeError> {
    let to_type_error = |error: Error| TypeError {
        source: source.clone(),
        error,
    };

    let signatures: FnvHashMap<Rc<str>, TypeScheme> = definitions
        .iter()
        .map(|definition| (definition.name.item.clone(), definition.scheme.clone()))
        .collect();
    let env = Env {
        primitives,
        definitions: &signatures,
    };
    let mut state = State::new();

    for definition in definitions {
        kinds::kind_check(env, &mut state, definition.name.pos, &definition.scheme)
            .map_err(to_type_error)?;
    }

    for definition in definitions {
        tracing::debug!(
            definition = %definition.name.item,
            signature = %definition.scheme.render(),
            "checking definition"
        );
        state.reset();
        if let Err(error) = check_definition(env, &mut state, definition) {
            state.reset();
            return Err(to_type_error(error));
        }
        discharge::discharge(
            &mut state,
            prover,
            &definition.name.item,
            definition.name.pos,
            config.debug,
        )
        .map_err(to_type_error)?;
    }
    Ok(())
}
