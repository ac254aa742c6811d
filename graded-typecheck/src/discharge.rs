//! Handing a definition's accumulated predicate to a prover.

use crate::{
    error::{Error, ErrorInfo},
    predicate::{Constraint, Predicate},
    prover::{self, Prover, Verdict},
    state::State,
};
use graded_syntax::CoeffectKind;
use std::rc::Rc;

fn resolve_kind(state: &State, kind: &CoeffectKind) -> CoeffectKind {
    match state.resolve_coeffect_kind(kind) {
        CoeffectKind::Var(_) => CoeffectKind::Nat,
        kind => kind,
    }
}

/// Replace every constraint's kind with its resolution.
fn resolve_kinds(state: &State, predicate: &Predicate) -> Predicate {
    match predicate {
        Predicate::Constraint(constraint) => Predicate::Constraint(Constraint {
            kind: resolve_kind(state, &constraint.kind),
            ..constraint.clone()
        }),
        Predicate::Conj(items) => {
            Predicate::Conj(items.iter().map(|item| resolve_kinds(state, item)).collect())
        }
        Predicate::Impl {
            bound,
            antecedent,
            consequent,
        } => Predicate::mk_impl(
            bound.clone(),
            resolve_kinds(state, antecedent),
            resolve_kinds(state, consequent),
        ),
    }
}

/**
Decide the predicate accumulated while checking `name`.

The state is reset afterwards, whatever the verdict.
*/
pub fn discharge(
    state: &mut State,
    prover: &mut dyn Prover,
    name: &Rc<str>,
    pos: usize,
    debug: bool,
) -> Result<(), Error> {
    let predicate = resolve_kinds(state, &state.predicate());
    let vars = state.coeffect_variables();

    if debug {
        tracing::info!(definition = %name, predicate = %predicate.render(), "discharging");
        for (var, kind, quantifier) in &vars {
            tracing::info!(
                definition = %name,
                var = %var,
                kind = %kind.render(),
                quantifier = ?quantifier,
                "coeffect variable"
            );
        }
    }

    let result = if predicate.is_trivial() {
        Ok(())
    } else {
        match prover.solve(&predicate, &vars) {
            Verdict::Valid => Ok(()),
            Verdict::Invalid(assignment) => {
                let falsified = predicate
                    .constraints()
                    .into_iter()
                    .filter(|constraint| prover::is_trivially_false(constraint))
                    .cloned()
                    .collect();
                Err(Error::new(
                    pos,
                    ErrorInfo::ConstraintViolation {
                        definition: name.clone(),
                        assignment,
                        falsified,
                    },
                ))
            }
            Verdict::Error(message) => Err(Error::new(pos, ErrorInfo::ProverError { message })),
        }
    };

    match &result {
        Ok(()) => tracing::info!(definition = %name, "grades are valid"),
        Err(error) => tracing::info!(definition = %name, reason = %error.message(), "grades are invalid"),
    }

    state.reset();
    result
}
