#![deny(unused_crate_dependencies)]

use std::{fs, io, path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use graded_diagnostic::{Diagnostic, Location, Message, Source};
use graded_syntax::Definition;
use graded_typecheck::{
    primitives::Primitives,
    prover::{BoundedProver, Prover, SmtProver},
    Config, TypeError,
};
use tracing_subscriber::EnvFilter;

use crate::version::VERSION;

pub mod version;

enum CheckError {
    FileDoesNotExist(PathBuf),
    ReadError(PathBuf, io::Error),
    DecodeError(Source, serde_json::Error),
    TypeError(TypeError),
}

/// Byte offset of a 1-indexed line and column.
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

fn report_check_error(err: CheckError, contents: Option<&str>) -> io::Result<()> {
    let mut diagnostic = Diagnostic::new();
    match err {
        CheckError::TypeError(err) => err.report(&mut diagnostic),
        CheckError::DecodeError(source, err) => diagnostic.item(
            Some(Location {
                source,
                offset: contents.map(|text| offset_of(text, err.line(), err.column())),
            }),
            Message {
                content: format!("invalid definitions: {}", err),
                addendum: None,
            },
        ),
        CheckError::FileDoesNotExist(path) => diagnostic.item(
            None,
            Message {
                content: format!("file {} does not exist", path.display()),
                addendum: None,
            },
        ),
        CheckError::ReadError(path, err) => diagnostic.item(
            None,
            Message {
                content: format!("could not read {}: {}", path.display(), err),
                addendum: None,
            },
        ),
    }
    diagnostic.report_all()
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum Backend {
    /// Search over small values. A predicate that survives the search is
    /// reported as inconclusive rather than accepted.
    Bounded,
    /// An external SMT solver.
    Smt,
}

#[derive(Parser)]
#[command(name = "graded", disable_version_flag = true)]
struct Cli {
    /// A JSON file containing the definitions to check.
    #[arg(required_unless_present = "version")]
    filename: Option<String>,

    /// Log every definition's grade predicate before it is discharged.
    #[arg(long)]
    debug: bool,

    /// The decision procedure for grade predicates.
    #[arg(long, value_enum, default_value = "smt")]
    prover: Backend,

    /// The SMT solver executable.
    #[arg(long = "z3", default_value = "z3")]
    z3: PathBuf,

    /// Give up on a definition's predicate after this many seconds (SMT only).
    #[arg(long)]
    timeout: Option<u64>,

    /// The largest natural number tried by the bounded prover.
    #[arg(long)]
    bound: Option<u64>,

    /// Print the current version.
    #[clap(long = "version")]
    version: bool,
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert()
}

#[test]
fn smt_is_default_prover() {
    let cli = Cli::parse_from(["graded", "defs.json"]);
    assert_eq!(Backend::Smt, cli.prover);
}

#[test]
fn offsets() {
    let text = "[\n  {\"name\": 1}\n]";
    assert_eq!(0, offset_of(text, 1, 1));
    assert_eq!(4, offset_of(text, 2, 3));
    assert_eq!(text.len(), offset_of(text, 9, 1));
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn make_prover(cli: &Cli) -> Box<dyn Prover> {
    match cli.prover {
        Backend::Bounded => {
            let mut prover = BoundedProver::default();
            if let Some(bound) = cli.bound {
                prover.nat_bound = bound;
            }
            Box::new(prover)
        }
        Backend::Smt => Box::new(SmtProver {
            command: cli.z3.clone(),
            timeout: cli.timeout.map(Duration::from_secs),
        }),
    }
}

fn check_file(
    filename: &str,
    contents: &mut Option<String>,
    prover: &mut dyn Prover,
    config: Config,
) -> Result<(), CheckError> {
    let path = PathBuf::from(filename);
    if !path.exists() {
        return Err(CheckError::FileDoesNotExist(path));
    }
    let text = fs::read_to_string(&path).map_err(|err| CheckError::ReadError(path.clone(), err))?;
    let source = Source::File { path };

    let definitions: Result<Vec<Definition>, _> = serde_json::from_str(&text)
        .map_err(|err| CheckError::DecodeError(source.clone(), err));
    *contents = Some(text);
    let definitions = definitions?;
    tracing::debug!(file = filename, definitions = definitions.len(), "decoded definitions");

    graded_typecheck::check_definitions(
        &source,
        &Primitives::default(),
        &definitions,
        prover,
        config,
    )
    .map_err(CheckError::TypeError)
}

/// The entrypoint to the CLI.
///
/// It's defined in this library to avoid false positives associated with the
/// [`#![deny(unused_crate_dependencies)]` attribute](https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html#unused-crate-dependencies).
pub fn main() -> io::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("graded {}", VERSION);
        return Ok(());
    }

    init_logging(cli.debug);

    let filename = match &cli.filename {
        Some(filename) => filename.clone(),
        None => return Ok(()),
    };
    let mut prover = make_prover(&cli);
    let config = Config { debug: cli.debug };

    let mut contents = None;
    match check_file(&filename, &mut contents, prover.as_mut(), config) {
        Ok(()) => {
            println!("{}: success", filename);
            Ok(())
        }
        Err(err) => {
            report_check_error(err, contents.as_deref())?;
            std::process::exit(1)
        }
    }
}
