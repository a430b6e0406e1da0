#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

// ========================================================================================
//
//                         THE REQUEST BOUNDARY: GLYCORISK
//
// ========================================================================================
//
// One process, one request. The `predict` path reads a single patient record from
// stdin and writes exactly one JSON document to stdout, whatever happens in between:
// every error and every panic below this point is folded into the failure shape and
// the process still exits 0. Diagnostics go to stderr through the logger.
//
// The operator subcommands (`inspect`, `version`) are ordinary CLI tools and report
// failures with an `Error:` line and a non-zero exit status.

use clap::{Args, Parser, Subcommand};
use env_logger::{Builder, Env, Target};
use glycorisk::assess::assess;
use glycorisk::driver::{self, PredictionError, Response};
use glycorisk::model::artifact::TrainedModel;
use glycorisk::model::capability::Model;
use glycorisk::model::locate::resolve_model_path;
use glycorisk::schema::{FeatureSchema, resolve_schema};
use itertools::Itertools;
use std::any::Any;
use std::backtrace::Backtrace;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

/// Message and backtrace of the most recent panic, left here by the panic hook.
static PANIC_TRACE: Mutex<Option<String>> = Mutex::new(None);

// ========================================================================================
//                         COMMAND-LINE INTERFACE DEFINITION
// ========================================================================================

#[derive(Parser)]
#[command(
    name = "glycorisk",
    about = "Diabetes risk inference for a single patient record",
    long_about = "Reads one patient record as JSON on stdin, reconciles its fields with the \
                 input the trained model expects, and writes one JSON verdict to stdout.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    predict: PredictArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the record on stdin (the default when no subcommand is given)
    #[command(about = "Classify one JSON record read from stdin")]
    Predict(PredictArgs),

    /// Describe a model artifact
    #[command(about = "Show the estimator, expected features and probability support of a model")]
    Inspect(InspectArgs),

    /// Display version information
    #[command(about = "Display version information")]
    Version,
}

#[derive(Args, Clone, Default)]
pub struct PredictArgs {
    /// Path to the model artifact (.toml); defaults to diabetes_model.toml next to the executable
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Attach a guideline-based risk assessment to successful verdicts
    #[arg(long)]
    pub assess: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Path to the model artifact (.toml); defaults to diabetes_model.toml next to the executable
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,
}

// ========================================================================================
//                                   SUBCOMMANDS
// ========================================================================================

pub fn predict(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let response = respond(&args);
    if !response.is_success() {
        log::warn!("Request failed; reporting the failure on stdout");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer(&mut out, &response)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Runs the whole request and folds every outcome into a `Response`.
fn respond(args: &PredictArgs) -> Response {
    install_panic_capture();
    fold_outcome(|| {
        driver::evaluate(io::stdin().lock(), args.model.as_deref()).map(|evaluation| {
            let assessment = args
                .assess
                .then(|| assess(&evaluation.record, &evaluation.verdict));
            Response::success(evaluation.verdict, assessment)
        })
    })
}

/// Runs `request`, turning its error or panic into the failure shape.
fn fold_outcome<F>(request: F) -> Response
where
    F: FnOnce() -> Result<Response, PredictionError>,
{
    match panic::catch_unwind(AssertUnwindSafe(request)) {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            log::error!("{e}");
            Response::failure(&e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let trace = PANIC_TRACE
                .lock()
                .ok()
                .and_then(|mut slot| slot.take())
                .unwrap_or_else(|| message.clone());
            log::error!("Unexpected failure: {message}");
            Response::fault(message, trace)
        }
    }
}

/// Replaces the default panic printer so panics are recorded instead of
/// written to stderr mid-request.
fn install_panic_capture() {
    panic::set_hook(Box::new(|info| {
        let trace = format!("{info}\n{}", Backtrace::force_capture());
        if let Ok(mut slot) = PANIC_TRACE.lock() {
            *slot = Some(trace);
        }
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unexpected internal failure".to_string()
    }
}

pub fn inspect(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_model_path(args.model.as_deref())?;
    let model = TrainedModel::load(&path)?;

    println!("Model file: {}", path.display());
    println!("Estimator: {}", model.kind());
    match resolve_schema(&model) {
        FeatureSchema::Named(names) => {
            println!("Expected features ({}): {}", names.len(), names.iter().join(", "));
        }
        FeatureSchema::Counted(count) => {
            println!("Expected feature count: {count} (names not stored)");
        }
        FeatureSchema::Unknown => println!("Model does not store feature info."),
    }
    let probabilities = if model.probabilistic().is_some() {
        "available"
    } else {
        "not available"
    };
    println!("Probabilities: {probabilities}");
    Ok(())
}

fn print_version_info() {
    println!("glycorisk {}", env!("CARGO_PKG_VERSION"));
    match option_env!("GLYCORISK_RELEASE_TAG") {
        Some(tag) => println!("Release: {tag}"),
        None => println!("Release: development build"),
    }
}

// ========================================================================================
//                                  ENTRY POINT
// ========================================================================================

fn main() {
    Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .format_timestamp(None)
        .target(Target::Stderr)
        .init();

    let Cli { command, predict: default_args } = Cli::parse();

    let result = match command {
        Some(Commands::Predict(args)) => predict(args),
        Some(Commands::Inspect(args)) => inspect(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => predict(default_args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_predicts() {
        let cli = Cli::try_parse_from(["glycorisk", "--model", "m.toml", "--assess"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.predict.model, Some(PathBuf::from("m.toml")));
        assert!(cli.predict.assess);
    }

    #[test]
    fn panics_inside_a_request_become_failure_json() {
        install_panic_capture();
        let response = fold_outcome(|| panic!("reconciliation exploded"));
        let _ = panic::take_hook();

        assert!(!response.is_success());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], serde_json::Value::Bool(false));
        assert_eq!(json["error"], "reconciliation exploded");
        assert!(json["trace"].as_str().unwrap().contains("reconciliation exploded"));
    }

    #[test]
    fn request_errors_become_failure_json() {
        let response = fold_outcome(|| {
            Err(PredictionError::Input(glycorisk::record::InputError::Empty))
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], serde_json::Value::Bool(false));
        assert_eq!(json["error"], "No input data received");
    }

    #[test]
    fn panic_payloads_become_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned.as_ref()), "bang");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "Unexpected internal failure");
    }
}
