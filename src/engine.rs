use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CleanArgs, RunArgs};
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::exit_codes::exit;
use crate::handler::HandlerRegistry;
use crate::model::{self, CleanProcedure, Procedure};
use crate::outcome::Outcome;
use crate::reporter::Reporter;

/// Tracks the exit code across several procedures. The first failure wins;
/// an unresolved remainder only counts when nothing failed.
#[derive(Debug, Default)]
struct RunStatus {
    failure: Option<i32>,
    unresolved: bool,
}

impl RunStatus {
    fn record(&mut self, result: Result<Outcome, DispatchError>) -> bool {
        match result {
            Ok(outcome) => {
                if !outcome.remainder().is_empty() {
                    self.unresolved = true;
                }
                true
            }
            Err(e) => {
                let code = if e.is_validation() {
                    exit::VALIDATION_FAILURE
                } else {
                    exit::OPERATIONAL_FAILURE
                };
                eprintln!("error: {:#}", anyhow::Error::from(e));
                self.failure.get_or_insert(code);
                false
            }
        }
    }

    fn code(&self) -> i32 {
        match (self.failure, self.unresolved) {
            (Some(code), _) => code,
            (None, true) => exit::UNRESOLVED_REMAINDER,
            (None, false) => exit::SUCCESS,
        }
    }
}

pub fn run(args: RunArgs) -> Result<i32> {
    let config = match model::load_configuration(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return Ok(exit::VALIDATION_FAILURE);
        }
    };
    let procedures = match config.procedures() {
        Ok(procedures) => procedures,
        Err(e) => {
            eprintln!("error: invalid procedure in {}: {e}", args.config.display());
            return Ok(exit::VALIDATION_FAILURE);
        }
    };
    debug!(count = procedures.len(), "configuration loaded");

    let reporter = Arc::new(Reporter::new(args.json));
    let mut dispatcher = Dispatcher::new(HandlerRegistry::standard());
    dispatcher.register("console", reporter.clone());

    #[cfg(feature = "cli")]
    let bar = if args.progress {
        let bar = Arc::new(crate::reporter::ProgressBarListener::new());
        dispatcher.register("progress", bar.clone());
        Some(bar)
    } else {
        None
    };

    let mut status = RunStatus::default();
    for procedure in &procedures {
        let result = if args.validate_only {
            dispatcher.validate(procedure)
        } else {
            dispatcher.dispatch(procedure)
        };
        if !status.record(result) && config.options.stop_on_error {
            info!(procedure = %procedure.name, "stopping after failure");
            break;
        }
    }

    #[cfg(feature = "cli")]
    {
        if let Some(bar) = bar {
            bar.finish();
        }
    }
    if !args.json {
        println!("{}", reporter.summary());
    }
    Ok(status.code())
}

pub fn clean(args: CleanArgs) -> Result<i32> {
    let target = match args.target {
        Some(target) => target,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let procedure = Procedure::new(
        uuid::Uuid::new_v4().to_string(),
        "clean",
        CleanProcedure::new(target),
    );

    let reporter = Arc::new(Reporter::new(args.json));
    let mut dispatcher = Dispatcher::new(HandlerRegistry::standard());
    dispatcher.register("console", reporter.clone());

    let mut status = RunStatus::default();
    status.record(dispatcher.dispatch(&procedure));
    if !args.json {
        println!("{}", reporter.summary());
    }
    Ok(status.code())
}
