//! deduct - checks natural-deduction proofs saved as JSON.
//!
//! ```text
//! deduct [--config PATH] verify FILE [--line N | --goal N]
//! deduct [--config PATH] autofill FILE --line N [--write]
//! deduct rules
//! deduct check-server
//! ```
//!
//! `check-server` answers the external checker protocol on stdio, so a
//! configured `[checker]` may point back at this binary.

mod render;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use deduct_checker::ProcessChecker;
use deduct_config::DeductConfig;
use deduct_core::{Proof, ProofContext, VerificationEngine, deserialize, serialize};
use tokio::io::{stdin, stdout};
use tokio::runtime::Builder;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "deduct",
    about = "Checks natural-deduction proofs",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// Config file to use instead of ~/.deduct/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify a proof file and print the status of every line and goal.
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Only verify this line (1-based).
        #[arg(long, value_name = "N", conflicts_with = "goal")]
        line: Option<usize>,
        /// Only verify this goal (1-based).
        #[arg(long, value_name = "N")]
        goal: Option<usize>,
    },
    /// Fill in the conclusion of a blank line from its rule and premises.
    Autofill {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "N")]
        line: usize,
        /// Save the result back to FILE.
        #[arg(long)]
        write: bool,
    },
    /// List the inference rules.
    Rules,
    /// Answer check requests on stdin/stdout.
    CheckServer,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<DeductConfig> {
    match path {
        Some(path) => Ok(DeductConfig::load_from(path)?),
        None => Ok(DeductConfig::load()?.unwrap_or_default()),
    }
}

fn engine(config: &DeductConfig) -> Result<VerificationEngine> {
    let Some(checker) = &config.checker else {
        return Ok(VerificationEngine::local());
    };
    tracing::debug!("using external checker {}", checker.command);
    let checker = ProcessChecker::new(checker.clone())?;
    Ok(VerificationEngine::with_checker(Arc::new(checker)))
}

/// Reads a proof file. A restriction saved in the file wins over the one in
/// the config.
fn open_proof(file: &Path, config: &DeductConfig) -> Result<Proof> {
    let text =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let context = ProofContext::new(engine(config)?).with_debounce(config.debounce());
    let proof =
        deserialize(&text, context).with_context(|| format!("loading {}", file.display()))?;
    if proof.restricted_rules().is_empty() {
        let restricted = config.restricted_rules()?;
        if !restricted.is_empty() {
            proof.set_restricted_rules(restricted);
        }
    }
    Ok(proof)
}

fn index(number: usize, count: usize, what: &str) -> Result<usize> {
    if number == 0 || number > count {
        bail!("{what} {number} does not exist; the proof has {count}");
    }
    Ok(number - 1)
}

fn verify(proof: &Proof, line: Option<usize>, goal: Option<usize>) -> Result<bool> {
    if let Some(number) = line {
        let status = proof.verify_line(index(number, proof.len(), "line")?)?;
        if let Some(view) = proof.line(number - 1) {
            println!("{}", render::line_row(&view));
        }
        return Ok(!status.is_error());
    }
    if let Some(number) = goal {
        let status = proof.verify_goal(index(number, proof.goal_count(), "goal")?)?;
        if let Some(view) = proof.goal(number - 1) {
            println!("{}", render::goal_row(&view));
        }
        return Ok(!status.is_error());
    }

    let summary = proof.verify_proof();
    let snapshot = proof.snapshot();
    for line in &snapshot.lines {
        println!("{}", render::line_row(line));
    }
    for goal in &snapshot.goals {
        println!("{}", render::goal_row(goal));
    }
    if summary.is_complete() {
        println!("Proof complete.");
    }
    Ok(!summary.has_errors())
}

fn autofill(file: &Path, proof: &Proof, line: usize, write: bool) -> Result<bool> {
    let index = index(line, proof.len(), "line")?;
    let Some(text) = proof.auto_fill(index)? else {
        eprintln!("line {line} cannot be auto-filled");
        return Ok(false);
    };
    tracing::info!("auto-filled line {line} with {text}");
    let json = serialize(proof)?;
    if write {
        fs::write(file, format!("{json}\n"))
            .with_context(|| format!("writing {}", file.display()))?;
        if let Some(view) = proof.line(index) {
            println!("{}", render::line_row(&view));
        }
    } else {
        println!("{json}");
    }
    Ok(true)
}

fn check_server() -> Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    runtime.block_on(deduct_checker::serve(stdin(), stdout()))
}

fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Rules => {
            print!("{}", render::rule_table());
            Ok(true)
        }
        Command::CheckServer => check_server().map(|()| true),
        Command::Verify { file, line, goal } => {
            let config = load_config(args.config.as_deref())?;
            let proof = open_proof(&file, &config)?;
            verify(&proof, line, goal)
        }
        Command::Autofill { file, line, write } => {
            let config = load_config(args.config.as_deref())?;
            let proof = open_proof(&file, &config)?;
            autofill(&file, &proof, line, write)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}
