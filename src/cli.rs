use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use crate::catalog::{BlockRole, Catalog};
use crate::command::render_script;
use crate::dispatch::{self, RunOutcome};
use crate::generate::generate;
use crate::overlay::overlay_text;
use crate::program::ProgramGraph;
use crate::run_log::{FileRunLog, RunLog, RunRecord};
use crate::scene::SceneState;
use crate::script::ScriptRunner;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which executor to run generated commands through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// The command dispatcher (default).
    Commands,
    /// The Rhai script engine.
    Script,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and execute a block program against the built-in scene
    Run {
        /// Program graph JSON file
        #[arg(long)]
        program: PathBuf,

        #[arg(long, value_enum, default_value = "commands")]
        backend: Backend,

        /// Print the debug overlay after the run
        #[arg(long)]
        overlay: bool,

        /// Append a run record to this JSON-lines file
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Generate commands without executing them
    Check {
        /// Program graph JSON file
        #[arg(long)]
        program: PathBuf,
    },

    /// List the block catalog
    Blocks,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            program,
            backend,
            overlay,
            log,
        } => run_program(&program, backend, overlay, log.as_deref()),
        Commands::Check { program } => check_program(&program),
        Commands::Blocks => {
            list_blocks();
            Ok(())
        }
    }
}

fn load_graph(path: &std::path::Path) -> Result<ProgramGraph> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read program file {path:?}"))?;
    ProgramGraph::from_json(&json).with_context(|| format!("failed to parse program file {path:?}"))
}

fn run_program(
    path: &std::path::Path,
    backend: Backend,
    overlay: bool,
    log_path: Option<&std::path::Path>,
) -> Result<()> {
    let catalog = Catalog::builtin()?;
    let graph = load_graph(path)?;

    let generated = generate(&graph, &catalog)?;
    for diagnostic in &generated.diagnostics {
        println!("note: {}", diagnostic.message);
    }

    let script = render_script(&generated.commands);
    if !script.is_empty() {
        println!("{script}");
    }

    let mut scene = SceneState::new();
    let outcome = match backend {
        Backend::Commands => dispatch::execute(&generated.commands, &mut scene),
        Backend::Script => {
            let shared = Rc::new(RefCell::new(scene));
            let result = ScriptRunner::new(shared.clone()).run_commands(&generated.commands);
            scene = Rc::try_unwrap(shared)
                .map_err(|_| anyhow::anyhow!("scene still shared after script run"))?
                .into_inner();
            match result {
                // The script engine stops at the first error, so a clean run
                // means everything executed.
                Ok(()) => RunOutcome {
                    executed: generated.commands.len(),
                    ..RunOutcome::default()
                },
                Err(diag) => {
                    println!("script error: {diag}");
                    RunOutcome::default()
                }
            }
        }
    };

    println!("executed {} command(s)", outcome.executed);
    for failure in &outcome.failures {
        println!("failed: {} ({})", failure.command, failure.message);
    }
    if let Some(halted) = &outcome.halted {
        println!("halted: {halted}");
    }

    if overlay {
        println!("{}", overlay_text(&scene));
    }

    if let Some(log_path) = log_path {
        FileRunLog::new(log_path).submit(&RunRecord::new(script, &outcome));
    }

    Ok(())
}

fn check_program(path: &std::path::Path) -> Result<()> {
    let catalog = Catalog::builtin()?;
    let graph = load_graph(path)?;

    let generated = generate(&graph, &catalog)?;
    for command in &generated.commands {
        println!("{command};");
    }
    for diagnostic in &generated.diagnostics {
        println!("note: {}", diagnostic.message);
    }
    println!(
        "{} command(s), {} diagnostic(s)",
        generated.commands.len(),
        generated.diagnostics.len()
    );

    Ok(())
}

fn list_blocks() {
    let catalog = match Catalog::builtin() {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("catalog error: {e}");
            return;
        }
    };

    let mut last_category = None;
    for spec in catalog.iter() {
        if last_category != Some(spec.category) {
            println!("{} ({})", spec.category.label(), spec.category.colour());
            last_category = Some(spec.category);
        }

        let role = match &spec.role {
            BlockRole::Statement { template } => format!("-> {}", template.name),
            BlockRole::Value => "(value)".to_string(),
        };
        println!("  {:<22} {:<28} {}", spec.kind, spec.label, role);

        for slot in &spec.slots {
            match &slot.default {
                Some(default) => {
                    println!("      {}: {} (default {})", slot.name, slot.ty, default)
                }
                None => println!("      {}: {}", slot.name, slot.ty),
            }
        }
    }
}
