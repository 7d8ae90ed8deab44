//! yli CLI
//!
//! Interactive console for the Ylikuutio entity ontology.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use yli_core::{tokenize, EntityId, Universe};

mod config;

use config::YliConfig;

#[derive(Parser)]
#[command(name = "yli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ylikuutio entity console", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ./yli.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive console (default)
    Run,

    /// Execute a single command line and print its output
    Exec {
        /// Command name followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },

    /// Validate the configuration and print a summary
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = YliConfig::load_or_default(cli.config.as_deref())?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(config.logging.level.as_deref().unwrap_or("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(&config),
        Commands::Exec { line } => cmd_exec(&config, &line.join(" ")),
        Commands::Check => cmd_check(&config),
    }
}

/// Print and drain everything the console has buffered
fn flush_output(universe: &mut Universe, console: EntityId, out: &mut impl Write) -> Result<()> {
    for line in universe.take_console_output(console) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn cmd_run(config: &YliConfig) -> Result<()> {
    let (mut universe, console) = config.build_universe()?;
    info!("Type `help` for commands, `quit` to exit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    while !universe.state.exit_requested {
        write!(stdout, "{}", universe.console_prompt(console))?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            break;
        }

        universe.process_line(console, &line);
        flush_output(&mut universe, console, &mut stdout)?;
    }

    debug!(history = universe.console_history(console).len(), "console closed");
    Ok(())
}

fn cmd_exec(config: &YliConfig, line: &str) -> Result<()> {
    let (mut universe, console) = config.build_universe()?;

    let tokens = tokenize(line);
    let Some(name) = tokens.first() else {
        bail!("Empty command line");
    };
    let known = universe.command(console, name).is_some();

    universe.process_line(console, line);
    flush_output(&mut universe, console, &mut io::stdout())?;

    if !known {
        let suggestion = universe.complete_command(console, name);
        if suggestion != *name {
            bail!("Unknown command `{name}` (did you mean `{suggestion}`?)");
        }
        bail!("Unknown command `{name}`");
    }
    Ok(())
}

fn cmd_check(config: &YliConfig) -> Result<()> {
    let (universe, console) = config.build_universe()?;
    let stats = universe.stats();

    println!("Configuration OK");
    println!("  entities:     {}", stats.entity_count);
    println!("  variables:    {}", stats.variable_count);
    println!("  global names: {}", stats.global_name_count);
    println!("  commands:     {}", universe.command_names(console).len());
    println!("  names:        {}", universe.entity_names());
    Ok(())
}
