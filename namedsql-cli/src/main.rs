//! nsql - run named SQL queries from the terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;
mod tracing_setup;

use commands::{check, list, show};
use output::OutputFormat;
use tracing_setup::TracingConfig;

/// nsql - named SQL queries from `-- name:` tagged files
#[derive(Parser)]
#[command(name = "nsql", version, about, long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the queries in the configured or given files
    List {
        /// Query files (defaults to the ones in namedsql.json)
        files: Vec<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the SQL of one query
    Show {
        /// Query name
        name: String,
        /// Query file (repeatable)
        #[arg(short, long)]
        file: Vec<PathBuf>,
        /// Rewrite `?` bindvars into the configured bind style
        #[arg(long)]
        rebind: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Syntax-check every query
    Check {
        /// Query files (defaults to the ones in namedsql.json)
        files: Vec<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a query by name
    Run {
        /// Query name
        name: String,
        /// Positional arguments, parsed as JSON (`[1,2]` is a list), else text
        args: Vec<String>,
        /// Named argument `key=value` (repeatable); switches to :name binding
        #[arg(long = "named", value_name = "KEY=VALUE")]
        named: Vec<String>,
        /// Execute without reading rows
        #[arg(long)]
        exec: bool,
        /// Database file (defaults to namedsql.json, then in-memory)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Query file (repeatable)
        #[arg(short, long)]
        file: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Output as JSON (shorthand for --format json)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = tracing_setup::init_tracing(&TracingConfig {
        verbose: cli.verbose,
    }) {
        eprintln!("{}", e);
    }

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List { files, json } => list::run(&files, json),
        Commands::Show { name, file, rebind, json } => show::run(&name, &file, rebind, json),
        Commands::Check { files, json } => check::run(&files, json),
        Commands::Run {
            name,
            args,
            named,
            exec,
            db,
            file,
            format,
            json,
        } => {
            let fmt = if json { OutputFormat::Json } else { format };
            commands::run::run(commands::run::RunOptions {
                name: &name,
                args: &args,
                named: &named,
                exec,
                db: db.as_deref(),
                files: &file,
                format: fmt,
            })
        }
    }
}
