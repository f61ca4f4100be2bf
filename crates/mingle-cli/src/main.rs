#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, OutputRequest};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "mingle",
    author,
    version,
    about = "mingle: split a roster into groups across several topics",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging (also logs every group of every topic).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit the run summary as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Summary format.
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Suppress the run summary.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_request(&self) -> OutputRequest {
        OutputRequest {
            format: self.format,
            json: self.json,
            quiet: self.quiet,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Group a roster for every topic",
        long_about = "Read a roster CSV, split it into fixed-size groups once per topic, and write a userId × topic matrix of 1-based group numbers.",
        after_help = "EXAMPLES:\n    # Groups of 4 for 3 topics\n    mingle assign people.csv groups.csv\n\n    # Groups of 5, no repeat pairs, mixed departments\n    mingle assign people.csv groups.csv -g 5 --overlap --department prefer-different\n\n    # Reproducible run with a JSON summary\n    mingle assign people.csv groups.csv --seed 42 --json"
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    mingle completions bash\n\n    # Generate zsh completions\n    mingle completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MINGLE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "mingle=debug,info"
        } else {
            "mingle=info,warn"
        })
    });

    let format = env::var("MINGLE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;

    match cli.command {
        Commands::Assign(ref args) => {
            cmd::assign::run_assign(args, cli.output_request(), &project_root)
        }
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command, &mut std::io::stdout())
        }
    }
}
