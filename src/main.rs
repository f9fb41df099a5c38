use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use refweave::commands;
use refweave::config::Config;
use refweave::diagnostics::print_error;
use refweave::error::Error;
use refweave::symbols::Graph;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "refweave", version, about = "Context-aware cross-references for symbol-graph documentation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Symbol graph JSON; overrides `graph` in .refweave.toml
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// More log output (-v info, -vv debug); REFWEAVE_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
#[allow(clippy::arbitrary_source_item_ordering, reason = "help lists subcommands in workflow order")]
enum Commands {
    /// Parse a signature and print its components
    Parse {
        /// Signature text, e.g. `java.util/java.util.List#add(int,E)`
        signature: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Resolve a signature against the symbol graph (exit 2 if unresolved)
    Resolve {
        /// Signature text
        signature: String,
        /// Qualified name of the element the reference is written in
        #[arg(long)]
        from: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Verify every reference in every documentation comment (exit 0/2)
    Check,
    /// Render page fragments for every documented symbol
    Render {
        /// Output directory; overrides `output` in .refweave.toml
        #[arg(long)]
        out: Option<PathBuf>,
        /// Render only slices serving this locale
        #[arg(long)]
        locale: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    return match run(cli) {
        Ok(code) => code,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        },
    };
}

/// Install the stderr log subscriber.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "refweave=warn",
        1 => "refweave=info",
        _ => "refweave=debug",
    };
    let filter = EnvFilter::try_from_env("REFWEAVE_LOG").unwrap_or_else(|_| return EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Load configuration, apply flag overrides, and dispatch.
///
/// # Errors
///
/// Returns configuration, graph loading, and command errors.
fn run(cli: Cli) -> Result<ExitCode, Error> {
    let mut config = Config::load(&PathBuf::from("."))?;
    if let Some(graph) = cli.graph {
        config.graph = graph;
    }

    return match cli.command {
        Commands::Parse { json, signature } => {
            commands::parse(&config, &signature, json)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Resolve { from, json, signature } => {
            let graph = Graph::load(&config.graph)?;
            commands::resolve(&config, &graph, &signature, from.as_deref(), json)
        },
        Commands::Check => {
            let graph = Graph::load(&config.graph)?;
            commands::check(&config, &graph)
        },
        Commands::Render { locale, out } => {
            if let Some(out) = out {
                config.output = out;
            }
            let graph = Graph::load(&config.graph)?;
            commands::render(&config, &graph, locale.as_deref())
        },
    };
}
