// Copyright 2026 Offprint Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use offprint::cli;

#[derive(Parser)]
#[command(
    name = "offprint",
    about = "Offprint — crawl a site and press it into PDFs",
    version,
    after_help = "Run 'offprint <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a site and press every stored record into a PDF
    Run {
        /// Path to a JSON config file
        config: Option<PathBuf>,
        /// Seed URL the crawl starts from (overrides the config file)
        #[arg(long)]
        url: Option<String>,
        /// Glob discovered links must match to be crawled
        #[arg(long = "match")]
        match_pattern: Option<String>,
        /// CSS selector whose inner text becomes each record's body
        #[arg(long)]
        selector: Option<String>,
        /// Hard ceiling on pages fetched
        #[arg(long)]
        max_pages: Option<u32>,
        /// Dataset name for records and PDFs
        #[arg(long)]
        output: Option<String>,
        /// Cookie applied before each navigation, as name=value
        #[arg(long)]
        cookie: Option<String>,
        /// Root directory for datasets and PDFs
        #[arg(long, default_value = "storage")]
        storage_dir: PathBuf,
        /// Concurrent fetch workers for the crawl stage
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Render PDFs from a previous run's records without crawling
    Render {
        /// Path to a JSON config file naming the dataset
        config: Option<PathBuf>,
        /// Dataset name to render
        #[arg(long)]
        output: Option<String>,
        /// Root directory for datasets and PDFs
        #[arg(long, default_value = "storage")]
        storage_dir: PathBuf,
    },
    /// Check environment and diagnose issues
    Doctor {
        /// Root directory checked for writability
        #[arg(long, default_value = "storage")]
        storage_dir: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let directive = if quiet {
        "offprint=warn"
    } else if verbose {
        "offprint=debug"
    } else {
        "offprint=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Global flags travel as environment variables so every module can
    // check them.
    if cli.json {
        std::env::set_var("OFFPRINT_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("OFFPRINT_QUIET", "1");
    }

    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            url,
            match_pattern,
            selector,
            max_pages,
            output,
            cookie,
            storage_dir,
            workers,
        } => {
            cli::run_cmd::run(
                config.as_deref(),
                url.as_deref(),
                match_pattern.as_deref(),
                selector.as_deref(),
                max_pages,
                output.as_deref(),
                cookie.as_deref(),
                &storage_dir,
                workers,
            )
            .await
        }
        Commands::Render {
            config,
            output,
            storage_dir,
        } => cli::render_cmd::run(config.as_deref(), output.as_deref(), &storage_dir).await,
        Commands::Doctor { storage_dir } => cli::doctor::run(&storage_dir).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "offprint", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
