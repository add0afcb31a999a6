//! flatsheet CLI - Flatten ERP query results into spreadsheet tables
//!
//! Usage:
//!   flatsheet run <job> [--input <file>] [--output <file>] [--format csv|json]
//!   flatsheet list
//!   flatsheet validate
//!
//! Examples:
//!   flatsheet run oa_item --input saved/sale_orders.json --output out/oa_item.csv
//!   flatsheet --config jobs.toml run fg_dispatch --format json
//!   RUST_LOG=flatsheet=debug flatsheet run invoices

use clap::{Parser, Subcommand, ValueEnum};
use flatsheet::config::Settings;
use flatsheet::sink::{self, OutputFormat};
use flatsheet::source::MemorySource;
use flatsheet::Job;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flatsheet")]
#[command(about = "flatsheet - Flatten nested ERP records into spreadsheet tables")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to flatsheet.toml or $FLATSHEET_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a configured job
    Run {
        /// Name of the job in the config file
        job: String,

        /// Saved query response to read (overrides the job's input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// File to write (overrides the job's output; stdout if neither is set)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (overrides the job's format)
        #[arg(short, long)]
        format: Option<FormatArg>,
    },

    /// List configured jobs
    List,

    /// Validate the config file without running anything
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            job,
            input,
            output,
            format,
        } => cmd_run(cli.config, job, input, output, format),
        Commands::List => cmd_list(cli.config),
        Commands::Validate => cmd_validate(cli.config),
    }
}

/// Logs go to stderr so table output on stdout stays clean.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("flatsheet={}", level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(config: Option<PathBuf>) -> Option<Settings> {
    let result = match &config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };

    match result {
        Ok(settings) => Some(settings),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

fn cmd_run(
    config: Option<PathBuf>,
    name: String,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<FormatArg>,
) -> ExitCode {
    let Some(settings) = load_settings(config) else {
        return ExitCode::FAILURE;
    };

    let job_settings = match settings.get_job(&name) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let job = match Job::from_settings(&settings, &name) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // No live ERP client here; jobs read saved query responses.
    let Some(input) = input.or_else(|| job_settings.input.clone()) else {
        eprintln!("Error: job '{}' has no input; pass --input <file>", name);
        return ExitCode::FAILURE;
    };

    let mut source = match MemorySource::from_path(&input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading input '{}': {}", input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let format = format.map(OutputFormat::from).unwrap_or(job_settings.format);
    let output = output.or_else(|| job_settings.output.clone());
    let mut sink = match &output {
        Some(path) => match sink::file_sink(path, format) {
            Ok(sink) => sink,
            Err(e) => {
                eprintln!("Error opening output '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => sink::stdout_sink(format),
    };

    match job.run(&mut source, sink.as_mut()) {
        Ok(report) => {
            eprintln!(
                "{}: {} records, {} rows flattened, {} rows written{}",
                name,
                report.fetched,
                report.flattened,
                report.written,
                output
                    .map(|path| format!(" to {}", path.display()))
                    .unwrap_or_default()
            );
            if let Some(stamp) = report.last_updated() {
                eprintln!("{}", stamp);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(job = %name, error = %e, "job failed");
            eprintln!("Job '{}' failed: {}", name, e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_list(config: Option<PathBuf>) -> ExitCode {
    let Some(settings) = load_settings(config) else {
        return ExitCode::FAILURE;
    };

    if settings.jobs.is_empty() {
        println!("No jobs defined.");
        return ExitCode::SUCCESS;
    }

    println!("Jobs:");
    for (name, job) in &settings.jobs {
        let fan_out = if job.fan_out.is_empty() {
            String::new()
        } else {
            format!(", fan-out: {}", job.fan_out.join(" > "))
        };
        println!(
            "  - {} ({} columns, {}{})",
            name,
            job.columns.len(),
            job.format,
            fan_out
        );
    }

    ExitCode::SUCCESS
}

fn cmd_validate(config: Option<PathBuf>) -> ExitCode {
    // Loading already validates every job.
    let Some(settings) = load_settings(config) else {
        return ExitCode::FAILURE;
    };

    let source = match settings.source.resolved() {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Validation error in [source]: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(endpoint) = &source.endpoint {
        println!(
            "Source: {} (database: {})",
            endpoint,
            source.database.as_deref().unwrap_or("-")
        );
    }
    println!("OK: {} job(s) valid", settings.jobs.len());
    ExitCode::SUCCESS
}
