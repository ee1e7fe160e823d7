use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use image_harvest::app::Harvester;
use image_harvest::config::{Config, ConfigLoader, Overrides};
use image_harvest::domain::{ClassQuerySpec, MinSize, Region};
use image_harvest::error::HarvestError;
use image_harvest::fetch::HttpFetcher;
use image_harvest::output::{ConsoleOutput, JsonOutput, OutputMode};
use image_harvest::providers::DuckDuckGoProvider;

#[derive(Parser)]
#[command(name = "image-harvest")]
#[command(about = "Build a labeled image dataset from web image searches")]
#[command(version, author)]
struct Cli {
    /// Job file with classes and queries (default: ./image-harvest.json)
    #[arg(long)]
    config: Option<String>,

    /// Ad-hoc CLASS=QUERY pair; repeatable. Used instead of a job file.
    #[arg(long = "query", value_name = "CLASS=QUERY")]
    queries: Vec<String>,

    /// Dataset root directory
    #[arg(long)]
    root: Option<Utf8PathBuf>,

    #[arg(long)]
    max_per_query: Option<usize>,

    /// Minimum reported image size, e.g. 200x200
    #[arg(long, value_name = "WxH")]
    min_size: Option<MinSize>,

    /// Search region code, e.g. us-en (default: wt-wt, worldwide)
    #[arg(long)]
    region: Option<Region>,

    /// Print the run summary as JSON instead of console progress
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(err.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };
    let overrides = Overrides {
        root: cli.root,
        max_per_query: cli.max_per_query,
        min_size: cli.min_size,
        region: cli.region,
    };

    let request = if cli.config.is_none() && !cli.queries.is_empty() {
        let mut request = ConfigLoader::resolve_config(Config::default(), overrides)?;
        request.classes = ClassQuerySpec::from_pairs(&cli.queries)?;
        request
    } else {
        let mut request = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
        for entry in ClassQuerySpec::from_pairs(&cli.queries)?.iter() {
            request
                .classes
                .push(entry.class.clone(), entry.queries.iter().cloned());
        }
        request
    };

    let provider = DuckDuckGoProvider::new();
    let fetcher = HttpFetcher::new()?;
    let mut harvester = Harvester::new(provider, fetcher);

    match output_mode {
        OutputMode::Console => {
            harvester.run(&request, &ConsoleOutput::new())?;
        }
        OutputMode::Json => {
            let result = harvester.run(&request, &JsonOutput)?;
            JsonOutput::print_harvest(&result).into_diagnostic()?;
        }
    }
    Ok(())
}
