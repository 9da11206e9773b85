use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

use mms_scraper::apis::create_adapter;
use mms_scraper::common::constants::{DEFAULT_CONFIG_PATH, ISO_DATE_FORMAT};
use mms_scraper::config::{Config, ResolverConfig};
use mms_scraper::pipeline::dates::DateProfile;
use mms_scraper::pipeline::resolver::{DateResolver, DisabledResolver, OpenAiDateResolver};
use mms_scraper::pipeline::{DateNormalizer, DateParseOutcome, Pipeline, SourceJob};
use mms_scraper::registry::{AdapterSpec, SourceRegistry};
use mms_scraper::{logging, metrics};

#[derive(Parser)]
#[command(name = "mms_scraper")]
#[command(about = "Melbourne Music Scene event aggregator")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every enabled source and write the consolidated listing
    Run {
        /// Specific sources to run (comma-separated)
        #[arg(long)]
        sources: Option<String>,
    },
    /// Normalize a single raw date string and print the outcome
    ParseDate {
        text: String,
        /// Use this source's date profile
        #[arg(long)]
        source: Option<String>,
        /// Pretend the run happens on this date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// Show the sources in the registry
    ListSources,
}

fn build_resolver(config: &ResolverConfig) -> anyhow::Result<Arc<dyn DateResolver>> {
    if !config.enabled {
        info!("Date resolver disabled in config");
        return Ok(Arc::new(DisabledResolver));
    }
    match config.api_key() {
        Some(key) => Ok(Arc::new(OpenAiDateResolver::new(config, key)?)),
        None => {
            warn!("OPENAI_KEY not set; unparseable dates will stay unresolved");
            Ok(Arc::new(DisabledResolver))
        }
    }
}

fn parse_today(today: Option<&str>) -> anyhow::Result<NaiveDate> {
    match today {
        Some(text) => NaiveDate::parse_from_str(text, ISO_DATE_FORMAT)
            .with_context(|| format!("--today must be YYYY-MM-DD, got '{}'", text)),
        None => Ok(Local::now().date_naive()),
    }
}

async fn run_sources(config: Config, only: Option<String>) -> anyhow::Result<()> {
    let registry = SourceRegistry::load_from_directory(&config.pipeline.registry_dir)?;
    let only: Option<Vec<String>> = only.map(|list| {
        list.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });
    let specs = registry.enabled_sources(only.as_deref())?;
    if specs.is_empty() {
        bail!("No enabled sources to run");
    }

    let mut jobs = Vec::with_capacity(specs.len());
    for spec in &specs {
        match create_adapter(spec) {
            Ok(adapter) => jobs.push(SourceJob {
                adapter: Arc::from(adapter),
                profile: spec.dates,
            }),
            Err(e) => error!("Skipping source '{}': {}", spec.source_id, e),
        }
    }

    let normalizer = DateNormalizer::new(build_resolver(&config.resolver)?);
    let pipeline = Pipeline::new(config.pipeline.clone(), normalizer);
    let run_id = uuid::Uuid::new_v4().to_string();
    let today = Local::now().date_naive();

    let span = tracing::info_span!("run", run_id = %run_id);
    let result = pipeline.run(&run_id, jobs, today).instrument(span).await?;

    println!("\n📊 Run {} for {}:", result.run_id, result.run_date);
    for source in &result.sources {
        match &source.error {
            None => println!(
                "   {}: {} raw, {} records, {} unresolved",
                source.source_id, source.raw_events, source.records, source.unresolved
            ),
            Some(e) => println!("   {}: failed ({})", source.source_id, e),
        }
    }
    println!("   Listed events: {}", result.consolidated.events.len());
    println!("   Duplicates dropped: {}", result.consolidated.duplicates_dropped);
    println!("   Outside window: {}", result.consolidated.outside_window);
    println!("   Unresolved: {}", result.consolidated.unresolved.len());
    if let Some(path) = &result.output_file {
        println!("   Output file: {}", path);
    }
    Ok(())
}

async fn parse_one(config: Config, text: String, source: Option<String>, today: Option<String>) -> anyhow::Result<()> {
    let today = parse_today(today.as_deref())?;
    let profile = match source {
        Some(source_id) => {
            let registry = SourceRegistry::load_from_directory(&config.pipeline.registry_dir)?;
            registry
                .get(&source_id)
                .map(|spec| spec.dates)
                .with_context(|| format!("Unknown source '{}'", source_id))?
        }
        None => DateProfile::default(),
    };

    let normalizer = DateNormalizer::new(build_resolver(&config.resolver)?);
    match normalizer.normalize("cli", &text, &profile, today).await {
        DateParseOutcome::Single(date) => println!("{}", date),
        DateParseOutcome::Multiple(dates) => {
            let dates: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
            println!("{}", dates.join(", "));
        }
        DateParseOutcome::Unparseable(reason) => println!("unresolved: {}", reason),
    }
    Ok(())
}

fn list_sources(config: &Config) -> anyhow::Result<()> {
    let registry = SourceRegistry::load_from_directory(&config.pipeline.registry_dir)?;
    for spec in registry.all() {
        let adapter = match &spec.adapter {
            AdapterSpec::HtmlListing { .. } => "html_listing",
            AdapterSpec::JsonFile { .. } => "json_file",
        };
        println!(
            "{:<20} {:<8} priority={:<4} adapter={:<13} day_first={} relative={} ranges={:?}",
            spec.source_id,
            if spec.enabled { "enabled" } else { "disabled" },
            spec.priority,
            adapter,
            spec.dates.day_first,
            spec.dates.relative_terms,
            spec.dates.delimiter_policy,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { sources } => run_sources(config, sources).await,
        Commands::ParseDate { text, source, today } => parse_one(config, text, source, today).await,
        Commands::ListSources => list_sources(&config),
    }
}
