//! search-gateway CLI - Command-line interface for the search gateway
//!
//! Runs web searches, code searches and page extraction through the configured
//! providers, with weighted fallback or concurrent fan-out.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use search_gateway::{
    build_engine,
    config::{GatewayConfig, PROVIDER_NAMES},
    render, tools,
    types::{FetchFormat, SearchOutcome},
    SearchEngine, SearchError,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "search-gateway")]
#[command(about = "Multi-provider search gateway CLI")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file (defaults to config.yaml in the working directory)
    #[arg(short, long, global = true, env = "SEARCH_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the web
    Web {
        /// Search query
        query: String,

        /// Provider selector: auto, multi/all, a provider name, or a comma-separated list
        #[arg(short, long, default_value = "auto")]
        provider: String,

        /// Maximum number of results (per provider when fanning out)
        #[arg(short, long, default_value = "10")]
        max_results: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },
    /// Search code across code-aware providers
    Code {
        /// What to look for
        query: String,

        /// Repository scope: owner/repo, https URL or git@ remote
        #[arg(short, long)]
        repo: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },
    /// Extract the content of a web page
    Fetch {
        /// http(s) URL to fetch
        url: String,

        /// Content format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: FetchFormatCli,
    },
    /// List providers and whether they are registered
    Providers,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Markdown,
    Json,
    Table,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FetchFormatCli {
    Markdown,
    Text,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config =
        GatewayConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let engine = build_engine(&config).context("Failed to build provider registry")?;

    let outcome = match cli.command {
        Commands::Web {
            query,
            provider,
            max_results,
            format,
        } => handle_web_search(&engine, &query, &provider, max_results, format).await,
        Commands::Code {
            query,
            repo,
            format,
        } => handle_code_search(&engine, &query, repo.as_deref(), format).await,
        Commands::Fetch { url, format } => handle_fetch(&engine, &url, format).await,
        Commands::Providers => {
            handle_list_providers(&engine, &config);
            Ok(())
        }
    };

    if let Err(error) = outcome {
        eprintln!("{}", render::error(&error).red());
        if let Some(hint) = search_gateway::troubleshooting(&error) {
            eprintln!("{} {}", "Troubleshooting:".bold(), hint);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

async fn handle_web_search(
    engine: &SearchEngine,
    query: &str,
    provider: &str,
    max_results: u32,
    format: OutputFormat,
) -> Result<(), SearchError> {
    let outcome = tools::search_web(engine, query, max_results, provider).await?;
    display_outcome(&outcome, format, render::markdown)
}

async fn handle_code_search(
    engine: &SearchEngine,
    query: &str,
    repo: Option<&str>,
    format: OutputFormat,
) -> Result<(), SearchError> {
    let outcome = tools::search_code(engine, query, repo).await?;
    display_outcome(&outcome, format, render::code_sections)
}

async fn handle_fetch(
    engine: &SearchEngine,
    url: &str,
    format: FetchFormatCli,
) -> Result<(), SearchError> {
    let format = match format {
        FetchFormatCli::Markdown => FetchFormat::Markdown,
        FetchFormatCli::Text => FetchFormat::Text,
    };

    let page = tools::fetch_webpage(engine, url, format).await?;
    println!("{}", render::fetched(&page));
    log::info!("Fetched {} via {} in {}ms", page.url, page.provider, page.elapsed_ms);
    Ok(())
}

fn handle_list_providers(engine: &SearchEngine, config: &GatewayConfig) {
    println!("{}", "Search Providers:".bold().blue());
    println!();

    for &name in PROVIDER_NAMES {
        let Some(settings) = config.provider(name) else {
            continue;
        };

        match engine.registry().get(name) {
            Some(descriptor) if !descriptor.enabled => {
                println!(
                    "{} {} - {}",
                    "✗".yellow(),
                    name.bold(),
                    "disabled, available by explicit name only".italic()
                );
            }
            Some(descriptor) => {
                let capabilities = descriptor
                    .capabilities
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "{} {} - weight {}, {}",
                    "✓".green(),
                    name.bold(),
                    descriptor.weight,
                    capabilities.italic()
                );
            }
            None => {
                let reason = if settings.enabled {
                    "no API key configured"
                } else {
                    "disabled"
                };
                println!("{} {} - {}", "✗".red(), name.bold(), reason.italic());
            }
        }
    }

    println!();
    println!("{}", "Set environment variables to enable providers:".bold());
    println!("export SERPER_API_KEY=your_key");
    println!("export BRAVE_API_KEY=your_key");
    println!("export TAVILY_API_KEY=tvly-your_key");
    println!("export PERPLEXITY_API_KEY=your_key");
    println!("export EXA_API_KEY=your_key");
    println!("export JINA_API_KEY=your_key  # optional, lifts rate limits");
}

fn display_outcome(
    outcome: &SearchOutcome,
    format: OutputFormat,
    markdown: fn(&SearchOutcome) -> String,
) -> Result<(), SearchError> {
    match format {
        OutputFormat::Markdown => println!("{}", markdown(outcome)),
        OutputFormat::Json => println!("{}", render::json(outcome)?),
        OutputFormat::Table => display_table(outcome),
    }
    Ok(())
}

fn display_table(outcome: &SearchOutcome) {
    println!(
        "{} {}",
        "Search Results from".bold(),
        outcome.providers_used.join(", ").bold().blue()
    );
    println!("{}", "─".repeat(80).dimmed());

    for (i, result) in outcome.results.iter().enumerate() {
        println!("{}. {}", (i + 1).to_string().bold(), result.title.bold());
        println!("   {}", result.url.blue().underline());

        if let Some(domain) = &result.domain {
            println!("   {}", domain.green());
        }

        if let Some(snippet) = &result.snippet {
            let truncated = search_gateway::utils::text::truncate_chars(snippet, 200);
            println!("   {}", truncated.italic());
        }

        if let Some(published_date) = &result.published_date {
            println!("   {}", published_date.yellow());
        }

        println!("   Provider: {}", result.provider.cyan());
        println!();
    }

    println!(
        "{} {}",
        "Total results:".bold(),
        outcome.results.len().to_string().bold()
    );

    for attempt in outcome.failed_attempts() {
        println!("{} {}", "Failed:".red(), attempt);
    }
    println!("{} {}ms", "Elapsed:".dimmed(), outcome.elapsed_ms);
}
