use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use repomark_api::BookmarkClient;
use repomark_core::{
    providers::GitHubProvider, summarize, Config, LanguageFilter, RepositorySearch, SearchQuery,
    SortKey,
};
use repomark_tui::{run_tui, App, Services};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "repomark=info,tower_http=info";

#[derive(Parser)]
#[command(name = "repomark")]
#[command(version, about = "Search GitHub, bookmark repositories, chart what you keep", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the bookmark HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Search GitHub and print one page of results with a summary
    Search {
        /// Search query
        query: String,
        /// Language name, or "all"
        #[arg(short, long, default_value = "all")]
        language: LanguageFilter,
        /// stars or updated
        #[arg(short, long, default_value = "stars")]
        sort: SortKey,
        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Interactive terminal UI (the default)
    Tui,
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    init_logging(matches!(command, Commands::Tui))?;

    let mut config = Config::load()?;
    config.apply_env()?;

    match command {
        Commands::Serve { host, port, db } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(db) = db {
                config.server.database_path = Some(db);
            }
            repomark_server::serve(&config.server).await?;
        }
        Commands::Search {
            query,
            language,
            sort,
            page,
        } => {
            let search = github_search(&config)?;
            let query = SearchQuery {
                query,
                language,
                sort,
                page,
            };
            tracing::info!("Searching for: {}", query.query);
            print_search(&search, &query).await;
        }
        Commands::Tui => {
            let services = Services {
                search: Arc::new(github_search(&config)?),
                bookmarks: BookmarkClient::new(&config.client.api_url, config.client.token.clone())
                    .context("Failed to build bookmark client")?,
            };
            let app = App::new(Duration::from_millis(config.client.annotation_debounce_ms));
            run_tui(app, services).await?;
        }
        Commands::Config { init } => {
            let path = Config::config_path()?;
            if init && !path.exists() {
                Config::default().save()?;
                println!("Wrote default config to {}", path.display());
            }
            println!("# {}", path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// The TUI owns the terminal, so its logs go to a file instead
fn init_logging(to_file: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    if to_file {
        let dir = Config::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("repomark.log"))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn github_search(config: &Config) -> anyhow::Result<RepositorySearch> {
    let provider = GitHubProvider::new(config.github.token.clone(), &config.github.api_url)?;
    Ok(RepositorySearch::new(Box::new(provider)))
}

async fn print_search(search: &RepositorySearch, query: &SearchQuery) {
    let outcome = search.search(query).await;

    if let Some(warning) = &outcome.warning {
        eprintln!("Search failed: {}", warning);
    }
    if outcome.repositories.is_empty() {
        println!("No repositories found.");
        return;
    }

    println!(
        "{} / {} / page {}\n",
        query.language.label(),
        query.sort.label(),
        query.page
    );
    for (i, repo) in outcome.repositories.iter().enumerate() {
        println!(
            "{:>3}. {}  ★ {}  [{}]",
            i + 1,
            repo.full_name,
            repo.stars,
            repo.language_or_unknown()
        );
        if let Some(desc) = repo.description.as_deref().filter(|d| !d.is_empty()) {
            println!("     {}", desc);
        }
    }

    let stats = summarize(&outcome.repositories);
    println!("\nTotal stars: {}", stats.total_stars);
    if let Some(top) = stats.top_repository {
        println!("Most starred: {} ({})", top.full_name, top.stars);
    }
    println!("Languages:");
    for bucket in &stats.languages {
        println!(
            "  {:<12} {:>3}  {:>6.2}%",
            bucket.language, bucket.count, bucket.percentage
        );
    }
}
