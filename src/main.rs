use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use greenlight::api::{Loader, UreqClient};
use greenlight::config::{AppConfig, ParamOverrides};
use greenlight::dashboard::Dashboard;
use greenlight::db::Database;
use greenlight::views::View;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "greenlight", version, about = "Movie statistics dashboard with composite scoring")]
struct Cli {
    /// Base URL of the movie statistics API
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// IMDb weight in the composite score (0.0 to 1.0)
    #[arg(long, global = true)]
    weight: Option<f64>,

    /// Ignore cached responses and fetch everything again
    #[arg(long, global = true)]
    refresh: bool,

    /// Disable the on-disk response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Path to the response cache database
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Threshold controls shared by `view` and `export`.
#[derive(clap::Args)]
struct Thresholds {
    /// Number of countries shown (5 to 20)
    #[arg(long)]
    top_countries: Option<u32>,

    /// Minimum movies per actor (1 to 50)
    #[arg(long)]
    min_actor_movies: Option<u32>,

    /// Minimum movies per director (1 to 50)
    #[arg(long)]
    min_director_movies: Option<u32>,

    /// Minimum movies per genre (1 to 100)
    #[arg(long)]
    min_genre_movies: Option<u32>,
}

impl Thresholds {
    fn overrides(&self, weight: Option<f64>) -> ParamOverrides {
        ParamOverrides {
            weight,
            top_countries: self.top_countries,
            min_actor_movies: self.min_actor_movies,
            min_director_movies: self.min_director_movies,
            min_genre_movies: self.min_genre_movies,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render one dashboard view in the terminal
    View {
        #[arg(value_enum)]
        view: View,

        #[command(flatten)]
        thresholds: Thresholds,

        /// Print the Plotly figures as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Write every view to a standalone HTML page
    Export {
        /// Output file
        #[arg(short, long, default_value = "dashboard.html")]
        out: PathBuf,

        #[command(flatten)]
        thresholds: Thresholds,
    },

    /// Explore the dashboard with line commands
    Interactive,

    /// Manage the on-disk response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete every cached response
    Clear,
    /// Show cache size and age
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // Resolve cache path: CLI > config > XDG default
    let cache_path = cli
        .cache_path
        .or(config.cache.path.clone())
        .unwrap_or_else(greenlight::config::default_cache_path);

    let session = SessionFlags {
        api_url: cli.api_url,
        weight: cli.weight,
        refresh: cli.refresh,
        no_cache: cli.no_cache,
    };

    match cli.command {
        Commands::Cache { action } => {
            let db = Database::open(&cache_path).context("Failed to open response cache")?;
            match action {
                CacheAction::Clear => {
                    let removed = db.clear_responses().context("Failed to clear cache")?;
                    println!("Removed {removed} cached responses from {}", cache_path.display());
                }
                CacheAction::Stats => {
                    let stats = db.cache_stats().context("Failed to read cache stats")?;
                    println!("Response cache: {}", cache_path.display());
                    println!("Entries:  {}", stats.entries);
                    println!("Size:     {:.1} KiB", stats.total_bytes as f64 / 1024.0);
                    println!("Oldest:   {}", stats.oldest.as_deref().unwrap_or("-"));
                    println!("Newest:   {}", stats.newest.as_deref().unwrap_or("-"));
                }
            }
        }

        Commands::View { view, thresholds, json } => {
            let overrides = thresholds.overrides(session.weight);
            let mut dashboard = open_dashboard(&session, &overrides, &config, &cache_path)?;
            let panel = dashboard
                .render(view)
                .with_context(|| format!("Failed to load data from {}", dashboard.base_url()))?;

            if json {
                let doc = greenlight::report::panel_json(&panel);
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!("{}", greenlight::views::header(dashboard.params()));
                println!();
                greenlight::report::print_panel(&panel);
            }
        }

        Commands::Export { out, thresholds } => {
            let overrides = thresholds.overrides(session.weight);
            let mut dashboard = open_dashboard(&session, &overrides, &config, &cache_path)?;
            let panels = dashboard
                .render_all()
                .with_context(|| format!("Failed to load data from {}", dashboard.base_url()))?;

            let file = std::fs::File::create(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            greenlight::report::html::write(&mut writer, dashboard.base_url(), dashboard.params(), &panels)
                .context("Failed to write HTML report")?;
            writer.flush().context("Failed to write HTML report")?;
            println!("Dashboard written to {}", out.display());
        }

        Commands::Interactive => {
            let overrides = ParamOverrides {
                weight: session.weight,
                ..ParamOverrides::default()
            };
            let mut dashboard = open_dashboard(&session, &overrides, &config, &cache_path)?;
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            greenlight::interactive::run(&mut dashboard, stdin.lock(), &mut stdout)
                .context("Interactive session failed")?;
        }
    }

    Ok(())
}

/// Global flags that shape a dashboard session.
struct SessionFlags {
    api_url: Option<String>,
    weight: Option<f64>,
    refresh: bool,
    no_cache: bool,
}

fn open_dashboard(
    flags: &SessionFlags,
    overrides: &ParamOverrides,
    config: &AppConfig,
    cache_path: &Path,
) -> Result<Dashboard<UreqClient>> {
    // Resolve controls: CLI > config > built-in defaults
    let base_url = flags.api_url.as_deref().unwrap_or(&config.api_base_url).trim();
    let params = config
        .view_params(overrides)
        .context("Invalid weight or threshold (command line or config file)")?;
    log::info!("API: {base_url}");

    let client = UreqClient::new(config.timeout());
    let mut loader = Loader::new(client).with_progress(std::io::stderr().is_terminal());
    if config.cache.enabled && !flags.no_cache {
        match Database::open(cache_path) {
            Ok(db) => {
                log::info!("Response cache: {}", cache_path.display());
                loader = loader.with_disk_cache(db, config.cache_ttl());
            }
            Err(e) => log::warn!("Response cache unavailable ({e}); continuing without it"),
        }
    }

    let mut dashboard = Dashboard::new(loader, base_url, params);
    if flags.refresh {
        dashboard.refresh();
    }
    Ok(dashboard)
}
