use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use ghtopics::app::App;
use ghtopics::config::Config;
use ghtopics::feed::{FeedEvent, TopicError, TopicFeed};
use ghtopics::github::{build_http_client, GitHubClient};
use ghtopics::storage::{Database, SettingsStore, StoreError, Topic};
use ghtopics::ui;

/// Get the config directory path (~/.config/ghtopics/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("ghtopics"))
}

#[derive(Parser, Debug)]
#[command(name = "ghtopics", about = "Browse GitHub repositories by topic")]
struct Args {
    /// Config file (default: ~/.config/ghtopics/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Delete saved topics and start from the configured defaults
    #[arg(long)]
    reset_settings: bool,

    /// Save a topic before starting (repeatable)
    #[arg(long = "add-topic", value_name = "TOPIC")]
    add_topic: Vec<String>,
}

/// Route tracing output to a log file; stdout belongs to the TUI.
fn init_logging(config_dir: &std::path::Path) -> Result<()> {
    let log_path = config_dir.join("ghtopics.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file '{}'", log_path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ghtopics=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    init_logging(&config_dir)?;

    // User-only access to settings and token-bearing config
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;
    tracing::debug!(?config, "Configuration resolved");

    let db_path = config_dir.join("settings.db");
    if args.reset_settings && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete settings database")?;
        println!("Settings reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in settings path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(StoreError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of ghtopics appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open settings database: {}", e)),
    };

    let store = match SettingsStore::open(db).await {
        Ok(store) => Arc::new(store),
        Err(e @ (StoreError::Corrupt(_) | StoreError::UnsupportedVersion(_))) => {
            eprintln!("Error: {e}");
            eprintln!("Run with --reset-settings to start over.");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to load settings"),
    };

    if store.is_fresh() {
        seed_initial_topics(&store, &config.initial_topics).await?;
    }

    let http = build_http_client().context("Failed to build HTTP client")?;
    let client = GitHubClient::new(http, config.api_base_url.as_deref(), config.github_token())
        .context("Invalid GitHub API configuration")?;

    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(32);
    let feed = TopicFeed::new(Arc::new(client), Arc::clone(&store), config.selection, event_tx);

    for raw in &args.add_topic {
        match feed.add_topic(raw).await {
            Ok(topic) => println!("Saved topic '{topic}'"),
            Err(e @ TopicError::Duplicate(_)) => println!("{e}"),
            Err(e) => return Err(e).context("Failed to save topic"),
        }
    }

    let mut app = App::new(feed, config.load_more_buffer);
    ui::run(&mut app, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}

/// First run: save the configured topics and select the first one.
async fn seed_initial_topics(store: &SettingsStore, initial: &[String]) -> Result<()> {
    let topics: Vec<Topic> = initial
        .iter()
        .filter_map(|raw| match Topic::parse(raw) {
            Ok(topic) => Some(topic),
            Err(e) => {
                tracing::warn!(topic = %raw, error = %e, "Skipping invalid initial topic");
                None
            }
        })
        .collect();

    tracing::info!(count = topics.len(), "Seeding initial topics");
    store
        .update(move |s| {
            s.current_topics = topics.first().cloned().into_iter().collect();
            s.topic_list = topics;
        })
        .await
        .context("Failed to save initial topics")
}
