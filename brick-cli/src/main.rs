use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use brick::storage::SETTING_API_BASE_URL;
use brick::{
    ApiClient, AuthSession, ChatMessage, ClientConfig, CollectionQuery, SqliteCredentialStore,
    Storage,
};

#[derive(Parser)]
#[command(name = "brick")]
#[command(author, version, about = "Command-line client for the Brick language-learning server", long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Server root; remembered for later runs
    #[arg(long, global = true, env = "BRICK_API_BASE_URL")]
    base_url: Option<String>,

    /// Settings database (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the access token
    Login {
        username: String,

        #[arg(short, long, env = "BRICK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored access token
    Logout,

    /// Show the server and sign-in state
    Whoami,

    /// List collections
    Collections {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(short, long)]
        group: Option<String>,
    },

    /// Print a random brick
    Random {
        /// Restrict to these collections (repeatable)
        #[arg(short, long = "collection")]
        collections: Vec<i64>,
    },

    /// Score an answer against a target sentence
    Compare { answer: String, target: String },

    /// Transcribe a recording
    Transcribe { path: PathBuf },

    /// Ask the tutor; the reply streams as it is generated
    Chat { message: Vec<String> },

    /// Search video subtitles, or bricks with --bricks
    Search {
        query: String,

        #[arg(long)]
        bricks: bool,
    },
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("brick")
        .join("brick.db")
}

fn open_client(cli: &Cli) -> Result<ApiClient> {
    let db_path = cli.db.clone().unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let storage = Arc::new(
        Storage::open(&db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?,
    );

    let config = match &cli.base_url {
        Some(url) => {
            let config = ClientConfig::new(url)?;
            storage.set_setting(SETTING_API_BASE_URL, &config.base_url)?;
            config
        }
        None => match storage.get_setting(SETTING_API_BASE_URL)? {
            Some(saved) => ClientConfig::new(&saved)?,
            None => ClientConfig::from_env()?,
        },
    };
    debug!("Using {} with {}", config.base_url, db_path.display());

    let session = AuthSession::new(Arc::new(SqliteCredentialStore::new(storage)));
    Ok(ApiClient::new(config, session)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let api = open_client(&cli)?;

    match cli.command {
        Commands::Login { username, password } => {
            api.login(&username, &password)
                .await
                .context("Login failed")?;
            info!("Signed in to {}", api.base_url());
        }

        Commands::Logout => api.logout().await,

        Commands::Whoami => {
            let state = if api.session().is_logged_in().await {
                "signed in"
            } else {
                "signed out"
            };
            println!("{} ({})", api.base_url(), state);
        }

        Commands::Collections { page, limit, group } => {
            let query = CollectionQuery {
                page,
                limit,
                group_name: group,
            };
            let collections = api.list_collections(&query).await?;
            if collections.is_empty() {
                println!("No collections");
            }
            for collection in collections {
                println!(
                    "{:>5}  {:<30} {:>4} bricks  {}",
                    collection.id,
                    collection.name,
                    collection.brick_count,
                    collection.group_name.unwrap_or_default()
                );
            }
        }

        Commands::Random { collections } => {
            let brick = api.random_brick(&collections).await?;
            println!("{}", brick.target_text);
            println!("{}", brick.native_text);
            println!("{}", api.brick_audio_url(&brick.target_audio_url));
        }

        Commands::Compare { answer, target } => {
            let result = api.compare_sentences(&answer, &target).await?;
            let verdict = if result.correct { "correct" } else { "try again" };
            println!("{}% ({})", result.percent(), verdict);
        }

        Commands::Transcribe { path } => {
            println!("{}", api.transcribe_or_fallback(&path).await);
        }

        Commands::Chat { message } => {
            let messages = [ChatMessage::user(message.join(" "))];
            let mut stdout = std::io::stdout();
            api.stream_chat(&messages, |chunk| {
                let _ = stdout.write_all(chunk.as_bytes());
                let _ = stdout.flush();
            })
            .await?;
            println!();
        }

        Commands::Search { query, bricks } => {
            if bricks {
                for result in api.search_bricks(&query).await? {
                    let level = result
                        .cefr_level
                        .map(|l| format!("{l:?}"))
                        .unwrap_or_else(|| "--".to_string());
                    println!("[{}] {} / {}", level, result.target_text, result.native_text);
                }
            } else {
                for result in api.search_videos(&query).await? {
                    println!(
                        "https://youtu.be/{}?t={}  {}",
                        result.ytb_video_id,
                        result.start.floor() as u64,
                        result.text
                    );
                }
            }
        }
    }

    Ok(())
}
