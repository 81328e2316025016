use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use events::EventCategory;
use log::LevelFilter;
use sse::{RelayConfig, SessionConfig};
use std::path::PathBuf;
use std::time::Duration;

/// A file whose changes are announced as notifications of `category`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchTarget {
    pub category: EventCategory,
    pub path: PathBuf,
}

fn parse_watch_target(value: &str) -> Result<WatchTarget, String> {
    let (category, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=PATH, got `{value}`"))?;
    let category = category.trim().parse::<EventCategory>().map_err(|e| e.to_string())?;
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("missing path in `{value}`"));
    }

    Ok(WatchTarget {
        category,
        path: PathBuf::from(path),
    })
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Path prefix the event endpoint is mounted under (e.g. "/app" serves "/app/api/event").
    #[arg(long, env, default_value = "")]
    url_prefix: String,

    /// Milliseconds the watcher sleeps between two drains of the notification queue
    #[arg(long, env, default_value_t = 100)]
    pub watcher_interval_ms: u64,

    /// Milliseconds between two counter polls of an event stream session
    #[arg(long, env, default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Idle polls before a heartbeat frame is sent on an event stream (0 disables heartbeats)
    #[arg(long, env, default_value_t = 100)]
    pub heartbeat_cycles: u32,

    /// Send a heartbeat frame as soon as an event stream opens
    #[arg(long, env, default_value_t = false)]
    pub prime_with_heartbeat: bool,

    /// Files to watch for changes, as CATEGORY=PATH (e.g. "log=/var/log/app.log")
    #[arg(long = "watch", env = "WATCH", value_delimiter = ',', value_parser = parse_watch_target)]
    pub watch: Vec<WatchTarget>,

    /// Milliseconds between two checks of a watched file
    #[arg(long, env, default_value_t = 1000)]
    pub watch_interval_ms: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn set_url_prefix(mut self, url_prefix: String) -> Self {
        self.url_prefix = url_prefix;
        self
    }

    /// Returns the URL prefix with a leading slash and no trailing slash,
    /// or an empty string when the endpoint is mounted at the root.
    pub fn url_prefix(&self) -> String {
        let trimmed = self.url_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            heartbeat_cycles: self.heartbeat_cycles,
            prime_with_heartbeat: self.prime_with_heartbeat,
        }
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            watcher_interval: Duration::from_millis(self.watcher_interval_ms),
            session: self.session_config(),
        }
    }
}
