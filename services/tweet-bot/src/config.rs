//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The consumer key/secret and the generator API key come only from the
//! environment, never from the TOML file, to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use twitter_auth::{ConsumerCredential, Endpoints};

/// Default config file name, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tweet-bot.toml";

/// Default generation prompt
pub const DEFAULT_PROMPT: &str = "Unique, Share bite-sized programming wisdom in concise tweets under 260 characters only single tweet, using simple language and clear examples. Avoid special formatting like \\n or **, and use simple alphabets and characters only when required. Incorporate relevant emojis (max 2-3) and hashtags #CodingTips. Focus on programming concepts and best practices. Keep the tone supportive and engaging. Your response is automated and it will be directly tweeted so do not need to interact in the response just give the response in the form of a tweet.";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub twitter: TwitterConfig,
    pub schedule: ScheduleConfig,
    pub generator: GeneratorConfig,
    /// From TWITTER_CONSUMER_KEY / TWITTER_CONSUMER_SECRET
    #[serde(skip)]
    pub consumer: Option<ConsumerCredential>,
    /// From API_KEY; only required once content is generated
    #[serde(skip)]
    pub api_key: Option<Secret<String>>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 100,
        }
    }
}

/// Outbound HTTP client settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// How the operator supplies the authorization PIN
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinEntry {
    /// Prompt on the terminal
    #[default]
    Console,
    /// Wait for `POST /auth/pin`
    Web,
}

/// Twitter endpoints and credential storage
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub credentials_path: PathBuf,
    pub pin_entry: PinEntry,
    pub request_token_url: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub tweets_url: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        let endpoints = Endpoints::default();
        Self {
            credentials_path: PathBuf::from(twitter_auth::DEFAULT_CREDENTIALS_FILE),
            pin_entry: PinEntry::default(),
            request_token_url: endpoints.request_token,
            authorize_url: endpoints.authorize,
            access_token_url: endpoints.access_token,
            tweets_url: publisher::TWEETS_ENDPOINT.to_string(),
        }
    }
}

impl TwitterConfig {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            request_token: self.request_token_url.clone(),
            authorize: self.authorize_url.clone(),
            access_token: self.access_token_url.clone(),
        }
    }
}

/// Posting schedule
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub retry_delay_secs: u64,
    /// Where each tick fetches its text (normally this service's `/tweet`)
    pub content_url: String,
    pub suffix: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            retry_delay_secs: 60,
            content_url: "http://127.0.0.1:3000/tweet".to_string(),
            suffix: scheduler::DEFAULT_SUFFIX.to_string(),
        }
    }
}

/// Content generator settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub prompt: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_output_tokens: 4096,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

fn require_http_url(name: &str, value: &str) -> common::Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(common::Error::Config(format!(
            "{name} must start with http:// or https://, got: {value}"
        )))
    }
}

fn require_positive(name: &str, value: u64) -> common::Result<()> {
    if value == 0 {
        return Err(common::Error::Config(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// A missing file yields the defaults. TWITTER_CONSUMER_KEY and
    /// TWITTER_CONSUMER_SECRET must be set; API_KEY is optional here.
    pub fn load(path: &Path) -> common::Result<Self> {
        let mut config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        config.validate()?;

        let key = Secret::from_env("TWITTER_CONSUMER_KEY")
            .ok_or_else(|| common::Error::MissingEnv("TWITTER_CONSUMER_KEY".into()))?;
        let secret = Secret::from_env("TWITTER_CONSUMER_SECRET")
            .ok_or_else(|| common::Error::MissingEnv("TWITTER_CONSUMER_SECRET".into()))?;
        config.consumer = Some(ConsumerCredential::new(
            key.expose().clone(),
            secret.expose().clone(),
        ));
        config.api_key = Secret::from_env("API_KEY");

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        let twitter = &self.twitter;
        require_http_url("twitter.request_token_url", &twitter.request_token_url)?;
        require_http_url("twitter.authorize_url", &twitter.authorize_url)?;
        require_http_url("twitter.access_token_url", &twitter.access_token_url)?;
        require_http_url("twitter.tweets_url", &twitter.tweets_url)?;
        require_http_url("schedule.content_url", &self.schedule.content_url)?;
        require_http_url("generator.base_url", &self.generator.base_url)?;

        require_positive("http.timeout_secs", self.http.timeout_secs)?;
        require_positive("schedule.interval_secs", self.schedule.interval_secs)?;
        require_positive("schedule.retry_delay_secs", self.schedule.retry_delay_secs)?;
        require_positive("server.max_connections", self.server.max_connections as u64)?;
        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }
}
