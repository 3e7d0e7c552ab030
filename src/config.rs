use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Base URL of the remote A2A agent
    #[arg(long, env = "AGENT_URL")]
    pub agent_url: Option<String>,

    /// Bearer token sent to the remote agent
    #[arg(long, env = "AGENT_API_KEY", hide_env_values = true)]
    pub agent_api_key: Option<String>,

    /// Default delay between status polls
    #[arg(long, env = "POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Log output: compact or json
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub polling: PollingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upper bound on a single JSON-RPC call.
    pub request_timeout_ms: u64,
}

/// Poll defaults applied when a request carries no overrides.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag (or its env alias) > `BRIDGE_*` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let defaults = PollingConfig::default();
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_origins", vec!["*"])?
            .set_default("agent.base_url", "http://localhost:3773")?
            .set_default("agent.request_timeout_ms", 30_000)?
            .set_default("polling.interval_ms", defaults.interval_ms)?
            .set_default("polling.max_attempts", defaults.max_attempts)?
            .set_default("log.format", "compact")?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::from(Path::new(path)).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).is_file() {
            builder = builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml));
        }

        // E.g. BRIDGE_SERVER__PORT=9000, BRIDGE_SERVER__CORS_ORIGINS=a,b
        builder = builder.add_source(
            Environment::with_prefix("BRIDGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.cors_origins"),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(url) = cli.agent_url {
            builder = builder.set_override("agent.base_url", url)?;
        }
        if let Some(key) = cli.agent_api_key {
            builder = builder.set_override("agent.api_key", key)?;
        }
        if let Some(ms) = cli.poll_interval_ms {
            builder = builder.set_override("polling.interval_ms", ms)?;
        }
        if let Some(format) = cli.log_format {
            builder = builder.set_override("log.format", format.to_lowercase())?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "polling.interval_ms must be greater than zero".into(),
            ));
        }
        if self.polling.max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "polling.max_attempts must be greater than zero".into(),
            ));
        }
        url::Url::parse(&self.agent.base_url).map_err(|e| {
            config::ConfigError::Message(format!(
                "agent.base_url is not a valid URL ({}): {e}",
                self.agent.base_url
            ))
        })?;
        Ok(())
    }

    /// Whether any origin may call the API.
    pub fn allows_any_origin(&self) -> bool {
        self.server.cors_origins.is_empty() || self.server.cors_origins.iter().any(|o| o == "*")
    }
}
