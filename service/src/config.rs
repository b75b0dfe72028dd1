use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default spacing between SSE keep-alive frames, in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

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

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Seconds between keep-alive frames written to every open SSE connection.
    /// Dead connections are evicted when their keep-alive write fails.
    #[arg(
        long,
        env,
        default_value_t = DEFAULT_HEARTBEAT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub heartbeat_interval_secs: u64,

    /// The HS256 secret used to verify session tokens issued by the auth provider.
    #[arg(long, env)]
    session_jwt_secret: Option<String>,

    /// When set, session tokens must carry this `iss` claim.
    #[arg(long, env)]
    session_jwt_issuer: Option<String>,

    /// The shared secret generation providers sign job-status webhooks with.
    #[arg(long, env)]
    webhook_signing_secret: Option<String>,
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

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn set_session_jwt_secret(mut self, secret: String) -> Self {
        self.session_jwt_secret = Some(secret);
        self
    }

    pub fn session_jwt_secret(&self) -> Option<&str> {
        self.session_jwt_secret.as_deref()
    }

    pub fn set_session_jwt_issuer(mut self, issuer: String) -> Self {
        self.session_jwt_issuer = Some(issuer);
        self
    }

    pub fn session_jwt_issuer(&self) -> Option<&str> {
        self.session_jwt_issuer.as_deref()
    }

    pub fn set_webhook_signing_secret(mut self, secret: String) -> Self {
        self.webhook_signing_secret = Some(secret);
        self
    }

    pub fn webhook_signing_secret(&self) -> Option<&str> {
        self.webhook_signing_secret.as_deref()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::parse_from(std::iter::once("creative_ink").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.port, 4000);
        assert_eq!(config.interface(), "127.0.0.1");
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.runtime_env(), RustEnv::Development);
        assert!(!config.is_production());
    }

    #[test]
    fn test_allowed_origins_are_comma_delimited() {
        let config = parse(&[
            "--allowed-origins",
            "https://app.creativeink.io,https://staging.creativeink.io",
        ]);
        assert_eq!(
            config.allowed_origins,
            vec![
                "https://app.creativeink.io".to_string(),
                "https://staging.creativeink.io".to_string()
            ]
        );
    }

    #[test]
    fn test_zero_heartbeat_interval_is_rejected() {
        let result = Config::try_parse_from(["creative_ink", "--heartbeat-interval-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_runtime_env_accepts_upper_case() {
        let config = parse(&["--runtime-env", "PRODUCTION"]);
        assert!(config.is_production());
    }

    #[test]
    fn test_setters_override_secrets() {
        let config = parse(&[])
            .set_session_jwt_secret("jwt-secret".to_string())
            .set_session_jwt_issuer("https://clerk.creativeink.io".to_string())
            .set_webhook_signing_secret("whsec".to_string());
        assert_eq!(config.session_jwt_secret(), Some("jwt-secret"));
        assert_eq!(config.session_jwt_issuer(), Some("https://clerk.creativeink.io"));
        assert_eq!(config.webhook_signing_secret(), Some("whsec"));
    }
}
