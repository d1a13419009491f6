use bangumi_mcp::api::DEFAULT_BASE_URL;
use bangumi_mcp::mcp::ServeMode;
use bangumi_mcp::render::OutputFormat;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the Bangumi access token
pub const TOKEN_ENV: &str = "BANGUMI_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub api: ApiConfig,
    pub server: ServerConfig,
    pub output: OutputConfig,
    /// File the config was read from, `None` for defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// Problems met during discovery, reported once logging is up
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub mode: ServeMode,
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServeMode::Stdio,
            host: "localhost".to_string(),
            port: 18080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            api: ApiConfig::default(),
            server: ServerConfig::default(),
            output: OutputConfig::default(),
            source: None,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::discover(config_path)?;
        // A .env file may carry the token
        let _ = dotenvy::dotenv();
        config.apply_token(std::env::var(TOKEN_ENV).ok());
        Ok(config)
    }

    fn discover(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            let mut config =
                Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?;
            config.source = Some(path.clone());
            return Ok(config);
        }
        Ok(Self::first_readable(&Self::candidates()))
    }

    /// Primary location `~/.config/<project>/<project>.yml`, then `./<project>.yml`
    fn candidates() -> Vec<PathBuf> {
        let project_name = env!("CARGO_PKG_NAME");
        let mut paths = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(project_name).join(format!("{}.yml", project_name)));
        }
        paths.push(PathBuf::from(format!("{}.yml", project_name)));
        paths
    }

    /// First candidate that parses; defaults when none does
    fn first_readable(paths: &[PathBuf]) -> Self {
        let mut warnings = Vec::new();
        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(mut config) => {
                    config.source = Some(path.clone());
                    config.warnings = warnings;
                    return config;
                }
                Err(e) => warnings.push(format!("Failed to load config from {}: {:#}", path.display(), e)),
            }
        }
        Self {
            warnings,
            ..Self::default()
        }
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// The file's token wins; the environment fills in when it is unset or blank
    fn apply_token(&mut self, env_token: Option<String>) {
        if self.api.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            self.api.token = None;
        }
        if self.api.token.is_none() {
            self.api.token = env_token.filter(|t| !t.trim().is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://api.bgm.tv");
        assert!(config.api.token.is_none());
        assert!(config.api.user_agent.starts_with("bangumi-mcp/"));
        assert_eq!(config.server.mode, ServeMode::Stdio);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 18080);
        assert_eq!(config.output.format, OutputFormat::Structured);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  mode: sse\n  port: 9000\noutput:\n  format: text").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.mode, ServeMode::Sse);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.api.base_url, "https://api.bgm.tv");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let missing = PathBuf::from("/nonexistent/bangumi-mcp.yml");
        assert!(Config::discover(Some(&missing)).is_err());
    }

    #[test]
    fn test_explicit_path_sets_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log_level: debug").unwrap();

        let path = file.path().to_path_buf();
        let config = Config::discover(Some(&path)).unwrap();
        assert_eq!(config.source.as_ref(), Some(&path));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_broken_candidate_falls_through_with_warning() {
        let mut broken = NamedTempFile::new().unwrap();
        writeln!(broken, "server: [unclosed").unwrap();
        let mut good = NamedTempFile::new().unwrap();
        writeln!(good, "server:\n  port: 9100").unwrap();

        let paths = vec![
            PathBuf::from("/nonexistent/bangumi-mcp.yml"),
            broken.path().to_path_buf(),
            good.path().to_path_buf(),
        ];
        let config = Config::first_readable(&paths);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.source.as_deref(), Some(good.path()));
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains(&broken.path().display().to_string()));
        assert!(config.warnings[0].contains("Failed to parse config file"));
    }

    #[test]
    fn test_no_readable_candidate_uses_defaults() {
        let mut broken = NamedTempFile::new().unwrap();
        writeln!(broken, "server: [unclosed").unwrap();

        let config = Config::first_readable(&[broken.path().to_path_buf()]);
        assert!(config.source.is_none());
        assert_eq!(config.server.port, 18080);
        assert_eq!(config.warnings.len(), 1);

        let config = Config::first_readable(&[PathBuf::from("/nonexistent/bangumi-mcp.yml")]);
        assert!(config.source.is_none());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "server: [unclosed").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_file_token_wins_over_env() {
        let mut config = Config::default();
        config.api.token = Some("from-file".to_string());
        config.apply_token(Some("from-env".to_string()));
        assert_eq!(config.api.token.as_deref(), Some("from-file"));

        let mut config = Config::default();
        config.apply_token(Some("from-env".to_string()));
        assert_eq!(config.api.token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_blank_tokens_are_unset() {
        let mut config = Config::default();
        config.api.token = Some("  ".to_string());
        config.apply_token(Some(String::new()));
        assert!(config.api.token.is_none());

        let mut config = Config::default();
        config.api.token = Some("kept".to_string());
        config.apply_token(None);
        assert_eq!(config.api.token.as_deref(), Some("kept"));
    }
}
