use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NotesConfig {
    dir: PathBuf,
    extension: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./notes"),
            extension: "md".to_string(),
        }
    }
}

impl NotesConfig {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ResultsConfig {
    dir: PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./results"),
        }
    }
}

impl ResultsConfig {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    max_tokens: usize,
    token_limit: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1500,
            token_limit: 2048,
        }
    }
}

impl ChunkingConfig {
    /// Tokens of note text sent with one summary prompt.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens.min(self.token_limit)
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    attempts: u32,
    base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay_ms: base_delay.as_millis() as u64,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TranscriptConfig {
    dir: PathBuf,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./results"),
        }
    }
}

impl TranscriptConfig {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("README.md"),
        }
    }
}

impl CatalogConfig {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    notes: NotesConfig,
    results: ResultsConfig,
    chunking: ChunkingConfig,
    retry: RetryConfig,
    transcripts: TranscriptConfig,
    catalog: CatalogConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error reading config: {0}")]
    Confy(#[from] confy::ConfyError),
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Config> {
        match Config::load_or_create(path) {
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                None
            }
            Ok(cfg) => Some(cfg),
        }
    }

    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        if path.exists() {
            let cfg: Self = confy::load_path(path)?;
            Ok(cfg)
        } else {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            info!("Writing default configuration to {}", path.display());
            let cfg = Config::default();
            confy::store_path(path, &cfg)?;
            Ok(cfg)
        }
    }

    pub fn notes(&self) -> &NotesConfig {
        &self.notes
    }

    pub fn results(&self) -> &ResultsConfig {
        &self.results
    }

    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn transcripts(&self) -> &TranscriptConfig {
        &self.transcripts
    }

    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let cfg = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.chunking().max_tokens(), 1500);
        assert_eq!(cfg.retry().attempts(), 3);

        let reloaded = Config::from_path(&path).unwrap();
        assert_eq!(reloaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "notes:\n  dir: /srv/notes\nchunking:\n  max_tokens: 4000\n",
        )
        .unwrap();

        let cfg = Config::load_or_create(&path).unwrap();
        assert_eq!(cfg.notes().dir(), Path::new("/srv/notes"));
        assert_eq!(cfg.notes().extension(), "md");
        // The chunk budget never exceeds the model's token limit.
        assert_eq!(cfg.chunking().max_tokens(), 2048);
        assert_eq!(cfg.catalog().path(), Path::new("README.md"));
    }

    #[test]
    fn unreadable_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "retry: [not, a, map]\n").unwrap();
        assert!(Config::from_path(&path).is_none());
    }
}
