use std::{env, path::PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 3001;

pub const DEFAULT_CROSS_MODULE_FILES: [&str; 3] = [
    "cross_module_crisis_management.json",
    "cross_module_content_strategy.json",
    "cross_module_influencer_campaign.json",
];

#[async_trait]
pub trait ConfigManagerType: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    fn clone_box(&self) -> Box<dyn ConfigManagerType>;
    fn debug_box(&self) -> String;
}

pub struct ConfigManager(pub Box<dyn ConfigManagerType>);

impl ConfigManager {
    pub async fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).await
    }
}

impl Clone for ConfigManager {
    fn clone(&self) -> Self {
        ConfigManager(self.0.clone_box())
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.debug_box())
    }
}

/// What happened to the `.env` file at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvFile {
    Loaded(PathBuf),
    Missing(PathBuf),
    Invalid { path: PathBuf, error: String },
}

impl EnvFile {
    /// The `.env` file is read before any subscriber exists, so the outcome
    /// is reported here once tracing is up.
    pub fn log(&self) {
        match self {
            EnvFile::Loaded(path) => info!("Loaded .env from {}", path.display()),
            EnvFile::Missing(path) => {
                debug!("no .env at {}, using process environment", path.display())
            }
            EnvFile::Invalid { path, error } => {
                warn!(error = %error, "could not parse {}", path.display())
            }
        }
    }
}

/// Process environment, optionally seeded from a `.env` file.
#[derive(Clone, Debug)]
pub struct EnvConfigManager {
    env_file: EnvFile,
}

impl EnvConfigManager {
    pub fn new(path: PathBuf) -> Box<Self> {
        let env_file = if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(()) => EnvFile::Loaded(path),
                Err(e) => EnvFile::Invalid {
                    path,
                    error: e.to_string(),
                },
            }
        } else {
            EnvFile::Missing(path)
        };
        Box::new(Self { env_file })
    }

    pub fn env_file(&self) -> &EnvFile {
        &self.env_file
    }
}

#[async_trait]
impl ConfigManagerType for EnvConfigManager {
    async fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn clone_box(&self) -> Box<dyn ConfigManagerType> {
        Box::new(self.clone())
    }

    fn debug_box(&self) -> String {
        format!("EnvConfigManager({:?})", self.env_file)
    }
}

/// In-memory configuration, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MapConfigManager {
    map: DashMap<String, String>,
}

impl MapConfigManager {
    pub fn new() -> Box<Self> {
        Box::new(Self::default())
    }

    pub fn with(self: Box<Self>, key: &str, value: impl Into<String>) -> Box<Self> {
        self.map.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
impl ConfigManagerType for MapConfigManager {
    async fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).map(|v| v.clone())
    }

    fn clone_box(&self) -> Box<dyn ConfigManagerType> {
        Box::new(self.clone())
    }

    fn debug_box(&self) -> String {
        format!("MapConfigManager({} entries)", self.map.len())
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub log_dir: PathBuf,
    pub port: u16,
    pub cross_module_files: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./public/data"),
            backup_dir: PathBuf::from("./backups"),
            docs_dir: PathBuf::from("./public"),
            log_dir: PathBuf::from("./logs"),
            port: DEFAULT_PORT,
            cross_module_files: DEFAULT_CROSS_MODULE_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    pub async fn load(config: &ConfigManager) -> Self {
        let defaults = Settings::default();
        let path = |key: &'static str, fallback: PathBuf| async move {
            config.get(key).await.map(PathBuf::from).unwrap_or(fallback)
        };

        let port = match config.get("PORT").await {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring unparsable PORT");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let cross_module_files = config
            .get("FLOWDOCS_CROSS_MODULE_FILES")
            .await
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or(defaults.cross_module_files);

        Self {
            data_dir: path("FLOWDOCS_DATA_DIR", defaults.data_dir).await,
            backup_dir: path("FLOWDOCS_BACKUP_DIR", defaults.backup_dir).await,
            docs_dir: path("FLOWDOCS_DOCS_DIR", defaults.docs_dir).await,
            log_dir: path("FLOWDOCS_LOG_DIR", defaults.log_dir).await,
            port,
            cross_module_files,
        }
    }
}
