use std::path::{Path, PathBuf};
use std::time::Duration;

use docchat_service::DEFAULT_BASE_URL;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use super::sequencer::ReplyOrdering;
use super::session::{DEFAULT_EVENT_CAPACITY, DEFAULT_GREETING, DEFAULT_QUERY_TIMEOUT, SessionOptions};

pub const SETTINGS_DIRECTORY_NAME: &str = "docchat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "DOCCHAT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default)]
    pub reply_ordering: ReplyOrdering,
    /// Empty disables the opening bot message.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query_timeout_secs: default_query_timeout_secs(),
            reply_ordering: ReplyOrdering::default(),
            greeting: default_greeting(),
        }
    }
}

impl Settings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".docchat"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Defaults, then the JSON file if it exists, then `DOCCHAT_*` variables.
    pub fn figment(path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: &Figment) -> Self {
        match figment.extract::<Settings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!("failed to parse settings: {}. using defaults", error);
                Settings::default()
            }
        }
    }

    pub fn load(path: &Path) -> Self {
        Self::from_figment(&Self::figment(path))
    }

    pub fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            self.base_url = default_base_url();
        }
        if self.query_timeout_secs == 0 {
            self.query_timeout_secs = default_query_timeout_secs();
        }
        self
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn session_options(&self) -> SessionOptions {
        let greeting = Some(self.greeting.clone()).filter(|greeting| !greeting.trim().is_empty());
        SessionOptions {
            query_timeout: self.query_timeout(),
            reply_ordering: self.reply_ordering,
            greeting,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Writes the settings as pretty JSON, replacing the file atomically.
    pub fn persist(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(self).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: path.to_path_buf(),
        })?;

        tracing::info!("saved settings to {:?}", path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_query_timeout_secs() -> u64 {
    DEFAULT_QUERY_TIMEOUT.as_secs()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}
