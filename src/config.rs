use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use snafu::ResultExt;

const CONFIG_DIR: &str = "scfetch";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

#[derive(Debug, snafu::Snafu)]
pub enum Error {
    #[snafu(display("incorrect toml config: {}", source))]
    IncorrectToml { source: toml::de::Error },
    #[snafu(display("cannot read config {}: {}", path.display(), source))]
    Unreadable { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// API client id, discovered from the web player when absent.
    pub client_id: Option<String>,
    pub download_dir: PathBuf,
    pub user_agent: String,
    /// Transport timeout, `0` disables it.
    pub timeout_secs: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).context(IncorrectTomlSnafu)
    }
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads the user config; defaults when there is none.
    pub fn load() -> Result<Self, Error> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, Error> {
        match std::fs::read_to_string(path) {
            Ok(content) => content.parse(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(Error::Unreadable {
                path: path.to_owned(),
                source,
            }),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}
