use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::CollisionPolicy;
use crate::error::{DisposalError, Result};
use crate::rule::DisposalRule;
use crate::utils;

pub const CONFIG_ENV: &str = "TIDYSWEEP_CONFIG";
const APP_DIR: &str = "tidysweep";

/// Persisted user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backup_folder: PathBuf,
    pub trash_folder: PathBuf,
    pub log_file: PathBuf,
    pub report_file: PathBuf,
    pub on_collision: CollisionPolicy,
    pub prune_empty_dirs: bool,
    pub skip_dirs: Vec<String>,
    pub rule: RuleSettings,
}

/// The `[rule]` table. Sizes accept suffixes like "10MB".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    pub junk: Vec<String>,
    pub excluded: Vec<String>,
    pub min_age_days: u64,
    pub min_size: String,
}

impl Default for RuleSettings {
    fn default() -> Self {
        let rule = DisposalRule::default();
        Self {
            junk: rule.junk,
            excluded: vec![".pdf".into(), ".docx".into()],
            min_age_days: 30,
            min_size: "0B".into(),
        }
    }
}

impl RuleSettings {
    pub fn to_rule(&self) -> Result<DisposalRule> {
        let min_size = utils::parse_size(&self.min_size).map_err(DisposalError::Config)?;
        let rule = DisposalRule::new(self.junk.clone(), self.excluded.clone())
            .with_min_age(Duration::from_secs(self.min_age_days * utils::SECS_PER_DAY))
            .with_min_size(min_size);
        rule.validate()?;
        Ok(rule)
    }
}

impl Default for Settings {
    fn default() -> Self {
        let data = data_dir();
        Self {
            backup_folder: default_backup_folder(),
            trash_folder: default_trash_folder(),
            log_file: data.join("disposal.log"),
            report_file: data.join("history.csv"),
            on_collision: CollisionPolicy::Fail,
            prune_empty_dirs: false,
            skip_dirs: Vec::new(),
            rule: RuleSettings::default(),
        }
    }
}

impl Settings {
    /// Missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text)
            .map_err(|e| DisposalError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| DisposalError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// `$TIDYSWEEP_CONFIG`, else `<config dir>/tidysweep/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(val) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(val);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".tidysweep.toml"))
}

/// Where the log and history live.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".tidysweep"))
}

/// `~/Downloads/Backup`.
pub fn default_backup_folder() -> PathBuf {
    utils::home_dir()
        .map(|h| h.join("Downloads").join("Backup"))
        .unwrap_or_else(|| PathBuf::from("Backup"))
}

/// `~/.Trash` on macOS. Elsewhere a plain `trash` folder next to the log:
/// moved files carry no `.trashinfo`, so the freedesktop trash is not used.
pub fn default_trash_folder() -> PathBuf {
    if cfg!(target_os = "macos") {
        if let Some(home) = utils::home_dir() {
            return home.join(".Trash");
        }
    }
    data_dir().join("trash")
}
