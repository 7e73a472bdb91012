//! Resolved runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, `settings.json` in the data
//! directory, then values captured from the environment or command line.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::suggest::{DEFAULT_API_BASE_URL, DEFAULT_MODEL};

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub data_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Optional values from the settings file. Everything may be absent.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    api_key: Option<String>,
    model: Option<String>,
    api_base_url: Option<String>,
    city: Option<String>,
}

/// Values supplied on the command line or through the environment.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub city: Option<String>,
}

pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("soulstep");
    }
    dirs::home_dir()
        .map(|home| home.join(".soulstep"))
        .unwrap_or_else(|| PathBuf::from(".soulstep"))
}

impl Settings {
    pub fn resolve(overrides: Overrides) -> Self {
        let data_dir = overrides.data_dir.unwrap_or_else(default_data_dir);
        let file = read_settings_file(&data_dir);

        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let settings = Self {
            api_key: non_blank(overrides.api_key).or(non_blank(file.api_key)),
            model: non_blank(overrides.model)
                .or(non_blank(file.model))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base_url: non_blank(file.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            city: non_blank(overrides.city).or(non_blank(file.city)),
            data_dir,
        };
        debug!(data_dir = %settings.data_dir.display(), model = %settings.model, "resolved settings");
        settings
    }

    /// Copy suitable for printing: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = copy.api_key.map(|_| "********".to_string());
        copy
    }
}

fn read_settings_file(data_dir: &Path) -> SettingsFile {
    let path = data_dir.join(SETTINGS_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return SettingsFile::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read settings");
            return SettingsFile::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring invalid settings");
        SettingsFile::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::resolve(Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            ..Overrides::default()
        });
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.city, None);
    }

    #[test]
    fn overrides_beat_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"apiKey":"from-file","city":"京都","model":"file-model"}"#,
        )
        .unwrap();
        let settings = Settings::resolve(Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            api_key: Some("from-env".to_string()),
            model: Some(" ".to_string()),
            ..Overrides::default()
        });
        assert_eq!(settings.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.model, "file-model");
        assert_eq!(settings.city.as_deref(), Some("京都"));
    }

    #[test]
    fn invalid_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "not json").unwrap();
        let settings = Settings::resolve(Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            ..Overrides::default()
        });
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn redacted_masks_key() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::resolve(Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            api_key: Some("secret".to_string()),
            ..Overrides::default()
        });
        assert_eq!(settings.redacted().api_key.as_deref(), Some("********"));
    }
}
