//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive: `[instrument.MES]` is read
//! back as `instrument.mes`.

use crate::domain::error::BackadjustError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BackadjustError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| BackadjustError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, BackadjustError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| BackadjustError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// Sections whose name starts with `prefix`, lowercase.
    pub fn sections_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut sections: Vec<String> = self
            .config
            .sections()
            .into_iter()
            .filter(|s| s.starts_with(prefix))
            .collect();
        sections.sort();
        sections
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}
