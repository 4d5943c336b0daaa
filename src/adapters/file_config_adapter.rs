//! INI configuration read through `configparser`.

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| BacktestError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { ini })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        let Some(raw) = self.ini.get(section, key) else {
            return default;
        };
        raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(section, key, value = %raw, default, "not an integer, using default");
            default
        })
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        let Some(raw) = self.ini.get(section, key) else {
            return default;
        };
        parse_flag(&raw).unwrap_or_else(|| {
            tracing::warn!(section, key, value = %raw, default, "not a boolean, using default");
            default
        })
    }
}
