//! Configuration persistence
//!
//! The runtime configuration is stored as pretty-printed JSON and written
//! atomically (temp file + rename).

use std::fs;
use std::io::Write;
use std::path::Path;

use super::RuntimeConfig;
use super::error::{ConfigError, ConfigResult};

/// Default config file name inside a runtime directory
pub const CONFIG_FILE: &str = "cadence.json";

/// Atomically write `data` to `path`
fn write_atomic(path: &Path, data: &[u8]) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path).map_err(|e| ConfigError::AtomicWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Write runtime configuration
pub fn write_config(path: &Path, config: &RuntimeConfig) -> ConfigResult<()> {
    let json = serde_json::to_vec_pretty(config)?;
    write_atomic(path, &json)?;
    tracing::debug!("Wrote config to {:?}", path);
    Ok(())
}

/// Load runtime configuration
pub fn load_config(path: &Path) -> ConfigResult<RuntimeConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;
    let config: RuntimeConfig = serde_json::from_slice(&data)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(CONFIG_FILE);

        let config = RuntimeConfig {
            tick_interval_ms: 250,
            debug: false,
            debug_filters: vec!["s@greeter".into()],
            history_limit: 8,
            stop_when_drained: false,
        };

        write_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded.tick_interval_ms, 250);
        assert!(!loaded.debug);
        assert_eq!(loaded.debug_filters, vec!["s@greeter".to_string()]);
        assert_eq!(loaded.history_limit, 8);
        assert!(!loaded.stop_when_drained);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, br#"{ "tick_interval_ms": 100 }"#).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.tick_interval_ms, 100);
        assert!(loaded.debug);
        assert_eq!(loaded.history_limit, RuntimeConfig::default().history_limit);
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_config(&temp.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
