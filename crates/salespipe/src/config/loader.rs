use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // The three lifecycle zones must be distinct directories, otherwise a
    // release would move a file back into the watched input zone.
    let paths = &config.paths;
    if paths.input_dir == paths.archive_dir || paths.input_dir == paths.processed_dir {
        return Err(ConfigError::Validation {
            message: "archive_dir and processed_dir must differ from input_dir".to_string(),
        });
    }

    if config.batch.interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "batch.interval_secs must be greater than 0".to_string(),
        });
    }

    if config.stream.queue_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "stream.queue_capacity must be greater than 0".to_string(),
        });
    }

    Ok(())
}
