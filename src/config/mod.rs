mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub song_data_dir: Option<PathBuf>,
    pub log_data_dir: Option<PathBuf>,
    pub continue_on_error: bool,
    pub progress: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Root of the song-metadata tree. A pass is skipped when its root is
    /// not configured.
    pub song_data_dir: Option<PathBuf>,
    pub log_data_dir: Option<PathBuf>,
    pub continue_on_error: bool,
    pub progress: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        let song_data_dir = file
            .song_data_dir
            .map(PathBuf::from)
            .or_else(|| cli.song_data_dir.clone());
        let log_data_dir = file
            .log_data_dir
            .map(PathBuf::from)
            .or_else(|| cli.log_data_dir.clone());

        for (name, dir) in [("song_data_dir", &song_data_dir), ("log_data_dir", &log_data_dir)] {
            if let Some(dir) = dir {
                if !dir.exists() {
                    bail!("{} does not exist: {:?}", name, dir);
                }
                if !dir.is_dir() {
                    bail!("{} is not a directory: {:?}", name, dir);
                }
            }
        }

        let continue_on_error = file.continue_on_error.unwrap_or(cli.continue_on_error);
        let progress = file.progress.unwrap_or(cli.progress);

        Ok(Self {
            db_path,
            song_data_dir,
            log_data_dir,
            continue_on_error,
            progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_cli_only() {
        let data_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/tmp/warehouse.db")),
            song_data_dir: Some(data_dir.path().to_path_buf()),
            log_data_dir: None,
            continue_on_error: true,
            progress: false,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/warehouse.db"));
        assert_eq!(config.song_data_dir, Some(data_dir.path().to_path_buf()));
        assert_eq!(config.log_data_dir, None);
        assert!(config.continue_on_error);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let data_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/should/be/overridden")),
            continue_on_error: true,
            ..Default::default()
        };
        let file = FileConfig {
            db_path: Some("/toml/warehouse.db".to_string()),
            log_data_dir: Some(data_dir.path().to_string_lossy().to_string()),
            continue_on_error: Some(false),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/toml/warehouse.db"));
        assert_eq!(config.log_data_dir, Some(data_dir.path().to_path_buf()));
        assert!(!config.continue_on_error);
    }

    #[test]
    fn test_resolve_missing_db_path_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_path must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_data_dir_error() {
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/tmp/warehouse.db")),
            song_data_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_data_dir_not_directory_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/tmp/warehouse.db")),
            log_data_dir: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }
}
