use crate::fs_scan::default_extensions;
use crate::types::DEFAULT_THREADS;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "mp3tools.yaml";

pub const DEFAULT_OUTDIR: &str = "output";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct YamlConfig {
    pub threads: Option<usize>,
    pub outdir: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub log_level: Option<String>,
}

/// Missing file -> Ok(None).
pub fn read_yaml(path: &Path) -> Result<Option<YamlConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let cfg = serde_yaml::from_reader(file).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(cfg))
}

/// Config file contents, plus why the file was ignored when it was.
/// Loading happens before logging is set up, so the warning is deferred to
/// [`LoadedConfig::finish`].
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: YamlConfig,
    pub ignored: Option<anyhow::Error>,
}

impl LoadedConfig {
    pub fn log_level(&self) -> Option<&str> {
        self.config.log_level.as_deref()
    }

    /// Emits the deferred warning, if any, and hands over the config.
    pub fn finish(self, path: &Path) -> YamlConfig {
        if let Some(e) = &self.ignored {
            warn!(config = %path.display(), error = %format!("{e:#}"), "config ignored, using defaults");
        }
        self.config
    }
}

/// Unreadable or invalid file -> defaults, with the error kept for a warning.
pub fn load_yaml(path: &Path) -> LoadedConfig {
    match read_yaml(path) {
        Ok(cfg) => LoadedConfig {
            config: cfg.unwrap_or_default(),
            ignored: None,
        },
        Err(e) => LoadedConfig {
            config: YamlConfig::default(),
            ignored: Some(e),
        },
    }
}

/// Values after applying CLI flag > config file > built-in default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub threads: usize,
    pub outdir: PathBuf,
    pub extensions: Vec<String>,
}

impl YamlConfig {
    pub fn resolve(&self, cli_threads: Option<usize>, cli_outdir: Option<PathBuf>) -> Settings {
        let threads = cli_threads
            .or(self.threads)
            .unwrap_or(DEFAULT_THREADS)
            .max(1);
        let outdir = cli_outdir
            .or_else(|| self.outdir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTDIR));
        let extensions = match &self.extensions {
            Some(exts) if !exts.is_empty() => exts.clone(),
            _ => default_extensions(),
        };
        Settings {
            threads,
            outdir,
            extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        assert!(read_yaml(&path).unwrap().is_none());
        let loaded = load_yaml(&path);
        assert!(loaded.ignored.is_none());
        assert_eq!(loaded.finish(&path), YamlConfig::default());
    }

    #[test]
    fn parses_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        std::fs::write(
            &path,
            "threads: 8\noutdir: /tmp/tagged\nextensions: [mp3, ape]\nlog_level: debug\n",
        )
        .unwrap();

        let loaded = load_yaml(&path);
        assert!(loaded.ignored.is_none());
        assert_eq!(loaded.log_level(), Some("debug"));
        let cfg = loaded.finish(&path);
        assert_eq!(cfg.threads, Some(8));
        assert_eq!(cfg.outdir, Some(PathBuf::from("/tmp/tagged")));
        assert_eq!(cfg.extensions, Some(vec!["mp3".to_string(), "ape".to_string()]));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        std::fs::write(&path, "threads: [not a number\n").unwrap();
        assert!(read_yaml(&path).is_err());
        let loaded = load_yaml(&path);
        assert!(loaded.ignored.is_some());
        assert_eq!(loaded.log_level(), None);
        assert_eq!(loaded.finish(&path), YamlConfig::default());

        std::fs::write(&path, "workers: 4\n").unwrap();
        assert!(read_yaml(&path).is_err());
    }

    #[test]
    fn cli_beats_config_beats_default() {
        let cfg = YamlConfig {
            threads: Some(3),
            outdir: Some(PathBuf::from("cfg_out")),
            ..Default::default()
        };
        let s = cfg.resolve(Some(9), None);
        assert_eq!(s.threads, 9);
        assert_eq!(s.outdir, PathBuf::from("cfg_out"));
        assert_eq!(s.extensions, default_extensions());

        let s = YamlConfig::default().resolve(None, None);
        assert_eq!(s.threads, DEFAULT_THREADS);
        assert_eq!(s.outdir, PathBuf::from(DEFAULT_OUTDIR));

        assert_eq!(YamlConfig::default().resolve(Some(0), None).threads, 1);
    }
}
