//! Report configuration.
//!
//! Read from TOML; every key is optional:
//!
//! ```toml
//! input_dir = "lineage_wiki/_data/devices"
//! output_dir = "report"
//! release_lines = ["16", "17"]
//! ram_threshold_mb = 2048
//! storage_threshold_gb = 16
//! top_n = 10
//! write_summary = true
//! wiki_base_url = "https://wiki.lineageos.org/devices"
//! ```
//!
//! Any error here is fatal and raised before input is read.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::DEFAULT_TOP_N;
use crate::device::ReleaseLine;
use crate::filter::{Thresholds, DEFAULT_RAM_THRESHOLD_MB, DEFAULT_STORAGE_THRESHOLD_GB};

pub const DEFAULT_INPUT_DIR: &str = "lineage_wiki/_data/devices";
pub const DEFAULT_OUTPUT_DIR: &str = "report";
pub const DEFAULT_RELEASE_LINES: &[&str] = &["16"];
pub const DEFAULT_WIKI_BASE_URL: &str = "https://wiki.lineageos.org/devices";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Sorted, deduplicated.
    pub release_lines: Vec<ReleaseLine>,
    pub thresholds: Thresholds,
    pub top_n: usize,
    pub write_summary: bool,
    pub wiki_base_url: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            release_lines: DEFAULT_RELEASE_LINES
                .iter()
                .filter_map(|raw| raw.parse().ok())
                .collect(),
            thresholds: Thresholds::default(),
            top_n: DEFAULT_TOP_N,
            write_summary: true,
            wiki_base_url: DEFAULT_WIKI_BASE_URL.to_string(),
        }
    }
}

impl ReportConfig {
    /// Check the rules that make a configuration unusable.
    pub fn validate(&self) -> Result<()> {
        if self.release_lines.is_empty() {
            bail!("invalid config: release_lines must name at least one release line");
        }
        if self.thresholds.ram_mb == 0 {
            bail!("invalid config: ram_threshold_mb must be greater than 0");
        }
        if self.thresholds.storage_gb == 0 {
            bail!("invalid config: storage_threshold_gb must be greater than 0");
        }
        if self.thresholds.storage_gb.checked_mul(1024).is_none() {
            bail!(
                "invalid config: storage_threshold_gb {} is out of range",
                self.thresholds.storage_gb
            );
        }
        if self.top_n == 0 {
            bail!("invalid config: top_n must be at least 1");
        }
        if self.wiki_base_url.trim().is_empty() {
            bail!("invalid config: wiki_base_url must not be empty");
        }
        Ok(())
    }

    pub fn wiki_link(&self, codename: &str) -> String {
        format!("{}/{}", self.wiki_base_url.trim_end_matches('/'), codename)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReportToml {
    input_dir: Option<String>,
    output_dir: Option<String>,
    release_lines: Option<Vec<toml::Value>>,
    ram_threshold_mb: Option<u64>,
    storage_threshold_gb: Option<u64>,
    top_n: Option<usize>,
    write_summary: Option<bool>,
    wiki_base_url: Option<String>,
}

/// Read and validate a configuration file. Relative paths inside it are
/// resolved against the file's directory.
pub fn load_config(config_path: &Path) -> Result<ReportConfig> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("reading report config '{}'", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    parse_config(&text, base_dir)
        .with_context(|| format!("loading report config '{}'", config_path.display()))
}

/// Parse configuration text; `base_dir` anchors relative paths.
pub fn parse_config(text: &str, base_dir: &Path) -> Result<ReportConfig> {
    let parsed: ReportToml = toml::from_str(text).context("parsing report config")?;
    let defaults = ReportConfig::default();

    let release_lines = match parsed.release_lines {
        Some(raw) => parse_release_lines(&raw)?,
        None => defaults.release_lines,
    };

    let config = ReportConfig {
        input_dir: parsed
            .input_dir
            .map(|p| resolve_path(base_dir, &p))
            .unwrap_or_else(|| resolve_path(base_dir, DEFAULT_INPUT_DIR)),
        output_dir: parsed
            .output_dir
            .map(|p| resolve_path(base_dir, &p))
            .unwrap_or_else(|| resolve_path(base_dir, DEFAULT_OUTPUT_DIR)),
        release_lines,
        thresholds: Thresholds {
            ram_mb: parsed.ram_threshold_mb.unwrap_or(DEFAULT_RAM_THRESHOLD_MB),
            storage_gb: parsed
                .storage_threshold_gb
                .unwrap_or(DEFAULT_STORAGE_THRESHOLD_GB),
        },
        top_n: parsed.top_n.unwrap_or(DEFAULT_TOP_N),
        write_summary: parsed.write_summary.unwrap_or(true),
        wiki_base_url: parsed.wiki_base_url.unwrap_or(defaults.wiki_base_url),
    };
    config.validate()?;
    Ok(config)
}

/// Accepts `"17"`, `"17.1"`, `17` and `17.1`.
fn parse_release_lines(raw: &[toml::Value]) -> Result<Vec<ReleaseLine>> {
    let mut lines = Vec::with_capacity(raw.len());
    for value in raw {
        let line = match value {
            toml::Value::String(s) => s.parse::<ReleaseLine>()?,
            toml::Value::Integer(i) => u32::try_from(*i)
                .map(ReleaseLine::new)
                .map_err(|_| anyhow::anyhow!("unknown release line '{}'", i))?,
            toml::Value::Float(f) if f.is_finite() && *f >= 0.0 && *f < u32::MAX as f64 => {
                ReleaseLine::new(f.trunc() as u32)
            }
            other => bail!("unknown release line '{}'", other),
        };
        lines.push(line);
    }
    lines.sort();
    lines.dedup();
    Ok(lines)
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = ReportConfig::default();
        config.validate().unwrap();
        assert_eq!(config.release_lines, vec![ReleaseLine::new(16)]);
        assert_eq!(config.thresholds.ram_mb, 2048);
        assert_eq!(config.thresholds.storage_gb, 16);
        assert_eq!(config.top_n, 10);
    }

    #[test]
    fn empty_file_uses_defaults_relative_to_base() {
        let config = parse_config("", Path::new("/srv/report")).unwrap();
        assert_eq!(
            config.input_dir,
            PathBuf::from("/srv/report/lineage_wiki/_data/devices")
        );
        assert_eq!(config.output_dir, PathBuf::from("/srv/report/report"));
    }

    #[test]
    fn parses_all_keys() {
        let config = parse_config(
            r#"
input_dir = "/data/devices"
output_dir = "out"
release_lines = ["17.1", 16, "17", 18.1]
ram_threshold_mb = 3072
storage_threshold_gb = 32
top_n = 5
write_summary = false
wiki_base_url = "https://example.org/devices/"
"#,
            Path::new("/base"),
        )
        .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/data/devices"));
        assert_eq!(config.output_dir, PathBuf::from("/base/out"));
        assert_eq!(
            config.release_lines,
            vec![ReleaseLine::new(16), ReleaseLine::new(17), ReleaseLine::new(18)]
        );
        assert_eq!(config.thresholds.ram_mb, 3072);
        assert_eq!(config.thresholds.storage_gb, 32);
        assert_eq!(config.top_n, 5);
        assert!(!config.write_summary);
        assert_eq!(
            config.wiki_link("cheeseburger"),
            "https://example.org/devices/cheeseburger"
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let base = Path::new("/base");
        assert!(parse_config("release_lines = []", base).is_err());
        assert!(parse_config("release_lines = [\"cm-14\"]", base).is_err());
        assert!(parse_config("release_lines = [-1]", base).is_err());
        assert!(parse_config("ram_threshold_mb = 0", base).is_err());
        assert!(parse_config("storage_threshold_gb = 0", base).is_err());
        assert!(parse_config("top_n = 0", base).is_err());
        assert!(parse_config("unknown_key = 1", base).is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.toml");
        fs::write(&path, "release_lines = [\"17\"]\ninput_dir = \"devices\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.release_lines, vec![ReleaseLine::new(17)]);
        assert_eq!(config.input_dir, tmp.path().join("devices"));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("reading report config"));
    }
}
