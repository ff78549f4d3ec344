//! Report emission.
//!
//! Every run regenerates the whole report directory:
//!
//! - `devices-<line>.csv`   included devices per release line, ranked
//! - `skipped.log`          one line per skipped (device, line) pair
//! - `load-errors.log`      input files that could not be loaded
//! - `summary.txt`          per-line top N and the overall leaderboard
//! - `report-manifest.json` counts and sha256 of every file above
//!
//! Nothing time- or environment-dependent is written, so identical input
//! gives byte-identical files.

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregate::{Aggregation, RankedDevice};
use crate::config::ReportConfig;
use crate::device::ReleaseLine;
use crate::error::LoadError;
use crate::filter::SkipEntry;

pub const SKIP_LOG_FILENAME: &str = "skipped.log";
pub const LOAD_ERRORS_FILENAME: &str = "load-errors.log";
pub const SUMMARY_FILENAME: &str = "summary.txt";
pub const MANIFEST_FILENAME: &str = "report-manifest.json";
const LOCK_FILENAME: &str = ".report.lock";
const PROBE_FILENAME: &str = ".write-probe";
const MANIFEST_SCHEMA: u32 = 1;

const CSV_HEADER: [&str; 12] = [
    "vendor",
    "name",
    "codename",
    "maintainers",
    "RAM",
    "storage",
    "SOC",
    "screen",
    "removable battery",
    "release",
    "models",
    "wiki link",
];

pub fn line_csv_filename(line: ReleaseLine) -> String {
    format!("devices-{line}.csv")
}

fn is_report_artifact(name: &str) -> bool {
    matches!(
        name,
        SKIP_LOG_FILENAME | LOAD_ERRORS_FILENAME | SUMMARY_FILENAME | MANIFEST_FILENAME
    ) || (name.starts_with("devices-") && name.ends_with(".csv"))
}

/// A written report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub file: String,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ReportArtifacts {
    pub dir: PathBuf,
    pub files: Vec<Artifact>,
}

impl ReportArtifacts {
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

#[derive(Debug, Serialize)]
struct ReportManifest<'a> {
    schema: u32,
    release_lines: Vec<u32>,
    ram_threshold_mb: u64,
    storage_threshold_gb: u64,
    top_n: usize,
    devices_loaded: usize,
    included: BTreeMap<String, usize>,
    skipped: usize,
    load_errors: usize,
    artifacts: &'a [Artifact],
}

/// Create the output directory and make sure it is writable.
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory '{}'", output_dir.display()))?;
    let probe = output_dir.join(PROBE_FILENAME);
    fs::write(&probe, b"")
        .with_context(|| format!("output directory '{}' is not writable", output_dir.display()))?;
    fs::remove_file(&probe)
        .with_context(|| format!("removing write probe '{}'", probe.display()))?;
    Ok(())
}

/// Held while a run writes into the output directory.
struct ReportLock {
    _file: File,
}

fn acquire_lock(output_dir: &Path) -> Result<ReportLock> {
    let lock_path = output_dir.join(LOCK_FILENAME);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("creating report lock '{}'", lock_path.display()))?;
    if file.try_lock_exclusive().is_err() {
        anyhow::bail!(
            "report directory is locked by another run: {}",
            lock_path.display()
        );
    }
    Ok(ReportLock { _file: file })
}

fn remove_stale_artifacts(output_dir: &Path) -> Result<()> {
    for entry in fs::read_dir(output_dir)
        .with_context(|| format!("reading output directory '{}'", output_dir.display()))?
    {
        let entry = entry
            .with_context(|| format!("iterating output directory '{}'", output_dir.display()))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|part| part.to_str()) else {
            continue;
        };
        if path.is_file() && is_report_artifact(name) {
            fs::remove_file(&path)
                .with_context(|| format!("removing previous report file '{}'", path.display()))?;
        }
    }
    Ok(())
}

/// Regenerate every report file in `config.output_dir`.
pub fn write_reports(
    config: &ReportConfig,
    aggregation: &Aggregation<'_>,
    skipped: &[SkipEntry],
    load_errors: &[LoadError],
    devices_loaded: usize,
) -> Result<ReportArtifacts> {
    let dir = config.output_dir.clone();
    prepare_output_dir(&dir)?;
    let _lock = acquire_lock(&dir)?;
    remove_stale_artifacts(&dir)?;

    let mut artifacts = ReportArtifacts {
        dir,
        files: Vec::new(),
    };

    for report in aggregation.lines.values() {
        let bytes = render_line_csv(config, &report.ranked)?;
        write_artifact(&mut artifacts, &line_csv_filename(report.line), bytes)?;
    }
    write_artifact(
        &mut artifacts,
        SKIP_LOG_FILENAME,
        render_skip_log(skipped).into_bytes(),
    )?;
    write_artifact(
        &mut artifacts,
        LOAD_ERRORS_FILENAME,
        render_load_errors(load_errors).into_bytes(),
    )?;
    if config.write_summary {
        write_artifact(
            &mut artifacts,
            SUMMARY_FILENAME,
            render_summary(config, aggregation).into_bytes(),
        )?;
    }

    let manifest = ReportManifest {
        schema: MANIFEST_SCHEMA,
        release_lines: config.release_lines.iter().map(|l| l.major()).collect(),
        ram_threshold_mb: config.thresholds.ram_mb,
        storage_threshold_gb: config.thresholds.storage_gb,
        top_n: config.top_n,
        devices_loaded,
        included: aggregation
            .lines
            .values()
            .map(|report| (report.line.to_string(), report.len()))
            .collect(),
        skipped: skipped.len(),
        load_errors: load_errors.len(),
        artifacts: &artifacts.files,
    };
    let mut manifest_json =
        serde_json::to_string_pretty(&manifest).context("serializing report manifest")?;
    manifest_json.push('\n');
    let manifest_path = artifacts.path(MANIFEST_FILENAME);
    fs::write(&manifest_path, manifest_json)
        .with_context(|| format!("writing report manifest '{}'", manifest_path.display()))?;

    info!(
        "wrote {} report files to '{}'",
        artifacts.files.len() + 1,
        artifacts.dir.display()
    );
    Ok(artifacts)
}

fn write_artifact(artifacts: &mut ReportArtifacts, name: &str, bytes: Vec<u8>) -> Result<()> {
    let path = artifacts.path(name);
    fs::write(&path, &bytes).with_context(|| format!("writing report '{}'", path.display()))?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    artifacts.files.push(Artifact {
        file: name.to_string(),
        sha256,
        bytes: bytes.len() as u64,
    });
    Ok(())
}

fn render_line_csv(config: &ReportConfig, ranked: &[RankedDevice<'_>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .context("writing csv header")?;
    for entry in ranked {
        let device = entry.device;
        let maintainers = entry.maintainers.to_string();
        let models = device.details.models.join(",");
        let link = config.wiki_link(&device.codename);
        writer
            .write_record([
                device.vendor.as_str(),
                device.name.as_str(),
                device.codename.as_str(),
                maintainers.as_str(),
                device.ram.text(),
                device.storage.text(),
                device.details.soc.as_str(),
                device.details.screen.as_str(),
                device.details.removable_battery.as_str(),
                device.details.release.as_str(),
                models.as_str(),
                link.as_str(),
            ])
            .with_context(|| format!("writing csv row for '{}'", device.codename))?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing csv output: {}", err.error()))
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_skip_log(skipped: &[SkipEntry]) -> String {
    let mut entries: Vec<&SkipEntry> = skipped.iter().collect();
    entries.sort_by(|a, b| (&a.codename, a.line).cmp(&(&b.codename, b.line)));

    let mut out = String::new();
    for entry in entries {
        let predicates = entry
            .predicates()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(
            out,
            "{}\tline={}\tfailed={}\t{}",
            entry.codename,
            entry.line,
            predicates,
            one_line(&entry.message())
        );
    }
    out
}

fn render_load_errors(errors: &[LoadError]) -> String {
    let mut entries: Vec<&LoadError> = errors.iter().collect();
    entries.sort_by(|a, b| a.origin.cmp(&b.origin));

    let mut out = String::new();
    for err in entries {
        let _ = writeln!(
            out,
            "{}\t{}\t{}",
            err.origin,
            err.kind.tag(),
            one_line(&err.kind.detail())
        );
    }
    out
}

fn render_summary(config: &ReportConfig, aggregation: &Aggregation<'_>) -> String {
    let lines = config
        .release_lines
        .iter()
        .map(ReleaseLine::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    let _ = writeln!(out, "LineageOS device report");
    let _ = writeln!(
        out,
        "release lines: {} | RAM > {} MB | storage > {} GB",
        lines, config.thresholds.ram_mb, config.thresholds.storage_gb
    );

    for report in aggregation.lines.values() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "release line {}: {} devices (top {})",
            report.line,
            report.len(),
            report.top().len()
        );
        for (rank, entry) in report.top().iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>4}. {:<20} {:<32} {} maintainers",
                rank + 1,
                entry.device.codename,
                entry.device.display_name(),
                entry.maintainers
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "overall top {}:", aggregation.top_n);
    for (rank, entry) in aggregation.leaderboard.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}. {:<20} {:<6} {:<32} {} maintainers",
            rank + 1,
            entry.device.codename,
            format!("[{}]", entry.line),
            entry.device.display_name(),
            entry.maintainers
        );
    }
    out
}
