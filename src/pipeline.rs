//! The linear Load -> Filter -> Aggregate -> Emit pass.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::info;

use crate::aggregate::aggregate;
use crate::config::ReportConfig;
use crate::device::{load_devices, ReleaseLine};
use crate::filter::classify;
use crate::report::{prepare_output_dir, write_reports, ReportArtifacts};
use crate::source::RecordSource;

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub devices_loaded: usize,
    pub included: BTreeMap<ReleaseLine, usize>,
    pub skipped: usize,
    pub load_errors: usize,
    pub artifacts: ReportArtifacts,
}

impl RunSummary {
    pub fn included_total(&self) -> usize {
        self.included.values().sum()
    }
}

/// Run the whole report. Configuration problems and an unusable output
/// directory fail before any record is read; per-file problems never fail
/// the run.
pub fn run_report(config: &ReportConfig, source: &dyn RecordSource) -> Result<RunSummary> {
    config.validate()?;
    prepare_output_dir(&config.output_dir)?;

    let loaded = load_devices(source);
    info!(
        "loaded {} devices ({} load errors)",
        loaded.devices.len(),
        loaded.errors.len()
    );

    let classified = classify(&loaded.devices, &config.release_lines, &config.thresholds);
    let aggregation = aggregate(&classified.included, &config.release_lines, config.top_n);

    for report in aggregation.lines.values() {
        for entry in &report.ranked {
            info!(
                "{} - {}",
                entry.device.display_name(),
                config.wiki_link(&entry.device.codename)
            );
        }
        info!(
            "release line {}: {} devices included",
            report.line,
            report.len()
        );
    }

    let artifacts = write_reports(
        config,
        &aggregation,
        &classified.skipped,
        &loaded.errors,
        loaded.devices.len(),
    )
    .with_context(|| format!("writing report to '{}'", config.output_dir.display()))?;

    Ok(RunSummary {
        devices_loaded: loaded.devices.len(),
        included: aggregation
            .lines
            .values()
            .map(|report| (report.line, report.len()))
            .collect(),
        skipped: classified.skipped.len(),
        load_errors: loaded.errors.len(),
        artifacts,
    })
}
