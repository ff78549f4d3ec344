//! Filtered compatibility reports for LineageOS devices.
//!
//! Reads the per-device YAML files of the LineageOS wiki
//! (`_data/devices/*.yml`), decides for every configured release line which
//! devices are worth listing, and writes a reproducible report.
//!
//! - **Source** - discovery of raw device files ([`RecordSource`])
//! - **Device loader** - YAML -> [`DeviceRecord`], per-file [`LoadError`]s
//! - **Filter** - release line, maintainer and hardware-floor predicates
//! - **Aggregate** - per-line ranking and top-N leaderboard
//! - **Report** - CSV per line, skip log, load error log, summary, manifest
//!
//! # Architecture
//!
//! ```text
//! RecordSource ──> load_devices ──┬──> classify ──┬──> aggregate ──> write_reports
//!                                 │               └── skipped ──────────┘
//!                                 └── load errors ─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use lineage_device_report::{run_report, DirectorySource, ReportConfig};
//!
//! let config = ReportConfig::default();
//! let source = DirectorySource::new(&config.input_dir);
//! let summary = run_report(&config, &source)?;
//! println!("{} devices included", summary.included_total());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod device;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod source;

pub use aggregate::{aggregate, Aggregation, LineReport, RankedDevice};
pub use config::{load_config, parse_config, ReportConfig};
pub use device::{Capacity, DeviceRecord, ReleaseLine};
pub use error::{LoadError, LoadErrorKind};
pub use filter::{classify, evaluate, Predicate, SkipEntry, SkipReason, Thresholds, Verdict};
pub use pipeline::{run_report, RunSummary};
pub use source::{DirectorySource, MemorySource, RawRecord, RecordSource};
