//! Normalized device records.
//!
//! A [`DeviceRecord`] is built fresh from one input file per run by
//! [`loader::parse_device`] and is never mutated afterwards.

pub mod capacity;
pub mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde_yaml::Value;

pub use capacity::Capacity;
pub use loader::{load_devices, parse_device, LoadOutcome};

/// A major version track, e.g. `17` for LineageOS 17.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseLine(u32);

impl ReleaseLine {
    pub fn new(major: u32) -> Self {
        Self(major)
    }

    pub fn major(self) -> u32 {
        self.0
    }

    /// Normalize a YAML version tag (`16`, `16.0`, `17.1`, `"18.1"`).
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Number(n) => {
                if let Some(major) = n.as_u64() {
                    return u32::try_from(major)
                        .map(Self)
                        .map_err(|_| format!("version '{n}' out of range"));
                }
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 && f < u32::MAX as f64 => {
                        Ok(Self(f.trunc() as u32))
                    }
                    _ => Err(format!("invalid version '{n}'")),
                }
            }
            Value::String(s) => s.parse::<Self>().map_err(|e| e.to_string()),
            other => Err(format!("invalid version {other:?}")),
        }
    }
}

impl FromStr for ReleaseLine {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split('.');
        let major = parts.next().unwrap_or_default();
        if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
            bail!("unknown release line '{}'", raw);
        }
        if !parts.all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())) {
            bail!("unknown release line '{}'", raw);
        }
        let major = major
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("release line '{}' out of range", raw))?;
        Ok(Self(major))
    }
}

impl fmt::Display for ReleaseLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive columns carried through to the tabular report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDetails {
    pub soc: String,
    pub screen: String,
    pub removable_battery: String,
    pub release: String,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub codename: String,
    pub vendor: String,
    pub name: String,
    /// Maintainers per declared release line, in file order.
    pub lines: BTreeMap<ReleaseLine, Vec<String>>,
    pub ram: Capacity,
    pub storage: Capacity,
    pub details: DeviceDetails,
}

impl DeviceRecord {
    /// `"<vendor> <name>"`, as shown in logs.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.vendor, self.name)
    }

    pub fn declares(&self, line: ReleaseLine) -> bool {
        self.lines.contains_key(&line)
    }

    pub fn maintainers(&self, line: ReleaseLine) -> Option<&[String]> {
        self.lines.get(&line).map(Vec::as_slice)
    }

    pub fn maintainer_count(&self, line: ReleaseLine) -> usize {
        self.maintainers(line).map(<[String]>::len).unwrap_or(0)
    }

    pub fn declared_lines(&self) -> impl Iterator<Item = ReleaseLine> + '_ {
        self.lines.keys().copied()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal record for filter and ranking tests.
    pub(crate) fn device(
        codename: &str,
        ram_mb: u64,
        storage_gb: u64,
        lines: &[(u32, usize)],
    ) -> DeviceRecord {
        DeviceRecord {
            codename: codename.to_string(),
            vendor: "Vendor".to_string(),
            name: codename.to_uppercase(),
            lines: lines
                .iter()
                .map(|(line, count)| {
                    let names = (0..*count).map(|i| format!("dev{i}")).collect();
                    (ReleaseLine::new(*line), names)
                })
                .collect(),
            ram: Capacity::from_megabytes(ram_mb),
            storage: Capacity::from_megabytes(storage_gb * 1024),
            details: DeviceDetails::default(),
        }
    }
}
