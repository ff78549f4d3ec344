//! Eligibility filter.
//!
//! Every (device, release line) pair is judged independently against three
//! predicates: the line is declared, it has maintainers, and the hardware
//! clears the RAM and storage floors. Comparisons are strict, so a device
//! sitting exactly on a threshold is skipped.

use std::fmt;

use tracing::debug;

use crate::device::{DeviceRecord, ReleaseLine};

pub const DEFAULT_RAM_THRESHOLD_MB: u64 = 2048;
pub const DEFAULT_STORAGE_THRESHOLD_GB: u64 = 16;

/// Hardware floors. A device must be strictly above both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub ram_mb: u64,
    pub storage_gb: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ram_mb: DEFAULT_RAM_THRESHOLD_MB,
            storage_gb: DEFAULT_STORAGE_THRESHOLD_GB,
        }
    }
}

impl Thresholds {
    pub fn storage_mb(&self) -> u64 {
        self.storage_gb * 1024
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    ReleaseLine,
    Maintainers,
    HardwareFloor,
}

impl Predicate {
    pub fn as_str(self) -> &'static str {
        match self {
            Predicate::ReleaseLine => "release-line",
            Predicate::Maintainers => "maintainers",
            Predicate::HardwareFloor => "hardware-floor",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed predicate with a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReason {
    pub predicate: Predicate,
    pub message: String,
}

impl SkipReason {
    fn new(predicate: Predicate, message: String) -> Self {
        Self { predicate, message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Included { maintainers: usize },
    /// Never empty.
    Skipped(Vec<SkipReason>),
}

impl Verdict {
    pub fn is_included(&self) -> bool {
        matches!(self, Verdict::Included { .. })
    }
}

/// Evaluate all predicates for one pair. Pure.
pub fn evaluate(device: &DeviceRecord, line: ReleaseLine, thresholds: &Thresholds) -> Verdict {
    let mut reasons = Vec::new();

    match device.maintainers(line) {
        None => {
            let declared = device
                .declared_lines()
                .map(|l| l.to_string())
                .collect::<Vec<_>>();
            let declared = if declared.is_empty() {
                "none".to_string()
            } else {
                declared.join(", ")
            };
            reasons.push(SkipReason::new(
                Predicate::ReleaseLine,
                format!("release line {line} not supported (declares: {declared})"),
            ));
        }
        Some([]) => {
            reasons.push(SkipReason::new(
                Predicate::Maintainers,
                "no maintainers".to_string(),
            ));
        }
        Some(_) => {}
    }

    if device.ram.megabytes() <= thresholds.ram_mb {
        reasons.push(SkipReason::new(
            Predicate::HardwareFloor,
            format!("RAM {} not above {} MB", device.ram, thresholds.ram_mb),
        ));
    }
    if device.storage.megabytes() <= thresholds.storage_mb() {
        reasons.push(SkipReason::new(
            Predicate::HardwareFloor,
            format!(
                "storage {} not above {} GB",
                device.storage, thresholds.storage_gb
            ),
        ));
    }

    if reasons.is_empty() {
        Verdict::Included {
            maintainers: device.maintainer_count(line),
        }
    } else {
        Verdict::Skipped(reasons)
    }
}

/// An included pair.
#[derive(Debug, Clone, Copy)]
pub struct Inclusion<'a> {
    pub device: &'a DeviceRecord,
    pub line: ReleaseLine,
    pub maintainers: usize,
}

/// A skipped pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEntry {
    pub codename: String,
    pub line: ReleaseLine,
    pub reasons: Vec<SkipReason>,
}

impl SkipEntry {
    /// Distinct failed predicates, in predicate order.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates: Vec<Predicate> = self.reasons.iter().map(|r| r.predicate).collect();
        predicates.sort();
        predicates.dedup();
        predicates
    }

    pub fn message(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Default)]
pub struct Classification<'a> {
    pub included: Vec<Inclusion<'a>>,
    pub skipped: Vec<SkipEntry>,
}

/// Evaluate every device against every configured line.
pub fn classify<'a>(
    devices: &'a [DeviceRecord],
    lines: &[ReleaseLine],
    thresholds: &Thresholds,
) -> Classification<'a> {
    let mut result = Classification::default();
    for device in devices {
        for &line in lines {
            match evaluate(device, line, thresholds) {
                Verdict::Included { maintainers } => {
                    debug!("{} line {line}: included ({maintainers} maintainers)", device.codename);
                    result.included.push(Inclusion {
                        device,
                        line,
                        maintainers,
                    });
                }
                Verdict::Skipped(reasons) => {
                    debug!("{} line {line}: skipped", device.codename);
                    result.skipped.push(SkipEntry {
                        codename: device.codename.clone(),
                        line,
                        reasons,
                    });
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fixtures::device;
    use crate::device::Capacity;

    fn line(n: u32) -> ReleaseLine {
        ReleaseLine::new(n)
    }

    fn skipped(verdict: Verdict) -> Vec<SkipReason> {
        match verdict {
            Verdict::Skipped(reasons) => reasons,
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn well_equipped_maintained_device_is_included() {
        let d = device("cheeseburger", 6000, 64, &[(17, 6)]);
        assert_eq!(
            evaluate(&d, line(17), &Thresholds::default()),
            Verdict::Included { maintainers: 6 }
        );
    }

    #[test]
    fn exact_thresholds_are_excluded() {
        let t = Thresholds::default();
        let at_ram = device("atram", 2048, 64, &[(17, 1)]);
        let at_storage = device("atstorage", 4096, 16, &[(17, 1)]);
        let just_above = device("above", 2049, 17, &[(17, 1)]);

        let reasons = skipped(evaluate(&at_ram, line(17), &t));
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].message.starts_with("RAM"));

        let reasons = skipped(evaluate(&at_storage, line(17), &t));
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].message.starts_with("storage"));

        assert!(evaluate(&just_above, line(17), &t).is_included());
    }

    #[test]
    fn memory_type_suffix_does_not_lift_ram_over_the_floor() {
        let mut d = device("twogig", 0, 32, &[(16, 1)]);
        d.ram = Capacity::parse("2 GB LPDDR4X").unwrap();
        assert_eq!(d.ram.megabytes(), 2048);

        let reasons = skipped(evaluate(&d, line(16), &Thresholds::default()));
        assert_eq!(reasons.len(), 1);
        assert_eq!(reasons[0].predicate, Predicate::HardwareFloor);
        assert!(reasons[0].message.starts_with("RAM"));
    }

    #[test]
    fn empty_maintainers_skip_regardless_of_hardware() {
        let d = device("nomaint", 16384, 512, &[(16, 0), (17, 3)]);
        let reasons = skipped(evaluate(&d, line(16), &Thresholds::default()));
        assert_eq!(
            reasons,
            vec![SkipReason::new(Predicate::Maintainers, "no maintainers".into())]
        );
        assert!(evaluate(&d, line(17), &Thresholds::default()).is_included());
    }

    #[test]
    fn undeclared_line_is_a_release_line_skip() {
        let d = device("old", 4096, 32, &[(14, 1), (15, 1)]);
        let reasons = skipped(evaluate(&d, line(17), &Thresholds::default()));
        assert_eq!(reasons[0].predicate, Predicate::ReleaseLine);
        assert_eq!(
            reasons[0].message,
            "release line 17 not supported (declares: 14, 15)"
        );
    }

    #[test]
    fn all_failures_are_reported() {
        let d = device("junk", 1024, 8, &[(16, 0)]);
        let reasons = skipped(evaluate(&d, line(16), &Thresholds::default()));
        let predicates: Vec<_> = reasons.iter().map(|r| r.predicate).collect();
        assert_eq!(
            predicates,
            vec![
                Predicate::Maintainers,
                Predicate::HardwareFloor,
                Predicate::HardwareFloor
            ]
        );
    }

    #[test]
    fn custom_thresholds_are_honored() {
        let t = Thresholds {
            ram_mb: 4096,
            storage_gb: 32,
        };
        let d = device("mid", 4096, 64, &[(17, 1)]);
        assert!(!evaluate(&d, line(17), &t).is_included());
    }

    #[test]
    fn classify_covers_every_pair() {
        let devices = vec![
            device("lowram", 1024, 32, &[(16, 2), (17, 2)]),
            device("nomaint", 4096, 32, &[(16, 0), (17, 2)]),
        ];
        let result = classify(&devices, &[line(16), line(17)], &Thresholds::default());

        assert_eq!(result.included.len(), 1);
        assert_eq!(result.included[0].device.codename, "nomaint");
        assert_eq!(result.included[0].line, line(17));

        assert_eq!(result.skipped.len(), 3);
        let lowram: Vec<_> = result
            .skipped
            .iter()
            .filter(|s| s.codename == "lowram")
            .collect();
        assert_eq!(lowram.len(), 2);
        assert!(lowram.iter().all(|s| s.message().contains("RAM")));
        assert_eq!(lowram[0].predicates(), vec![Predicate::HardwareFloor]);
    }
}
