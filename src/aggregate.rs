//! Grouping and ranking of included devices.
//!
//! Order within a release line is maintainer count descending, then codename
//! ascending, so the same inclusions always produce the same report.

use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

use crate::device::{DeviceRecord, ReleaseLine};
use crate::filter::Inclusion;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct RankedDevice<'a> {
    pub device: &'a DeviceRecord,
    pub line: ReleaseLine,
    pub maintainers: usize,
}

impl RankedDevice<'_> {
    fn rank_key(&self) -> (Reverse<usize>, &str, ReleaseLine) {
        (Reverse(self.maintainers), self.device.codename.as_str(), self.line)
    }
}

fn by_rank(a: &RankedDevice<'_>, b: &RankedDevice<'_>) -> Ordering {
    a.rank_key().cmp(&b.rank_key())
}

/// All included devices for one release line, ranked.
#[derive(Debug, Clone)]
pub struct LineReport<'a> {
    pub line: ReleaseLine,
    pub ranked: Vec<RankedDevice<'a>>,
    top_n: usize,
}

impl<'a> LineReport<'a> {
    pub fn top(&self) -> &[RankedDevice<'a>] {
        &self.ranked[..self.ranked.len().min(self.top_n)]
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Aggregation<'a> {
    /// One entry per configured line, including lines with no devices.
    pub lines: BTreeMap<ReleaseLine, LineReport<'a>>,
    /// Highest maintainer counts across every line, at most `top_n` pairs.
    pub leaderboard: Vec<RankedDevice<'a>>,
    pub top_n: usize,
}

impl Aggregation<'_> {
    pub fn included_count(&self) -> usize {
        self.lines.values().map(LineReport::len).sum()
    }
}

/// Group inclusions by line and rank them.
///
/// Inclusions for lines outside `lines` are ignored.
pub fn aggregate<'a>(
    included: &[Inclusion<'a>],
    lines: &[ReleaseLine],
    top_n: usize,
) -> Aggregation<'a> {
    let mut grouped: BTreeMap<ReleaseLine, LineReport<'a>> = lines
        .iter()
        .map(|&line| {
            (
                line,
                LineReport {
                    line,
                    ranked: Vec::new(),
                    top_n,
                },
            )
        })
        .collect();

    for inclusion in included {
        if let Some(report) = grouped.get_mut(&inclusion.line) {
            report.ranked.push(RankedDevice {
                device: inclusion.device,
                line: inclusion.line,
                maintainers: inclusion.maintainers,
            });
        }
    }

    let mut leaderboard = Vec::new();
    for report in grouped.values_mut() {
        report.ranked.sort_by(by_rank);
        leaderboard.extend(report.ranked.iter().copied());
    }
    leaderboard.sort_by(by_rank);
    leaderboard.truncate(top_n);

    Aggregation {
        lines: grouped,
        leaderboard,
        top_n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fixtures::device;
    use crate::filter::{classify, Thresholds};

    fn codenames(ranked: &[RankedDevice<'_>]) -> Vec<String> {
        ranked.iter().map(|r| r.device.codename.clone()).collect()
    }

    fn sample() -> Vec<DeviceRecord> {
        vec![
            device("zeta", 4096, 32, &[(17, 3)]),
            device("alpha", 4096, 32, &[(17, 3), (16, 1)]),
            device("cheeseburger", 6000, 64, &[(17, 6)]),
            device("beta", 4096, 32, &[(16, 5)]),
        ]
    }

    #[test]
    fn ranks_by_count_then_codename() {
        let devices = sample();
        let lines = [ReleaseLine::new(16), ReleaseLine::new(17)];
        let classified = classify(&devices, &lines, &Thresholds::default());
        let agg = aggregate(&classified.included, &lines, DEFAULT_TOP_N);

        assert_eq!(
            codenames(&agg.lines[&ReleaseLine::new(17)].ranked),
            vec!["cheeseburger", "alpha", "zeta"]
        );
        assert_eq!(
            codenames(&agg.lines[&ReleaseLine::new(16)].ranked),
            vec!["beta", "alpha"]
        );
        assert_eq!(agg.included_count(), 5);
    }

    #[test]
    fn ranking_is_independent_of_input_order() {
        let devices = sample();
        let mut reversed = sample();
        reversed.reverse();
        let lines = [ReleaseLine::new(17)];

        let a = classify(&devices, &lines, &Thresholds::default());
        let b = classify(&reversed, &lines, &Thresholds::default());
        let a = aggregate(&a.included, &lines, 10);
        let b = aggregate(&b.included, &lines, 10);
        assert_eq!(
            codenames(&a.lines[&ReleaseLine::new(17)].ranked),
            codenames(&b.lines[&ReleaseLine::new(17)].ranked)
        );
    }

    #[test]
    fn top_and_leaderboard_are_truncated() {
        let devices = sample();
        let lines = [ReleaseLine::new(16), ReleaseLine::new(17)];
        let classified = classify(&devices, &lines, &Thresholds::default());
        let agg = aggregate(&classified.included, &lines, 2);

        assert_eq!(agg.lines[&ReleaseLine::new(17)].len(), 3);
        assert_eq!(
            codenames(agg.lines[&ReleaseLine::new(17)].top()),
            vec!["cheeseburger", "alpha"]
        );
        assert_eq!(codenames(&agg.leaderboard), vec!["cheeseburger", "beta"]);
    }

    #[test]
    fn configured_lines_without_devices_are_present() {
        let lines = [ReleaseLine::new(20)];
        let agg = aggregate(&[], &lines, 10);
        assert!(agg.lines[&ReleaseLine::new(20)].is_empty());
        assert!(agg.leaderboard.is_empty());
    }
}
