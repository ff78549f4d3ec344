//! YAML device file -> [`DeviceRecord`].
//!
//! Two layouts are understood:
//!
//! ```yaml
//! # wiki layout: one maintainer list for every declared version
//! codename: cheeseburger
//! vendor: OnePlus
//! name: 5
//! maintainers: [a, b]
//! versions: [16.0, 17.1]
//! ram: 6/8 GB
//! storage: 64/128 GB
//!
//! # per-line layout
//! versions:
//!   16: { maintainers: [] }
//!   17: { maintainers: [a, b] }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use super::{Capacity, DeviceDetails, DeviceRecord, ReleaseLine};
use crate::error::{LoadError, LoadErrorKind};
use crate::source::{RawRecord, RecordSource};

/// Everything the loader produced for one run.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Valid records in source order.
    pub devices: Vec<DeviceRecord>,
    pub errors: Vec<LoadError>,
}

/// Load every record from `source`. Per-file failures and duplicate
/// codenames are collected; nothing here aborts the run.
pub fn load_devices(source: &dyn RecordSource) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    let mut seen: HashMap<String, String> = HashMap::new();

    for raw in source.records() {
        let origin = raw.origin.clone();
        match parse_device(&raw) {
            Ok(device) => {
                if let Some(first_origin) = seen.get(&device.codename) {
                    outcome.errors.push(LoadError::new(
                        origin,
                        LoadErrorKind::DuplicateCodename {
                            codename: device.codename,
                            first_origin: first_origin.clone(),
                        },
                    ));
                    continue;
                }
                debug!("loaded '{}' from {}", device.codename, origin);
                seen.insert(device.codename.clone(), origin);
                outcome.devices.push(device);
            }
            Err(err) => {
                debug!("load failed: {err}");
                outcome.errors.push(err);
            }
        }
    }

    outcome
}

/// Parse one raw record.
pub fn parse_device(raw: &RawRecord) -> Result<DeviceRecord, LoadError> {
    let fail = |kind| LoadError::new(raw.origin.clone(), kind);

    let text = raw
        .contents
        .as_deref()
        .map_err(|reason| fail(LoadErrorKind::Unreadable(reason.to_string())))?;
    let doc: Value = serde_yaml::from_str(text)
        .map_err(|err| fail(LoadErrorKind::Unparseable(err.to_string())))?;
    let Value::Mapping(map) = doc else {
        return Err(fail(LoadErrorKind::Unparseable(
            "document is not a mapping".to_string(),
        )));
    };

    let codename = required_scalar(&map, "codename").map_err(fail)?;
    let name = required_scalar(&map, "name").map_err(fail)?;
    let vendor = match optional_scalar(&map, "vendor").map_err(fail)? {
        Some(vendor) => vendor,
        None => optional_scalar(&map, "vendor_short")
            .map_err(fail)?
            .ok_or_else(|| fail(LoadErrorKind::MissingField("vendor")))?,
    };

    let ram = capacity(&map, "ram").map_err(fail)?;
    let storage = capacity(&map, "storage").map_err(fail)?;

    let shared = match field(&map, "maintainers") {
        Some(value) => Some(maintainer_list(value).map_err(fail)?),
        None => None,
    };
    let versions = field(&map, "versions").ok_or_else(|| fail(LoadErrorKind::MissingField("versions")))?;
    let lines = release_lines(versions, shared.as_deref()).map_err(fail)?;

    let short_name = format!("{vendor} {name}");
    let details = DeviceDetails {
        soc: field(&map, "soc").map(render_text).unwrap_or_default(),
        screen: field(&map, "screen").and_then(screen_size).unwrap_or_default(),
        removable_battery: removable_battery(&short_name, field(&map, "battery")),
        release: field(&map, "release").map(render_text).unwrap_or_default(),
        models: field(&map, "models").map(model_list).unwrap_or_default(),
    };

    Ok(DeviceRecord {
        codename,
        vendor,
        name,
        lines,
        ram,
        storage,
        details,
    })
}

fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn optional_scalar(map: &Mapping, key: &'static str) -> Result<Option<String>, LoadErrorKind> {
    let Some(value) = field(map, key) else {
        return Ok(None);
    };
    let text = scalar_text(value).ok_or_else(|| LoadErrorKind::Malformed {
        field: key,
        detail: "expected a scalar".to_string(),
    })?;
    Ok(Some(text).filter(|t| !t.is_empty()))
}

fn required_scalar(map: &Mapping, key: &'static str) -> Result<String, LoadErrorKind> {
    optional_scalar(map, key)?.ok_or(LoadErrorKind::MissingField(key))
}

fn capacity(map: &Mapping, key: &'static str) -> Result<Capacity, LoadErrorKind> {
    let value = field(map, key).ok_or(LoadErrorKind::MissingField(key))?;
    Capacity::from_value(value).map_err(|detail| LoadErrorKind::Malformed { field: key, detail })
}

fn maintainer_list(value: &Value) -> Result<Vec<String>, LoadErrorKind> {
    let malformed = |detail: String| LoadErrorKind::Malformed {
        field: "maintainers",
        detail,
    };
    match value {
        Value::Sequence(items) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                let name = scalar_text(item)
                    .ok_or_else(|| malformed(format!("non-scalar entry {item:?}")))?;
                if !name.is_empty() {
                    names.push(name);
                }
            }
            Ok(names)
        }
        other => Err(malformed(format!("expected a list, got {other:?}"))),
    }
}

fn release_lines(
    versions: &Value,
    shared: Option<&[String]>,
) -> Result<BTreeMap<ReleaseLine, Vec<String>>, LoadErrorKind> {
    let malformed = |detail: String| LoadErrorKind::Malformed {
        field: "versions",
        detail,
    };
    let mut lines: BTreeMap<ReleaseLine, Vec<String>> = BTreeMap::new();

    match versions {
        Value::Mapping(blocks) => {
            for (tag, block) in blocks {
                let line = ReleaseLine::from_value(tag).map_err(malformed)?;
                let maintainers = match block {
                    Value::Null => shared.map(<[String]>::to_vec).unwrap_or_default(),
                    Value::Sequence(_) => maintainer_list(block)?,
                    Value::Mapping(inner) => match field(inner, "maintainers") {
                        Some(list) => maintainer_list(list)?,
                        None => shared.map(<[String]>::to_vec).unwrap_or_default(),
                    },
                    other => {
                        return Err(malformed(format!("unsupported block for {line}: {other:?}")))
                    }
                };
                merge_line(&mut lines, line, maintainers);
            }
        }
        Value::Sequence(tags) => {
            let shared = shared.ok_or(LoadErrorKind::MissingField("maintainers"))?;
            for tag in tags {
                let line = ReleaseLine::from_value(tag).map_err(malformed)?;
                merge_line(&mut lines, line, shared.to_vec());
            }
        }
        scalar @ (Value::Number(_) | Value::String(_)) => {
            let shared = shared.ok_or(LoadErrorKind::MissingField("maintainers"))?;
            let line = ReleaseLine::from_value(scalar).map_err(malformed)?;
            merge_line(&mut lines, line, shared.to_vec());
        }
        other => return Err(malformed(format!("unsupported value {other:?}"))),
    }

    Ok(lines)
}

/// Tags sharing a major (e.g. `14.0` and `14.1`) merge into one line. The
/// first tag's list is kept as written; later tags only add new names.
fn merge_line(
    lines: &mut BTreeMap<ReleaseLine, Vec<String>>,
    line: ReleaseLine,
    maintainers: Vec<String>,
) {
    let Some(entry) = lines.get_mut(&line) else {
        lines.insert(line, maintainers);
        return;
    };
    for name in maintainers {
        if !entry.contains(&name) {
            entry.push(name);
        }
    }
}

fn render_text(value: &Value) -> String {
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(render_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", render_text(k), render_text(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Tagged(tagged) => render_text(&tagged.value),
        other => scalar_text(other).unwrap_or_default(),
    }
}

fn model_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// Screen diagonal in inches (`"5.5 in"` -> `5.5`); falls back to the raw
/// text when no inch figure is present.
fn screen_size(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(inches(text).unwrap_or_else(|| text.trim().to_string())),
        Value::Mapping(map) => field(map, "size").and_then(screen_size),
        Value::Sequence(items) => items.first().and_then(screen_size),
        other => scalar_text(other),
    }
}

fn inches(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let bare = word.trim_end_matches(|c: char| !c.is_alphanumeric());
        if let Some(number) = bare.strip_suffix("in").filter(|n| !n.is_empty()) {
            if is_decimal(number) {
                return Some(number.to_string());
            }
        }
        if bare == "in" && i > 0 {
            let number = words[i - 1].trim_start_matches(|c: char| !c.is_ascii_digit());
            if is_decimal(number) {
                return Some(number.to_string());
            }
        }
    }
    None
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Summarize battery removability as `yes`, `no`, `-` (no battery or not
/// specified) or `???` (missing or unreadable entry). Multi-model entries
/// are joined with `/`.
fn removable_battery(short_name: &str, battery: Option<&Value>) -> String {
    let Some(battery) = battery else {
        warn!("device '{short_name}' has no 'battery' entry");
        return "???".to_string();
    };
    let entries: Vec<&Value> = match battery {
        Value::Sequence(items) => items.iter().collect(),
        other => vec![other],
    };
    let mut parts = Vec::with_capacity(entries.len());
    for entry in entries {
        match removable_flag(entry) {
            Some(part) => parts.push(part),
            None => {
                warn!("cannot read battery info for '{short_name}': {entry:?}");
                return "???".to_string();
            }
        }
    }
    parts.join("/")
}

fn removable_flag(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) if s.trim() == "None" => Some("-".to_string()),
        Value::Mapping(map) => match map.get("removable") {
            Some(Value::Bool(true)) => Some("yes".to_string()),
            Some(Value::Bool(false)) => Some("no".to_string()),
            Some(Value::Null) => Some("-".to_string()),
            Some(_) => None,
            // `{ "3T": { removable: false, ... } }`: one model per key.
            None => {
                let parts = map
                    .values()
                    .map(removable_flag)
                    .collect::<Option<Vec<_>>>()?;
                (!parts.is_empty()).then(|| parts.join("/"))
            }
        },
        _ => None,
    }
}
