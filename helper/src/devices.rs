//! Playback device registry.
//!
//! Devices come from two sources, read once at startup: the inline
//! `DLNA_DEVICES` list and a JSON file. Both are merged into one registry
//! keyed by device id.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A device that can receive playback requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub play_url: String,
}

impl Device {
    fn new(id: impl Into<String>, name: Option<String>, play_url: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.unwrap_or_else(|| format!("DLNA {}", id));
        Self {
            id,
            name,
            play_url: play_url.into(),
        }
    }
}

/// Parse an inline device list.
///
/// Entries are `id|name|url`, separated by `;` or `,`. A missing id becomes
/// `dlna-N` (1-based entry position), a missing name `DLNA <id>`. Entries
/// without a url are dropped.
pub fn parse_device_list(source: &str) -> Vec<Device> {
    source
        .split([';', ','])
        .enumerate()
        .filter_map(|(index, entry)| {
            let mut parts = entry.split('|').map(str::trim);
            let id = non_empty(parts.next());
            let name = non_empty(parts.next());
            let play_url = non_empty(parts.next())?;
            let id = id.unwrap_or_else(|| format!("dlna-{}", index + 1));
            Some(Device::new(id, name, play_url))
        })
        .collect()
}

fn non_empty(part: Option<&str>) -> Option<String> {
    part.filter(|p| !p.is_empty()).map(str::to_string)
}

/// Errors reading the device file.
#[derive(Debug, thiserror::Error)]
pub enum DeviceFileError {
    #[error("failed to read device file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse device file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read devices from a JSON array file.
///
/// Returns `Ok(None)` when the file does not exist. Elements without both
/// `id` and `playUrl` are skipped; non-array documents yield no devices.
pub fn load_device_file(path: &Path) -> Result<Option<Vec<Device>>, DeviceFileError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&raw)?;
    let devices = parsed
        .as_array()
        .map(|entries| entries.iter().filter_map(device_from_value).collect())
        .unwrap_or_default();
    Ok(Some(devices))
}

fn device_from_value(value: &Value) -> Option<Device> {
    let id = scalar_string(value.get("id")?)?;
    let play_url = scalar_string(value.get("playUrl")?)?;
    let name = value.get("name").and_then(scalar_string);
    Some(Device::new(id, name, play_url))
}

fn scalar_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Immutable set of known devices, unique by id.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    by_id: HashMap<String, usize>,
}

impl DeviceRegistry {
    /// Build a registry. A repeated id keeps the position of its first
    /// occurrence and the values of its last one.
    pub fn new(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut registry = Self::default();
        for device in devices {
            if device.id.is_empty() || device.play_url.is_empty() {
                continue;
            }
            match registry.by_id.get(&device.id) {
                Some(&position) => registry.devices[position] = device,
                None => {
                    registry
                        .by_id
                        .insert(device.id.clone(), registry.devices.len());
                    registry.devices.push(device);
                }
            }
        }
        registry
    }

    /// Load from the inline list first, then the device file.
    pub fn load(inline: Option<&str>, file: &Path) -> Self {
        let mut devices = inline.map(parse_device_list).unwrap_or_default();

        match load_device_file(file) {
            Ok(Some(from_file)) => {
                tracing::debug!(path = %file.display(), count = from_file.len(), "loaded device file");
                devices.extend(from_file);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "could not read device file");
            }
        }

        Self::new(devices)
    }

    pub fn get(&self, id: &str) -> Option<&Device> {
        self.by_id.get(id).map(|&i| &self.devices[i])
    }

    pub fn all(&self) -> &[Device] {
        &self.devices
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_device_list() {
        let devices = parse_device_list("tv|Living Room|http://tv/play; |Bedroom|http://b/play,kitchen||http://k");
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0], Device::new("tv", Some("Living Room".into()), "http://tv/play"));
        assert_eq!(devices[1].id, "dlna-2");
        assert_eq!(devices[1].name, "Bedroom");
        assert_eq!(devices[2].name, "DLNA kitchen");
    }

    #[test]
    fn test_parse_drops_entries_without_url() {
        let devices = parse_device_list("a|A;b|B|;c|C|http://c;");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "c");
    }

    #[test]
    fn test_registry_dedup_keeps_first_position_last_value() {
        let registry = DeviceRegistry::new(vec![
            Device::new("a", None, "http://a/1"),
            Device::new("b", None, "http://b"),
            Device::new("a", Some("Again".into()), "http://a/2"),
        ]);
        let ids: Vec<_> = registry.all().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        let a = registry.get("a").unwrap();
        assert_eq!(a.play_url, "http://a/2");
        assert_eq!(a.name, "Again");
    }

    #[test]
    fn test_load_device_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "tv", "playUrl": "http://tv"}}, {{"id": 7, "name": "Seven", "playUrl": "http://7"}}, {{"name": "no id", "playUrl": "http://x"}}]"#
        )
        .unwrap();

        let registry = DeviceRegistry::load(Some("tv|Inline|http://inline"), file.path());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("tv").unwrap().play_url, "http://tv");
        assert_eq!(registry.get("tv").unwrap().name, "DLNA tv");
        assert_eq!(registry.get("7").unwrap().name, "Seven");
    }

    #[test]
    fn test_unreadable_device_file_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let registry = DeviceRegistry::load(Some("a||http://a"), file.path());
        assert_eq!(registry.len(), 1);
        assert!(load_device_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_device_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        assert!(load_device_file(&path).unwrap().is_none());
        assert!(DeviceRegistry::load(None, &path).is_empty());
    }
}
