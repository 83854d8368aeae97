//! Device and central identifiers plus the device lookup capability.
//!
//! The directory is built once from configuration and only read afterwards.
//! It is the single place where a central's free-form device key is matched
//! against configured identifiers and labels.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::define_key_type;

define_key_type!(DeviceId);
define_key_type!(CentralId);

/// Static description of one configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub label: String,
    pub central: CentralId,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>, central: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(id),
            label: label.into(),
            central: CentralId::new(central),
        }
    }
}

/// Read-only device -> (label, central) mapping.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    devices: BTreeMap<DeviceId, DeviceInfo>,
    by_label: HashMap<String, DeviceId>,
    by_folded_key: HashMap<String, DeviceId>,
}

fn fold_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl DeviceDirectory {
    pub fn new(devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        let mut directory = Self::default();
        for info in devices {
            directory
                .by_label
                .entry(info.label.clone())
                .or_insert_with(|| info.id.clone());
            directory
                .by_folded_key
                .entry(fold_key(&info.label))
                .or_insert_with(|| info.id.clone());
            // Identifiers win over labels when both fold to the same key.
            directory
                .by_folded_key
                .insert(fold_key(info.id.as_str()), info.id.clone());
            directory.devices.insert(info.id.clone(), info);
        }
        directory
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: &DeviceId) -> Option<&DeviceInfo> {
        self.devices.get(id)
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.values()
    }

    /// Label for a device, falling back to its identifier.
    pub fn label_of<'a>(&'a self, id: &'a DeviceId) -> &'a str {
        self.devices
            .get(id)
            .map(|info| info.label.as_str())
            .unwrap_or_else(|| id.as_str())
    }

    pub fn central_of(&self, id: &DeviceId) -> Option<&CentralId> {
        self.devices.get(id).map(|info| &info.central)
    }

    /// Match a reading's device key against configured devices.
    ///
    /// Tries, in order: exact identifier, exact label, then identifier or
    /// label ignoring case and repeated whitespace.
    pub fn resolve(&self, device_key: &str) -> Option<&DeviceInfo> {
        if let Some(info) = self.devices.get(device_key) {
            return Some(info);
        }
        if let Some(id) = self.by_label.get(device_key) {
            return self.devices.get(id);
        }
        self.by_folded_key
            .get(&fold_key(device_key))
            .and_then(|id| self.devices.get(id))
    }

    /// Selected devices grouped by owning central, in identifier order.
    ///
    /// Unknown identifiers are skipped; callers validate selections first.
    pub fn group_by_central(&self, selected: &[DeviceId]) -> BTreeMap<CentralId, Vec<DeviceId>> {
        let mut groups: BTreeMap<CentralId, Vec<DeviceId>> = BTreeMap::new();
        let unique: BTreeSet<&DeviceId> = selected.iter().collect();
        for id in unique {
            if let Some(info) = self.devices.get(id) {
                groups
                    .entry(info.central.clone())
                    .or_default()
                    .push(id.clone());
            }
        }
        groups
    }

    /// Distinct centrals owning the selected devices.
    pub fn centrals_for(&self, selected: &[DeviceId]) -> BTreeSet<CentralId> {
        selected
            .iter()
            .filter_map(|id| self.central_of(id).cloned())
            .collect()
    }
}
