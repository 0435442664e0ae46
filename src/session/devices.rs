use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::hardware::ResponseLink;
use crate::question::Answer;

/// A voting keypad (boîtier) known to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub name: Option<String>,
    pub connected: bool,
    pub last_response: Option<Answer>,
    pub last_response_time: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            connected: true,
            last_response: None,
            last_response_time: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn record(&mut self, answer: Answer, at: DateTime<Utc>) {
        self.last_response = Some(answer);
        self.last_response_time = Some(at);
    }
}

impl From<&ResponseLink> for Device {
    fn from(link: &ResponseLink) -> Self {
        Self {
            id: link.id.clone(),
            name: link.name.clone(),
            connected: link.is_connected(),
            last_response: None,
            last_response_time: None,
        }
    }
}

pub type DeviceRegistry = BTreeMap<String, Device>;

/// Upsert the device's last-response fields. Unknown devices are registered on their
/// first vote.
pub fn record_device_response(
    devices: &mut DeviceRegistry,
    device_id: &str,
    answer: Answer,
    at: DateTime<Utc>,
) {
    devices
        .entry(device_id.to_string())
        .or_insert_with(|| Device::new(device_id))
        .record(answer, at);
}

/// Votes for the current poll, one per device, last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseSet {
    votes: BTreeMap<String, Answer>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vote this one replaced, if any.
    pub fn record(&mut self, device_id: &str, answer: Answer) -> Option<Answer> {
        self.votes.insert(device_id.to_string(), answer)
    }

    pub fn get(&self, device_id: &str) -> Option<Answer> {
        self.votes.get(device_id).copied()
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Answer)> {
        self.votes.iter().map(|(id, answer)| (id.as_str(), *answer))
    }
}
