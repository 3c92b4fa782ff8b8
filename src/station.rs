//! Parsed station records and the per-fetch directory that holds them.

use std::collections::HashMap;

/// Id used when the feed gives a station no identifier.
pub const UNKNOWN_ID: &str = "unknown";
/// Name used when the feed gives a station no name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Live status of one docking station, as of the fetch it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct StationStatus {
    pub id: String,
    pub name: String,
    pub empty_docks: u32,
    pub bikes_available: u32,
    pub total_docks: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub terminal_name: Option<String>,
}

impl Default for StationStatus {
    fn default() -> Self {
        Self {
            id: UNKNOWN_ID.to_string(),
            name: UNKNOWN_NAME.to_string(),
            empty_docks: 0,
            bikes_available: 0,
            total_docks: 0,
            latitude: 0.0,
            longitude: 0.0,
            terminal_name: None,
        }
    }
}

impl StationStatus {
    /// Directory key: the name, or the id for stations without one.
    pub fn key(&self) -> &str {
        if self.name == UNKNOWN_NAME {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Stations from a single feed fetch, keyed by [`StationStatus::key`].
#[derive(Debug, Default, Clone)]
pub struct StationDirectory {
    stations: HashMap<String, StationStatus>,
}

impl StationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `station`, replacing any earlier station with the same key.
    pub fn insert(&mut self, station: StationStatus) {
        self.stations.insert(station.key().to_string(), station);
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, key: &str) -> Option<&StationStatus> {
        self.stations.get(key)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StationStatus)> {
        self.stations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All entries ordered by key.
    pub fn sorted(&self) -> Vec<(&str, &StationStatus)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Entries whose key contains `term`, ignoring case, ordered by key.
    pub fn search(&self, term: &str) -> Vec<(&str, &StationStatus)> {
        let needle = term.to_lowercase();
        self.sorted()
            .into_iter()
            .filter(|(key, _)| key.to_lowercase().contains(&needle))
            .collect()
    }
}

impl FromIterator<StationStatus> for StationDirectory {
    fn from_iter<I: IntoIterator<Item = StationStatus>>(iter: I) -> Self {
        let mut directory = Self::new();
        for station in iter {
            directory.insert(station);
        }
        directory
    }
}
