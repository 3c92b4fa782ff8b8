//! Station lookup by exact name against a freshly fetched feed.

use crate::fetch::{HttpClient, fetch_feed};
use crate::parser::parse_feed;
use crate::station::{StationDirectory, StationStatus};

/// Looks stations up in the live feed. Nothing is cached: every call
/// re-fetches and re-parses the whole feed.
pub struct StationLookup<C> {
    client: C,
    source: String,
}

impl<C: HttpClient> StationLookup<C> {
    /// `source` is the feed URL, or a path to a saved copy of the feed.
    pub fn new(client: C, source: impl Into<String>) -> Self {
        Self {
            client,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fetches and parses the feed. `None` if the fetch failed; an empty
    /// directory if the feed could not be parsed.
    pub async fn directory(&self) -> Option<StationDirectory> {
        let xml = fetch_feed(&self.client, &self.source).await?;
        Some(parse_feed(&xml))
    }

    /// Returns the station whose key is exactly `name` (case and whitespace
    /// significant).
    pub async fn find(&self, name: &str) -> Option<StationStatus> {
        self.directory().await?.get(name).cloned()
    }

    /// Empty-dock count for `name` together with its record, or `(0, None)`
    /// when the station cannot be found for any reason.
    pub async fn dock_count(&self, name: &str) -> (u32, Option<StationStatus>) {
        match self.find(name).await {
            Some(station) => (station.empty_docks, Some(station)),
            None => (0, None),
        }
    }
}
