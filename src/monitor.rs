//! The check-and-notify run: look the station up, compare against the
//! threshold, and email the result.

use tracing::{error, info};

use crate::fetch::HttpClient;
use crate::lookup::StationLookup;
use crate::notify::{Mailer, Notifier};
use crate::station::StationStatus;

const LOW_MARKER: &str = "⚠️ WARNING: Low availability of empty docks!";
const OK_MARKER: &str = "✅ Sufficient empty docks available.";

/// Snapshot of one station measured against the alert threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub station_name: String,
    pub empty_docks: u32,
    pub bikes_available: u32,
    pub total_docks: u32,
    pub threshold: i64,
}

impl StatusReport {
    pub fn new(station_name: &str, station: &StationStatus, threshold: i64) -> Self {
        Self {
            station_name: station_name.to_string(),
            empty_docks: station.empty_docks,
            bikes_available: station.bikes_available,
            total_docks: station.total_docks,
            threshold,
        }
    }

    /// Low when empty docks are at or below the threshold.
    pub fn is_low(&self) -> bool {
        i64::from(self.empty_docks) <= self.threshold
    }

    pub fn subject(&self) -> String {
        let prefix = if self.is_low() { "⚠️ " } else { "" };
        format!("{prefix}Santander Cycle Station Update: {}", self.station_name)
    }

    pub fn body(&self) -> String {
        let marker = if self.is_low() { LOW_MARKER } else { OK_MARKER };
        format!(
            "\nSantander Cycle Station Status Update for {}:\n\n\
             Empty Docks: {}\n\
             Bikes Available: {}\n\
             Total Docks: {}\n\n\
             {marker}\n",
            self.station_name, self.empty_docks, self.bikes_available, self.total_docks,
        )
    }
}

/// Checks `station_name` and emails its status. Returns whether an email was
/// sent; an unknown station is reported and nothing is sent.
#[tracing::instrument(skip(lookup, notifier))]
pub async fn check_and_notify<C: HttpClient, M: Mailer>(
    lookup: &StationLookup<C>,
    notifier: &Notifier<M>,
    station_name: &str,
    threshold: i64,
) -> bool {
    let (empty_docks, station) = lookup.dock_count(station_name).await;
    let Some(station) = station else {
        error!("Station '{station_name}' not found.");
        return false;
    };

    let report = StatusReport::new(station_name, &station, threshold);
    info!(empty_docks, low = report.is_low(), "Sending notification");
    println!("Sending notification for {station_name}:");
    println!("{}", report.body());

    notifier.notify(&report.subject(), &report.body()).await
}
