//! Station listing and search, for finding the exact name to monitor.
//!
//! Search is a case-insensitive substring match, unlike
//! [`StationLookup::find`](crate::lookup::StationLookup::find) which needs the
//! exact name. A search with no hits lists every station instead.

use std::fmt::Write;

use tracing::{error, info};

use crate::fetch::HttpClient;
use crate::lookup::StationLookup;
use crate::station::{StationDirectory, StationStatus};

const RULE_WIDTH: usize = 80;

/// Stations chosen for display, in key order.
#[derive(Debug)]
pub struct Selection<'a> {
    pub stations: Vec<(&'a str, &'a StationStatus)>,
    /// The search term matched nothing, so `stations` is the full directory.
    pub fell_back: bool,
}

/// Applies an optional search term to `directory`.
pub fn select_stations<'a>(directory: &'a StationDirectory, search: Option<&str>) -> Selection<'a> {
    let Some(term) = search.filter(|t| !t.is_empty()) else {
        return Selection {
            stations: directory.sorted(),
            fell_back: false,
        };
    };

    let matches = directory.search(term);
    if matches.is_empty() {
        Selection {
            stations: directory.sorted(),
            fell_back: true,
        }
    } else {
        Selection {
            stations: matches,
            fell_back: false,
        }
    }
}

/// Formats a numbered listing with counts and ids.
pub fn render_listing(selection: &Selection<'_>) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\nFound {} stations:", selection.stations.len());
    let _ = writeln!(out, "{rule}");
    for (i, (key, station)) in selection.stations.iter().enumerate() {
        let _ = writeln!(out, "{}. {key}", i + 1);
        let _ = writeln!(
            out,
            "   Empty Docks: {}, Bikes: {}, Total: {}",
            station.empty_docks, station.bikes_available, station.total_docks
        );
        let _ = writeln!(out, "   ID: {}", station.id);
        let _ = writeln!(out, "{rule}");
    }
    let _ = writeln!(
        out,
        "\nTo monitor a station, set CYCLE_STATION_NAME in your .env file to the exact station name."
    );
    let _ = writeln!(out, "Example: CYCLE_STATION_NAME=Westminster Pier, Westminster");
    out
}

/// Fetches the feed and prints the (optionally filtered) station list to
/// stdout. Search terms are joined with single spaces.
#[tracing::instrument(skip(lookup))]
pub async fn list_stations<C: HttpClient>(lookup: &StationLookup<C>, terms: &[String]) {
    let search = (!terms.is_empty()).then(|| terms.join(" "));
    if let Some(term) = &search {
        println!("Searching for stations matching: '{term}'");
    }

    println!("Fetching TfL Santander Cycle stations data...");
    let Some(directory) = lookup.directory().await else {
        println!("Error: Failed to fetch TfL cycle data.");
        return;
    };
    if directory.is_empty() {
        error!("Feed contained no stations");
        println!("Error: No stations found or failed to parse station data.");
        return;
    }

    let selection = select_stations(&directory, search.as_deref());
    if selection.fell_back {
        let term = search.as_deref().unwrap_or_default().to_lowercase();
        println!("No stations found matching '{term}'.");
        println!("Showing all stations instead.");
    }
    info!(shown = selection.stations.len(), total = directory.len(), "Listing stations");
    print!("{}", render_listing(&selection));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StationDirectory {
        [
            ("1", "Westminster Pier, Westminster", 2, 20, 22),
            ("2", "Abbey Road", 5, 5, 10),
            ("3", "Westminster Bridge Road, Elephant & Castle", 9, 1, 10),
        ]
        .into_iter()
        .map(|(id, name, empty_docks, bikes_available, total_docks)| StationStatus {
            id: id.to_string(),
            name: name.to_string(),
            empty_docks,
            bikes_available,
            total_docks,
            ..Default::default()
        })
        .collect()
    }

    #[test]
    fn test_no_search_selects_everything_sorted() {
        let directory = directory();
        let selection = select_stations(&directory, None);
        assert!(!selection.fell_back);
        assert_eq!(selection.stations.len(), 3);
        assert_eq!(selection.stations[0].0, "Abbey Road");
    }

    #[test]
    fn test_search_filters_case_insensitively() {
        let directory = directory();
        let selection = select_stations(&directory, Some("westMINSTER"));
        assert!(!selection.fell_back);
        let keys: Vec<_> = selection.stations.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            [
                "Westminster Bridge Road, Elephant & Castle",
                "Westminster Pier, Westminster"
            ]
        );
    }

    #[test]
    fn test_search_without_hits_falls_back_to_all() {
        let directory = directory();
        let selection = select_stations(&directory, Some("paddington"));
        assert!(selection.fell_back);
        assert_eq!(selection.stations.len(), 3);
    }

    #[test]
    fn test_render_listing_format() {
        let directory = directory();
        let selection = select_stations(&directory, Some("abbey"));
        let text = render_listing(&selection);

        assert!(text.contains("Found 1 stations:"));
        assert!(text.contains("1. Abbey Road\n"));
        assert!(text.contains("   Empty Docks: 5, Bikes: 5, Total: 10\n"));
        assert!(text.contains("   ID: 2\n"));
        assert!(text.contains(&"-".repeat(80)));
        assert!(text.contains("CYCLE_STATION_NAME"));
    }

    #[test]
    fn test_render_listing_numbers_sequentially() {
        let directory = directory();
        let text = render_listing(&select_stations(&directory, None));
        assert!(text.contains("1. Abbey Road\n"));
        assert!(text.contains("2. Westminster Bridge Road, Elephant & Castle\n"));
        assert!(text.contains("3. Westminster Pier, Westminster\n"));
    }
}
