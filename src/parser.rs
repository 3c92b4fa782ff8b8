//! XML parser for the cycle hire live status feed.
//!
//! The feed is a `<stations>` document with one child element per station:
//!
//! ```xml
//! <stations lastUpdate="1700000000000" version="2.0">
//!   <station>
//!     <id>1</id>
//!     <name>River Street , Clerkenwell</name>
//!     <terminalName>001023</terminalName>
//!     <lat>51.52916347</lat>
//!     <long>-0.109970527</long>
//!     <nbBikes>10</nbBikes>
//!     <nbEmptyDocks>8</nbEmptyDocks>
//!     <nbDocks>19</nbDocks>
//!   </station>
//! </stations>
//! ```

use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::{debug, error};

use crate::station::{StationDirectory, StationStatus};

/// Parses a feed document into a [`StationDirectory`].
///
/// Never fails: malformed fields keep their defaults, and a document that is
/// not well-formed XML logs an error and yields an empty directory.
pub fn parse_feed(xml: &str) -> StationDirectory {
    if xml.trim().is_empty() {
        return StationDirectory::new();
    }

    let doc = match Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            error!(error = %e, "Error parsing cycle hire feed");
            return StationDirectory::new();
        }
    };

    let directory: StationDirectory = doc
        .root_element()
        .children()
        .filter(Node::is_element)
        .map(parse_station)
        .collect();

    debug!(stations = directory.len(), "Feed parsed");
    directory
}

fn parse_station(node: Node<'_, '_>) -> StationStatus {
    let mut station = StationStatus::default();
    let mut id_attr = false;

    if let Some(id) = node.attribute("id").map(str::trim).filter(|s| !s.is_empty()) {
        station.id = id.to_string();
        id_attr = true;
    }

    for child in node.children().filter(Node::is_element) {
        let Some(text) = child.text().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };

        match child.tag_name().name() {
            "id" if !id_attr => station.id = text.to_string(),
            "name" => station.name = text.to_string(),
            "terminalName" => station.terminal_name = Some(text.to_string()),
            "lat" => set_parsed(&mut station.latitude, "lat", text),
            "long" => set_parsed(&mut station.longitude, "long", text),
            "nbEmptyDocks" => set_parsed(&mut station.empty_docks, "nbEmptyDocks", text),
            "nbBikes" => set_parsed(&mut station.bikes_available, "nbBikes", text),
            "nbDocks" => set_parsed(&mut station.total_docks, "nbDocks", text),
            _ => {}
        }
    }

    station
}

/// Overwrites `slot` when `text` parses; otherwise leaves the default alone.
fn set_parsed<T: FromStr>(slot: &mut T, field: &str, text: &str) {
    match text.parse() {
        Ok(value) => *slot = value,
        Err(_) => debug!(field, value = text, "Ignoring unparsable station field"),
    }
}
