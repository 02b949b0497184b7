//! Itinerary parsing
//!
//! Turns the raw itinerary string returned by the trip planner
//! (`"Paris -> Lyon -> Marseille"`) into a structured [`Journey`].
//! Parsing is total: every input, including the empty string, yields a journey.

use serde::Serialize;
use std::fmt;

/// Separator between stop names in an itinerary string
pub const STOP_SEPARATOR: &str = " -> ";

/// Placeholder used when the route has no stops at all
pub const UNKNOWN_STOP: &str = "Unknown";

/// Placeholder used when the backend omitted duration or next departure
pub const NOT_SPECIFIED: &str = "Not specified";

/// Structured result of parsing an itinerary string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Journey {
    pub departure: String,
    pub arrival: String,
    pub intermediate_stops: Vec<String>,
    pub duration: String,
    pub next_departure: String,
}

impl Journey {
    /// Parse a raw itinerary string with no schedule information
    pub fn parse(raw: &str) -> Self {
        Self::from_parts(raw, None, None)
    }

    /// Parse a raw itinerary string and attach the schedule fields verbatim
    pub fn from_parts(raw: &str, duration: Option<&str>, next_departure: Option<&str>) -> Self {
        let stops: Vec<&str> = raw
            .split(STOP_SEPARATOR)
            .map(str::trim)
            .filter(|stop| !stop.is_empty())
            .collect();

        let departure = stops.first().copied().unwrap_or(UNKNOWN_STOP);
        let arrival = stops.last().copied().unwrap_or(UNKNOWN_STOP);
        let intermediate_stops = if stops.len() > 2 {
            stops[1..stops.len() - 1]
                .iter()
                .map(|stop| stop.to_string())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            departure: departure.to_string(),
            arrival: arrival.to_string(),
            intermediate_stops,
            duration: duration.unwrap_or(NOT_SPECIFIED).to_string(),
            next_departure: next_departure.unwrap_or(NOT_SPECIFIED).to_string(),
        }
    }

    /// Every stop of the route, departure and arrival included
    pub fn stops(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.departure.as_str())
            .chain(self.intermediate_stops.iter().map(String::as_str))
            .chain(std::iter::once(self.arrival.as_str()))
    }

    /// Whether the route goes straight from departure to arrival
    pub fn is_direct(&self) -> bool {
        self.intermediate_stops.is_empty()
    }
}

impl fmt::Display for Journey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route: Vec<&str> = self.stops().collect();
        write!(f, "{}", route.join(" → "))
    }
}
