use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, Location};
use crate::error::{invalid_input_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Transit => "transit",
        }
    }
}

impl Default for TravelMode {
    fn default() -> Self {
        Self::Driving
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TravelMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" => Ok(Self::Driving),
            "walking" => Ok(Self::Walking),
            "bicycling" => Ok(Self::Bicycling),
            "transit" => Ok(Self::Transit),
            _ => Err(invalid_input_error()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: Coordinates,
    pub destination: Coordinates,
    pub waypoints: Vec<Coordinates>,
    pub mode: TravelMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub directions: Option<serde_json::Value>,
    pub removed_indices: BTreeSet<usize>,
    pub coordinates: Vec<Location>,
}

impl RouteResult {
    pub fn unroutable(coordinates: Vec<Location>, removed_indices: BTreeSet<usize>) -> Self {
        Self {
            directions: None,
            removed_indices,
            coordinates,
        }
    }

    pub fn is_renderable(&self) -> bool {
        self.directions.is_some()
    }
}

#[test]
fn travel_mode_parses_case_insensitively() {
    assert_eq!("Driving".parse::<TravelMode>().unwrap(), TravelMode::Driving);
    assert_eq!(" transit ".parse::<TravelMode>().unwrap(), TravelMode::Transit);
    assert!("teleport".parse::<TravelMode>().is_err());
}

#[test]
fn route_result_uses_camel_case_on_the_wire() {
    let result = RouteResult::unroutable(vec![], BTreeSet::from([1, 2]));
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["directions"], serde_json::Value::Null);
    assert_eq!(value["removedIndices"], serde_json::json!([1, 2]));
}
