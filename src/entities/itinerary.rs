use serde::{Deserialize, Serialize};

use crate::error::{missing_field_error, Error};

pub const BATCH_SIZE: usize = 5;

pub const MIN_STOPS: usize = 3;
pub const MAX_STOPS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub time: String,
    pub place: String,
    pub description: String,
}

impl Stop {
    pub fn new(
        time: impl Into<String>,
        place: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            place: place.into(),
            description: description.into(),
        }
    }

    pub fn is_at(&self, place: &str) -> bool {
        self.place.trim() == place.trim()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub option: u32,
    pub stops: Vec<Stop>,
}

impl Itinerary {
    pub fn places(&self) -> Vec<String> {
        self.stops.iter().map(|stop| stop.place.clone()).collect()
    }
}

pub type ItineraryBatch = Vec<Itinerary>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripRequest {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub preference: Option<String>,
}

impl TripRequest {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            preference: None,
        }
    }

    pub fn with_preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn anchors(&self) -> Result<(&str, &str), Error> {
        let start = self.start.trim();
        let end = self.end.trim();

        if start.is_empty() {
            return Err(missing_field_error("start"));
        }
        if end.is_empty() {
            return Err(missing_field_error("end"));
        }

        Ok((start, end))
    }

    pub fn preference(&self) -> Option<&str> {
        self.preference
            .as_deref()
            .map(str::trim)
            .filter(|preference| !preference.is_empty())
    }
}

#[test]
fn blank_anchors_are_rejected() {
    assert_eq!(
        TripRequest::new("  ", "Hamilton").anchors().unwrap_err(),
        missing_field_error("start")
    );
    assert_eq!(
        TripRequest::new("Auckland CBD", "").anchors().unwrap_err(),
        missing_field_error("end")
    );
    assert_eq!(
        TripRequest::new(" Auckland CBD ", "Hamilton").anchors().unwrap(),
        ("Auckland CBD", "Hamilton")
    );
}
