use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for String {
    fn from(coordinates: Coordinates) -> Self {
        format!("{},{}", coordinates.lat, coordinates.lng)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
}

impl Location {
    pub fn new(coordinates: Coordinates, name: String) -> Self {
        Self { name, coordinates }
    }
}

#[test]
fn location_serializes_flat() {
    let location = Location::new(
        Coordinates {
            lat: -36.8485,
            lng: 174.7633,
        },
        "Auckland CBD".into(),
    );

    let value = serde_json::to_value(&location).unwrap();
    assert_eq!(
        value,
        serde_json::json!({ "name": "Auckland CBD", "lat": -36.8485, "lng": 174.7633 })
    );
}
