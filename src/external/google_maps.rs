use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    config::Config,
    entities::{Coordinates, DirectionsRequest},
    error::{invalid_input_error, upstream_error, Error},
    external::{DirectionsService, Geocoder},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Coordinates,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    results: Option<T>,
}

#[derive(Clone, Debug)]
pub struct GoogleMaps {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    region: Option<String>,
}

impl GoogleMaps {
    pub fn new(
        api_base: String,
        api_key: String,
        region: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base,
            api_key,
            region,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(
            config.google_maps_api_base.clone(),
            config.google_maps_api_key.clone(),
            config.geocode_region.clone(),
            config.request_timeout,
        )
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, Error> {
        let url = format!("https://{}{}", self.api_base, path);

        let res = self
            .client
            .get(url)
            .query(&[("key", &self.api_key)])
            .query(query)
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if (400..500).contains(&status_code) {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl Geocoder for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, Error> {
        let mut query = vec![("address", address.to_string())];
        if let Some(region) = &self.region {
            query.push(("region", region.clone()));
        }

        let body = self.get("/maps/api/geocode/json", &query).await?;
        let data: Response<Vec<Place>> = serde_json::from_value(body)?;

        match data.status.as_str() {
            "OK" => Ok(data
                .results
                .and_then(|places| places.into_iter().next())
                .map(|place| {
                    tracing::debug!("matched {}", place.formatted_address);
                    place.geometry.location
                })),
            "ZERO_RESULTS" => Ok(None),
            status => {
                tracing::warn!("geocoding returned status {}", status);
                Err(upstream_error())
            }
        }
    }
}

#[async_trait]
impl DirectionsService for GoogleMaps {
    #[tracing::instrument(skip(self, request), fields(waypoints = request.waypoints.len()))]
    async fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> Result<Option<serde_json::Value>, Error> {
        let body = self
            .get("/maps/api/directions/json", &directions_query(request))
            .await?;

        let status = body
            .get("status")
            .and_then(|status| status.as_str())
            .map(str::to_string)
            .ok_or_else(upstream_error)?;

        match status.as_str() {
            "OK" => Ok(Some(body)),
            "NOT_FOUND"
            | "ZERO_RESULTS"
            | "MAX_WAYPOINTS_EXCEEDED"
            | "MAX_ROUTE_LENGTH_EXCEEDED" => {
                tracing::info!("no route: {}", status);
                Ok(None)
            }
            status => {
                tracing::warn!("directions returned status {}", status);
                Err(upstream_error())
            }
        }
    }
}

fn directions_query(request: &DirectionsRequest) -> Vec<(&'static str, String)> {
    let mut query: Vec<(&'static str, String)> = vec![
        ("origin", request.origin.into()),
        ("destination", request.destination.into()),
        ("mode", request.mode.name().to_string()),
    ];

    if !request.waypoints.is_empty() {
        let waypoints: Vec<String> = request
            .waypoints
            .iter()
            .map(|&waypoint| waypoint.into())
            .collect();
        query.push(("waypoints", waypoints.join("|")));
    }

    query
}

#[test]
fn directions_query_keeps_waypoint_order() {
    use crate::entities::TravelMode;

    let request = DirectionsRequest {
        origin: Coordinates { lat: 1.0, lng: 2.0 },
        destination: Coordinates { lat: 5.0, lng: 6.0 },
        waypoints: vec![
            Coordinates { lat: 4.0, lng: 4.5 },
            Coordinates { lat: 3.0, lng: 3.5 },
        ],
        mode: TravelMode::Driving,
    };

    let query = directions_query(&request);

    assert_eq!(query[0], ("origin", "1,2".to_string()));
    assert_eq!(query[1], ("destination", "5,6".to_string()));
    assert_eq!(query[2], ("mode", "driving".to_string()));
    assert_eq!(query[3], ("waypoints", "4,4.5|3,3.5".to_string()));
}

#[test]
fn direct_route_sends_no_waypoints() {
    use crate::entities::TravelMode;

    let request = DirectionsRequest {
        origin: Coordinates { lat: 1.0, lng: 2.0 },
        destination: Coordinates { lat: 5.0, lng: 6.0 },
        waypoints: vec![],
        mode: TravelMode::Walking,
    };

    let query = directions_query(&request);

    assert_eq!(query.len(), 3);
    assert!(query.iter().all(|(key, _)| *key != "waypoints"));
}

#[test]
fn geocode_response_parses() {
    let body = serde_json::json!({
        "status": "OK",
        "results": [{
            "formatted_address": "Hamilton, New Zealand",
            "geometry": { "location": { "lat": -37.787, "lng": 175.279 } }
        }]
    });

    let data: Response<Vec<Place>> = serde_json::from_value(body).unwrap();
    let place = data.results.unwrap().remove(0);

    assert_eq!(data.status, "OK");
    assert_eq!(
        place.geometry.location,
        Coordinates {
            lat: -37.787,
            lng: 175.279
        }
    );
}
