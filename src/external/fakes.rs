use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    entities::{Coordinates, DirectionsRequest},
    error::{upstream_error, Error},
    external::{DirectionsService, Geocoder, ResponseMode, TextGenerator},
};

#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, Error>>>,
    calls: Mutex<Vec<ResponseMode>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, Error>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<ResponseMode> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _prompt: &str, mode: ResponseMode) -> Result<String, Error> {
        self.calls.lock().unwrap().push(mode);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(upstream_error()))
    }
}

#[derive(Default)]
pub struct MapGeocoder {
    known: HashMap<String, Coordinates>,
    broken: Vec<String>,
    lookups: Mutex<usize>,
}

impl MapGeocoder {
    pub fn new(known: &[(&str, f64, f64)]) -> Self {
        Self {
            known: known
                .iter()
                .map(|&(name, lat, lng)| (name.to_string(), Coordinates { lat, lng }))
                .collect(),
            broken: vec![],
            lookups: Mutex::new(0),
        }
    }

    pub fn with_broken(mut self, name: &str) -> Self {
        self.broken.push(name.to_string());
        self
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl Geocoder for MapGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, Error> {
        *self.lookups.lock().unwrap() += 1;

        if self.broken.iter().any(|name| name == address) {
            return Err(upstream_error());
        }

        Ok(self.known.get(address).copied())
    }
}

type Connectivity = Box<dyn Fn(&DirectionsRequest) -> bool + Send + Sync>;

pub struct FakeDirections {
    connects: Connectivity,
    requests: Mutex<Vec<DirectionsRequest>>,
}

impl FakeDirections {
    pub fn new(connects: impl Fn(&DirectionsRequest) -> bool + Send + Sync + 'static) -> Self {
        Self {
            connects: Box::new(connects),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn never() -> Self {
        Self::new(|_| false)
    }

    pub fn requests(&self) -> Vec<DirectionsRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectionsService for FakeDirections {
    async fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> Result<Option<serde_json::Value>, Error> {
        self.requests.lock().unwrap().push(request.clone());

        if (self.connects)(request) {
            Ok(Some(json!({
                "status": "OK",
                "legs": request.waypoints.len() + 1,
            })))
        } else {
            Ok(None)
        }
    }
}

pub fn point(n: usize) -> Coordinates {
    Coordinates {
        lat: n as f64,
        lng: n as f64,
    }
}
