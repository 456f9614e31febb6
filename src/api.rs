use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{Itinerary, ItineraryBatch, RouteResult, TripRequest};
use crate::error::Error;

#[async_trait]
pub trait ItineraryAPI {
    async fn generate_itineraries(&self, request: TripRequest) -> Result<ItineraryBatch, Error>;
}

#[async_trait]
pub trait RouteAPI {
    async fn materialize_route(&self, places: Vec<String>) -> RouteResult;
    async fn materialize_routes(&self, itineraries: Vec<Itinerary>) -> Vec<RouteResult>;
}

pub trait API: ItineraryAPI + RouteAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
