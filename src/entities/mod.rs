mod itinerary;
mod location;
mod route;

pub use itinerary::{
    Itinerary, ItineraryBatch, Stop, TripRequest, BATCH_SIZE, MAX_STOPS, MIN_STOPS,
};
pub use location::{Coordinates, Location};
pub use route::{DirectionsRequest, RouteResult, TravelMode};
