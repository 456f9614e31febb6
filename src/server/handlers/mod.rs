pub mod health;
pub mod itineraries;
pub mod routes;
