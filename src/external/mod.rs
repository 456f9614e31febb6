pub mod google_maps;
pub mod openai;

#[cfg(test)]
pub(crate) mod fakes;

use async_trait::async_trait;

use crate::entities::{Coordinates, DirectionsRequest};
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    Json,
    Text,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, mode: ResponseMode) -> Result<String, Error>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    // Ok(None) means the service answered but found no match.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, Error>;
}

#[async_trait]
pub trait DirectionsService: Send + Sync {
    // Ok(None) means the service could not connect the requested chain.
    async fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> Result<Option<serde_json::Value>, Error>;
}
