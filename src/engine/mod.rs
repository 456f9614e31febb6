mod extract;
mod itinerary_api;
mod materialize;
mod prompt;
mod repair;
mod resolver;
mod route_api;

use std::sync::Arc;

use crate::{
    api::API,
    config::Config,
    entities::TravelMode,
    error::Error,
    external::{
        google_maps::GoogleMaps, openai::OpenAi, DirectionsService, Geocoder, TextGenerator,
    },
};

pub use extract::{extract_json, itinerary_array};
pub use materialize::materialize;
pub use repair::{is_valid_batch, repair_batch};
pub use resolver::resolve_places;

// Generate-and-validate cycles before the last reply is repaired as is.
pub const MAX_GENERATION_ATTEMPTS: usize = 2;

pub struct Engine {
    generator: Arc<dyn TextGenerator>,
    geocoder: Arc<dyn Geocoder>,
    directions: Arc<dyn DirectionsService>,
    travel_mode: TravelMode,
}

impl Engine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        geocoder: Arc<dyn Geocoder>,
        directions: Arc<dyn DirectionsService>,
        travel_mode: TravelMode,
    ) -> Self {
        Self {
            generator,
            geocoder,
            directions,
            travel_mode,
        }
    }

    #[tracing::instrument(name = "Engine::from_config", skip_all)]
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let maps = Arc::new(GoogleMaps::from_config(config)?);
        let openai = Arc::new(OpenAi::from_config(config)?);

        tracing::info!(
            model = openai.model(),
            mode = %config.travel_mode,
            "engine configured"
        );

        Ok(Self::new(openai, maps.clone(), maps, config.travel_mode))
    }
}

impl API for Engine {}
