use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::entities::TravelMode;
use crate::error::{invalid_input_error, Error};

const DEFAULT_OPENAI_API_BASE: &str = "api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GOOGLE_MAPS_API_BASE: &str = "maps.googleapis.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_base: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub google_maps_api_base: String,
    pub google_maps_api_key: String,
    pub geocode_region: Option<String>,
    pub travel_mode: TravelMode,
    pub request_timeout: Duration,
    pub listen_addr: SocketAddr,
}

impl Config {
    #[tracing::instrument(name = "Config::from_env")]
    pub fn from_env() -> Result<Self, Error> {
        let request_timeout = match optional_var("REQUEST_TIMEOUT_SECS") {
            Some(secs) => secs.parse().map_err(|_| invalid_input_error())?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let travel_mode = match optional_var("TRAVEL_MODE") {
            Some(mode) => mode.parse()?,
            None => TravelMode::default(),
        };

        let listen_addr = optional_var("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into())
            .parse()
            .map_err(|_| invalid_input_error())?;

        Ok(Self {
            openai_api_base: optional_var("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.into()),
            openai_api_key: env::var("OPENAI_API_KEY")?,
            openai_model: optional_var("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
            google_maps_api_base: optional_var("GOOGLE_MAPS_API_BASE")
                .unwrap_or_else(|| DEFAULT_GOOGLE_MAPS_API_BASE.into()),
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")?,
            geocode_region: optional_var("GEOCODE_REGION"),
            travel_mode,
            request_timeout: Duration::from_secs(request_timeout),
            listen_addr,
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
