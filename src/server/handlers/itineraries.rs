use axum::extract::{Extension, Json};

use crate::api::DynAPI;
use crate::entities::{ItineraryBatch, TripRequest};
use crate::error::Error;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<TripRequest>,
) -> Result<Json<ItineraryBatch>, Error> {
    let itineraries = api.generate_itineraries(params).await?;

    Ok(itineraries.into())
}

#[test]
fn blank_start_is_a_bad_request() {
    use crate::engine::Engine;
    use crate::entities::TravelMode;
    use crate::external::fakes::{FakeDirections, MapGeocoder, ScriptedGenerator};
    use axum::{http::StatusCode, response::IntoResponse};
    use std::sync::Arc;
    use tokio_test::block_on;

    let api = Arc::new(Engine::new(
        Arc::new(ScriptedGenerator::default()),
        Arc::new(MapGeocoder::default()),
        Arc::new(FakeDirections::always()),
        TravelMode::Driving,
    )) as DynAPI;

    let result = block_on(create(
        Extension(api),
        Json(TripRequest::new("   ", "Hamilton")),
    ));

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
