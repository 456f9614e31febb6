use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::DynAPI;
use crate::entities::{Itinerary, RouteResult};

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    places: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateManyParams {
    itineraries: Vec<Itinerary>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateParams>,
) -> Json<RouteResult> {
    let route = api.materialize_route(params.places).await;

    route.into()
}

pub async fn create_many(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateManyParams>,
) -> Json<Vec<RouteResult>> {
    let routes = api.materialize_routes(params.itineraries).await;

    routes.into()
}

#[test]
fn single_place_comes_back_unroutable() {
    use crate::engine::Engine;
    use crate::entities::TravelMode;
    use crate::external::fakes::{FakeDirections, MapGeocoder, ScriptedGenerator};
    use std::sync::Arc;
    use tokio_test::block_on;

    let api = Arc::new(Engine::new(
        Arc::new(ScriptedGenerator::default()),
        Arc::new(MapGeocoder::new(&[("Hamilton", -37.79, 175.28)])),
        Arc::new(FakeDirections::always()),
        TravelMode::Driving,
    )) as DynAPI;

    let params = CreateParams {
        places: vec!["Hamilton".into()],
    };
    let Json(route) = block_on(create(Extension(api), Json(params)));

    assert!(route.directions.is_none());
    assert_eq!(route.coordinates.len(), 1);
}
