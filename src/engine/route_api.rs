use super::{materialize::materialize, resolver::resolve_places, Engine};

use async_trait::async_trait;
use futures::future::join_all;

use crate::{
    api::RouteAPI,
    entities::{Itinerary, RouteResult},
};

#[async_trait]
impl RouteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn materialize_route(&self, places: Vec<String>) -> RouteResult {
        let locations = resolve_places(self.geocoder.as_ref(), &places).await;

        materialize(self.directions.as_ref(), locations, self.travel_mode).await
    }

    #[tracing::instrument(skip_all, fields(itineraries = itineraries.len()))]
    async fn materialize_routes(&self, itineraries: Vec<Itinerary>) -> Vec<RouteResult> {
        join_all(
            itineraries
                .iter()
                .map(|itinerary| self.materialize_route(itinerary.places())),
        )
        .await
    }
}

#[cfg(test)]
fn engine_with(
    geocoder: std::sync::Arc<crate::external::fakes::MapGeocoder>,
    directions: std::sync::Arc<crate::external::fakes::FakeDirections>,
) -> Engine {
    use crate::entities::TravelMode;
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;

    Engine::new(
        Arc::new(ScriptedGenerator::default()),
        geocoder,
        directions,
        TravelMode::Driving,
    )
}

#[cfg(test)]
fn lettered_geocoder() -> crate::external::fakes::MapGeocoder {
    crate::external::fakes::MapGeocoder::new(&[
        ("A", 1.0, 1.0),
        ("B", 2.0, 2.0),
        ("C", 3.0, 3.0),
        ("D", 4.0, 4.0),
    ])
}

#[test]
fn nothing_geocodes_so_nothing_is_routed() {
    use crate::external::fakes::{FakeDirections, MapGeocoder};
    use std::sync::Arc;
    use tokio_test::block_on;

    let geocoder = Arc::new(MapGeocoder::default());
    let directions = Arc::new(FakeDirections::always());
    let engine = engine_with(geocoder.clone(), directions.clone());

    let places = vec!["Nowhere".to_string(), "Neverland".into(), "Atlantis".into()];
    let result = block_on(engine.materialize_route(places));

    assert!(result.directions.is_none());
    assert!(result.removed_indices.is_empty());
    assert!(result.coordinates.is_empty());
    assert_eq!(geocoder.lookups(), 3);
    assert_eq!(directions.calls(), 0);
}

#[test]
fn unreachable_stop_is_removed() {
    use crate::entities::Coordinates;
    use crate::external::fakes::FakeDirections;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tokio_test::block_on;

    let b = Coordinates { lat: 2.0, lng: 2.0 };
    let directions = Arc::new(FakeDirections::new(move |request| {
        !request.waypoints.contains(&b)
    }));
    let engine = engine_with(Arc::new(lettered_geocoder()), directions.clone());

    let places = ["A", "B", "C", "D"].iter().map(|p| p.to_string()).collect();
    let result = block_on(engine.materialize_route(places));

    assert!(result.is_renderable());
    assert_eq!(result.removed_indices, BTreeSet::from([1]));
    assert_eq!(directions.calls(), 2);
}

#[test]
fn every_itinerary_gets_a_result_in_order() {
    use crate::entities::Stop;
    use crate::external::fakes::FakeDirections;
    use std::sync::Arc;
    use tokio_test::block_on;

    let itinerary = |option: u32, places: &[&str]| Itinerary {
        option,
        stops: places
            .iter()
            .map(|place| Stop::new("", *place, ""))
            .collect(),
    };

    let engine = engine_with(
        Arc::new(lettered_geocoder()),
        Arc::new(FakeDirections::always()),
    );

    let results = block_on(engine.materialize_routes(vec![
        itinerary(1, &["A", "B", "D"]),
        itinerary(2, &["A", "Atlantis"]),
        itinerary(3, &["A", "C", "D"]),
    ]));

    assert_eq!(results.len(), 3);
    assert!(results[0].is_renderable());
    assert!(!results[1].is_renderable());
    assert_eq!(results[2].coordinates[1].name, "C");
}
