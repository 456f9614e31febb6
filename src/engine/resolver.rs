use futures::future::join_all;

use crate::{entities::Location, external::Geocoder};

#[tracing::instrument(skip(geocoder, places), fields(places = places.len()))]
pub async fn resolve_places(geocoder: &dyn Geocoder, places: &[String]) -> Vec<Location> {
    let lookups = join_all(places.iter().map(|place| geocoder.geocode(place))).await;

    let mut locations = Vec::with_capacity(places.len());

    for (place, lookup) in places.iter().zip(lookups) {
        match lookup {
            Ok(Some(coordinates)) => locations.push(Location::new(coordinates, place.clone())),
            Ok(None) => tracing::warn!("no geocoding match for {:?}, dropping it", place),
            Err(err) => tracing::warn!("geocoding {:?} failed: {}, dropping it", place, err),
        }
    }

    tracing::info!("resolved {} of {} places", locations.len(), places.len());

    locations
}

#[test]
fn failed_lookups_are_dropped_in_order() {
    use crate::external::fakes::MapGeocoder;
    use tokio_test::block_on;

    let geocoder = MapGeocoder::new(&[
        ("Auckland CBD", -36.85, 174.76),
        ("Huntly", -37.56, 175.16),
        ("Hamilton", -37.79, 175.28),
    ])
    .with_broken("Huntly");

    let places: Vec<String> = ["Auckland CBD", "Atlantis", "Huntly", "", "Hamilton"]
        .iter()
        .map(|place| place.to_string())
        .collect();

    let locations = block_on(resolve_places(&geocoder, &places));
    let names: Vec<&str> = locations.iter().map(|l| l.name.as_str()).collect();

    assert_eq!(names, vec!["Auckland CBD", "Hamilton"]);
    assert_eq!(locations[1].coordinates.lat, -37.79);
    assert_eq!(geocoder.lookups(), 5);
}

#[test]
fn nothing_resolves() {
    use crate::external::fakes::MapGeocoder;
    use tokio_test::block_on;

    let geocoder = MapGeocoder::default();
    let places = vec!["Nowhere".to_string(), "Neverland".into(), "Atlantis".into()];

    assert!(block_on(resolve_places(&geocoder, &places)).is_empty());
    assert_eq!(geocoder.lookups(), 3);
}
