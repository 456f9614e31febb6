use std::collections::BTreeSet;

use serde_json::Value;

use crate::{
    entities::{Coordinates, DirectionsRequest, Location, RouteResult, TravelMode},
    error::Error,
    external::DirectionsService,
};

#[derive(Clone, Copy, Debug)]
struct Waypoint {
    index: usize,
    coordinates: Coordinates,
}

struct Router<'a> {
    directions: &'a dyn DirectionsService,
    chain: &'a [Waypoint],
    mode: TravelMode,
}

impl<'a> Router<'a> {
    fn interior(&self) -> std::ops::Range<usize> {
        1..self.chain.len() - 1
    }

    async fn route(&self, excluded: &BTreeSet<usize>) -> Result<Option<Value>, Error> {
        let last = self.chain.len() - 1;

        let request = DirectionsRequest {
            origin: self.chain[0].coordinates,
            destination: self.chain[last].coordinates,
            waypoints: self
                .interior()
                .filter(|position| !excluded.contains(position))
                .map(|position| self.chain[position].coordinates)
                .collect(),
            mode: self.mode,
        };

        self.directions.directions(&request).await
    }

    fn indices(&self, positions: impl IntoIterator<Item = usize>) -> BTreeSet<usize> {
        positions
            .into_iter()
            .map(|position| self.chain[position].index)
            .collect()
    }

    // A connecting trial ends the search, so a single round of removals is all
    // that can ever run.
    async fn prune(&self) -> Result<Option<(usize, Value)>, Error> {
        for position in self.interior() {
            if let Some(directions) = self.route(&BTreeSet::from([position])).await? {
                return Ok(Some((position, directions)));
            }
        }

        Ok(None)
    }

    async fn connect(&self) -> Result<Option<(Value, BTreeSet<usize>)>, Error> {
        if let Some(found) = self.route(&BTreeSet::new()).await? {
            return Ok(Some((found, BTreeSet::new())));
        }

        let interior: BTreeSet<usize> = self.interior().collect();

        if interior.is_empty() {
            return Ok(None);
        }

        if let Some((position, found)) = self.prune().await? {
            tracing::info!("route connects without waypoint {}", position);
            return Ok(Some((found, BTreeSet::from([position]))));
        }

        // with a single interior waypoint, pruning already tried the direct route
        if interior.len() == 1 {
            return Ok(None);
        }

        let direct = self.route(&interior).await?;
        if direct.is_some() {
            tracing::info!("falling back to a direct route");
        }

        Ok(direct.map(|found| (found, interior)))
    }
}

fn collapse_repeats(locations: &[Location]) -> Vec<Waypoint> {
    let mut chain: Vec<Waypoint> = Vec::with_capacity(locations.len());

    for (index, location) in locations.iter().enumerate() {
        if let Some(previous) = chain.last() {
            if previous.coordinates == location.coordinates {
                continue;
            }
        }

        chain.push(Waypoint {
            index,
            coordinates: location.coordinates,
        });
    }

    chain
}

/// `removed_indices` of the result are positions in `locations`.
#[tracing::instrument(skip(directions, locations), fields(points = locations.len()))]
pub async fn materialize(
    directions: &dyn DirectionsService,
    locations: Vec<Location>,
    mode: TravelMode,
) -> RouteResult {
    let chain = collapse_repeats(&locations);

    if chain.len() < 2 {
        tracing::warn!("fewer than two distinct points, skipping routing");
        return RouteResult::unroutable(locations, BTreeSet::new());
    }

    let router = Router {
        directions,
        chain: &chain,
        mode,
    };

    match router.connect().await {
        Ok(Some((found, removed))) => RouteResult {
            directions: Some(found),
            removed_indices: router.indices(removed),
            coordinates: locations,
        },
        Ok(None) => {
            tracing::warn!("route cannot be connected, even directly");
            RouteResult::unroutable(locations, router.indices(router.interior()))
        }
        Err(err) => {
            tracing::error!("routing service failed, giving up on this route: {}", err);
            RouteResult::unroutable(locations, BTreeSet::new())
        }
    }
}

#[cfg(test)]
fn stops_at(count: usize) -> Vec<Location> {
    use crate::external::fakes::point;

    (0..count)
        .map(|n| Location::new(point(n), format!("P{}", n)))
        .collect()
}

#[cfg(test)]
fn visits(request: &DirectionsRequest, n: usize) -> bool {
    use crate::external::fakes::point;

    let p = point(n);
    request.origin == p || request.destination == p || request.waypoints.contains(&p)
}

#[test]
fn full_route_short_circuits() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let service = FakeDirections::always();
    let result = block_on(materialize(&service, stops_at(4), TravelMode::Driving));

    assert!(result.directions.is_some());
    assert!(result.removed_indices.is_empty());
    assert_eq!(service.calls(), 1);
    assert_eq!(service.requests()[0].waypoints.len(), 2);
}

#[test]
fn unreachable_waypoint_is_pruned() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    // B (index 1) is unreachable as part of any chain
    let service = FakeDirections::new(|request| !visits(request, 1));
    let result = block_on(materialize(&service, stops_at(4), TravelMode::Driving));

    assert!(result.directions.is_some());
    assert_eq!(result.removed_indices, BTreeSet::from([1]));
    assert_eq!(service.calls(), 2);
    assert_eq!(result.coordinates.len(), 4);
}

#[test]
fn later_waypoints_are_tried_in_order() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let service = FakeDirections::new(|request| !visits(request, 3));
    let result = block_on(materialize(&service, stops_at(5), TravelMode::Driving));

    assert_eq!(result.removed_indices, BTreeSet::from([3]));
    // full chain, then without 1, without 2, without 3
    assert_eq!(service.calls(), 4);
}

#[test]
fn only_direct_leg_connects() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let service = FakeDirections::new(|request| request.waypoints.is_empty());
    let result = block_on(materialize(&service, stops_at(4), TravelMode::Driving));

    assert!(result.directions.is_some());
    assert_eq!(result.removed_indices, BTreeSet::from([1, 2]));

    let last = service.requests().pop().unwrap();
    assert_eq!(last.origin, stops_at(4)[0].coordinates);
    assert_eq!(last.destination, stops_at(4)[3].coordinates);
}

#[test]
fn unroutable_returns_without_directions() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let service = FakeDirections::never();
    let result = block_on(materialize(&service, stops_at(6), TravelMode::Driving));

    assert!(result.directions.is_none());
    assert_eq!(result.removed_indices, BTreeSet::from([1, 2, 3, 4]));
    // full chain, one removal per waypoint, direct fallback
    assert_eq!(service.calls(), 6);
}

#[test]
fn single_waypoint_is_not_routed_directly_twice() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let service = FakeDirections::never();
    let result = block_on(materialize(&service, stops_at(3), TravelMode::Driving));

    assert!(result.directions.is_none());
    assert_eq!(result.removed_indices, BTreeSet::from([1]));
    assert_eq!(service.calls(), 2);
    assert!(service.requests()[1].waypoints.is_empty());
}

#[test]
fn two_points_are_not_retried() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let service = FakeDirections::never();
    let result = block_on(materialize(&service, stops_at(2), TravelMode::Driving));

    assert!(result.directions.is_none());
    assert!(result.removed_indices.is_empty());
    assert_eq!(service.calls(), 1);
}

#[test]
fn too_few_points_skip_routing() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let service = FakeDirections::always();

    let result = block_on(materialize(&service, vec![], TravelMode::Driving));
    assert!(result.directions.is_none());
    assert!(result.removed_indices.is_empty());

    let result = block_on(materialize(&service, stops_at(1), TravelMode::Driving));
    assert!(result.directions.is_none());

    assert_eq!(service.calls(), 0);
}

#[test]
fn repeated_points_are_merged_before_routing() {
    use crate::external::fakes::FakeDirections;
    use tokio_test::block_on;

    let mut points = stops_at(3);
    points.insert(1, points[0].clone());
    points.insert(3, points[2].clone());
    // P0 P0 P1 P1 P2

    let service = FakeDirections::new(|request| !visits(request, 1));
    let result = block_on(materialize(&service, points, TravelMode::Walking));

    let first = &service.requests()[0];
    assert_eq!(first.waypoints.len(), 1);
    assert_eq!(first.mode, TravelMode::Walking);
    // the surviving P1 sits at index 2 of the resolved list
    assert_eq!(result.removed_indices, BTreeSet::from([2]));
    assert_eq!(result.coordinates.len(), 5);
}

#[cfg(test)]
struct Outage {
    answers_before_failing: usize,
    calls: std::sync::Mutex<usize>,
}

#[cfg(test)]
impl Outage {
    fn after(answers_before_failing: usize) -> Self {
        Self {
            answers_before_failing,
            calls: std::sync::Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl DirectionsService for Outage {
    async fn directions(&self, _: &DirectionsRequest) -> Result<Option<Value>, Error> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;

        if *calls > self.answers_before_failing {
            Err(crate::error::upstream_error())
        } else {
            Ok(None)
        }
    }
}

#[test]
fn service_outage_stops_routing_at_once() {
    use tokio_test::block_on;

    let service = Outage::after(0);
    let result = block_on(materialize(&service, stops_at(8), TravelMode::Driving));

    assert!(result.directions.is_none());
    assert!(result.removed_indices.is_empty());
    assert_eq!(result.coordinates.len(), 8);
    assert_eq!(service.calls(), 1);
}

#[test]
fn outage_during_pruning_reports_nothing_removed() {
    use tokio_test::block_on;

    let service = Outage::after(2);
    let result = block_on(materialize(&service, stops_at(6), TravelMode::Driving));

    assert!(result.directions.is_none());
    assert!(result.removed_indices.is_empty());
    assert_eq!(service.calls(), 3);
}
