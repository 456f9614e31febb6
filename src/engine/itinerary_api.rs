use super::{
    extract::{extract_json, itinerary_array},
    prompt::itinerary_prompt,
    repair::{is_valid_batch, repair_batch},
    Engine, MAX_GENERATION_ATTEMPTS,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    api::ItineraryAPI,
    entities::{ItineraryBatch, TripRequest},
    error::Error,
    external::ResponseMode,
};

#[async_trait]
impl ItineraryAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn generate_itineraries(&self, request: TripRequest) -> Result<ItineraryBatch, Error> {
        let (start, end) = request.anchors()?;
        let prompt = itinerary_prompt(start, end, request.preference());

        let mut raw = self.request_raw_itineraries(&prompt).await?;
        let mut attempt = 1;

        while !is_valid_batch(&raw, start, end) {
            tracing::warn!(
                attempt,
                items = raw.len(),
                "generated itineraries failed validation"
            );

            if attempt == MAX_GENERATION_ATTEMPTS {
                break;
            }
            attempt += 1;

            match self.request_raw_itineraries(&prompt).await {
                Ok(next) if !next.is_empty() => raw = next,
                Ok(_) => {
                    tracing::warn!("retry produced no itineraries, keeping the previous reply")
                }
                Err(err) => {
                    tracing::warn!("retry failed ({}), repairing the previous reply", err);
                    break;
                }
            }
        }

        Ok(repair_batch(&raw, start, end))
    }
}

impl Engine {
    #[tracing::instrument(skip_all)]
    async fn request_raw_itineraries(&self, prompt: &str) -> Result<Vec<Value>, Error> {
        let structured = self.generator.complete(prompt, ResponseMode::Json).await;

        match &structured {
            Ok(text) => {
                let items = serde_json::from_str(text)
                    .ok()
                    .and_then(itinerary_array)
                    .filter(|items| !items.is_empty());

                if let Some(items) = items {
                    return Ok(items);
                }

                tracing::warn!("structured reply held no itineraries, retrying as text");
            }
            Err(err) => tracing::warn!("structured generation failed: {}", err),
        }

        match self.generator.complete(prompt, ResponseMode::Text).await {
            Ok(text) => Ok(extract_json(&text)
                .and_then(itinerary_array)
                .unwrap_or_default()),
            Err(err) if structured.is_ok() => {
                tracing::warn!("text generation failed: {}", err);
                Ok(vec![])
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
fn valid_reply() -> String {
    reply_with(5)
}

#[cfg(test)]
fn reply_with(count: u32) -> String {
    let itineraries: Vec<Value> = (1..=count)
        .map(|option| {
            serde_json::json!({
                "option": option,
                "stops": [
                    { "time": "09:00 AM", "place": "Auckland CBD", "description": "Leave town" },
                    { "time": "10:30 AM", "place": "Huntly", "description": "Coffee" },
                    { "time": "12:00 PM", "place": "Hamilton", "description": "Gardens" }
                ]
            })
        })
        .collect();

    serde_json::json!({ "itineraries": itineraries }).to_string()
}

#[cfg(test)]
fn engine_with(generator: std::sync::Arc<crate::external::fakes::ScriptedGenerator>) -> Engine {
    use crate::entities::TravelMode;
    use crate::external::fakes::{FakeDirections, MapGeocoder};
    use std::sync::Arc;

    Engine::new(
        generator,
        Arc::new(MapGeocoder::default()),
        Arc::new(FakeDirections::always()),
        TravelMode::Driving,
    )
}

#[test]
fn valid_structured_reply_needs_one_call() {
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;
    use tokio_test::block_on;

    let generator = Arc::new(ScriptedGenerator::new(vec![Ok(valid_reply())]));
    let engine = engine_with(generator.clone());

    let batch = block_on(engine.generate_itineraries(TripRequest::new("Auckland CBD", "Hamilton")))
        .unwrap();

    assert_eq!(batch.len(), 5);
    assert_eq!(batch[4].places(), vec!["Auckland CBD", "Huntly", "Hamilton"]);
    assert_eq!(generator.calls(), vec![ResponseMode::Json]);
}

#[test]
fn malformed_structured_reply_falls_back_to_text() {
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;
    use tokio_test::block_on;

    let prose = format!("Here you go!\n```json\n{}\n```", valid_reply());
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok("{\"itineraries\": [".into()),
        Ok(prose),
    ]));
    let engine = engine_with(generator.clone());

    let batch = block_on(engine.generate_itineraries(TripRequest::new("Auckland CBD", "Hamilton")))
        .unwrap();

    assert_eq!(batch[0].places(), vec!["Auckland CBD", "Huntly", "Hamilton"]);
    assert_eq!(
        generator.calls(),
        vec![ResponseMode::Json, ResponseMode::Text]
    );
}

#[test]
fn invalid_batch_is_retried_once_then_repaired() {
    use crate::error::upstream_error;
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;
    use tokio_test::block_on;

    let partial = serde_json::json!([{
        "option": 1,
        "stops": [
            { "time": "9", "place": "Auckland CBD", "description": "" },
            { "time": "11", "place": "Rotorua", "description": "Geysers" }
        ]
    }])
    .to_string();

    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok(partial.clone()),
        Ok(partial),
        Err(upstream_error()),
    ]));
    let engine = engine_with(generator.clone());

    let batch = block_on(engine.generate_itineraries(TripRequest::new("Auckland CBD", "Hamilton")))
        .unwrap();

    assert_eq!(batch.len(), 5);
    assert_eq!(batch[0].places(), vec!["Auckland CBD", "Rotorua", "Hamilton"]);
    assert!(batch[1..]
        .iter()
        .all(|itinerary| itinerary.stops[1].description.ends_with("(auto-filled)")));
    assert_eq!(generator.calls(), vec![ResponseMode::Json, ResponseMode::Json]);
}

#[test]
fn empty_retry_keeps_the_first_reply() {
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;
    use tokio_test::block_on;

    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok(reply_with(4)),
        Ok("{}".into()),
        Ok("Sorry, nothing to suggest.".into()),
    ]));
    let engine = engine_with(generator.clone());

    let batch = block_on(engine.generate_itineraries(TripRequest::new("Auckland CBD", "Hamilton")))
        .unwrap();

    for itinerary in &batch[..4] {
        assert_eq!(itinerary.places(), vec!["Auckland CBD", "Huntly", "Hamilton"]);
        assert_eq!(itinerary.stops[1].description, "Coffee");
    }
    assert_eq!(batch[4].stops[1].description, "Coffee (auto-filled)");
    assert_eq!(
        generator.calls(),
        vec![ResponseMode::Json, ResponseMode::Json, ResponseMode::Text]
    );
}

#[test]
fn transport_failure_on_both_modes_is_an_error() {
    use crate::error::upstream_error;
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;
    use tokio_test::block_on;

    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(upstream_error()),
        Err(upstream_error()),
    ]));
    let engine = engine_with(generator.clone());

    let result = block_on(engine.generate_itineraries(TripRequest::new("Auckland CBD", "Hamilton")));

    assert_eq!(result.unwrap_err(), upstream_error());
    assert_eq!(generator.calls().len(), 2);
}

#[test]
fn content_failures_still_produce_a_batch() {
    use crate::error::upstream_error;
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;
    use tokio_test::block_on;

    // attempt 1: garbage then transport error; attempt 2: prose without JSON
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok("not json".into()),
        Err(upstream_error()),
        Ok("{}".into()),
        Ok("Sorry, I cannot plan that trip.".into()),
    ]));
    let engine = engine_with(generator.clone());

    let batch = block_on(engine.generate_itineraries(TripRequest::new("Auckland CBD", "Hamilton")))
        .unwrap();

    assert_eq!(batch.len(), 5);
    assert!(batch
        .iter()
        .all(|itinerary| itinerary.stops[0].place == "Auckland CBD"
            && itinerary.stops[itinerary.stops.len() - 1].place == "Hamilton"));
    assert_eq!(generator.calls().len(), 4);
}

#[test]
fn blank_anchor_fails_fast() {
    use crate::error::missing_field_error;
    use crate::external::fakes::ScriptedGenerator;
    use std::sync::Arc;
    use tokio_test::block_on;

    let generator = Arc::new(ScriptedGenerator::new(vec![]));
    let engine = engine_with(generator.clone());

    let result = block_on(engine.generate_itineraries(TripRequest::new("Auckland CBD", " ")));

    assert_eq!(result.unwrap_err(), missing_field_error("end"));
    assert!(generator.calls().is_empty());
}
