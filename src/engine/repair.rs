use chrono::NaiveTime;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::entities::{Itinerary, ItineraryBatch, Stop, BATCH_SIZE, MAX_STOPS, MIN_STOPS};

const AUTO_FILLED_MARKER: &str = "(auto-filled)";

// Only decides whether to retry; repair never depends on it.
pub fn is_valid_batch(raw: &[Value], start: &str, end: &str) -> bool {
    if raw.len() != BATCH_SIZE {
        return false;
    }

    let options: BTreeSet<u64> = raw
        .iter()
        .filter_map(|itinerary| itinerary.get("option").and_then(Value::as_u64))
        .collect();

    if options != (1..=BATCH_SIZE as u64).collect::<BTreeSet<u64>>() {
        return false;
    }

    raw.iter()
        .all(|itinerary| is_valid_itinerary(itinerary, start, end))
}

fn is_valid_itinerary(raw: &Value, start: &str, end: &str) -> bool {
    let itinerary: Itinerary = match serde_json::from_value(raw.clone()) {
        Ok(itinerary) => itinerary,
        Err(_) => return false,
    };

    let stops = &itinerary.stops;
    if !(MIN_STOPS..=MAX_STOPS).contains(&stops.len()) {
        return false;
    }

    let last = stops.len() - 1;
    stops[0].is_at(start)
        && stops[last].is_at(end)
        && stops[1..last]
            .iter()
            .all(|stop| !stop.is_at(start) && !stop.is_at(end))
}

pub fn repair_batch(raw: &[Value], start: &str, end: &str) -> ItineraryBatch {
    let start = start.trim();
    let end = end.trim();

    let itineraries: Vec<Itinerary> = raw
        .iter()
        .enumerate()
        .map(|(position, value)| normalize(position, value, start, end))
        .map(|itinerary| anchor(itinerary, start, end))
        .map(|itinerary| drop_interior_anchors(itinerary, start, end))
        .collect();

    fill_to_batch(itineraries, start, end)
        .into_iter()
        .enumerate()
        .map(|(index, itinerary)| finalize(index, itinerary, start, end))
        .collect()
}

fn normalize(position: usize, value: &Value, start: &str, end: &str) -> Itinerary {
    let option = value
        .get("option")
        .and_then(coerce_option)
        .unwrap_or(position as u32 + 1);

    let mut stops: Vec<Stop> = value
        .get("stops")
        .and_then(Value::as_array)
        .map(|stops| stops.iter().map(normalize_stop).collect())
        .unwrap_or_default();

    if stops.is_empty() {
        stops = vec![start_stop(start), end_stop(end)];
    }

    Itinerary { option, stops }
}

fn coerce_option(value: &Value) -> Option<u32> {
    let option = match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|n| n.fract() == 0.0 && *n >= 0.0)
                .map(|n| n as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;

    u32::try_from(option).ok()
}

fn normalize_stop(value: &Value) -> Stop {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Stop::new(text("time"), text("place"), text("description"))
}

fn anchor(mut itinerary: Itinerary, start: &str, end: &str) -> Itinerary {
    match itinerary.stops.first_mut() {
        Some(first) if first.is_at(start) => first.place = start.to_string(),
        _ => itinerary.stops.insert(0, start_stop(start)),
    }

    match itinerary.stops.last_mut() {
        Some(last) if last.is_at(end) => last.place = end.to_string(),
        _ => itinerary.stops.push(end_stop(end)),
    }

    // a lone stop can satisfy both anchors when start and end coincide
    if itinerary.stops.len() < 2 {
        itinerary.stops.push(end_stop(end));
    }

    itinerary
}

fn drop_interior_anchors(mut itinerary: Itinerary, start: &str, end: &str) -> Itinerary {
    let count = itinerary.stops.len();
    if count <= 2 {
        return itinerary;
    }

    itinerary.stops = itinerary
        .stops
        .into_iter()
        .enumerate()
        .filter(|(i, stop)| {
            *i == 0 || *i == count - 1 || !(stop.is_at(start) || stop.is_at(end))
        })
        .map(|(_, stop)| stop)
        .collect();

    itinerary
}

fn fill_to_batch(mut itineraries: Vec<Itinerary>, start: &str, end: &str) -> Vec<Itinerary> {
    itineraries.truncate(BATCH_SIZE);

    if itineraries.is_empty() {
        itineraries.push(Itinerary {
            option: 1,
            stops: vec![start_stop(start), end_stop(end)],
        });
    }

    let template = itineraries[itineraries.len() - 1].clone();

    while itineraries.len() < BATCH_SIZE {
        let mut clone = template.clone();
        clone.option = itineraries.len() as u32 + 1;
        mark_auto_filled(&mut clone, start, end);
        itineraries.push(clone);
    }

    itineraries
}

fn mark_auto_filled(itinerary: &mut Itinerary, start: &str, end: &str) {
    if itinerary.stops.len() > 2 {
        let stop = &mut itinerary.stops[1];
        stop.description = format!("{} {}", stop.description, AUTO_FILLED_MARKER)
            .trim()
            .to_string();
    } else {
        itinerary.stops.insert(1, filler_stop(start, end));
    }
}

fn finalize(index: usize, mut itinerary: Itinerary, start: &str, end: &str) -> Itinerary {
    itinerary.option = index as u32 + 1;

    if itinerary.stops.len() < MIN_STOPS {
        itinerary.stops.insert(1, filler_stop(start, end));
    }

    if itinerary.stops.len() > MAX_STOPS {
        let last = itinerary.stops.remove(itinerary.stops.len() - 1);
        itinerary.stops.truncate(MAX_STOPS - 1);
        itinerary.stops.push(last);
    }

    let last = itinerary.stops.len() - 1;
    itinerary.stops[0].place = start.to_string();
    itinerary.stops[last].place = end.to_string();

    itinerary
}

fn clock(hour: u32) -> String {
    NaiveTime::from_hms_opt(hour, 0, 0)
        .map(|time| time.format("%I:%M %p").to_string())
        .unwrap_or_default()
}

fn start_stop(start: &str) -> Stop {
    Stop::new(clock(9), start, "Starting point")
}

fn end_stop(end: &str) -> Stop {
    Stop::new(clock(17), end, "Destination")
}

fn filler_stop(start: &str, end: &str) -> Stop {
    Stop::new(
        clock(13),
        format!("Scenic stop between {} and {}", start, end),
        AUTO_FILLED_MARKER,
    )
}

#[cfg(test)]
fn assert_invariants(batch: &ItineraryBatch, start: &str, end: &str) {
    assert_eq!(batch.len(), BATCH_SIZE);

    for (index, itinerary) in batch.iter().enumerate() {
        assert_eq!(itinerary.option as usize, index + 1);

        let stops = &itinerary.stops;
        assert!((MIN_STOPS..=MAX_STOPS).contains(&stops.len()), "{:?}", stops);
        assert_eq!(stops[0].place, start);
        assert_eq!(stops[stops.len() - 1].place, end);

        for stop in &stops[1..stops.len() - 1] {
            assert!(!stop.is_at(start) && !stop.is_at(end), "{:?}", stop);
        }
    }
}

#[cfg(test)]
fn stop_json(place: &str) -> Value {
    serde_json::json!({ "time": "10:00 AM", "place": place, "description": "nice" })
}

#[test]
fn empty_input_yields_five_skeletons() {
    let batch = repair_batch(&[], "Auckland CBD", "Hamilton");

    assert_invariants(&batch, "Auckland CBD", "Hamilton");
    assert_eq!(batch[0].stops[0].time, "09:00 AM");
    assert_eq!(batch[0].stops[2].time, "05:00 PM");
    assert!(batch[3].stops[1].description.contains(AUTO_FILLED_MARKER));
}

#[test]
fn wrong_end_is_anchored_and_batch_is_cloned() {
    use serde_json::json;

    let raw = vec![json!({
        "option": 1,
        "stops": [stop_json("Auckland CBD"), stop_json("Rotorua")]
    })];

    let batch = repair_batch(&raw, "Auckland CBD", "Hamilton");

    assert_invariants(&batch, "Auckland CBD", "Hamilton");
    assert_eq!(batch[0].places(), vec!["Auckland CBD", "Rotorua", "Hamilton"]);
    assert_eq!(batch[0].stops[1].description, "nice");

    for clone in &batch[1..] {
        assert_eq!(clone.places(), batch[0].places());
        assert_eq!(clone.stops[1].description, "nice (auto-filled)");
    }
}

#[test]
fn garbage_elements_are_coerced() {
    use serde_json::json;

    let raw = vec![
        json!("not an itinerary"),
        json!({ "option": "7", "stops": "nope" }),
        json!({ "stops": [42, { "place": 3, "time": null }, stop_json("Waitomo Caves")] }),
        json!(null),
    ];

    let batch = repair_batch(&raw, "Auckland CBD", "Hamilton");

    assert_invariants(&batch, "Auckland CBD", "Hamilton");
    assert_eq!(
        batch[2].places(),
        vec!["Auckland CBD", "", "", "Waitomo Caves", "Hamilton"]
    );
}

#[test]
fn interior_anchor_repeats_are_removed() {
    use serde_json::json;

    let raw = vec![json!({
        "option": 1,
        "stops": [
            stop_json(" Auckland CBD "),
            stop_json("Hamilton"),
            stop_json("Auckland CBD"),
            stop_json("Hobbiton"),
            stop_json("Hamilton  "),
        ]
    })];

    let batch = repair_batch(&raw, "Auckland CBD", "Hamilton");

    assert_invariants(&batch, "Auckland CBD", "Hamilton");
    assert_eq!(batch[0].places(), vec!["Auckland CBD", "Hobbiton", "Hamilton"]);
}

#[test]
fn extra_itineraries_and_stops_are_trimmed() {
    use serde_json::json;

    let long: Vec<Value> = ["A", "B", "C", "D", "E", "F", "G"]
        .iter()
        .map(|place| stop_json(place))
        .collect();
    let raw: Vec<Value> = (0..7)
        .map(|i| json!({ "option": 7 - i, "stops": long.clone() }))
        .collect();

    let batch = repair_batch(&raw, "Start", "End");

    assert_invariants(&batch, "Start", "End");
    assert_eq!(batch[0].places(), vec!["Start", "A", "B", "C", "D", "End"]);
}

#[test]
fn identical_anchors_still_produce_valid_loops() {
    use serde_json::json;

    let raw = vec![json!({ "stops": [stop_json("Home")] })];
    let batch = repair_batch(&raw, "Home", "Home");

    assert_invariants(&batch, "Home", "Home");
}

#[test]
fn repair_is_idempotent() {
    use serde_json::json;

    let raw = vec![
        json!({ "option": 2, "stops": [stop_json("Rotorua")] }),
        json!({
            "option": 1,
            "stops": [stop_json("Auckland CBD"), stop_json("Huntly"), stop_json("Hamilton")]
        }),
    ];

    let once = repair_batch(&raw, "Auckland CBD", "Hamilton");
    let raw_again: Vec<Value> = once
        .iter()
        .map(|itinerary| serde_json::to_value(itinerary).unwrap())
        .collect();
    let twice = repair_batch(&raw_again, "Auckland CBD", "Hamilton");

    assert!(is_valid_batch(&raw_again, "Auckland CBD", "Hamilton"));
    assert_eq!(once, twice);
}

#[test]
fn validation_rejects_near_misses() {
    use serde_json::json;

    let good = |option: u32| {
        json!({
            "option": option,
            "stops": [stop_json("Auckland CBD"), stop_json("Huntly"), stop_json("Hamilton")]
        })
    };

    let valid: Vec<Value> = (1..=5).map(good).collect();
    assert!(is_valid_batch(&valid, "Auckland CBD", "Hamilton"));

    let four: Vec<Value> = (1..=4).map(good).collect();
    assert!(!is_valid_batch(&four, "Auckland CBD", "Hamilton"));

    let duplicate_option: Vec<Value> = [1, 2, 3, 4, 4].into_iter().map(good).collect();
    assert!(!is_valid_batch(&duplicate_option, "Auckland CBD", "Hamilton"));

    let mut wrong_end = valid.clone();
    wrong_end[2]["stops"][2]["place"] = json!("Rotorua");
    assert!(!is_valid_batch(&wrong_end, "Auckland CBD", "Hamilton"));

    let mut missing_field = valid.clone();
    missing_field[4]["stops"][1]
        .as_object_mut()
        .unwrap()
        .remove("time");
    assert!(!is_valid_batch(&missing_field, "Auckland CBD", "Hamilton"));
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const START: &str = "Auckland CBD";
    const END: &str = "Hamilton";

    fn arb_place() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(START.to_string()),
            Just(format!(" {} ", END)),
            Just("Huntly".to_string()),
            "[A-Za-z ]{0,10}",
        ]
    }

    fn arb_stop() -> impl Strategy<Value = Value> {
        prop_oneof![
            4 => (arb_place(), "[0-9: APM]{0,8}").prop_map(|(place, time)| {
                json!({ "time": time, "place": place, "description": "stop" })
            }),
            1 => arb_place().prop_map(|place| json!({ "place": place })),
            1 => any::<i64>().prop_map(|n| json!(n)),
            1 => Just(Value::Null),
        ]
    }

    fn arb_option() -> impl Strategy<Value = Value> {
        prop_oneof![
            (0u32..9).prop_map(|n| json!(n)),
            (0u32..9).prop_map(|n| json!(n.to_string())),
            Just(json!(2.5)),
            Just(Value::Null),
        ]
    }

    fn arb_itinerary() -> impl Strategy<Value = Value> {
        prop_oneof![
            4 => (arb_option(), prop::collection::vec(arb_stop(), 0..9))
                .prop_map(|(option, stops)| json!({ "option": option, "stops": stops })),
            1 => Just(json!({})),
            1 => Just(json!("itinerary")),
        ]
    }

    proptest! {
        #[test]
        fn any_reply_repairs_into_a_stable_valid_batch(
            raw in prop::collection::vec(arb_itinerary(), 0..8)
        ) {
            let batch = repair_batch(&raw, START, END);
            assert_invariants(&batch, START, END);

            let again: Vec<Value> = batch
                .iter()
                .map(|itinerary| serde_json::to_value(itinerary).unwrap())
                .collect();

            prop_assert!(is_valid_batch(&again, START, END));
            prop_assert_eq!(repair_batch(&again, START, END), batch);
        }
    }
}
