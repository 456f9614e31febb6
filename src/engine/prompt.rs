use crate::entities::{BATCH_SIZE, MAX_STOPS, MIN_STOPS};

pub fn itinerary_prompt(start: &str, end: &str, preference: Option<&str>) -> String {
    let interests = match preference {
        Some(preference) => format!(" The traveller enjoys {}.", preference),
        None => String::new(),
    };

    format!(
        r#"Plan {count} different driving itineraries from "{start}" to "{end}".{interests}

Hard requirements:
- The first stop of every itinerary must be exactly "{start}".
- The last stop of every itinerary must be exactly "{end}".
- Each itinerary has between {min} and {max} stops, including the first and last.
- No stop other than the first and last may be "{start}" or "{end}".
- Only use real places that can be reached by car; avoid islands and ferry-only places.
- Keep every description under 20 words.

Return only JSON in this shape:
{{"itineraries": [
  {{"option": 1, "stops": [{{"time": "09:00 AM", "place": "{start}", "description": "..."}}, ...]}},
  ...
  {{"option": {count}, "stops": [...]}}
]}}"#,
        count = BATCH_SIZE,
        start = start,
        end = end,
        interests = interests,
        min = MIN_STOPS,
        max = MAX_STOPS,
    )
}

#[test]
fn prompt_states_the_anchors() {
    let prompt = itinerary_prompt("Auckland CBD", "Hamilton", Some("hot pools"));

    assert!(prompt.contains(r#"first stop of every itinerary must be exactly "Auckland CBD""#));
    assert!(prompt.contains(r#"last stop of every itinerary must be exactly "Hamilton""#));
    assert!(prompt.contains("between 3 and 6 stops"));
    assert!(prompt.contains("enjoys hot pools"));
    assert!(prompt.contains("JSON"));
}

#[test]
fn prompt_without_preference_stays_neutral() {
    let prompt = itinerary_prompt("Auckland CBD", "Hamilton", None);

    assert!(!prompt.contains("enjoys"));
}
