use serde_json::Value;

// Truncated output yields the first complete inner value, if any.
pub fn extract_json(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|&(_, c)| c == '[' || c == '{')
        .find_map(|(start, _)| {
            let len = balanced_len(&text[start..])?;
            serde_json::from_str(&text[start..start + len]).ok()
        })
}

fn balanced_len(text: &str) -> Option<usize> {
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => open.push(c),
            ']' | '}' => {
                let expected = match open.pop()? {
                    '[' => ']',
                    _ => '}',
                };
                if c != expected {
                    return None;
                }
                if open.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

// The first array field in document order wins.
pub fn itinerary_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) if map.contains_key("stops") => Some(vec![Value::Object(map)]),
        Value::Object(map) => {
            let mut nested = vec![];

            for (_, field) in map {
                match field {
                    Value::Array(items) => return Some(items),
                    Value::Object(_) => nested.push(field),
                    _ => {}
                }
            }

            nested.into_iter().find_map(itinerary_array)
        }
        _ => None,
    }
}

#[test]
fn finds_json_embedded_in_prose() {
    let text = r#"Sure! Here are your trips [see below]:
```json
[{"option": 1, "stops": [{"time": "9:00", "place": "A [north]", "description": "x"}]}]
```
Enjoy your journey."#;

    let value = extract_json(text).unwrap();
    assert_eq!(value[0]["option"], 1);
    assert_eq!(value[0]["stops"][0]["place"], "A [north]");
}

#[test]
fn truncated_json_falls_back_to_first_complete_value() {
    let text = r#"[{"option": 1, "stops": []}, {"option": 2, "stops": [{"place": "Rot"#;

    let value = extract_json(text).unwrap();
    assert_eq!(value, serde_json::json!({ "option": 1, "stops": [] }));
}

#[test]
fn truncated_json_without_a_complete_value_yields_nothing() {
    assert_eq!(extract_json(r#"[{"option": 1, "stops": [{"place": "Rot"#), None);
}

#[test]
fn no_json_present() {
    assert_eq!(extract_json("I'm sorry, I can't help with that."), None);
    assert_eq!(extract_json(""), None);
    assert_eq!(extract_json("brackets [that are not json]"), None);
}

#[test]
fn braces_inside_strings_are_ignored() {
    let value = extract_json(r#"note: {"place": "Café } \" {", "n": 1} trailing }"#).unwrap();
    assert_eq!(value["place"], "Café } \" {");
    assert_eq!(value["n"], 1);
}

#[test]
fn itinerary_array_accepts_common_shapes() {
    use serde_json::json;

    let top_level = json!([{ "option": 1 }]);
    assert_eq!(itinerary_array(top_level).unwrap().len(), 1);

    let keyed = json!({ "note": "five options", "itineraries": [{}, {}] });
    assert_eq!(itinerary_array(keyed).unwrap().len(), 2);

    let nested = json!({ "result": { "options": [{}, {}, {}] } });
    assert_eq!(itinerary_array(nested).unwrap().len(), 3);

    let single = json!({ "option": 1, "stops": [] });
    assert_eq!(itinerary_array(single).unwrap().len(), 1);

    assert_eq!(itinerary_array(json!({ "message": "no" })), None);
    assert_eq!(itinerary_array(json!("text")), None);
}
