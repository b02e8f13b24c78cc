/// Reading Monday webhook bodies
///
/// Monday sends several event shapes; the item id is looked up under the known envelopes
/// first, then anywhere in the body.

use serde_json::Value;

const ENVELOPES: [&str; 3] = ["event", "payload", "data"];
const ID_KEYS: [&str; 2] = ["itemId", "item_id"];

/// The subscription handshake token, when present
pub fn challenge(body: &Value) -> Option<&Value> {
    body.as_object()?.get("challenge")
}

/// Positive integer from a JSON number or an integer string
fn as_item_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn walk<'a>(value: &'a Value, found: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let key = key.to_lowercase();
                if key == "itemid" || key == "item_id" {
                    found.push(v);
                }
                walk(v, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| walk(v, found)),
        _ => {}
    }
}

/// Item id the webhook refers to
///
/// The first usable candidate wins; a zero id means the event has no item.
pub fn find_item_id(body: &Value) -> Option<u64> {
    let known = ENVELOPES.into_iter().flat_map(move |env| {
        ID_KEYS
            .into_iter()
            .filter_map(move |key| body.get(env)?.as_object()?.get(key))
    });

    let mut found = Vec::new();
    walk(body, &mut found);

    known
        .chain(found)
        .find_map(as_item_id)
        .filter(|id| *id != 0)
}
