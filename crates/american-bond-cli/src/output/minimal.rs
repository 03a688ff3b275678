use serde_json::Value;

use super::display_value;

/// Headline figures, most specific first.
const PRIORITY_KEYS: &[&str] = &["investor_trea", "issuer_tcea", "current_price", "period_rate"];

/// Print just the key answer from the output.
///
/// Looks through the result and its `metrics` section for a headline
/// figure. Batch output prints `succeeded/total`.
pub fn print_minimal(value: &Value) {
    if let (Some(ok), Some(failed)) = (
        value.get("succeeded").and_then(Value::as_u64),
        value.get("failed").and_then(Value::as_u64),
    ) {
        println!("{}/{}", ok, ok + failed);
        return;
    }

    let result = value.get("result").unwrap_or(value);
    let sections = [result.get("metrics"), Some(result)];

    for key in PRIORITY_KEYS {
        let hit = sections
            .iter()
            .flatten()
            .filter_map(|s| s.get(*key))
            .find(|v| !v.is_null());
        if let Some(val) = hit {
            println!("{}", display_value(val));
            return;
        }
    }

    match result {
        Value::Object(map) => match map.iter().next() {
            Some((key, val)) => println!("{}: {}", key, display_value(val)),
            None => println!("{{}}"),
        },
        other => println!("{}", display_value(other)),
    }
}
