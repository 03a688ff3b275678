use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{batch_row, display_value, BATCH_COLUMNS, SCHEDULE_COLUMNS};

/// Format output as tables: scalars first, then one table per nested
/// section (metrics, costs) and a row table for the schedule.
pub fn print_table(value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", value);
        return;
    };

    if let Some(Value::Array(results)) = map.get("results") {
        print_batch(map, results);
        return;
    }

    match map.get("result") {
        Some(Value::Object(result)) => print_result(result),
        _ => print_fields(map),
    }
    print_notes(map);
}

fn print_result(result: &Map<String, Value>) {
    let scalars: Map<String, Value> = result
        .iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !scalars.is_empty() {
        print_fields(&scalars);
    }

    for (key, val) in result {
        match val {
            Value::Object(section) => {
                println!("\n{}:", key);
                print_fields(section);
            }
            Value::Array(rows) if key == "schedule" => {
                println!("\nSchedule:");
                print_rows(SCHEDULE_COLUMNS, rows.iter().map(|row| schedule_row(row)));
            }
            _ => {}
        }
    }
}

fn print_batch(envelope: &Map<String, Value>, results: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(["succeeded", "failed"]);
    builder.push_record([
        envelope.get("succeeded").map(display_value).unwrap_or_default(),
        envelope.get("failed").map(display_value).unwrap_or_default(),
    ]);
    println!("{}", Table::from(builder));

    println!();
    print_rows(BATCH_COLUMNS, results.iter().map(batch_row));
}

fn schedule_row(row: &Value) -> Vec<Value> {
    SCHEDULE_COLUMNS
        .iter()
        .map(|col| row.get(*col).cloned().unwrap_or(Value::Null))
        .collect()
}

fn print_rows(headers: &[&str], rows: impl Iterator<Item = Vec<Value>>) {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());
    let mut empty = true;
    for row in rows {
        empty = false;
        builder.push_record(row.iter().map(display_value));
    }
    if empty {
        println!("(empty)");
        return;
    }
    println!("{}", Table::from(builder));
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &display_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
