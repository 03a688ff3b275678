use serde_json::{Map, Value};
use std::io;

use super::{batch_row, format_value, BATCH_COLUMNS, SCHEDULE_COLUMNS};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// A schedule is exported one row per period; a batch one row per bond.
/// Anything else falls back to two-column `field,value` records.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let outcome = match value {
        Value::Object(map) => write_object(&mut wtr, map),
        other => wtr.write_record([format_value(other)]),
    };
    if let Err(e) = outcome.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV write error: {}", e);
    }
}

fn write_object(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) -> csv::Result<()> {
    if let Some(Value::Array(results)) = map.get("results") {
        wtr.write_record(BATCH_COLUMNS)?;
        for item in results {
            wtr.write_record(batch_row(item).iter().map(format_value))?;
        }
        return Ok(());
    }

    let result = match map.get("result") {
        Some(Value::Object(result)) => result,
        _ => return write_fields(wtr, map, ""),
    };

    if let Some(Value::Array(rows)) = result.get("schedule") {
        wtr.write_record(SCHEDULE_COLUMNS)?;
        for row in rows {
            wtr.write_record(
                SCHEDULE_COLUMNS
                    .iter()
                    .map(|col| row.get(*col).map(format_value).unwrap_or_default()),
            )?;
        }
        return Ok(());
    }

    write_fields(wtr, result, "")
}

/// Nested sections are flattened with dotted keys (`metrics.convexity`).
fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>, prefix: &str) -> csv::Result<()> {
    if prefix.is_empty() {
        wtr.write_record(["field", "value"])?;
    }
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(section) => write_fields(wtr, section, &name)?,
            other => wtr.write_record([name.as_str(), &format_value(other)])?,
        }
    }
    Ok(())
}
