use serde_json::Value;
use std::io;

use super::{collect_tables, format_scalar};

/// Write output as CSV to stdout.
///
/// Attribution results become one row per table row, tagged with the table
/// title; anything else is written as field/value pairs.
pub fn print_csv(value: &Value, decimals: Option<u32>) {
    let stdout = io::stdout();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let views = map
                .get("result")
                .map(|r| collect_tables(r, decimals))
                .unwrap_or_default();
            if let Some(first) = views.first() {
                let mut header = vec!["Table".to_string(), "Key".to_string()];
                header.extend(first.headers.iter().skip(1).cloned());
                let _ = wtr.write_record(&header);
                for view in &views {
                    for row in &view.rows {
                        let mut record = vec![view.title.clone()];
                        record.extend(row.iter().cloned());
                        let _ = wtr.write_record(&record);
                    }
                }
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val, decimals)]);
                }
            }
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value, decimals)]);
        }
    }

    let _ = wtr.flush();
}

fn format_csv_value(value: &Value, decimals: Option<u32>) -> String {
    match value {
        Value::Array(arr) => arr
            .iter()
            .map(|v| format_scalar(v, decimals))
            .collect::<Vec<_>>()
            .join(";"),
        _ => format_scalar(value, decimals),
    }
}
