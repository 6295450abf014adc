pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use rust_decimal::Decimal;
use serde_json::Value;
use std::io::{self, Write};
use std::str::FromStr;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value, decimals: Option<u32>) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value, decimals),
        OutputFormat::Csv => csv_out::print_csv(value, decimals),
        OutputFormat::Minimal => minimal::print_minimal(value, decimals),
    }
}

/// Pretty-print JSON to stdout at full precision.
fn print_json(value: &Value) {
    let mut out = io::stdout().lock();
    let written = serde_json::to_writer_pretty(&mut out, value)
        .map_err(io::Error::from)
        .and_then(|_| writeln!(out));
    if let Err(e) = written {
        eprintln!("JSON serialization error: {}", e);
    }
}

/// Render a scalar, rounding decimal numbers (which serialise as strings)
/// when `decimals` is set.
pub fn format_scalar(value: &Value, decimals: Option<u32>) -> String {
    match value {
        Value::String(s) => round_text(s, decimals),
        Value::Number(n) => round_text(&n.to_string(), decimals),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn round_text(text: &str, decimals: Option<u32>) -> String {
    match decimals {
        Some(dp) => match Decimal::from_str(text) {
            Ok(d) => d.round_dp(dp).to_string(),
            Err(_) => text.to_string(),
        },
        None => text.to_string(),
    }
}

/// A serialised attribution table, flattened for display.
pub struct TableView {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Recognise an attribution table by its `key_label`, `effect_names` and
/// `rows` fields.
pub fn table_view(name: &str, value: &Value, decimals: Option<u32>) -> Option<TableView> {
    let map = value.as_object()?;
    let key_label = map.get("key_label")?.as_str()?;
    let effect_names = map.get("effect_names")?.as_array()?;
    let rows = map.get("rows")?.as_array()?;

    let mut headers = vec![key_label.to_string()];
    headers.extend(effect_names.iter().map(|n| format_scalar(n, None)));
    headers.push("Total effect".to_string());

    let rows = rows
        .iter()
        .filter_map(|row| {
            let key = row.get("key")?;
            let effects = row.get("effects")?.as_array()?;
            let mut cells = vec![format_scalar(key, None)];
            cells.extend(effects.iter().map(|e| format_scalar(e, decimals)));
            cells.push(format_scalar(row.get("total_effect")?, decimals));
            Some(cells)
        })
        .collect();

    let period = match (map.get("start_date"), map.get("end_date"), map.get("date")) {
        (Some(start), Some(end), _) => format!(
            "{} to {}",
            format_scalar(start, None),
            format_scalar(end, None)
        ),
        (_, _, Some(date)) => format_scalar(date, None),
        _ => String::new(),
    };

    Some(TableView {
        title: format!("{} ({})", name, period),
        headers,
        rows,
    })
}

/// All attribution tables inside a result object: linked tables first,
/// then per-period tables, then the drill-down.
pub fn collect_tables(result: &Value, decimals: Option<u32>) -> Vec<TableView> {
    let mut views = Vec::new();
    collect_into("", result, decimals, &mut views);
    views
}

fn collect_into(prefix: &str, value: &Value, decimals: Option<u32>, views: &mut Vec<TableView>) {
    let Some(map) = value.as_object() else {
        return;
    };
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by_key(|(k, _)| match k.as_str() {
        "linked" => 0,
        "periods" => 1,
        "drill_down" => 2,
        _ => 3,
    });
    for (key, val) in entries {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{} {}", prefix, key)
        };
        if let Some(view) = table_view(&name, val, decimals) {
            views.push(view);
        } else if let Value::Array(items) = val {
            views.extend(items.iter().filter_map(|item| table_view(&name, item, decimals)));
        } else if val.is_object() {
            collect_into(&name, val, decimals, views);
        }
    }
}
