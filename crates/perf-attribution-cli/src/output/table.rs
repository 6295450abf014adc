use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{collect_tables, format_scalar, TableView};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value, decimals: Option<u32>) {
    match value {
        Value::Object(map) => {
            // Check if "result" key holds the primary data
            if let Some(result) = map.get("result") {
                print_result_table(result, map, decimals);
            } else {
                print_flat_object(value, decimals);
            }
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(
    result: &Value,
    envelope: &serde_json::Map<String, Value>,
    decimals: Option<u32>,
) {
    let views = collect_tables(result, decimals);
    if let Value::Object(res_map) = result {
        // Scalar fields first, then each attribution table under its title
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if !val.is_object() && !is_table_list(val) {
                builder.push_record([key.as_str(), &format_value(val, decimals)]);
            }
        }
        println!("{}", Table::from(builder));
    }

    for view in &views {
        print_view(view);
    }

    // Print warnings if any
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    // Print methodology
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_view(view: &TableView) {
    let mut builder = Builder::default();
    builder.push_record(view.headers.iter().cloned());
    for row in &view.rows {
        builder.push_record(row.iter().cloned());
    }
    println!("\n{}", view.title);
    println!("{}", Table::from(builder));
}

fn is_table_list(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.iter().any(Value::is_object))
}

fn print_flat_object(value: &Value, decimals: Option<u32>) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val, decimals)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn format_value(value: &Value, decimals: Option<u32>) -> String {
    match value {
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(|v| format_value(v, decimals)).collect();
            items.join(", ")
        }
        _ => format_scalar(value, decimals),
    }
}
