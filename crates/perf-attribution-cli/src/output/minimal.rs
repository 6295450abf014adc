use serde_json::Value;

use super::format_scalar;

/// Print just the key answer from the output.
///
/// For an attribution this is the linked Total effect; otherwise the first
/// field of the result object.
pub fn print_minimal(value: &Value, decimals: Option<u32>) {
    // Try to extract the "result" envelope
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(total) = linked_total(result_obj) {
        println!("{}", format_scalar(total, decimals));
        return;
    }

    if let Value::Object(map) = result_obj {
        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val, decimals));
            return;
        }
    }

    // Not an object, just print directly
    println!("{}", format_minimal(result_obj, decimals));
}

fn linked_total(result: &Value) -> Option<&Value> {
    result
        .get("linked")?
        .get("rows")?
        .as_array()?
        .iter()
        .rev()
        .find(|row| row.get("key").and_then(Value::as_str) == Some("Total"))?
        .get("total_effect")
}

fn format_minimal(value: &Value, decimals: Option<u32>) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| format_scalar(v, decimals))
            .collect::<Vec<_>>()
            .join(", "),
        _ => format_scalar(value, decimals),
    }
}
