//! Deterministic YAML rendering of a strategy document. Two-space
//! indentation, scalars on the key line, nested collections on a new
//! indented line, map entries in insertion order.

use serde_json::{Map, Value};

pub fn render(doc: &Value) -> String {
    let mut out = String::new();
    match doc {
        Value::Object(map) if !map.is_empty() => write_object(&mut out, map, 0),
        Value::Array(items) if !items.is_empty() => write_array(&mut out, items, 0),
        other => {
            out.push_str(&inline(other));
            out.push('\n');
        }
    }
    out
}

fn write_object(out: &mut String, map: &Map<String, Value>, indent: usize) {
    for (key, value) in map {
        push_indent(out, indent);
        write_entry(out, key, value, indent);
    }
}

/// One `key: value` entry; the leading indent is already written.
fn write_entry(out: &mut String, key: &str, value: &Value, indent: usize) {
    out.push_str(&quote(key));
    out.push(':');
    if is_inline(value) {
        out.push(' ');
        out.push_str(&inline(value));
        out.push('\n');
        return;
    }
    out.push('\n');
    match value {
        Value::Object(map) => write_object(out, map, indent + 1),
        Value::Array(items) => write_array(out, items, indent + 1),
        other => {
            push_indent(out, indent + 1);
            out.push_str(&inline(other));
            out.push('\n');
        }
    }
}

fn write_array(out: &mut String, items: &[Value], indent: usize) {
    for item in items {
        match item {
            Value::Object(map) if !map.is_empty() => {
                // First entry shares the dash line, the rest align under it.
                for (i, (key, value)) in map.iter().enumerate() {
                    if i == 0 {
                        push_indent(out, indent);
                        out.push_str("- ");
                    } else {
                        push_indent(out, indent + 1);
                    }
                    write_entry(out, key, value, indent + 1);
                }
            }
            Value::Array(inner) if !inner.is_empty() => {
                push_indent(out, indent);
                out.push_str("-\n");
                write_array(out, inner, indent + 1);
            }
            other => {
                push_indent(out, indent);
                out.push_str("- ");
                out.push_str(&inline(other));
                out.push('\n');
            }
        }
    }
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn is_inline(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => true,
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
    }
}

/// Single-quote a scalar when leaving it plain would change its meaning:
/// structural characters (`:`, `#`, `-`, newline), surrounding whitespace,
/// and anything a YAML loader would re-read as a non-string scalar.
fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s.contains(':') || s.contains('#') || s.contains('-') || s.contains('\n') {
        return true;
    }
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        return true;
    }
    if s.eq_ignore_ascii_case("true")
        || s.eq_ignore_ascii_case("false")
        || s.eq_ignore_ascii_case("null")
        || s == "~"
    {
        return true;
    }
    s.parse::<f64>().is_ok()
}

fn quote(s: &str) -> String {
    if needs_quoting(s) {
        format!("'{}'", s.replace('\'', "''"))
    } else {
        s.to_string()
    }
}
