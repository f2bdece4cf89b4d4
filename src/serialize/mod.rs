//! Forest → canonical strategy document. The document is a
//! `serde_json::Value` (maps keep insertion order, which the YAML renderer
//! relies on); the two textual renderings live in the `yaml` and `python`
//! submodules.

pub mod python;
pub mod yaml;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

use crate::alias;
use crate::tree::{ConfigValue, Node};

pub const DEFAULT_NAME: &str = "Nouvelle stratégie";
pub const EDITOR_TAG: &str = "web-dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Yaml,
    Python,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Python => "python",
        }
    }
}

/// Build the canonical strategy document:
/// `{ name, rules: [{ when, signal }], metadata: { editor } }`.
pub fn build_document(name: &str, conditions: &[Node], actions: &[Node]) -> Value {
    let trimmed = name.trim();
    let name = if trimmed.is_empty() { DEFAULT_NAME } else { trimmed };
    json!({
        "name": name,
        "rules": [{
            "when": conditions_schema(conditions),
            "signal": signal_schema(actions),
        }],
        "metadata": { "editor": EDITOR_TAG },
    })
}

pub fn to_yaml(doc: &Value) -> String {
    yaml::render(doc)
}

pub fn to_python(doc: &Value) -> String {
    python::render(doc)
}

// ---------------------------------------------------------------------------
// Condition schema
// ---------------------------------------------------------------------------

fn conditions_schema(conditions: &[Node]) -> Value {
    let mut schemas: Vec<Value> = conditions.iter().filter_map(condition_schema).collect();
    match schemas.len() {
        0 => json!({}),
        1 => schemas.remove(0),
        _ => json!({ "all": schemas }),
    }
}

/// Schema for one condition node. `None` drops the node from its parent
/// (under-specified crosses, unknown types); the validator has already
/// flagged those.
fn condition_schema(node: &Node) -> Option<Value> {
    match node.block.as_str() {
        "condition" => {
            // Indicator child substitutes its alias for the field.
            let field = node
                .children
                .iter()
                .find_map(alias::print)
                .unwrap_or_else(|| node.text("field").unwrap_or("").to_string());
            Some(json!({
                "field": field,
                "operator": node.text("operator").unwrap_or(""),
                "value": coerce(node.config.get("value")),
            }))
        }
        "indicator" | "indicator_macd" | "indicator_bollinger" | "indicator_atr" => {
            // Indicator at condition position: existence check.
            alias::print(node).map(|a| {
                json!({ "field": a, "operator": "exists", "value": true })
            })
        }
        "logic" => {
            let key = if node.text("mode") == Some("any") { "any" } else { "all" };
            let children: Vec<Value> =
                node.children.iter().filter_map(condition_schema).collect();
            let mut map = Map::new();
            map.insert(key.to_string(), Value::Array(children));
            Some(Value::Object(map))
        }
        "group" => {
            let children: Vec<Value> =
                node.children.iter().filter_map(condition_schema).collect();
            Some(json!({ "all": children }))
        }
        "negation" => {
            let inner = node.children.iter().find_map(condition_schema)?;
            Some(json!({ "not": inner }))
        }
        "market_cross" => {
            let aliases: Vec<String> = node.children.iter().filter_map(alias::print).collect();
            if aliases.len() < 2 {
                return None;
            }
            Some(json!({
                "cross": {
                    "left": aliases[0],
                    "right": aliases[1],
                    "direction": node.text("direction").unwrap_or("above"),
                    "lookback": coerce(node.config.get("lookback")),
                }
            }))
        }
        "market_volume" => {
            let mut map = Map::new();
            map.insert("field".into(), json!("volume"));
            map.insert(
                "operator".into(),
                json!(node.text("operator").unwrap_or("")),
            );
            map.insert("value".into(), coerce(node.config.get("value")));
            if let Some(tf) = node.text("timeframe").map(str::trim).filter(|s| !s.is_empty()) {
                map.insert("timeframe".into(), json!(tf));
            }
            Some(Value::Object(map))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Signal schema
// ---------------------------------------------------------------------------

fn signal_schema(actions: &[Node]) -> Value {
    let steps: Vec<Value> = actions.iter().filter_map(step_schema).collect();

    let mut signal = Map::new();
    match steps.iter().find(|s| s["type"] == "order") {
        Some(order) => {
            signal.insert("action".into(), order["action"].clone());
            if !order["size"].is_null() {
                signal.insert("size".into(), order["size"].clone());
            }
        }
        None => {
            signal.insert("action".into(), json!("noop"));
        }
    }
    signal.insert("steps".into(), Value::Array(steps));
    Value::Object(signal)
}

fn step_schema(node: &Node) -> Option<Value> {
    match node.block.as_str() {
        "action" => Some(json!({
            "type": "order",
            "action": node.text("action").unwrap_or(""),
            "size": coerce(node.config.get("size")),
        })),
        "delay" => Some(json!({
            "type": "delay",
            "seconds": coerce(node.config.get("seconds")),
        })),
        "take_profit" => {
            let size = node.text("size").unwrap_or("full");
            let mut step = json!({
                "type": "take_profit",
                "mode": node.text("mode").unwrap_or("percent"),
                "value": coerce(node.config.get("value")),
                "size": size,
            });
            if size == "custom" {
                if let Some(map) = step.as_object_mut() {
                    map.insert("customSize".into(), coerce(node.config.get("customSize")));
                }
            }
            Some(step)
        }
        "stop_loss" => Some(json!({
            "type": "stop_loss",
            "mode": node.text("mode").unwrap_or("percent"),
            "value": coerce(node.config.get("value")),
            "trailing": node.flag("trailing").unwrap_or(false),
        })),
        "close_position" => Some(json!({
            "type": "close_position",
            "side": node.text("side").unwrap_or("all"),
        })),
        "alert" => Some(json!({
            "type": "alert",
            "channel": node.text("channel").unwrap_or(""),
            "message": node.text("message").unwrap_or(""),
        })),
        _ => None,
    }
}

/// Numeric coercion at the serialization boundary: numeric strings become
/// numbers, blanks become null, everything else passes through.
fn coerce(value: Option<&ConfigValue>) -> Value {
    match value {
        None => Value::Null,
        Some(ConfigValue::Flag(b)) => Value::Bool(*b),
        Some(ConfigValue::Text(s)) => {
            let t = s.trim();
            if t.is_empty() {
                return Value::Null;
            }
            if let Ok(i) = t.parse::<i64>() {
                return Value::Number(i.into());
            }
            if let Ok(f) = t.parse::<f64>() {
                if let Some(n) = Number::from_f64(f) {
                    return Value::Number(n);
                }
            }
            Value::String(s.clone())
        }
    }
}
