//! Deserialization: YAML or Python-literal text → canonical document →
//! best-effort forests. Recoverable problems become error entries; the
//! importer never aborts on a single bad node.

use serde_json::{Map, Value};

use crate::alias;
use crate::serialize::{ExportFormat, DEFAULT_NAME};
use crate::tree::{self, IdGen, Node};

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub name: String,
    pub metadata: Value,
    pub conditions: Vec<Node>,
    pub actions: Vec<Node>,
    pub format: ExportFormat,
    pub errors: Vec<String>,
}

/// Parse and hydrate a strategy text. Fresh identifiers come from `ids`,
/// so imported trees never collide with an existing forest.
pub fn import(text: &str, format: ExportFormat, ids: &mut dyn IdGen) -> ImportResult {
    let mut result = ImportResult {
        name: DEFAULT_NAME.to_string(),
        metadata: Value::Object(Map::new()),
        conditions: Vec::new(),
        actions: Vec::new(),
        format,
        errors: Vec::new(),
    };
    let doc = match parse_document(text, format) {
        Ok(doc) => doc,
        Err(message) => {
            tracing::warn!(format = format.as_str(), "strategy_import_parse_failed");
            result.errors.push(message);
            return result;
        }
    };
    hydrate(&doc, ids, &mut result);
    result
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub fn parse_document(text: &str, format: ExportFormat) -> Result<Value, String> {
    match format {
        ExportFormat::Yaml => parse_yaml(text),
        ExportFormat::Python => {
            let dict = extract_python_dict(text)?;
            parse_yaml(&substitute_python_keywords(dict))
        }
    }
}

fn parse_yaml(text: &str) -> Result<Value, String> {
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| format!("YAML invalide : {e}"))?;
    serde_json::to_value(parsed).map_err(|e| format!("YAML invalide : {e}"))
}

/// Locate the first balanced `{…}` block, skipping quoted spans.
fn extract_python_dict(text: &str) -> Result<&str, String> {
    let start = text
        .find('{')
        .ok_or_else(|| "Aucun dictionnaire trouvé dans le fichier Python.".to_string())?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                in_string = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => in_string = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    Err("Parenthèses non équilibrées dans le fichier Python.".to_string())
}

/// `True`/`False`/`None` → `true`/`false`/`null` outside string spans.
/// The result is fed to the YAML parser (single-quoted Python strings are
/// valid YAML flow scalars).
fn substitute_python_keywords(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut in_string: Option<u8> = None;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(quote) = in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                in_string = None;
            }
            i += 1;
        } else if b == b'"' || b == b'\'' {
            in_string = Some(b);
            out.push(b);
            i += 1;
        } else if bytes[i..].starts_with(b"True") {
            out.extend_from_slice(b"true");
            i += 4;
        } else if bytes[i..].starts_with(b"False") {
            out.extend_from_slice(b"false");
            i += 5;
        } else if bytes[i..].starts_with(b"None") {
            out.extend_from_slice(b"null");
            i += 4;
        } else {
            out.push(b);
            i += 1;
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| src.to_string())
}

// ---------------------------------------------------------------------------
// Hydration
// ---------------------------------------------------------------------------

fn hydrate(doc: &Value, ids: &mut dyn IdGen, out: &mut ImportResult) {
    let Some(obj) = doc.as_object() else {
        out.errors
            .push("Le document de stratégie doit être un objet JSON/YAML valide.".to_string());
        return;
    };
    if let Some(name) = obj.get("name").and_then(Value::as_str) {
        if !name.trim().is_empty() {
            out.name = name.trim().to_string();
        }
    }
    if let Some(meta) = obj.get("metadata") {
        out.metadata = meta.clone();
    }

    let rules = obj.get("rules").and_then(Value::as_array);
    let Some(rules) = rules.filter(|r| !r.is_empty()) else {
        out.errors.push("La stratégie ne contient aucune règle.".to_string());
        return;
    };
    let rule = &rules[0];

    match rule.get("when") {
        None | Some(Value::Null) => {}
        Some(when) if when.as_object().is_some_and(Map::is_empty) => {}
        Some(when) => {
            if let Some(root) = hydrate_condition(when, ids, &mut out.errors) {
                out.conditions.push(root);
            }
        }
    }
    out.actions = hydrate_signal(rule.get("signal"), ids, &mut out.errors);
}

/// Shape dispatch: array, any/all, not, cross, exists, volume, generic
/// comparison, in that order. Unrecognized shapes record an error and
/// hydration continues with the rest of the document.
fn hydrate_condition(value: &Value, ids: &mut dyn IdGen, errors: &mut Vec<String>) -> Option<Node> {
    if let Some(items) = value.as_array() {
        let mut node = tree::create("logic", ids);
        node.set("mode", "all");
        node.children = items
            .iter()
            .filter_map(|v| hydrate_condition(v, ids, errors))
            .collect();
        return Some(node);
    }
    let Some(obj) = value.as_object() else {
        errors.push("Bloc de condition non reconnu.".to_string());
        return None;
    };

    for mode in ["any", "all"] {
        if let Some(items) = obj.get(mode).and_then(Value::as_array) {
            let mut node = tree::create("logic", ids);
            node.set("mode", mode);
            node.children = items
                .iter()
                .filter_map(|v| hydrate_condition(v, ids, errors))
                .collect();
            return Some(node);
        }
    }

    if let Some(inner) = obj.get("not") {
        let mut node = tree::create("negation", ids);
        if let Some(child) = hydrate_condition(inner, ids, errors) {
            node.children.push(child);
        }
        return Some(node);
    }

    if let Some(cross) = obj.get("cross").and_then(Value::as_object) {
        let mut node = tree::create("market_cross", ids);
        if let Some(d) = cross.get("direction").and_then(Value::as_str) {
            node.set("direction", d);
        }
        if let Some(lb) = cross.get("lookback") {
            node.set("lookback", text_of(lb));
        }
        for side in ["left", "right"] {
            match cross.get(side).and_then(Value::as_str) {
                Some(a) => match alias::parse(a, ids) {
                    Some(child) => node.children.push(child),
                    None => errors.push(format!("Indicateur inconnu : « {a} ».")),
                },
                None => errors.push(format!("Croisement incomplet : « {side} » manquant.")),
            }
        }
        return Some(node);
    }

    if obj.get("operator").and_then(Value::as_str) == Some("exists") {
        if let Some(field) = obj.get("field").and_then(Value::as_str) {
            return match alias::parse(field, ids) {
                Some(node) => Some(node),
                None => {
                    errors.push(format!("Indicateur inconnu : « {field} »."));
                    None
                }
            };
        }
    }

    if let Some(field) = obj.get("field").and_then(Value::as_str) {
        if field == "volume" {
            let mut node = tree::create("market_volume", ids);
            if let Some(op) = obj.get("operator").and_then(Value::as_str) {
                node.set("operator", op);
            }
            if let Some(v) = obj.get("value") {
                node.set("value", text_of(v));
            }
            if let Some(tf) = obj.get("timeframe").and_then(Value::as_str) {
                node.set("timeframe", tf);
            }
            return Some(node);
        }
        let mut node = tree::create("condition", ids);
        if let Some(op) = obj.get("operator").and_then(Value::as_str) {
            node.set("operator", op);
        }
        if let Some(v) = obj.get("value") {
            node.set("value", text_of(v));
        }
        match alias::parse(field, ids) {
            // Alias field: restore the editable indicator child; the field
            // itself stays at its default.
            Some(indicator) => node.children.push(indicator),
            None => node.set("field", field),
        }
        return Some(node);
    }

    errors.push("Bloc de condition non reconnu.".to_string());
    None
}

fn hydrate_signal(signal: Option<&Value>, ids: &mut dyn IdGen, errors: &mut Vec<String>) -> Vec<Node> {
    let Some(obj) = signal.and_then(Value::as_object) else {
        errors.push("Signal manquant dans la règle.".to_string());
        return Vec::new();
    };
    let action = obj.get("action").and_then(Value::as_str).unwrap_or("noop");
    let size = obj.get("size");

    match obj.get("steps").and_then(Value::as_array) {
        Some(steps) => {
            let mut nodes: Vec<Node> = steps
                .iter()
                .filter_map(|s| hydrate_step(s, ids, errors))
                .collect();
            let has_order = nodes.iter().any(|n| n.block == "action");
            if !has_order && action != "noop" {
                nodes.insert(0, order_node(action, size, ids));
            }
            nodes
        }
        None if action != "noop" => vec![order_node(action, size, ids)],
        None => Vec::new(),
    }
}

fn order_node(action: &str, size: Option<&Value>, ids: &mut dyn IdGen) -> Node {
    let mut node = tree::create("action", ids);
    node.set("action", action);
    if let Some(size) = size {
        node.set("size", text_of(size));
    }
    node
}

fn hydrate_step(step: &Value, ids: &mut dyn IdGen, errors: &mut Vec<String>) -> Option<Node> {
    let Some(obj) = step.as_object() else {
        errors.push("Étape d'action non reconnue.".to_string());
        return None;
    };
    let kind = obj.get("type").and_then(Value::as_str).unwrap_or("");
    let block = match kind {
        "order" => "action",
        "delay" => "delay",
        "take_profit" => "take_profit",
        "stop_loss" => "stop_loss",
        "close_position" => "close_position",
        "alert" => "alert",
        other => {
            errors.push(format!("Étape d'action non reconnue : « {other} »."));
            return None;
        }
    };
    let mut node = tree::create(block, ids);
    let copy_text = |node: &mut Node, field: &str, key: &str| {
        if let Some(v) = obj.get(key) {
            node.set(field, text_of(v));
        }
    };
    match block {
        "action" => {
            if let Some(a) = obj.get("action").and_then(Value::as_str) {
                node.set("action", a);
            }
            copy_text(&mut node, "size", "size");
        }
        "delay" => copy_text(&mut node, "seconds", "seconds"),
        "take_profit" => {
            copy_text(&mut node, "mode", "mode");
            copy_text(&mut node, "value", "value");
            copy_text(&mut node, "size", "size");
            copy_text(&mut node, "customSize", "customSize");
        }
        "stop_loss" => {
            copy_text(&mut node, "mode", "mode");
            copy_text(&mut node, "value", "value");
            if let Some(t) = obj.get("trailing").and_then(Value::as_bool) {
                node.set("trailing", t);
            }
        }
        "close_position" => copy_text(&mut node, "side", "side"),
        "alert" => {
            copy_text(&mut node, "channel", "channel");
            copy_text(&mut node, "message", "message");
        }
        _ => {}
    }
    Some(node)
}

/// Document value → editable string config.
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        // Number's own Display keeps the float/integer distinction
        // (1.0 stays "1.0"), which the round-trip laws depend on.
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
