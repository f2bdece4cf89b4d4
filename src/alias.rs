//! Indicator alias grammar: the textual form an indicator takes inside a
//! condition field, e.g. `"EMA(close, 50)"` or `"MACD(close, 12, 26, 9)"`.
//! The type prefix is case-insensitive and whitespace between arguments is
//! tolerated; arguments are stored as strings.

use crate::tree::{self, IdGen, Node};

/// Split `KIND(a, b, ...)` into an uppercased kind and trimmed arguments.
fn split(alias: &str) -> Option<(String, Vec<String>)> {
    let s = alias.trim();
    let open = s.find('(')?;
    if !s.ends_with(')') || open == 0 {
        return None;
    }
    let kind = s[..open].trim();
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let body = &s[open + 1..s.len() - 1];
    let args: Vec<String> = body.split(',').map(|a| a.trim().to_string()).collect();
    if args.iter().any(String::is_empty) {
        return None;
    }
    Some((kind.to_ascii_uppercase(), args))
}

/// Parse an alias into a fresh indicator node, or `None` when the text does
/// not match the grammar.
pub fn parse(alias: &str, ids: &mut dyn IdGen) -> Option<Node> {
    let (kind, args) = split(alias)?;
    let node = match (kind.as_str(), args.len()) {
        ("MACD", 4) => {
            let mut n = tree::create("indicator_macd", ids);
            n.set("source", args[0].clone());
            n.set("fastPeriod", args[1].clone());
            n.set("slowPeriod", args[2].clone());
            n.set("signalPeriod", args[3].clone());
            n
        }
        ("BOLL", 3) => {
            let mut n = tree::create("indicator_bollinger", ids);
            n.set("source", args[0].clone());
            n.set("period", args[1].clone());
            n.set("deviation", args[2].clone());
            n
        }
        ("ATR", 3) => {
            let mut n = tree::create("indicator_atr", ids);
            n.set("source", args[0].clone());
            n.set("period", args[1].clone());
            n.set("smoothing", args[2].clone());
            n
        }
        // Reserved prefixes with a wrong arity are malformed, not generic.
        ("MACD" | "BOLL" | "ATR", _) => return None,
        (_, 2) => {
            let mut n = tree::create("indicator", ids);
            n.set("kind", kind.to_ascii_lowercase());
            n.set("source", args[0].clone());
            n.set("period", args[1].clone());
            n
        }
        _ => return None,
    };
    Some(node)
}

/// Render an indicator node back to its alias. `None` for non-indicator
/// blocks.
pub fn print(node: &Node) -> Option<String> {
    let get = |field: &str| node.text(field).unwrap_or("").to_string();
    match node.block.as_str() {
        "indicator" => Some(format!(
            "{}({}, {})",
            get("kind").to_ascii_uppercase(),
            get("source"),
            get("period")
        )),
        "indicator_macd" => Some(format!(
            "MACD({}, {}, {}, {})",
            get("source"),
            get("fastPeriod"),
            get("slowPeriod"),
            get("signalPeriod")
        )),
        "indicator_bollinger" => Some(format!(
            "BOLL({}, {}, {})",
            get("source"),
            get("period"),
            get("deviation")
        )),
        "indicator_atr" => Some(format!(
            "ATR({}, {}, {})",
            get("source"),
            get("period"),
            get("smoothing")
        )),
        _ => None,
    }
}
