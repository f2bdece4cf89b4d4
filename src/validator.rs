//! Semantic validation of the two designer forests. Produces French
//! diagnostics, a human-readable rule expression, and per-section
//! descriptions. Pure function of the trees and the catalog — never
//! panics, never mutates.

use crate::alias;
use crate::catalog;
use crate::tree::{Node, Section};

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Normalized rendering of the conditions forest, e.g. `"(A) ET (B)"`.
    pub condition_expression: Option<String>,
    /// Action steps joined with `" puis "`, e.g. `"BUY x1 puis stop-loss 2%"`.
    pub action_summary: Option<String>,
    /// `"<conditions> ⇒ <actions>"` when both sides render.
    pub rule: Option<String>,
    pub is_valid: bool,
}

pub fn validate(conditions: &[Node], actions: &[Node]) -> Validation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if conditions.is_empty() {
        errors.push("Ajoutez au moins une condition.".to_string());
    }
    if actions.is_empty() {
        errors.push("Ajoutez au moins une action.".to_string());
    }

    for (k, root) in conditions.iter().enumerate() {
        check_node(root, &format!("Condition #{}", k + 1), &mut errors, &mut warnings);
    }
    for (k, root) in actions.iter().enumerate() {
        check_node(root, &format!("Action #{}", k + 1), &mut errors, &mut warnings);
    }

    let condition_expression = conditions_expression(conditions);
    let action_summary = actions_summary(actions);
    let rule = match (&condition_expression, &action_summary) {
        (Some(c), Some(a)) => Some(format!("{c} ⇒ {a}")),
        _ => None,
    };
    let is_valid = errors.is_empty();

    Validation {
        errors,
        warnings,
        condition_expression,
        action_summary,
        rule,
        is_valid,
    }
}

// ---------------------------------------------------------------------------
// Structural + per-type checks
// ---------------------------------------------------------------------------

fn check_node(node: &Node, path: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let Some(bt) = catalog::block_type(&node.block) else {
        errors.push(format!("{path} — type de bloc inconnu « {} ».", node.block));
        recurse(node, path, errors, warnings);
        return;
    };
    let label = bt.label;

    for field in bt.required {
        if is_blank(node, field) {
            errors.push(format!("{path} — {label}: le champ « {field} » est requis."));
        }
    }

    let count = node.children.len();
    if let Some(min) = bt.min_children {
        if count < min {
            errors.push(format!(
                "{path} — {label}: au moins {min} bloc(s) enfant(s) requis."
            ));
        }
    }
    if let Some(max) = bt.max_children {
        if count > max {
            errors.push(format!(
                "{path} — {label}: au plus {max} bloc(s) enfant(s) autorisé(s)."
            ));
        }
    }

    if bt.accepts.is_empty() && !node.children.is_empty() {
        if bt.category == Section::Actions {
            warnings.push(format!(
                "{path} — {label}: les blocs enfants seront ignorés."
            ));
        } else {
            errors.push(format!("{path} — {label}: n'accepte pas de bloc enfant."));
        }
    } else {
        for (i, child) in node.children.iter().enumerate() {
            if !bt.accepts.contains(&child.block.as_str()) {
                errors.push(format!(
                    "{path} — {label}: le bloc enfant #{} ({}) est incompatible.",
                    i + 1,
                    child_label(child, i)
                ));
            }
        }
    }

    check_type_specific(node, bt.label, path, errors);
    recurse(node, path, errors, warnings);
}

fn check_type_specific(node: &Node, label: &str, path: &str, errors: &mut Vec<String>) {
    match node.block.as_str() {
        "market_cross" => {
            match trimmed(node, "lookback").map(str::parse::<i64>) {
                Some(Ok(n)) if n > 0 => {}
                Some(_) => errors.push(format!(
                    "{path} — {label}: « lookback » doit être un entier positif."
                )),
                None => {} // blank already reported as required
            }
            if node.children.iter().any(|c| !catalog::is_indicator(&c.block)) {
                errors.push(format!(
                    "{path} — {label}: seuls des indicateurs peuvent être utilisés comme enfants."
                ));
            }
        }
        "market_volume" => {
            if let Some(raw) = trimmed(node, "value") {
                match raw.parse::<f64>() {
                    Ok(v) if v >= 0.0 => {}
                    _ => errors.push(format!(
                        "{path} — {label}: « value » doit être un nombre positif ou nul."
                    )),
                }
            }
        }
        "take_profit" | "stop_loss" => {
            if let Some(raw) = trimmed(node, "value") {
                match raw.parse::<f64>() {
                    Ok(v) if v > 0.0 => {}
                    _ => errors.push(format!(
                        "{path} — {label}: « value » doit être strictement positif."
                    )),
                }
            }
            if node.block == "take_profit" && node.text("size") == Some("custom") {
                match trimmed(node, "customSize").map(str::parse::<f64>) {
                    Some(Ok(v)) if v > 0.0 => {}
                    _ => errors.push(format!(
                        "{path} — {label}: « customSize » doit être strictement positif."
                    )),
                }
            }
        }
        "delay" => {
            if let Some(raw) = trimmed(node, "seconds") {
                match raw.parse::<f64>() {
                    Ok(v) if v >= 0.0 => {}
                    _ => errors.push(format!(
                        "{path} — {label}: « seconds » doit être un nombre positif ou nul."
                    )),
                }
            }
        }
        _ => {}
    }
}

fn recurse(node: &Node, path: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    for (i, child) in node.children.iter().enumerate() {
        let segment = child_label(child, i);
        check_node(child, &format!("{path} > {segment}"), errors, warnings);
    }
}

fn child_label(child: &Node, index: usize) -> String {
    match catalog::block_type(&child.block) {
        Some(bt) => bt.label.to_string(),
        None => format!("Bloc {}", index + 1),
    }
}

fn is_blank(node: &Node, field: &str) -> bool {
    match node.config.get(field) {
        None => true,
        Some(v) => match v.as_text() {
            Some(s) => s.trim().is_empty(),
            None => false, // booleans count as present
        },
    }
}

fn trimmed<'a>(node: &'a Node, field: &str) -> Option<&'a str> {
    node.text(field).map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Expression rendering
// ---------------------------------------------------------------------------

fn op_sign(op: &str) -> &str {
    match op {
        "gt" => ">",
        "gte" => "≥",
        "lt" => "<",
        "lte" => "≤",
        "eq" => "=",
        "neq" => "≠",
        other => other,
    }
}

fn conditions_expression(conditions: &[Node]) -> Option<String> {
    let exprs: Vec<String> = conditions.iter().filter_map(condition_expr).collect();
    match exprs.len() {
        0 => None,
        1 => Some(exprs.into_iter().next().unwrap_or_default()),
        _ => Some(
            exprs
                .iter()
                .map(|e| format!("({e})"))
                .collect::<Vec<_>>()
                .join(" ET "),
        ),
    }
}

fn condition_expr(node: &Node) -> Option<String> {
    match node.block.as_str() {
        "indicator" | "indicator_macd" | "indicator_bollinger" | "indicator_atr" => {
            alias::print(node)
        }
        "condition" => {
            let field = node
                .children
                .iter()
                .find_map(alias::print)
                .unwrap_or_else(|| node.text("field").unwrap_or("").to_string());
            let sign = op_sign(node.text("operator").unwrap_or(""));
            let value = node.text("value").unwrap_or("");
            Some(format!("{field} {sign} {value}"))
        }
        "logic" | "group" => {
            let sep = if node.block == "logic" && node.text("mode") == Some("any") {
                " OU "
            } else {
                " ET "
            };
            let parts: Vec<String> = node
                .children
                .iter()
                .filter_map(condition_expr)
                .map(|e| format!("({e})"))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(sep))
            }
        }
        "negation" => {
            let inner = node.children.iter().find_map(condition_expr)?;
            Some(format!("NON ({inner})"))
        }
        "market_cross" => {
            let aliases: Vec<String> = node.children.iter().filter_map(alias::print).collect();
            if aliases.len() < 2 {
                return None;
            }
            let dir = if node.text("direction") == Some("above") {
                "au-dessus"
            } else {
                "sous"
            };
            let lookback = node.text("lookback").unwrap_or("");
            Some(format!(
                "{} croise {dir} {} (fenêtre {lookback})",
                aliases[0], aliases[1]
            ))
        }
        "market_volume" => {
            let sign = op_sign(node.text("operator").unwrap_or(""));
            let value = node.text("value").unwrap_or("");
            let mut expr = format!("Volume {sign} {value}");
            if let Some(tf) = trimmed(node, "timeframe") {
                expr.push_str(&format!(" ({tf})"));
            }
            Some(expr)
        }
        _ => None,
    }
}

fn actions_summary(actions: &[Node]) -> Option<String> {
    let parts: Vec<String> = actions.iter().filter_map(action_desc).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" puis "))
    }
}

fn action_desc(node: &Node) -> Option<String> {
    let get = |field: &str| node.text(field).unwrap_or("").to_string();
    match node.block.as_str() {
        "action" => Some(format!(
            "{} x{}",
            get("action").to_ascii_uppercase(),
            get("size")
        )),
        "delay" => Some(format!("délai {}s", get("seconds"))),
        "take_profit" => Some(if get("mode") == "price" {
            format!("take-profit @ {}", get("value"))
        } else {
            format!("take-profit {}%", get("value"))
        }),
        "stop_loss" => {
            let mut desc = if get("mode") == "price" {
                format!("stop-loss @ {}", get("value"))
            } else {
                format!("stop-loss {}%", get("value"))
            };
            if node.flag("trailing") == Some(true) {
                desc.push_str(" (suiveur)");
            }
            Some(desc)
        }
        "close_position" => Some(format!("fermer la position ({})", get("side"))),
        "alert" => Some(format!("alerte {}", get("channel"))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{self, SeqIds};

    fn make(ids: &mut SeqIds, block: &str, fields: &[(&str, &str)]) -> Node {
        let mut n = tree::create(block, ids);
        for (k, v) in fields {
            n.set(*k, *v);
        }
        n
    }

    #[test]
    fn test_simple_buy_rule() {
        let mut ids = SeqIds::new("n");
        let cond = make(
            &mut ids,
            "condition",
            &[("field", "close"), ("operator", "gt"), ("value", "100")],
        );
        let act = make(&mut ids, "action", &[("action", "buy"), ("size", "1")]);

        let report = validate(&[cond], &[act]);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
        assert_eq!(report.rule.as_deref(), Some("close > 100 ⇒ BUY x1"));
    }

    #[test]
    fn test_required_field_message() {
        let mut ids = SeqIds::new("n");
        let cond = make(&mut ids, "condition", &[("value", "  ")]);
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[cond], &[act]);
        assert!(!report.is_valid);
        assert!(report
            .errors
            .contains(&"Condition #1 — Comparaison: le champ « value » est requis.".to_string()));
    }

    #[test]
    fn test_empty_forests_report_both_sections() {
        let report = validate(&[], &[]);
        assert!(report.errors.contains(&"Ajoutez au moins une condition.".to_string()));
        assert!(report.errors.contains(&"Ajoutez au moins une action.".to_string()));
        assert!(report.rule.is_none());
    }

    #[test]
    fn test_unknown_block_type() {
        let mut ids = SeqIds::new("n");
        let ghost = make(&mut ids, "wormhole", &[]);
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[ghost], &[act]);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("type de bloc inconnu « wormhole »")));
    }

    #[test]
    fn test_logic_and_negation_expression() {
        let mut ids = SeqIds::new("n");
        let mut logic = make(&mut ids, "logic", &[("mode", "any")]);
        logic.children.push(make(
            &mut ids,
            "condition",
            &[("field", "close"), ("operator", "gt"), ("value", "10")],
        ));
        let mut neg = make(&mut ids, "negation", &[]);
        neg.children.push(make(
            &mut ids,
            "condition",
            &[("field", "open"), ("operator", "lte"), ("value", "5")],
        ));
        logic.children.push(neg);
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[logic], &[act]);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
        assert_eq!(
            report.condition_expression.as_deref(),
            Some("(close > 10) OU (NON (open ≤ 5))")
        );
    }

    #[test]
    fn test_indicator_substitution_and_cross_expression() {
        let mut ids = SeqIds::new("n");
        let mut logic = make(&mut ids, "logic", &[("mode", "all")]);

        let mut cond = make(
            &mut ids,
            "condition",
            &[("field", "close"), ("operator", "gt"), ("value", "150")],
        );
        cond.children.push(make(
            &mut ids,
            "indicator_macd",
            &[
                ("source", "close"),
                ("fastPeriod", "12"),
                ("slowPeriod", "26"),
                ("signalPeriod", "9"),
            ],
        ));
        logic.children.push(cond);

        let mut cross = make(
            &mut ids,
            "market_cross",
            &[("direction", "above"), ("lookback", "5")],
        );
        cross.children.push(make(
            &mut ids,
            "indicator",
            &[("kind", "sma"), ("source", "close"), ("period", "20")],
        ));
        cross.children.push(make(
            &mut ids,
            "indicator",
            &[("kind", "ema"), ("source", "close"), ("period", "50")],
        ));
        logic.children.push(cross);

        let act = make(&mut ids, "action", &[]);
        let report = validate(&[logic], &[act]);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
        assert_eq!(
            report.condition_expression.as_deref(),
            Some(
                "(MACD(close, 12, 26, 9) > 150) ET \
                 (SMA(close, 20) croise au-dessus EMA(close, 50) (fenêtre 5))"
            )
        );
    }

    #[test]
    fn test_cross_with_one_child_is_underspecified() {
        let mut ids = SeqIds::new("n");
        let mut cross = make(&mut ids, "market_cross", &[("lookback", "5")]);
        cross.children.push(make(&mut ids, "indicator", &[]));
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[cross], &[act]);
        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("au moins 2 bloc(s) enfant(s) requis")));
        assert!(report.condition_expression.is_none());
    }

    #[test]
    fn test_cross_rejects_non_indicator_children() {
        let mut ids = SeqIds::new("n");
        let mut cross = make(&mut ids, "market_cross", &[("lookback", "5")]);
        cross.children.push(make(&mut ids, "indicator", &[]));
        cross.children.push(make(&mut ids, "condition", &[("value", "1")]));
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[cross], &[act]);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("seuls des indicateurs peuvent être utilisés")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("le bloc enfant #2 (Comparaison) est incompatible")));
    }

    #[test]
    fn test_cross_lookback_must_be_positive_integer() {
        let mut ids = SeqIds::new("n");
        let mut cross = make(&mut ids, "market_cross", &[("lookback", "0")]);
        cross.children.push(make(&mut ids, "indicator", &[]));
        cross.children.push(make(&mut ids, "indicator", &[]));
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[cross], &[act]);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("« lookback » doit être un entier positif")));
    }

    #[test]
    fn test_take_profit_value_bounds() {
        let mut ids = SeqIds::new("n");
        let cond = make(&mut ids, "condition", &[("value", "1")]);

        let zero = make(&mut ids, "take_profit", &[("value", "0")]);
        let report = validate(&[cond.clone()], &[zero]);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("« value » doit être strictement positif")));

        let ok = make(&mut ids, "take_profit", &[("value", "0.01")]);
        let report = validate(&[cond], &[ok]);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn test_take_profit_custom_size() {
        let mut ids = SeqIds::new("n");
        let cond = make(&mut ids, "condition", &[("value", "1")]);
        let tp = make(
            &mut ids,
            "take_profit",
            &[("size", "custom"), ("customSize", "-3")],
        );

        let report = validate(&[cond], &[tp]);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("« customSize » doit être strictement positif")));
    }

    #[test]
    fn test_action_children_only_warn() {
        let mut ids = SeqIds::new("n");
        let cond = make(&mut ids, "condition", &[("value", "1")]);
        let mut act = make(&mut ids, "action", &[]);
        act.children.push(make(&mut ids, "delay", &[]));

        let report = validate(&[cond], &[act]);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("les blocs enfants seront ignorés")));
    }

    #[test]
    fn test_condition_leaf_children_are_errors() {
        let mut ids = SeqIds::new("n");
        let mut vol = make(&mut ids, "market_volume", &[("value", "1000")]);
        vol.children.push(make(&mut ids, "condition", &[("value", "1")]));
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[vol], &[act]);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("n'accepte pas de bloc enfant")));
    }

    #[test]
    fn test_volume_expression_with_timeframe() {
        let mut ids = SeqIds::new("n");
        let vol = make(
            &mut ids,
            "market_volume",
            &[("operator", "gte"), ("value", "1000"), ("timeframe", "1h")],
        );
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[vol], &[act]);
        assert_eq!(
            report.condition_expression.as_deref(),
            Some("Volume ≥ 1000 (1h)")
        );
    }

    #[test]
    fn test_action_summary_chain() {
        let mut ids = SeqIds::new("n");
        let cond = make(&mut ids, "condition", &[("value", "1")]);
        let buy = make(&mut ids, "action", &[("action", "buy"), ("size", "2")]);
        let wait = make(&mut ids, "delay", &[("seconds", "30")]);
        let mut sl = make(&mut ids, "stop_loss", &[("value", "2")]);
        sl.set("trailing", true);

        let report = validate(&[cond], &[buy, wait, sl]);
        assert_eq!(
            report.action_summary.as_deref(),
            Some("BUY x2 puis délai 30s puis stop-loss 2% (suiveur)")
        );
    }

    #[test]
    fn test_nested_path_in_messages() {
        let mut ids = SeqIds::new("n");
        let mut logic = make(&mut ids, "logic", &[]);
        logic.children.push(make(&mut ids, "condition", &[("value", " ")]));
        let act = make(&mut ids, "action", &[]);

        let report = validate(&[logic], &[act]);
        assert!(report.errors.contains(
            &"Condition #1 > Comparaison — Comparaison: le champ « value » est requis."
                .to_string()
        ));
    }
}
