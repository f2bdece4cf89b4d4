use crate::tree::{Config, ConfigValue, Section};

/// Default value of a configuration field.
#[derive(Debug, Clone, Copy)]
pub enum Preset {
    Text(&'static str),
    Flag(bool),
}

/// Static description of a block type. Single source of truth for every
/// other component: the validator reads `required`/`min_children`/
/// `max_children`/`accepts`, the controller reads `category` and `accepts`,
/// the tree store copies `defaults`.
#[derive(Debug)]
pub struct BlockType {
    pub id: &'static str,
    pub category: Section,
    pub label: &'static str,
    pub defaults: &'static [(&'static str, Preset)],
    /// Block types allowed as direct children; empty means leaf.
    pub accepts: &'static [&'static str],
    pub required: &'static [&'static str],
    pub min_children: Option<usize>,
    pub max_children: Option<usize>,
}

pub const INDICATOR_TYPES: &[&str] = &[
    "indicator",
    "indicator_macd",
    "indicator_bollinger",
    "indicator_atr",
];

const CONDITION_TYPES: &[&str] = &[
    "condition",
    "indicator",
    "indicator_macd",
    "indicator_bollinger",
    "indicator_atr",
    "logic",
    "group",
    "negation",
    "market_cross",
    "market_volume",
];

static BLOCK_TYPES: &[BlockType] = &[
    BlockType {
        id: "condition",
        category: Section::Conditions,
        label: "Comparaison",
        defaults: &[
            ("field", Preset::Text("close")),
            ("operator", Preset::Text("gt")),
            ("value", Preset::Text("")),
        ],
        accepts: INDICATOR_TYPES,
        required: &["field", "operator", "value"],
        min_children: None,
        max_children: Some(1),
    },
    BlockType {
        id: "indicator",
        category: Section::Conditions,
        label: "Indicateur",
        defaults: &[
            ("kind", Preset::Text("sma")),
            ("source", Preset::Text("close")),
            ("period", Preset::Text("14")),
        ],
        accepts: &[],
        required: &["kind", "source", "period"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "indicator_macd",
        category: Section::Conditions,
        label: "MACD",
        defaults: &[
            ("source", Preset::Text("close")),
            ("fastPeriod", Preset::Text("12")),
            ("slowPeriod", Preset::Text("26")),
            ("signalPeriod", Preset::Text("9")),
        ],
        accepts: &[],
        required: &["source", "fastPeriod", "slowPeriod", "signalPeriod"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "indicator_bollinger",
        category: Section::Conditions,
        label: "Bandes de Bollinger",
        defaults: &[
            ("source", Preset::Text("close")),
            ("period", Preset::Text("20")),
            ("deviation", Preset::Text("2")),
        ],
        accepts: &[],
        required: &["source", "period", "deviation"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "indicator_atr",
        category: Section::Conditions,
        label: "ATR",
        defaults: &[
            ("source", Preset::Text("close")),
            ("period", Preset::Text("14")),
            ("smoothing", Preset::Text("rma")),
        ],
        accepts: &[],
        required: &["source", "period", "smoothing"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "logic",
        category: Section::Conditions,
        label: "Logique",
        defaults: &[("mode", Preset::Text("all"))],
        accepts: CONDITION_TYPES,
        required: &["mode"],
        min_children: Some(1),
        max_children: None,
    },
    BlockType {
        id: "group",
        category: Section::Conditions,
        label: "Groupe",
        defaults: &[],
        accepts: CONDITION_TYPES,
        required: &[],
        min_children: Some(1),
        max_children: None,
    },
    BlockType {
        id: "negation",
        category: Section::Conditions,
        label: "Négation",
        defaults: &[],
        accepts: CONDITION_TYPES,
        required: &[],
        min_children: Some(1),
        max_children: Some(1),
    },
    BlockType {
        id: "market_cross",
        category: Section::Conditions,
        label: "Croisement",
        defaults: &[
            ("direction", Preset::Text("above")),
            ("lookback", Preset::Text("5")),
        ],
        accepts: INDICATOR_TYPES,
        required: &["direction", "lookback"],
        min_children: Some(2),
        max_children: Some(2),
    },
    BlockType {
        id: "market_volume",
        category: Section::Conditions,
        label: "Volume",
        defaults: &[
            ("operator", Preset::Text("gt")),
            ("value", Preset::Text("")),
            ("timeframe", Preset::Text("")),
        ],
        accepts: &[],
        required: &["operator", "value"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "action",
        category: Section::Actions,
        label: "Ordre",
        defaults: &[
            ("action", Preset::Text("buy")),
            ("size", Preset::Text("1")),
        ],
        accepts: &[],
        required: &["action", "size"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "delay",
        category: Section::Actions,
        label: "Délai",
        defaults: &[("seconds", Preset::Text("60"))],
        accepts: &[],
        required: &["seconds"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "take_profit",
        category: Section::Actions,
        label: "Take profit",
        defaults: &[
            ("mode", Preset::Text("percent")),
            ("value", Preset::Text("5")),
            ("size", Preset::Text("full")),
            ("customSize", Preset::Text("")),
        ],
        accepts: &[],
        required: &["mode", "value", "size"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "stop_loss",
        category: Section::Actions,
        label: "Stop loss",
        defaults: &[
            ("mode", Preset::Text("percent")),
            ("value", Preset::Text("2")),
            ("trailing", Preset::Flag(false)),
        ],
        accepts: &[],
        required: &["mode", "value"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "close_position",
        category: Section::Actions,
        label: "Clôture",
        defaults: &[("side", Preset::Text("all"))],
        accepts: &[],
        required: &["side"],
        min_children: None,
        max_children: None,
    },
    BlockType {
        id: "alert",
        category: Section::Actions,
        label: "Alerte",
        defaults: &[
            ("channel", Preset::Text("email")),
            ("message", Preset::Text("")),
        ],
        accepts: &[],
        required: &["channel", "message"],
        min_children: None,
        max_children: None,
    },
];

/// Look up a block type. Unknown ids return `None`; callers degrade to a
/// diagnostic instead of crashing.
pub fn block_type(id: &str) -> Option<&'static BlockType> {
    BLOCK_TYPES.iter().find(|bt| bt.id == id)
}

/// All block types of one category, in palette order.
pub fn palette(category: Section) -> impl Iterator<Item = &'static BlockType> {
    BLOCK_TYPES.iter().filter(move |bt| bt.category == category)
}

/// Fresh default configuration for a block type. The returned map is an
/// independent copy; callers may mutate it freely. Unknown ids get an
/// empty map.
pub fn default_config_for(id: &str) -> Config {
    let mut config = Config::new();
    if let Some(bt) = block_type(id) {
        for (field, preset) in bt.defaults {
            let value = match preset {
                Preset::Text(s) => ConfigValue::Text((*s).to_string()),
                Preset::Flag(b) => ConfigValue::Flag(*b),
            };
            config.insert((*field).to_string(), value);
        }
    }
    config
}

pub fn is_indicator(id: &str) -> bool {
    INDICATOR_TYPES.contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_returns_none() {
        assert!(block_type("wormhole").is_none());
        assert!(default_config_for("wormhole").is_empty());
    }

    #[test]
    fn test_default_config_is_fresh_copy() {
        let mut a = default_config_for("action");
        let b = default_config_for("action");
        a.insert("size".into(), "99".into());
        assert_eq!(b.get("size"), Some(&ConfigValue::Text("1".into())));
    }

    #[test]
    fn test_every_required_field_has_a_default() {
        for bt in super::BLOCK_TYPES {
            let defaults = default_config_for(bt.id);
            for field in bt.required {
                assert!(
                    defaults.contains_key(*field),
                    "{}: required field {} has no default",
                    bt.id,
                    field
                );
            }
        }
    }

    #[test]
    fn test_accepts_reference_known_types() {
        for bt in super::BLOCK_TYPES {
            for child in bt.accepts {
                assert!(block_type(child).is_some(), "{}: unknown child {}", bt.id, child);
            }
        }
    }

    #[test]
    fn test_indicators_are_condition_leaves() {
        for id in INDICATOR_TYPES {
            let bt = block_type(id).unwrap();
            assert_eq!(bt.category, Section::Conditions);
            assert!(bt.accepts.is_empty());
        }
    }

    #[test]
    fn test_palette_split_covers_catalog() {
        let conditions = palette(Section::Conditions).count();
        let actions = palette(Section::Actions).count();
        assert_eq!(conditions + actions, super::BLOCK_TYPES.len());
        assert_eq!(conditions, 10);
        assert_eq!(actions, 6);
    }
}
