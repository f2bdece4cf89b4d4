use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog;

/// Editor section a block lives in. Every block type belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Conditions,
    Actions,
}

/// A configuration field value. Editable fields stay strings and are only
/// coerced to numbers at the validation/serialization boundary; toggles
/// (e.g. `stop_loss.trailing`) are booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Flag(bool),
    Text(String),
}

impl ConfigValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

pub type Config = BTreeMap<String, ConfigValue>;

/// A concrete block instance in the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Block type identifier (catalog key).
    pub block: String,
    /// Snapshot of the catalog label at creation time.
    pub label: String,
    pub config: Config,
    pub children: Vec<Node>,
}

impl Node {
    pub fn text(&self, field: &str) -> Option<&str> {
        self.config.get(field).and_then(ConfigValue::as_text)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.config.get(field).and_then(ConfigValue::as_flag)
    }

    pub fn set(&mut self, field: &str, value: impl Into<ConfigValue>) {
        self.config.insert(field.to_string(), value.into());
    }
}

/// Ordered sequence of root blocks in one section.
pub type Forest = Vec<Node>;

/// Identifier allocation is injected so imports and tests control it.
pub trait IdGen {
    fn next_id(&mut self) -> String;
}

/// Prefix + counter generator. Ids are unique per generator instance.
#[derive(Debug, Clone)]
pub struct SeqIds {
    prefix: String,
    counter: u64,
}

impl SeqIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: 0,
        }
    }
}

impl IdGen for SeqIds {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}-{}", self.prefix, self.counter)
    }
}

// ---------------------------------------------------------------------------
// Pure tree operations — every function returns a new forest and leaves the
// input untouched. None of them validate; structural guards live in the
// controller.
// ---------------------------------------------------------------------------

/// Create a fresh node of the given block type with its default config.
/// Unknown types still produce a node (the validator reports them).
pub fn create(block: &str, ids: &mut dyn IdGen) -> Node {
    let label = catalog::block_type(block)
        .map(|bt| bt.label.to_string())
        .unwrap_or_else(|| block.to_string());
    Node {
        id: ids.next_id(),
        block: block.to_string(),
        label,
        config: catalog::default_config_for(block),
        children: Vec::new(),
    }
}

/// Append `node` under the node with id `target`, or at the forest root when
/// `target` is `None`. If no node matches, the forest is returned unchanged.
pub fn append(forest: &[Node], target: Option<&str>, node: Node) -> Forest {
    match target {
        None => {
            let mut out = forest.to_vec();
            out.push(node);
            out
        }
        Some(id) => {
            if find(forest, id).is_none() {
                return forest.to_vec();
            }
            append_under(forest, id, &node)
        }
    }
}

fn append_under(nodes: &[Node], target: &str, node: &Node) -> Vec<Node> {
    nodes
        .iter()
        .map(|n| {
            let mut next = n.clone();
            if n.id == target {
                next.children.push(node.clone());
            } else {
                next.children = append_under(&n.children, target, node);
            }
            next
        })
        .collect()
}

/// Apply `update` to the node with the given id, anywhere in the forest.
pub fn update_config<F>(forest: &[Node], node_id: &str, update: F) -> Forest
where
    F: Fn(&Node) -> Node,
{
    update_in(forest, node_id, &update)
}

fn update_in(nodes: &[Node], node_id: &str, update: &dyn Fn(&Node) -> Node) -> Vec<Node> {
    nodes
        .iter()
        .map(|n| {
            if n.id == node_id {
                update(n)
            } else {
                let mut next = n.clone();
                next.children = update_in(&n.children, node_id, update);
                next
            }
        })
        .collect()
}

/// Remove the node with the given id (and its whole subtree).
pub fn remove(forest: &[Node], node_id: &str) -> Forest {
    let mut out = Vec::with_capacity(forest.len());
    for n in forest {
        if n.id == node_id {
            continue;
        }
        let mut next = n.clone();
        next.children = remove(&n.children, node_id);
        out.push(next);
    }
    out
}

/// Preorder search for a node by id.
pub fn find<'a>(forest: &'a [Node], node_id: &str) -> Option<&'a Node> {
    for n in forest {
        if n.id == node_id {
            return Some(n);
        }
        if let Some(hit) = find(&n.children, node_id) {
            return Some(hit);
        }
    }
    None
}


#[cfg(test)]
mod props {
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize),
        AppendUnder(usize, usize),
        Remove(usize),
        Update(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8).prop_map(Op::Add),
            (0usize..8, 0usize..16).prop_map(|(t, x)| Op::AppendUnder(t, x)),
            (0usize..16).prop_map(Op::Remove),
            (0usize..16).prop_map(Op::Update),
        ]
    }

    const BLOCKS: [&str; 8] = [
        "condition",
        "logic",
        "group",
        "negation",
        "indicator",
        "market_cross",
        "action",
        "delay",
    ];

    fn collect_ids(forest: &[Node], out: &mut Vec<String>) {
        for n in forest {
            out.push(n.id.clone());
            collect_ids(&n.children, out);
        }
    }

    proptest! {
        /// Any operation sequence keeps identifiers unique across the forest.
        #[test]
        fn ids_stay_unique(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let mut ids = SeqIds::new("n");
            let mut forest: Forest = Vec::new();
            for op in ops {
                let mut all = Vec::new();
                collect_ids(&forest, &mut all);
                match op {
                    Op::Add(b) => {
                        forest = append(&forest, None, create(BLOCKS[b % BLOCKS.len()], &mut ids));
                    }
                    Op::AppendUnder(b, t) => {
                        let target = all.get(t % all.len().max(1)).cloned();
                        let node = create(BLOCKS[b % BLOCKS.len()], &mut ids);
                        forest = append(&forest, target.as_deref(), node);
                    }
                    Op::Remove(t) => {
                        if let Some(id) = all.get(t % all.len().max(1)) {
                            forest = remove(&forest, id);
                        }
                    }
                    Op::Update(t) => {
                        if let Some(id) = all.get(t % all.len().max(1)) {
                            forest = update_config(&forest, id, |n| {
                                let mut n = n.clone();
                                n.set("value", "1");
                                n
                            });
                        }
                    }
                }
            }
            let mut seen = Vec::new();
            collect_ids(&forest, &mut seen);
            let mut deduped = seen.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(seen.len(), deduped.len());
        }
    }
}
