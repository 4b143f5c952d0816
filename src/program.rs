//! The program graph.
//!
//! A snapshot of what the user authored in the visual editor: blocks chained
//! into statement sequences, with value blocks plugged into input slots. The
//! editor owns mutation; generation only ever reads a graph.
//!
//! The JSON form is the crate-native program format consumed by the CLI and
//! the browser bindings. The editor's own workspace serialization is a
//! different, opaque payload (see `persist`).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::Value;

/// Unique identifier for blocks within one graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What fills a slot: a literal, or a reference to a value block.
/// An unconnected slot simply has no entry in [`Block::inputs`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotInput {
    Literal(Value),
    Block { block: BlockId },
}

/// One block: a catalog kind, its filled slots, and the next statement in
/// the chain (statement blocks only; value blocks never chain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub inputs: HashMap<String, SlotInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<BlockId>,
}

impl Block {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            inputs: HashMap::new(),
            next: None,
        }
    }

    /// Fill a slot with a literal.
    pub fn literal(mut self, slot: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(slot.into(), SlotInput::Literal(value));
        self
    }

    /// Fill a slot with a nested value block.
    pub fn nested(mut self, slot: impl Into<String>, block: BlockId) -> Self {
        self.inputs.insert(slot.into(), SlotInput::Block { block });
        self
    }

    pub fn input(&self, slot: &str) -> Option<&SlotInput> {
        self.inputs.get(slot)
    }
}

/// All blocks in a workspace, plus the statement-chain roots in authored
/// (workspace) order. Blocks not reachable from a root are orphans: legal,
/// and ignored by generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramGraph {
    #[serde(default)]
    pub blocks: HashMap<BlockId, Block>,
    #[serde(default)]
    pub roots: Vec<BlockId>,
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block under a fresh id.
    pub fn insert(&mut self, block: Block) -> BlockId {
        let id = BlockId(
            self.blocks
                .keys()
                .map(|b| b.0)
                .max()
                .map_or(1, |max| max + 1),
        );
        self.blocks.insert(id, block);
        id
    }

    /// Append a chain root. Workspace order is the order of these calls.
    pub fn push_root(&mut self, id: BlockId) {
        self.roots.push(id);
    }

    /// Insert a block and register it as a root in one step.
    pub fn insert_root(&mut self, block: Block) -> BlockId {
        let id = self.insert(block);
        self.push_root(id);
        id
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    /// Link `from` to `to` as consecutive statements.
    pub fn chain(&mut self, from: BlockId, to: BlockId) {
        if let Some(block) = self.blocks.get_mut(&from) {
            block.next = Some(to);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_fresh_ids() {
        let mut graph = ProgramGraph::new();
        let a = graph.insert(Block::new("turn_left"));
        let b = graph.insert(Block::new("turn_right"));
        assert_ne!(a, b);
        assert_eq!(graph.get(a).unwrap().kind, "turn_left");
        assert_eq!(graph.get(b).unwrap().kind, "turn_right");
    }

    #[test]
    fn test_chain_links_statements() {
        let mut graph = ProgramGraph::new();
        let a = graph.insert_root(Block::new("move_forward"));
        let b = graph.insert(Block::new("turn_left"));
        graph.chain(a, b);
        assert_eq!(graph.get(a).unwrap().next, Some(b));
        assert_eq!(graph.roots, vec![a]);
    }

    #[test]
    fn test_json_round_trip() {
        let mut graph = ProgramGraph::new();
        let picker = graph.insert(
            Block::new("color_picker").literal("colour", Value::Color("#ff0000".parse().unwrap())),
        );
        let root = graph.insert_root(
            Block::new("set_light_color").nested("color", picker),
        );
        let second = graph.insert(Block::new("move_distance").literal("distance", Value::Number(2.0)));
        graph.chain(root, second);

        let json = graph.to_json().unwrap();
        let back = ProgramGraph::from_json(&json).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn test_json_literals_read_naturally() {
        let json = r##"{
            "blocks": {
                "1": { "kind": "move_distance", "inputs": { "distance": 2.5 }, "next": 2 },
                "2": { "kind": "set_light_color", "inputs": { "color": "#ff0000" } },
                "3": { "kind": "color_picker", "inputs": { "colour": "#00ff00" } }
            },
            "roots": [1]
        }"##;
        let graph = ProgramGraph::from_json(json).unwrap();

        let first = graph.get(BlockId(1)).unwrap();
        assert_eq!(
            first.input("distance"),
            Some(&SlotInput::Literal(Value::Number(2.5)))
        );
        assert_eq!(first.next, Some(BlockId(2)));

        let second = graph.get(BlockId(2)).unwrap();
        assert_eq!(
            second.input("color"),
            Some(&SlotInput::Literal(Value::Color("#ff0000".parse().unwrap())))
        );
    }

    #[test]
    fn test_json_nested_reference() {
        let json = r##"{
            "blocks": {
                "1": { "kind": "set_light_color", "inputs": { "color": { "block": 2 } } },
                "2": { "kind": "color_picker", "inputs": { "colour": "#123456" } }
            },
            "roots": [1]
        }"##;
        let graph = ProgramGraph::from_json(json).unwrap();
        assert_eq!(
            graph.get(BlockId(1)).unwrap().input("color"),
            Some(&SlotInput::Block { block: BlockId(2) })
        );
    }

    #[test]
    fn test_empty_graph_parses() {
        let graph = ProgramGraph::from_json("{}").unwrap();
        assert!(graph.is_empty());
        assert!(graph.blocks.is_empty());
    }
}
