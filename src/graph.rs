//! Workflow graph data structure.
//!
//! The engine describes a generation job as a mapping from node id to a node
//! record: an operation kind (`class_type`) plus named inputs. An input is
//! either a literal or a reference to another node's output slot, which the
//! wire format spells as a `[node_id, slot_index]` pair. The graph is built
//! once, never mutated after submission, and must serialize to plain JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Edge to another node's output: `(node id, output slot index)`.
///
/// Serializes as the engine's `["4", 0]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLink(pub String, pub u32);

impl NodeLink {
    pub fn node(&self) -> &str {
        &self.0
    }

    pub fn slot(&self) -> u32 {
        self.1
    }
}

/// One named input of a node: a literal value or a link to another node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeInput {
    Link(NodeLink),
    Int(u64),
    Float(f64),
    Text(String),
}

impl From<&str> for NodeInput {
    fn from(value: &str) -> Self {
        NodeInput::Text(value.to_string())
    }
}

impl From<String> for NodeInput {
    fn from(value: String) -> Self {
        NodeInput::Text(value)
    }
}

impl From<u32> for NodeInput {
    fn from(value: u32) -> Self {
        NodeInput::Int(u64::from(value))
    }
}

impl From<u64> for NodeInput {
    fn from(value: u64) -> Self {
        NodeInput::Int(value)
    }
}

impl From<f64> for NodeInput {
    fn from(value: f64) -> Self {
        NodeInput::Float(value)
    }
}

impl From<(&str, u32)> for NodeInput {
    fn from((node, slot): (&str, u32)) -> Self {
        NodeInput::Link(NodeLink(node.to_string(), slot))
    }
}

/// A single operation node: its kind and its named inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub class_type: String,
    pub inputs: BTreeMap<String, NodeInput>,
}

impl WorkflowNode {
    pub fn new(class_type: impl Into<String>) -> Self {
        Self {
            class_type: class_type.into(),
            inputs: BTreeMap::new(),
        }
    }

    /// Add a named input. Accepts literals and `(node_id, slot)` links.
    pub fn input(mut self, name: impl Into<String>, value: impl Into<NodeInput>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }
}

/// A complete workflow: node id → node. Serializes transparently as the
/// engine's top-level prompt object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowGraph {
    nodes: BTreeMap<String, WorkflowNode>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, node: WorkflowNode) {
        self.nodes.insert(id.into(), node);
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WorkflowNode)> {
        self.nodes.iter()
    }

    /// Links whose target node id does not exist in this graph. A well-formed
    /// graph returns an empty list.
    pub fn dangling_links(&self) -> Vec<&NodeLink> {
        self.nodes
            .values()
            .flat_map(|node| node.inputs.values())
            .filter_map(|input| match input {
                NodeInput::Link(link) if !self.nodes.contains_key(link.node()) => Some(link),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_serializes_as_pair() {
        let input = NodeInput::from(("4", 1));
        assert_eq!(serde_json::to_value(&input).unwrap(), json!(["4", 1]));
    }

    #[test]
    fn literals_serialize_as_plain_json() {
        assert_eq!(
            serde_json::to_value(NodeInput::from("euler")).unwrap(),
            json!("euler")
        );
        assert_eq!(serde_json::to_value(NodeInput::from(20u32)).unwrap(), json!(20));
        assert_eq!(serde_json::to_value(NodeInput::from(7.5)).unwrap(), json!(7.5));
    }

    #[test]
    fn node_serializes_with_wire_field_names() {
        let node = WorkflowNode::new("CLIPTextEncode")
            .input("text", "a cat")
            .input("clip", ("1", 1));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "class_type": "CLIPTextEncode",
                "inputs": {"text": "a cat", "clip": ["1", 1]}
            })
        );
    }

    #[test]
    fn graph_serializes_transparently() {
        let mut graph = WorkflowGraph::new();
        graph.insert("1", WorkflowNode::new("CheckpointLoaderSimple").input("ckpt_name", "m.safetensors"));
        let value = serde_json::to_value(&graph).unwrap();
        assert!(value.get("1").is_some());
        assert!(value.get("nodes").is_none());
    }

    #[test]
    fn dangling_link_is_reported() {
        let mut graph = WorkflowGraph::new();
        graph.insert("1", WorkflowNode::new("VAEDecode").input("samples", ("99", 0)));
        let dangling = graph.dangling_links();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].node(), "99");
    }

    #[test]
    fn resolved_links_are_not_reported() {
        let mut graph = WorkflowGraph::new();
        graph.insert("1", WorkflowNode::new("CheckpointLoaderSimple"));
        graph.insert("2", WorkflowNode::new("VAEDecode").input("vae", ("1", 2)));
        assert!(graph.dangling_links().is_empty());
    }

    #[test]
    fn graph_roundtrips_through_json() {
        let mut graph = WorkflowGraph::new();
        graph.insert(
            "5",
            WorkflowNode::new("KSampler")
                .input("seed", 42u32)
                .input("cfg", 7.0)
                .input("model", ("1", 0)),
        );
        let text = serde_json::to_string(&graph).unwrap();
        let back: WorkflowGraph = serde_json::from_str(&text).unwrap();
        assert_eq!(back, graph);
    }
}
