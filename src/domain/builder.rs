//! Builds documents from structured tree descriptions.
//!
//! A description is already-structured data (TOML tables), not markup:
//!
//! ```toml
//! [root]
//! tag = "body"
//!
//! [[root.children]]
//! tag = "div"
//! id = "mainContent"
//! classes = ["q-box"]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::arena::{Document, NodeData, NodeId};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Serializable description of one node and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDescription {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDescription>,
}

impl NodeDescription {
    fn to_node_data(&self) -> TreeResult<NodeData> {
        if self.tag.trim().is_empty() {
            return Err(DomainError::InvalidTree {
                message: "node without tag".to_string(),
            });
        }
        let mut data = NodeData::element(self.tag.trim());
        for (name, value) in &self.attributes {
            data = data.with_attribute(name, value);
        }
        if let Some(id) = &self.id {
            data = data.with_id(id);
        }
        for class in &self.classes {
            data = data.with_tag(class);
        }
        if let Some(text) = &self.text {
            data = data.with_text(text);
        }
        Ok(data)
    }
}

/// Page signals stored alongside a tree; both optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Top-level tree file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDescription {
    #[serde(default)]
    pub page: PageDescription,
    pub root: NodeDescription,
}

impl TreeDescription {
    pub fn from_toml(content: &str) -> TreeResult<Self> {
        toml::from_str(content).map_err(|e| DomainError::InvalidTree {
            message: e.to_string(),
        })
    }
}

/// Constructs documents from descriptions and describes documents back.
#[derive(Debug, Default)]
pub struct DocumentBuilder;

impl DocumentBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, description: &TreeDescription) -> TreeResult<Document> {
        let mut document = Document::new();
        self.append(&mut document, None, &description.root)?;
        Ok(document)
    }

    /// Append `description` under `parent` (or as root). Returns the subtree root.
    ///
    /// Nodes are inserted parent-first in document order, so a mutation
    /// journal sees one child-list record per inserted node.
    pub fn append(
        &self,
        document: &mut Document,
        parent: Option<NodeId>,
        description: &NodeDescription,
    ) -> TreeResult<NodeId> {
        let top = document.insert_node(description.to_node_data()?, parent)?;
        let mut stack: Vec<(&NodeDescription, NodeId)> = description
            .children
            .iter()
            .rev()
            .map(|child| (child, top))
            .collect();

        while let Some((current, parent_idx)) = stack.pop() {
            let current_idx = document.insert_node(current.to_node_data()?, Some(parent_idx))?;
            for child in current.children.iter().rev() {
                stack.push((child, current_idx));
            }
        }

        Ok(top)
    }

    /// Describe the subtree rooted at `node`.
    pub fn describe(&self, document: &Document, node: NodeId) -> TreeResult<NodeDescription> {
        let entry = document.get_node(node).ok_or(DomainError::StaleNode(node))?;
        let mut attributes = entry.data.attributes.clone();
        let id = attributes.remove("id");
        let children = entry
            .children
            .iter()
            .map(|&child| self.describe(document, child))
            .collect::<TreeResult<Vec<_>>>()?;

        Ok(NodeDescription {
            tag: entry.data.name.clone(),
            id,
            classes: entry.data.tags.iter().cloned().collect(),
            attributes,
            text: entry.data.text.clone(),
            children,
        })
    }
}
