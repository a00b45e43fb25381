// src/models/publish.rs

//! Node and file objects in the shape the publishing framework ingests.

use serde::{Deserialize, Serialize};

/// License attached to every published node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub license_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_holder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Channel-level metadata merged into the root of the published tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub title: String,
    pub source_domain: String,
    pub source_id: String,
    pub language: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub description: String,
}

/// A published content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishNode {
    Topic(ContainerNode),
    Video(ContentNode),
    Document(ContentNode),
}

impl PublishNode {
    pub fn source_id(&self) -> &str {
        match self {
            Self::Topic(node) => &node.source_id,
            Self::Video(node) | Self::Document(node) => &node.source_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Topic(node) => &node.title,
            Self::Video(node) | Self::Document(node) => &node.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerNode {
    pub source_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub license: License,
    pub language: String,
    pub children: Vec<PublishNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub license: License,
    pub language: String,
    pub files: Vec<FileDescriptor>,
}

/// A file attached to a content node: either a local file to upload or a
/// remote reference the publisher resolves itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "file_type", rename_all = "snake_case")]
pub enum FileDescriptor {
    Document { path: String, language: String },
    Video { web_url: String, language: String },
}

/// Root of the published tree: channel metadata plus the mapped children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishableTree {
    #[serde(flatten)]
    pub channel: ChannelInfo,

    pub license: License,
    pub children: Vec<PublishNode>,
}

impl PublishableTree {
    /// Total number of content (non-topic) nodes.
    pub fn content_count(&self) -> usize {
        fn count(nodes: &[PublishNode]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    PublishNode::Topic(t) => count(&t.children),
                    PublishNode::Video(_) | PublishNode::Document(_) => 1,
                })
                .sum()
        }
        count(&self.children)
    }
}
