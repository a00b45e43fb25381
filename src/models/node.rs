// src/models/node.rs

//! The resource tree shared by every pipeline stage.
//!
//! A tree is built by the crawler, rewritten by the scraper and the
//! transformer, and finally mapped by the loader. Each stage rebuilds
//! `children` from scratch; no stage mutates a node of its input tree.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry of the content tree, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceNode {
    Root(Topic),
    Subject(Topic),
    Section(Topic),
    Language(Topic),
    Extras(Topic),
    SharedFolder(Topic),
    VideoPlaylist(Topic),
    Link(Link),
    Video(Video),
    /// Any `kind` this build does not know about.
    #[serde(other)]
    Unrecognized,
}

/// A container node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default)]
    pub children: Vec<ResourceNode>,
}

impl Topic {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Copy of this container's metadata with the given children.
    pub fn with_children(&self, children: Vec<ResourceNode>) -> Self {
        Self {
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail: self.thumbnail.clone(),
            source_id: self.source_id.clone(),
            language: self.language.clone(),
            children,
        }
    }
}

/// A document leaf. Before scraping it carries a remote `url`, afterwards a
/// local `path`; never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Where a [`Link`] currently points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    Url(&'a str),
    Path(&'a std::path::Path),
}

impl Link {
    /// Unresolved link as produced by the crawler.
    pub fn remote(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Resolved link pointing at a local file.
    pub fn local(
        title: impl Into<String>,
        path: impl Into<PathBuf>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            path: Some(path.into()),
            source_id: Some(source_id.into()),
            ..Self::default()
        }
    }

    /// The single locator of this link, or `None` when it has both or neither.
    pub fn locator(&self) -> Option<Locator<'_>> {
        match (&self.url, &self.path) {
            (Some(url), None) => Some(Locator::Url(url)),
            (None, Some(path)) => Some(Locator::Path(path)),
            _ => None,
        }
    }

    /// Copy of this link pointing at `path` instead of its previous locator.
    pub fn relocated(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            title: self.title.clone(),
            url: None,
            path: Some(path.into()),
            source_id: self.source_id.clone(),
            language: self.language.clone(),
        }
    }
}

/// A streaming video leaf; it is never downloaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,

    pub web_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ResourceNode {
    /// Kind tag as written in checkpoint files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Root(_) => "root",
            Self::Subject(_) => "subject",
            Self::Section(_) => "section",
            Self::Language(_) => "language",
            Self::Extras(_) => "extras",
            Self::SharedFolder(_) => "shared_folder",
            Self::VideoPlaylist(_) => "video_playlist",
            Self::Link(_) => "link",
            Self::Video(_) => "video",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Root(t)
            | Self::Subject(t)
            | Self::Section(t)
            | Self::Language(t)
            | Self::Extras(t)
            | Self::SharedFolder(t)
            | Self::VideoPlaylist(t) => &t.title,
            Self::Link(link) => &link.title,
            Self::Video(video) => &video.title,
            Self::Unrecognized => "",
        }
    }

    /// Container payload, if this node is topic-like.
    pub fn topic(&self) -> Option<&Topic> {
        match self {
            Self::Root(t)
            | Self::Subject(t)
            | Self::Section(t)
            | Self::Language(t)
            | Self::Extras(t)
            | Self::SharedFolder(t)
            | Self::VideoPlaylist(t) => Some(t),
            Self::Link(_) | Self::Video(_) | Self::Unrecognized => None,
        }
    }

    pub fn children(&self) -> &[ResourceNode] {
        self.topic().map(|t| t.children.as_slice()).unwrap_or(&[])
    }

    /// Same container kind with new content. Leaves are returned unchanged.
    pub fn rebuild(&self, topic: Topic) -> Self {
        match self {
            Self::Root(_) => Self::Root(topic),
            Self::Subject(_) => Self::Subject(topic),
            Self::Section(_) => Self::Section(topic),
            Self::Language(_) => Self::Language(topic),
            Self::Extras(_) => Self::Extras(topic),
            Self::SharedFolder(_) => Self::SharedFolder(topic),
            Self::VideoPlaylist(_) => Self::VideoPlaylist(topic),
            Self::Link(_) | Self::Video(_) | Self::Unrecognized => self.clone(),
        }
    }

    /// Count of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }

    /// Depth-first iterator over the links of this subtree, in traversal order.
    pub fn links(&self) -> Vec<&Link> {
        let mut out = Vec::new();
        self.collect_links(&mut out);
        out
    }

    fn collect_links<'a>(&'a self, out: &mut Vec<&'a Link>) {
        match self {
            Self::Link(link) => out.push(link),
            _ => self.children().iter().for_each(|c| c.collect_links(out)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ResourceNode {
        ResourceNode::Root(Topic {
            title: "root".into(),
            children: vec![ResourceNode::Subject(Topic {
                title: "Subject".into(),
                children: vec![
                    ResourceNode::Link(Link::remote("A", "https://rescue.box.com/a")),
                    ResourceNode::Link(Link::remote("B", "https://vimeo.com/b")),
                ],
                ..Topic::default()
            })],
            ..Topic::default()
        })
    }

    #[test]
    fn test_kind_tag_serialization() {
        let json = serde_json::to_value(sample_tree()).unwrap();
        assert_eq!(json["kind"], "root");
        assert_eq!(json["children"][0]["kind"], "subject");
        assert_eq!(json["children"][0]["children"][0]["kind"], "link");
        assert_eq!(
            json["children"][0]["children"][0]["url"],
            "https://rescue.box.com/a"
        );
        assert!(json["children"][0]["children"][0].get("path").is_none());
    }

    #[test]
    fn test_unknown_kind_deserializes_as_unrecognized() {
        let json = r#"{"kind":"root","title":"r","children":[
            {"kind":"hologram","title":"x","children":[]},
            {"kind":"link","title":"ok","url":"https://rescue.box.com/ok"}
        ]}"#;
        let tree: ResourceNode = serde_json::from_str(json).unwrap();
        assert_eq!(tree.children()[0], ResourceNode::Unrecognized);
        assert_eq!(tree.children()[1].kind(), "link");
    }

    #[test]
    fn test_locator_requires_exactly_one() {
        let mut link = Link::remote("A", "https://x");
        assert_eq!(link.locator(), Some(Locator::Url("https://x")));

        link.path = Some(PathBuf::from("downloaded/a.pdf"));
        assert_eq!(link.locator(), None);

        link.url = None;
        assert!(matches!(link.locator(), Some(Locator::Path(_))));

        link.path = None;
        assert_eq!(link.locator(), None);
    }

    #[test]
    fn test_relocated_drops_url() {
        let link = Link::remote("A", "https://x");
        let moved = link.relocated("downloaded/a.pdf");
        assert!(moved.url.is_none());
        assert_eq!(moved.path, Some(PathBuf::from("downloaded/a.pdf")));
    }

    #[test]
    fn test_node_count_and_links_order() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 4);
        let titles: Vec<_> = tree.links().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }
}
