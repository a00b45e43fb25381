// src/pipeline/load.rs

//! Load stage: map the transformed tree onto the publishing framework's model.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{
    ChannelConfig, Config, ContainerNode, ContentNode, FileDescriptor, License, Link, PublishNode,
    PublishableTree, ResourceNode, Stage, Topic, Video,
};
use crate::storage::CheckpointStorage;
use crate::utils::progress;

struct Loader<'a> {
    license: &'a License,
}

impl Loader<'_> {
    fn map_children(
        &self,
        parent: &Topic,
        language: &str,
    ) -> Result<Vec<PublishNode>> {
        let children = parent
            .children
            .iter()
            .map(|child| self.map_node(child, &parent.title, language))
            .collect::<Result<Vec<_>>>()?;
        warn_duplicate_ids(&parent.title, &children);
        Ok(children)
    }

    fn map_node(&self, node: &ResourceNode, parent: &str, inherited: &str) -> Result<PublishNode> {
        match node {
            ResourceNode::Root(topic)
            | ResourceNode::Subject(topic)
            | ResourceNode::Section(topic)
            | ResourceNode::Language(topic)
            | ResourceNode::Extras(topic)
            | ResourceNode::SharedFolder(topic)
            | ResourceNode::VideoPlaylist(topic) => self.map_topic(topic, inherited),
            ResourceNode::Video(video) => Ok(self.map_video(video, inherited)),
            ResourceNode::Link(link) => self.map_document(link, inherited),
            ResourceNode::Unrecognized => Err(AppError::UnknownKind {
                parent: parent.to_string(),
            }),
        }
    }

    fn map_topic(&self, topic: &Topic, inherited: &str) -> Result<PublishNode> {
        let language = topic.language.as_deref().unwrap_or(inherited);
        Ok(PublishNode::Topic(ContainerNode {
            source_id: topic.source_id.clone().unwrap_or_else(|| topic.title.clone()),
            title: topic.title.clone(),
            description: topic.description.clone(),
            thumbnail: topic.thumbnail.clone(),
            license: self.license.clone(),
            language: language.to_string(),
            children: self.map_children(topic, language)?,
        }))
    }

    fn map_video(&self, video: &Video, inherited: &str) -> PublishNode {
        let language = video.language.as_deref().unwrap_or(inherited).to_string();
        PublishNode::Video(ContentNode {
            source_id: video.web_url.clone(),
            title: video.title.clone(),
            description: video.description.clone().unwrap_or_default(),
            thumbnail: video.thumbnail.clone(),
            license: self.license.clone(),
            files: vec![FileDescriptor::Video {
                web_url: video.web_url.clone(),
                language: language.clone(),
            }],
            language,
        })
    }

    fn map_document(&self, link: &Link, inherited: &str) -> Result<PublishNode> {
        let path = link.path.as_ref().ok_or_else(|| {
            AppError::checkpoint(format!("document '{}' has no local path", link.title))
        })?;
        let source_id = link.source_id.clone().ok_or_else(|| {
            AppError::checkpoint(format!("document '{}' has no source_id", link.title))
        })?;
        let language = link.language.as_deref().unwrap_or(inherited).to_string();

        Ok(PublishNode::Document(ContentNode {
            source_id,
            title: link.title.clone(),
            description: String::new(),
            thumbnail: None,
            license: self.license.clone(),
            files: vec![FileDescriptor::Document {
                path: path.to_string_lossy().into_owned(),
                language: language.clone(),
            }],
            language,
        }))
    }
}

fn warn_duplicate_ids(parent: &str, children: &[PublishNode]) {
    let mut seen = HashSet::new();
    for child in children {
        if !seen.insert(child.source_id()) {
            log::warn!(
                "Duplicate source_id '{}' under '{}'; the publisher keeps only one",
                child.source_id(),
                parent
            );
        }
    }
}

/// Map a transformed tree to the publishable tree, with the channel at the root.
///
/// A node kind the loader does not know is fatal.
pub fn load(tree: &ResourceNode, channel: &ChannelConfig) -> Result<PublishableTree> {
    let topic = tree.topic().ok_or_else(|| {
        AppError::validation(format!("cannot load a '{}' node as a tree", tree.kind()))
    })?;
    let loader = Loader {
        license: &channel.license,
    };
    let language = topic.language.as_deref().unwrap_or(&channel.language);

    Ok(PublishableTree {
        channel: channel.info(),
        license: channel.license.clone(),
        children: loader.map_children(topic, language)?,
    })
}

/// Run the load stage on the transformed checkpoint and write the publishable tree.
pub async fn run_load(config: &Config, storage: &dyn CheckpointStorage) -> Result<PublishableTree> {
    progress::header("Load - Building publishable tree");

    let input = storage.read_checkpoint(Stage::Transformed).await?;
    let publishable = load(&input.tree, &config.channel)?;
    let location = storage.write_publishable(&publishable).await?;

    progress::summary(
        "Load complete",
        &[
            ("Channel", publishable.channel.title.clone()),
            ("Top-level topics", publishable.children.len().to_string()),
            ("Content nodes", publishable.content_count().to_string()),
            ("Saved to", location.display().to_string()),
        ],
    );

    Ok(publishable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transformed_tree() -> ResourceNode {
        ResourceNode::Root(Topic::new("root").with_children(vec![
            ResourceNode::Subject(Topic {
                title: "Coping".into(),
                description: Some("Stress and coping".into()),
                children: vec![ResourceNode::Language(Topic {
                    title: "Arabic".into(),
                    language: Some("ar".into()),
                    children: vec![ResourceNode::Link(Link::local(
                        "Guide",
                        "chefdata/transformed/Guide.pdf",
                        "box_file:1",
                    ))],
                    ..Topic::default()
                })],
                ..Topic::default()
            }),
            ResourceNode::VideoPlaylist(Topic {
                title: "Sessions_ENGLISH".into(),
                language: Some("en".into()),
                children: vec![ResourceNode::Video(Video {
                    title: "Session 1".into(),
                    web_url: "https://vimeo.com/11".into(),
                    ..Video::default()
                })],
                ..Topic::default()
            }),
        ]))
    }

    #[test]
    fn test_maps_kinds() {
        let channel = ChannelConfig::default();
        let tree = load(&transformed_tree(), &channel).unwrap();

        assert_eq!(tree.channel.source_id, channel.source_id);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.content_count(), 2);

        let PublishNode::Topic(subject) = &tree.children[0] else {
            panic!("expected topic");
        };
        assert_eq!(subject.source_id, "Coping");
        assert_eq!(subject.language, channel.language);

        let PublishNode::Topic(arabic) = &subject.children[0] else {
            panic!("expected topic");
        };
        let PublishNode::Document(doc) = &arabic.children[0] else {
            panic!("expected document");
        };
        assert_eq!(doc.source_id, "box_file:1");
        assert_eq!(doc.language, "ar");
        assert_eq!(
            doc.files,
            vec![FileDescriptor::Document {
                path: "chefdata/transformed/Guide.pdf".into(),
                language: "ar".into(),
            }]
        );

        let PublishNode::Topic(playlist) = &tree.children[1] else {
            panic!("expected topic");
        };
        let PublishNode::Video(video) = &playlist.children[0] else {
            panic!("expected video");
        };
        assert_eq!(video.source_id, "https://vimeo.com/11");
        assert_eq!(video.language, "en");
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let tree = ResourceNode::Root(Topic::new("root").with_children(vec![
            ResourceNode::Subject(Topic::new("S").with_children(vec![ResourceNode::Unrecognized])),
        ]));
        let err = load(&tree, &ChannelConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::UnknownKind { ref parent } if parent == "S"));
    }

    #[test]
    fn test_document_requires_source_id_and_path() {
        let mut link = Link::local("Doc", "transformed/doc.pdf", "box_file:2");
        link.source_id = None;
        let tree = ResourceNode::Root(Topic::new("root").with_children(vec![ResourceNode::Link(link)]));
        assert!(matches!(
            load(&tree, &ChannelConfig::default()),
            Err(AppError::Checkpoint(_))
        ));

        let tree = ResourceNode::Root(Topic::new("root").with_children(vec![ResourceNode::Link(
            Link::remote("Doc", "https://rescue.box.com/s/x"),
        )]));
        assert!(load(&tree, &ChannelConfig::default()).is_err());
    }

    #[test]
    fn test_publishable_json_shape() {
        let tree = load(&transformed_tree(), &ChannelConfig::default()).unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["source_domain"], ChannelConfig::default().source_domain);
        assert_eq!(json["children"][0]["kind"], "topic");
        assert_eq!(
            json["children"][0]["children"][0]["children"][0]["files"][0]["file_type"],
            "document"
        );
        assert_eq!(json["children"][1]["children"][0]["kind"], "video");
    }
}
