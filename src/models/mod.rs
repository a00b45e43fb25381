// src/models/mod.rs

//! Domain models for the chef pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod checkpoint;
mod config;
mod node;
mod publish;

// Re-export all public types
pub use checkpoint::{Checkpoint, SCHEMA_VERSION, Stage};
pub use config::{
    ChannelConfig, Config, ConversionConfig, DataDirs, HttpConfig, PathsConfig, ProviderConfig,
    SiteConfig,
};
pub use node::{Link, Locator, ResourceNode, Topic, Video};
pub use publish::{
    ChannelInfo, ContainerNode, ContentNode, FileDescriptor, License, PublishNode,
    PublishableTree,
};
