//! Service layer for the chef application.
//!
//! This module contains the clients and parsers the stages build on:
//! - Toolkit site page parsing (`ToolkitSite`)
//! - Shared-storage API access (`BoxClient`)
//! - Video metadata extraction (`VideoInfoSource`, `YtDlp`)
//! - Document conversion (`DocumentConverter`)

pub mod box_api;
mod converter;
mod site;
pub mod video;

pub use box_api::BoxClient;
pub use converter::DocumentConverter;
pub use site::{StartPage, ToolkitSite, TopicTile};
pub use video::{VideoInfo, VideoInfoSource, YtDlp};
