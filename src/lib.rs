// src/lib.rs

//! SHLS toolkit chef library: crawl, scrape, transform and load the toolkit
//! into a publishable content tree.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
