//! Veriscope - URL content acquisition and AI analysis system.
//!
//! Ingests a URL (video, article, podcast, short post, or document),
//! acquires its textual content, and produces a structured multi-section
//! analysis persisted per content item and per output language.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod repository;
pub mod server;
pub mod utils;
