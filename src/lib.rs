//! Incremental build core for a static site generator.
//!
//! This crate owns content discovery, caching, cascading, taxonomy
//! derivation, snapshot freezing, incremental planning, wave scheduling,
//! and postprocess invocation. Markdown parsing and template rendering are
//! narrow, injected interfaces (see [`collaborators`]) — their internals
//! are a separate concern from the build graph this crate schedules.

pub mod assets;
pub mod cache;
pub mod cascade;
pub mod collaborators;
pub mod config;
pub mod content;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod planner;
pub mod postprocess;
pub mod scheduler;
pub mod site;
pub mod snapshot;
pub mod taxonomy;

pub mod primitives;

pub use config::SiteConfig;
pub use error::BuildError;
pub use orchestrator::{BuildStats, Orchestrator};
pub use site::Site;
pub use snapshot::SiteSnapshot;
