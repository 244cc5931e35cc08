pub mod acquisition;
pub mod cli;
pub mod compression;
pub mod config;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod logging;
pub mod review;
pub mod scoring;
pub mod search;
pub mod tasks;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use generator::workflow::launch;
pub use generator::{ResearchPlanGenerator, ResearchResult};
