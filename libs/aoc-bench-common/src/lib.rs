pub mod code_stats;
pub mod config;
pub mod discovery;
pub mod error;
pub mod paths;
pub mod tasks;
pub mod types;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::BenchError;
pub use types::{
    AuthorFilter, Authorship, CodeStats, Dataset, Language, RunResult, Solution, SolutionRecord,
    Task,
};
