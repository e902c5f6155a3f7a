pub mod assembler;
pub mod catalog;
pub mod jobs;
pub mod llm;
pub mod matcher;
pub mod prompt;
pub mod rate_limiter;
pub mod resolver;
pub mod sanitizer;
pub mod selection;
pub mod spotify;
