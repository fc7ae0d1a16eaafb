pub mod analysis;
pub mod client;
pub mod extractor;
pub mod gateway;
pub mod prompts;

pub use analysis::*;
pub use client::*;
pub use extractor::*;
pub use gateway::*;
