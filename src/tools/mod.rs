/// MCP tools for the insight engine
///
/// This module contains all the MCP tools that external clients can call to
/// record events, read insight reports and dispatch AI requests.

pub mod dispatch;
pub mod insights;
pub mod record;

// Re-export tool functions for easy access
pub use dispatch::*;
pub use insights::*;
pub use record::*;
