//! Bangumi-MCP - the Bangumi API exposed as Model Context Protocol tools
//!
//! A caller lists the tool catalog, then calls tools by name with JSON
//! arguments. Each call goes through the Dispatcher to one handler, which
//! makes one API call and returns a normalized success or error payload.

pub mod api;
pub mod error;
pub mod mcp;
pub mod render;
pub mod tools;

pub use error::{BangumiError, Result};
