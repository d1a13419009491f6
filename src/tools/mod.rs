//! Tool System - registry, handlers and dispatch
//!
//! The catalog is the discovery surface, each handler maps one tool onto
//! the API client, and the Dispatcher ties names to handlers.

mod arguments;
mod catalog;
mod definition;
mod handlers;
mod output;
mod router;

pub use arguments::Arguments;
pub use catalog::ToolCatalog;
pub use definition::Tool;
pub use handlers::Handler;
pub use output::{ToolOutput, remove_null_items};
pub use router::{Dispatcher, ToolRouter};
