//! Tool routing and dispatch
//!
//! Defines the ToolRouter trait every transport binding talks to, and the
//! Dispatcher that resolves a tool name to its handler and turns every
//! outcome (including panics) into exactly one `ToolOutput`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::api::BangumiClient;
use crate::error::{BangumiError, Result};

use super::arguments::Arguments;
use super::catalog::ToolCatalog;
use super::definition::Tool;
use super::handlers::{self, Handler};
use super::output::ToolOutput;

/// Trait for listing and calling tools
#[async_trait]
pub trait ToolRouter: Send + Sync {
    /// The tool catalog, in order
    fn list_tools(&self) -> Vec<Tool>;

    /// Call a tool; never fails, errors come back as an error payload
    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolOutput;
}

/// Name-keyed dispatcher over a shared `BangumiClient`
pub struct Dispatcher {
    client: BangumiClient,
    catalog: ToolCatalog,
    handlers: HashMap<String, Handler>,
}

impl Dispatcher {
    /// Dispatcher over the built-in catalog and handlers
    pub fn new(client: BangumiClient) -> Result<Self> {
        Self::with_catalog(client, ToolCatalog::builtin()?, handlers::builtin())
    }

    /// Every catalog entry must have exactly one handler, and vice versa
    pub fn with_catalog(
        client: BangumiClient,
        catalog: ToolCatalog,
        table: Vec<(&'static str, Handler)>,
    ) -> Result<Self> {
        let mut handlers = HashMap::new();
        for (name, handler) in table {
            if handlers.insert(name.to_string(), handler).is_some() {
                return Err(BangumiError::Config(format!("Duplicate handler '{}'", name)));
            }
        }
        for tool in catalog.all() {
            if !handlers.contains_key(&tool.name) {
                return Err(BangumiError::Config(format!("Tool '{}' has no handler", tool.name)));
            }
        }
        if let Some(orphan) = handlers.keys().find(|name| !catalog.contains(name)) {
            return Err(BangumiError::Config(format!("Handler '{}' has no catalog entry", orphan)));
        }

        debug!("Dispatcher ready with {} tools", catalog.len());
        Ok(Self {
            client,
            catalog,
            handlers,
        })
    }

    /// Add or replace a tool together with its handler
    pub fn register(&mut self, tool: Tool, handler: Handler) {
        self.handlers.insert(tool.name.clone(), handler);
        self.catalog.add(tool);
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Map a handler result onto the output the caller sees
    fn settle(name: &str, result: Result<ToolOutput>) -> ToolOutput {
        match result {
            Ok(output) => {
                info!("tool {} -> {}", name, if output.is_error() { "error" } else { "ok" });
                output
            }
            Err(e) if e.is_validation() => {
                debug!("tool {} rejected arguments: {}", name, e);
                ToolOutput::validation(e.to_string())
            }
            Err(e) => {
                error!("tool {} failed: {}", name, e);
                ToolOutput::fault(e)
            }
        }
    }
}

#[async_trait]
impl ToolRouter for Dispatcher {
    fn list_tools(&self) -> Vec<Tool> {
        self.catalog.all().cloned().collect()
    }

    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolOutput {
        let (Some(tool), Some(handler)) = (self.catalog.get(name), self.handlers.get(name)) else {
            warn!("Unknown tool requested: {}", name);
            return ToolOutput::unknown_tool(name);
        };

        let args = match Arguments::from_value(arguments).and_then(|args| {
            args.check_required(tool)?;
            Ok(args.with_defaults(tool))
        }) {
            Ok(args) => args,
            Err(e) => return Self::settle(name, Err(e)),
        };

        let future = handler(self.client.clone(), args);
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => Self::settle(name, result),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("tool {} panicked: {}", name, message);
                ToolOutput::fault(message)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool handler panicked".to_string()
    }
}
