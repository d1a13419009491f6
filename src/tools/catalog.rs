//! Tool catalog loading from YAML
//!
//! The built-in catalog ships inside the binary (`catalog.yml`) and is parsed
//! once at startup. Order is preserved so `tools/list` is stable.

use std::collections::HashMap;

use crate::error::{BangumiError, Result};

use super::definition::Tool;

const BUILTIN_CATALOG: &str = include_str!("catalog.yml");

/// Ordered catalog of tool descriptors
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Load catalog from a YAML string (a sequence of tools)
    pub fn from_yaml(content: &str) -> Result<Self> {
        let tools: Vec<Tool> = serde_yaml::from_str(content)
            .map_err(|e| BangumiError::Config(format!("Failed to parse tool catalog: {}", e)))?;

        let mut catalog = Self::new();
        for tool in tools {
            if catalog.contains(&tool.name) {
                return Err(BangumiError::Config(format!("Duplicate tool '{}' in catalog", tool.name)));
            }
            Self::check_schema(&tool)?;
            catalog.add(tool);
        }
        Ok(catalog)
    }

    /// Every required name must be a declared property
    fn check_schema(tool: &Tool) -> Result<()> {
        if !tool.input_schema.is_object() {
            return Err(BangumiError::Config(format!("Tool '{}' has a non-object schema", tool.name)));
        }
        for name in tool.required() {
            let declared = tool.properties().is_some_and(|props| props.contains_key(name));
            if !declared {
                return Err(BangumiError::Config(format!(
                    "Tool '{}' requires undeclared parameter '{}'",
                    tool.name, name
                )));
            }
        }
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// List all tool names in catalog order
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Get all tools in catalog order
    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Add a tool, replacing any existing tool with the same name in place
    pub fn add(&mut self, tool: Tool) {
        match self.index.get(&tool.name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}
