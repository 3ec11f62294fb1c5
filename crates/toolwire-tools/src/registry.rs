//! Tool registry for name-based dispatch.

use crate::descriptor::ToolDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use toolwire_mcp::{RemoteToolInfo, RpcSession};
use toolwire_types::{ToolDefinition, ToolError, ToolOutput};

/// Registry of available tools. Names are unique; schemas are listed in
/// registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for tool in [crate::sum_tool(), crate::echo_tool()] {
            registry.replace(tool);
        }
        registry
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), ToolError> {
        if self.index.contains_key(&tool.name) {
            return Err(ToolError::DuplicateName { name: tool.name });
        }
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Register a tool, overriding any existing tool with the same name.
    /// The replaced tool keeps its position. Returns the previous tool.
    pub fn replace(&mut self, tool: ToolDescriptor) -> Option<ToolDescriptor> {
        match self.index.get(&tool.name) {
            Some(&slot) => Some(std::mem::replace(&mut self.tools[slot], tool)),
            None => {
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(tool);
                None
            }
        }
    }

    /// Register a tool discovered on a connected server.
    pub fn register_remote(
        &mut self,
        session: Arc<RpcSession>,
        info: RemoteToolInfo,
    ) -> Result<(), ToolError> {
        self.register(ToolDescriptor::remote(session, info))
    }

    /// Register every discovered tool, skipping name collisions with a
    /// warning. Returns the number registered.
    pub fn register_all_remote(
        &mut self,
        tools: impl IntoIterator<Item = (Arc<RpcSession>, RemoteToolInfo)>,
    ) -> usize {
        let mut registered = 0;
        for (session, info) in tools {
            let server = session.server_name().to_string();
            match self.register_remote(session, info) {
                Ok(()) => registered += 1,
                Err(e) => tracing::warn!("Skipping tool from MCP server '{}': {}", server, e),
            }
        }
        registered
    }

    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor, ToolError> {
        self.index
            .get(name)
            .map(|&slot| &self.tools[slot])
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
            })
    }

    /// Get all tool definitions for sending to the backend.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDescriptor::definition).collect()
    }

    /// Execute a tool by name with the given arguments.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self.lookup(name)?;
        tracing::debug!(tool = name, remote = tool.is_remote(), "executing tool");
        tool.invoke(arguments).await
    }

    /// Check if a tool exists by name.
    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolwire_mcp::ServerConfig;
    use toolwire_types::empty_object_schema;

    fn constant(name: &str, value: i64) -> ToolDescriptor {
        ToolDescriptor::local(name, format!("Returns {value}"), empty_object_schema(), move |_| {
            Ok(serde_json::json!(value))
        })
    }

    fn remote_info(name: &str) -> RemoteToolInfo {
        RemoteToolInfo {
            name: name.to_string(),
            description: format!("Remote {name}"),
            input_schema: empty_object_schema(),
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = ToolRegistry::with_builtins();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["sumar", "echo"]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(constant("one", 1)).unwrap();
        match registry.register(constant("one", 2)) {
            Err(ToolError::DuplicateName { name }) => assert_eq!(name, "one"),
            other => panic!("Expected DuplicateName, got {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn replace_overrides_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(constant("one", 1)).unwrap();
        registry.register(constant("two", 2)).unwrap();

        let old = registry.replace(constant("one", 11));
        assert!(old.is_some());
        assert!(registry.replace(constant("three", 3)).is_none());

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["one", "two", "three"]);
        let out = registry.execute("one", serde_json::json!({})).await.unwrap();
        assert_eq!(out.value, 11);
    }

    #[test]
    fn lookup_unknown_is_not_found() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.lookup("missing"),
            Err(ToolError::NotFound { .. })
        ));
        assert!(!registry.has_tool("missing"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn execute_unknown_is_not_found() {
        let registry = ToolRegistry::with_builtins();
        let err = registry
            .execute("nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: nope");
    }

    #[test]
    fn remote_and_local_tools_share_one_namespace() {
        let session = Arc::new(RpcSession::new("web", ServerConfig::new("cat", vec![])));
        let mut registry = ToolRegistry::new();
        registry
            .register_remote(Arc::clone(&session), remote_info("a"))
            .unwrap();
        registry
            .register_remote(Arc::clone(&session), remote_info("b"))
            .unwrap();
        registry.register(crate::sum_tool()).unwrap();

        let defs = registry.definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "sumar"]);

        assert!(matches!(
            registry.register(crate::sum_tool()),
            Err(ToolError::DuplicateName { .. })
        ));
        assert!(matches!(
            registry.register_remote(session, remote_info("sumar")),
            Err(ToolError::DuplicateName { .. })
        ));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn register_all_remote_skips_collisions() {
        let session = Arc::new(RpcSession::new("web", ServerConfig::new("cat", vec![])));
        let mut registry = ToolRegistry::with_builtins();
        let count = registry.register_all_remote(vec![
            (Arc::clone(&session), remote_info("fetch")),
            (Arc::clone(&session), remote_info("echo")),
            (session, remote_info("search")),
        ]);
        assert_eq!(count, 2);
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["sumar", "echo", "fetch", "search"]);
        assert!(!registry.lookup("echo").unwrap().is_remote());
    }
}
