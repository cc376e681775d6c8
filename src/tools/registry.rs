use anyhow::{anyhow, Result};

use super::Tool;

/// Tools in registration order.
///
/// Names are unique; `tools/list` reports tools in the order they were added.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails when the name is already taken.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        if self.tools.iter().any(|existing| existing.name() == tool.name()) {
            return Err(anyhow!("tool '{}' already registered", tool.name()));
        }
        self.tools.push(Box::new(tool));
        Ok(())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Tool + 'static)> {
        self.tools
            .iter_mut()
            .find(|tool| tool.name() == name)
            .map(|tool| tool.as_mut())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|tool| tool.as_ref())
    }

    /// Shut every tool down in registration order. Failures are logged, not propagated.
    pub fn shutdown(&mut self) {
        for tool in &mut self.tools {
            if let Err(err) = tool.shutdown() {
                log::warn!("shutdown of tool {} failed: {:#}", tool.name(), err);
            }
        }
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
    use crate::tools::ToolError;
    use serde_json::{json, Value};

    struct Named(&'static str);

    struct Closable {
        name: &'static str,
        log: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Tool for Closable {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "records shutdown"
        }

        fn input_schema(&self) -> Value {
            json!({ "type": "object" })
        }

        fn call(&mut self, _arguments: &Value) -> Result<Value, ToolError> {
            Ok(Value::Null)
        }

        fn shutdown(&mut self) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(anyhow!("busy"));
            }
            Ok(())
        }
    }

    impl Tool for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "test tool"
        }

        fn input_schema(&self) -> Value {
            json!({ "type": "object" })
        }

        fn call(&mut self, _arguments: &Value) -> Result<Value, ToolError> {
            Ok(Value::String(self.0.to_string()))
        }
    }

    #[test]
    fn keeps_registration_order_and_rejects_duplicates() -> Result<()> {
        let mut registry = ToolRegistry::new();
        registry.register(Named("b"))?;
        registry.register(Named("a"))?;
        assert!(registry.register(Named("a")).is_err());
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert_eq!(registry.len(), 2);

        let tool = registry.get_mut("a").ok_or_else(|| anyhow!("missing"))?;
        assert_eq!(tool.call(&json!({}))?, json!("a"));
        assert!(registry.get_mut("c").is_none());
        Ok(())
    }

    #[test]
    fn shutdown_reaches_every_tool_even_after_a_failure() -> Result<()> {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = ToolRegistry::new();
        registry.register(Closable {
            name: "first",
            log: log.clone(),
            fail: true,
        })?;
        registry.register(Named("plain"))?;
        registry.register(Closable {
            name: "second",
            log: log.clone(),
            fail: false,
        })?;

        registry.shutdown();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        Ok(())
    }
}
