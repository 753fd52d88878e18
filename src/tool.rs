use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::value::Value;

/// A positional parameter in a tool signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Value>,
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{}={}", self.name, default.to_literal()),
            None => f.write_str(&self.name),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Ordered positional parameters. Trailing parameters with defaults may be
    /// omitted by the caller.
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Whether the operator must approve each invocation.
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// Invoked with exactly one value per declared parameter.
    async fn call(&self, args: Vec<Value>) -> Result<Value>;
}

/// Static description of a tool that can be embedded in prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub description: String,
}

impl ToolDescriptor {
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
        format!("({})", params.join(", "))
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}: {}", self.name, self.signature(), self.description)
    }
}

/// The fixed set of tools available to one run, in registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register_arc(tool);
        }
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Registering a name twice replaces the earlier tool but keeps its slot
    /// in the manifest.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                tracing::warn!(tool = %name, "duplicate tool registration, replacing earlier entry");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| self.tools[slot].clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn requires_confirmation(&self, name: &str) -> bool {
        self.get(name)
            .map(|tool| tool.requires_confirmation())
            .unwrap_or(false)
    }

    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                parameters: tool.parameters(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    /// One `name(signature): description` line per tool.
    pub fn manifest(&self) -> String {
        self.describe()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        let args = bind_arguments(name, &tool.parameters(), args)?;
        tool.call(args).await.map_err(|source| match source {
            err @ (AgentError::InvalidArguments { .. } | AgentError::ToolInvocation { .. }) => err,
            other => AgentError::ToolInvocation {
                name: name.to_string(),
                source: Box::new(other),
            },
        })
    }
}

fn bind_arguments(name: &str, params: &[Parameter], mut args: Vec<Value>) -> Result<Vec<Value>> {
    if args.len() > params.len() {
        return Err(AgentError::invalid_arguments(
            name,
            format!(
                "takes {} positional argument(s) but {} were given",
                params.len(),
                args.len()
            ),
        ));
    }
    for param in &params[args.len()..] {
        match &param.default {
            Some(default) => args.push(default.clone()),
            None => {
                return Err(AgentError::invalid_arguments(
                    name,
                    format!("missing required argument `{}`", param.name),
                ))
            }
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its arguments"
        }

        fn parameters(&self) -> Vec<Parameter> {
            vec![Parameter::required("text"), Parameter::optional("times", 1)]
        }

        async fn call(&self, args: Vec<Value>) -> Result<Value> {
            Ok(Value::List(args))
        }
    }

    struct Failing(&'static str);

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn call(&self, _args: Vec<Value>) -> Result<Value> {
            Err(AgentError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )))
        }
    }

    #[test]
    fn manifest_follows_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Failing("zeta"));
        registry.register(Echo);

        assert_eq!(
            registry.manifest(),
            "zeta(): Always fails\necho(text, times=1): Echoes its arguments"
        );
        assert_eq!(registry.manifest(), registry.manifest());
    }

    #[test]
    fn duplicate_registration_keeps_slot_and_last_tool() {
        struct Other;

        #[async_trait]
        impl Tool for Other {
            fn name(&self) -> &str {
                "echo"
            }

            fn description(&self) -> &str {
                "Replacement"
            }

            async fn call(&self, _args: Vec<Value>) -> Result<Value> {
                Ok(Value::None)
            }
        }

        let registry = ToolRegistry::from_tools(vec![
            Arc::new(Echo) as Arc<dyn Tool>,
            Arc::new(Failing("other")),
            Arc::new(Other),
        ]);

        assert_eq!(registry.names(), vec!["echo", "other"]);
        assert_eq!(registry.describe()[0].description, "Replacement");
    }

    #[tokio::test]
    async fn dispatch_fills_defaults() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);

        let out = registry.dispatch("echo", vec!["hi".into()]).await.unwrap();
        assert_eq!(out, Value::List(vec!["hi".into(), Value::Int(1)]));
    }

    #[tokio::test]
    async fn dispatch_rejects_bad_arity() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);

        let err = registry.dispatch("echo", vec![]).await.unwrap_err();
        assert!(err.to_string().contains("missing required argument `text`"));

        let err = registry
            .dispatch("echo", vec!["a".into(), Value::Int(2), Value::None])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn unknown_tool_is_case_sensitive() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);

        let err = registry.dispatch("Echo", vec![]).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "Echo"));
    }

    #[tokio::test]
    async fn wraps_tool_failures() {
        let mut registry = ToolRegistry::new();
        registry.register(Failing("broken"));

        let err = registry.dispatch("broken", vec![]).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolInvocation { ref name, .. } if name == "broken"));
        assert!(err.to_string().contains("no such file"));
    }
}
