use std::path::PathBuf;
use std::sync::Arc;

use crate::action::{parse_action, ParsedAction};
use crate::error::Result;
use crate::hooks::{AgentHook, ConfirmationHandler, StdinConfirmation};
use crate::llm::LanguageModel;
use crate::memory::Transcript;
use crate::message::Message;
use crate::prompt::{self, PromptContext};
use crate::protocol::{self, Directive};
use crate::tool::ToolRegistry;

pub const CANCELLED_MESSAGE: &str = "operation cancelled by user";

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model produced a `<final_answer>`.
    Finished(String),
    /// The operator declined a gated tool call.
    Cancelled(String),
    /// The model broke the reply contract and the run cannot continue.
    ProtocolViolation(String),
}

/// A reason-then-act agent that alternates between the model and registered
/// tools until the model gives a final answer.
pub struct Agent<M: LanguageModel> {
    model: Arc<M>,
    tools: ToolRegistry,
    prompt_template: String,
    project_directory: Option<PathBuf>,
    max_steps: Option<usize>,
    hooks: Vec<Arc<dyn AgentHook>>,
    confirmation_handler: Arc<dyn ConfirmationHandler>,
}

impl<M: LanguageModel> Agent<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            tools: ToolRegistry::new(),
            prompt_template: prompt::DEFAULT_TEMPLATE.to_string(),
            project_directory: None,
            max_steps: None,
            hooks: Vec::new(),
            confirmation_handler: Arc::new(StdinConfirmation::stdin()),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Replace the system prompt template. `${tool_list}`,
    /// `${operating_system}` and `${file_list}` are still substituted.
    pub fn with_system_prompt(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_project_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.project_directory = Some(directory.into());
        self
    }

    /// Cap the number of model turns. A cap of zero is treated as one.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps.max(1));
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn AgentHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_confirmation_handler(mut self, handler: Arc<dyn ConfirmationHandler>) -> Self {
        self.confirmation_handler = handler;
        self
    }

    pub fn system_prompt(&self) -> Result<String> {
        let context = match &self.project_directory {
            Some(dir) => PromptContext::for_project(&self.tools, dir)?,
            None => PromptContext::for_tools(&self.tools),
        };
        Ok(prompt::render(&self.prompt_template, &context))
    }

    /// Run one task to completion.
    ///
    /// Tool failures, unknown tools and bad arguments are fed back to the model
    /// as observations. A malformed action or a backend failure ends the run
    /// with an error.
    pub async fn run(&mut self, task: impl Into<String>) -> Result<LoopOutcome> {
        let task = task.into();
        let mut transcript = Transcript::start(self.system_prompt()?, protocol::question(&task))?;
        tracing::info!(tools = self.tools.len(), "starting run");

        let mut step = 0usize;
        loop {
            if let Some(limit) = self.max_steps {
                if step >= limit {
                    tracing::warn!(limit, "step limit reached without a final answer");
                    return Ok(LoopOutcome::ProtocolViolation(format!(
                        "no final answer after {limit} steps"
                    )));
                }
            }
            step += 1;

            for hook in &self.hooks {
                hook.before_model(transcript.messages()).await?;
            }
            tracing::debug!(step, messages = transcript.len(), "requesting model");
            let reply = self.model.complete(transcript.messages()).await?;
            for hook in &self.hooks {
                hook.after_model(&reply).await?;
            }

            if reply.is_empty() {
                tracing::warn!(step, "model returned an empty reply");
                return Ok(LoopOutcome::ProtocolViolation(
                    "model returned an empty reply".into(),
                ));
            }
            transcript.push(Message::assistant(reply.as_str()))?;

            let scanned = protocol::scan_reply(&reply);
            if let Some(thought) = scanned.thought {
                tracing::info!(thought = thought.trim(), "thought");
                for hook in &self.hooks {
                    hook.on_thought(thought).await?;
                }
            }

            let action = match scanned.directive {
                Directive::FinalAnswer(answer) => {
                    tracing::info!(step, "final answer received");
                    for hook in &self.hooks {
                        hook.on_final_answer(answer).await?;
                    }
                    return Ok(LoopOutcome::Finished(answer.to_string()));
                }
                Directive::Missing => {
                    tracing::warn!(step, "reply has neither <action> nor <final_answer>");
                    return Ok(LoopOutcome::ProtocolViolation(
                        "model reply contained neither <action> nor <final_answer>".into(),
                    ));
                }
                Directive::Action(text) => parse_action(text)?,
            };

            let Some(observation) = self.dispatch(&action).await? else {
                return Ok(LoopOutcome::Cancelled(CANCELLED_MESSAGE.into()));
            };
            transcript.push(Message::user(protocol::observation(&observation)))?;
        }
    }

    /// Execute one action. Returns `None` when the operator declines it.
    async fn dispatch(&self, action: &ParsedAction) -> Result<Option<String>> {
        tracing::info!(action = %action, "dispatching action");
        for hook in &self.hooks {
            hook.before_tool_call(action).await?;
        }

        if self.tools.requires_confirmation(&action.name)
            && !self.confirmation_handler.confirm_tool_call(action).await?
        {
            tracing::info!(tool = %action.name, "operator declined tool call");
            return Ok(None);
        }

        let observation = match self
            .tools
            .dispatch(&action.name, action.arguments.clone())
            .await
        {
            Ok(value) => value.to_string(),
            Err(err) => {
                tracing::warn!(tool = %action.name, error = %err, "tool call failed");
                format!("tool execution error: {err}")
            }
        };

        for hook in &self.hooks {
            hook.after_tool_result(action, &observation).await?;
        }
        Ok(Some(observation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::AgentError;
    use crate::message::Role;
    use crate::tool::{Parameter, Tool};
    use crate::value::Value;
    use crate::StubModel;

    #[derive(Default)]
    struct CountingTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "count"
        }

        fn description(&self) -> &str {
            "Counts invocations and echoes its text"
        }

        fn parameters(&self) -> Vec<Parameter> {
            vec![Parameter::required("text")]
        }

        async fn call(&self, args: Vec<Value>) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Str(format!("counted {}", args[0])))
        }
    }

    #[derive(Default)]
    struct GatedTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for GatedTool {
        fn name(&self) -> &str {
            "run_terminal_command"
        }

        fn description(&self) -> &str {
            "Pretends to run a command"
        }

        fn parameters(&self) -> Vec<Parameter> {
            vec![Parameter::required("command")]
        }

        fn requires_confirmation(&self) -> bool {
            true
        }

        async fn call(&self, _args: Vec<Value>) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Str("command succeeded".into()))
        }
    }

    struct FixedAnswer(bool);

    #[async_trait]
    impl ConfirmationHandler for FixedAnswer {
        async fn confirm_tool_call(&self, _action: &ParsedAction) -> Result<bool> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingHook {
        thoughts: Mutex<Vec<String>>,
        observations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AgentHook for RecordingHook {
        async fn on_thought(&self, thought: &str) -> Result<()> {
            self.thoughts.lock().unwrap().push(thought.to_string());
            Ok(())
        }

        async fn after_tool_result(&self, _action: &ParsedAction, observation: &str) -> Result<()> {
            self.observations.lock().unwrap().push(observation.to_string());
            Ok(())
        }
    }

    fn registry_with(tool: Arc<dyn Tool>) -> ToolRegistry {
        ToolRegistry::from_tools([tool])
    }

    #[tokio::test]
    async fn finishes_without_dispatch() {
        let model = StubModel::new(vec![
            "<thought>trivial</thought><final_answer>4</final_answer>".into(),
        ]);
        let counter = Arc::new(CountingTool::default());
        let mut agent = Agent::new(model.clone()).with_tools(registry_with(counter.clone()));

        let outcome = agent.run("what is 2+2?").await.unwrap();

        assert_eq!(outcome, LoopOutcome::Finished("4".into()));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        let roles: Vec<Role> = requests[0].iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert_eq!(requests[0][1].content, "<question>what is 2+2?</question>");
    }

    #[tokio::test]
    async fn executes_tool_then_replies() {
        let model = StubModel::new(vec![
            "<thought>count it</thought>\n<action>count(\"a, b\")</action>".into(),
            "<thought>done</thought><final_answer>counted</final_answer>".into(),
        ]);
        let counter = Arc::new(CountingTool::default());
        let hook = Arc::new(RecordingHook::default());
        let mut agent = Agent::new(model.clone())
            .with_tools(registry_with(counter.clone()))
            .with_hook(hook.clone());

        let outcome = agent.run("count").await.unwrap();

        assert_eq!(outcome, LoopOutcome::Finished("counted".into()));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*hook.thoughts.lock().unwrap(), vec!["count it", "done"]);

        let second = &model.requests()[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[3].role, Role::User);
        assert_eq!(second[3].content, "<observation>counted a, b</observation>");
    }

    #[tokio::test]
    async fn unknown_tool_becomes_observation() {
        let model = StubModel::new(vec![
            "<thought>x</thought><action>missing_tool(1)</action>".into(),
            "<final_answer>recovered</final_answer>".into(),
        ]);
        let hook = Arc::new(RecordingHook::default());
        let mut agent = Agent::new(model.clone()).with_hook(hook.clone());

        let outcome = agent.run("task").await.unwrap();

        assert_eq!(outcome, LoopOutcome::Finished("recovered".into()));
        let observations = hook.observations.lock().unwrap();
        assert_eq!(
            observations[0],
            "tool execution error: tool `missing_tool` not found"
        );
    }

    #[tokio::test]
    async fn argument_mismatch_becomes_observation() {
        let model = StubModel::new(vec![
            "<action>count()</action>".into(),
            "<final_answer>ok</final_answer>".into(),
        ]);
        let counter = Arc::new(CountingTool::default());
        let mut agent = Agent::new(model.clone()).with_tools(registry_with(counter.clone()));

        assert_eq!(
            agent.run("task").await.unwrap(),
            LoopOutcome::Finished("ok".into())
        );
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
        let observation = &model.requests()[1][3].content;
        assert!(observation.starts_with("<observation>tool execution error: invalid arguments"));
    }

    #[tokio::test]
    async fn missing_tags_is_protocol_violation() {
        let model = StubModel::new(vec!["<thought>hmm</thought>The answer is 4.".into()]);
        let mut agent = Agent::new(model);

        let outcome = agent.run("task").await.unwrap();

        assert!(matches!(outcome, LoopOutcome::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn empty_reply_is_protocol_violation() {
        let model = StubModel::new(vec![String::new()]);
        let outcome = Agent::new(model).run("task").await.unwrap();
        assert!(matches!(outcome, LoopOutcome::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn malformed_action_fails_the_run() {
        let model = StubModel::new(vec!["<action>this is not a call</action>".into()]);
        let err = Agent::new(model).run("task").await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedAction(_)));
    }

    #[tokio::test]
    async fn declined_confirmation_cancels_without_side_effect() {
        let model = StubModel::new(vec![
            "<thought>clean</thought><action>run_terminal_command(\"rm -rf build\")</action>".into(),
        ]);
        let gated = Arc::new(GatedTool::default());
        let mut agent = Agent::new(model)
            .with_tools(registry_with(gated.clone()))
            .with_confirmation_handler(Arc::new(FixedAnswer(false)));

        let outcome = agent.run("clean up").await.unwrap();

        assert_eq!(outcome, LoopOutcome::Cancelled(CANCELLED_MESSAGE.into()));
        assert_eq!(gated.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn approved_confirmation_runs_gated_tool() {
        let model = StubModel::new(vec![
            "<action>run_terminal_command('make')</action>".into(),
            "<final_answer>built</final_answer>".into(),
        ]);
        let gated = Arc::new(GatedTool::default());
        let mut agent = Agent::new(model)
            .with_tools(registry_with(gated.clone()))
            .with_confirmation_handler(Arc::new(FixedAnswer(true)));

        assert_eq!(
            agent.run("build").await.unwrap(),
            LoopOutcome::Finished("built".into())
        );
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ungated_tools_skip_confirmation() {
        let model = StubModel::new(vec![
            "<action>count('x')</action>".into(),
            "<final_answer>ok</final_answer>".into(),
        ]);
        let counter = Arc::new(CountingTool::default());
        let mut agent = Agent::new(model)
            .with_tools(registry_with(counter.clone()))
            .with_confirmation_handler(Arc::new(FixedAnswer(false)));

        assert_eq!(
            agent.run("task").await.unwrap(),
            LoopOutcome::Finished("ok".into())
        );
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn step_limit_stops_the_loop() {
        let model = StubModel::new(vec![
            "<action>count('1')</action>".into(),
            "<action>count('2')</action>".into(),
            "<action>count('3')</action>".into(),
        ]);
        let counter = Arc::new(CountingTool::default());
        let mut agent = Agent::new(model)
            .with_tools(registry_with(counter.clone()))
            .with_max_steps(2);

        let outcome = agent.run("loop").await.unwrap();

        assert!(matches!(outcome, LoopOutcome::ProtocolViolation(msg) if msg.contains("2 steps")));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn system_prompt_lists_tools() {
        let model = StubModel::new(vec![]);
        let agent = Agent::new(model)
            .with_tools(registry_with(Arc::new(CountingTool::default())))
            .with_system_prompt("Tools:\n${tool_list}\nOS: ${operating_system}");

        let prompt = agent.system_prompt().unwrap();

        assert!(prompt.starts_with("Tools:\n- count(text): Counts invocations and echoes its text\nOS: "));
    }

    #[tokio::test]
    async fn system_prompt_lists_project_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();
        let agent = Agent::new(StubModel::new(vec![]))
            .with_project_directory(dir.path())
            .with_system_prompt("Files: ${file_list}");

        let prompt = agent.system_prompt().unwrap();

        let expected = dir.path().canonicalize().unwrap().join("notes.md");
        assert_eq!(prompt, format!("Files: {}", expected.display()));
    }

    #[tokio::test]
    async fn backend_failure_is_an_error() {
        let model = StubModel::new(vec![]);
        let err = Agent::new(model).run("task").await.unwrap_err();
        assert!(matches!(err, AgentError::LanguageModel(_)));
    }
}
