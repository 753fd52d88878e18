//! The tagged text protocol spoken between the model and the controller.
//!
//! Every model reply carries an optional `<thought>` followed by either an
//! `<action>` or a `<final_answer>`. Tool results go back as
//! `<observation>` user messages. Tags are case-sensitive and may span lines.

use std::sync::LazyLock;

use regex::Regex;

static THOUGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<thought>(.*?)</thought>").expect("valid thought pattern"));
static ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<action>(.*?)</action>").expect("valid action pattern"));
static FINAL_ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<final_answer>(.*?)</final_answer>").expect("valid final answer pattern")
});

const FINAL_ANSWER_OPEN: &str = "<final_answer>";

/// What a reply asks the controller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    FinalAnswer(&'a str),
    Action(&'a str),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedReply<'a> {
    pub thought: Option<&'a str>,
    pub directive: Directive<'a>,
}

/// Split a model reply into its thought and directive. A final answer wins
/// over an action when both are present.
pub fn scan_reply(reply: &str) -> ScannedReply<'_> {
    let thought = first_capture(&THOUGHT_RE, reply);

    let directive = if let Some(answer) = final_answer(reply) {
        Directive::FinalAnswer(answer)
    } else if let Some(action) = first_capture(&ACTION_RE, reply) {
        Directive::Action(action)
    } else {
        Directive::Missing
    };

    ScannedReply { thought, directive }
}

fn final_answer(reply: &str) -> Option<&str> {
    if let Some(answer) = first_capture(&FINAL_ANSWER_RE, reply) {
        return Some(answer);
    }
    // Replies cut off before the closing tag still end the run.
    reply
        .find(FINAL_ANSWER_OPEN)
        .map(|start| &reply[start + FINAL_ANSWER_OPEN.len()..])
}

fn first_capture<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn question(task: &str) -> String {
    format!("<question>{task}</question>")
}

pub fn observation(text: &str) -> String {
    format!("<observation>{text}</observation>")
}
