// ABOUTME: Benchmark tags and the capability record each one resolves to
// ABOUTME: One lookup table replaces per-benchmark strategy types (prompts, action parsing, answer matching)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Benchmark {
    HotpotQA,
    Fever,
    AmbigNQ,
    TriviaQA,
    Gsm8k,
    Svamp,
    TabMwp,
    HumanEval,
    Mbpp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkFamily {
    Qa,
    Math,
    Code,
}

impl Benchmark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Benchmark::HotpotQA => "hotpotqa",
            Benchmark::Fever => "fever",
            Benchmark::AmbigNQ => "ambignq",
            Benchmark::TriviaQA => "triviaqa",
            Benchmark::Gsm8k => "gsm8k",
            Benchmark::Svamp => "svamp",
            Benchmark::TabMwp => "tabmwp",
            Benchmark::HumanEval => "humaneval",
            Benchmark::Mbpp => "mbpp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|b| b.as_str() == s.trim().to_lowercase())
    }

    pub fn all() -> Vec<Self> {
        vec![
            Benchmark::HotpotQA,
            Benchmark::Fever,
            Benchmark::AmbigNQ,
            Benchmark::TriviaQA,
            Benchmark::Gsm8k,
            Benchmark::Svamp,
            Benchmark::TabMwp,
            Benchmark::HumanEval,
            Benchmark::Mbpp,
        ]
    }

    pub fn family(&self) -> BenchmarkFamily {
        match self {
            Benchmark::HotpotQA | Benchmark::Fever | Benchmark::AmbigNQ | Benchmark::TriviaQA => {
                BenchmarkFamily::Qa
            }
            Benchmark::Gsm8k | Benchmark::Svamp | Benchmark::TabMwp => BenchmarkFamily::Math,
            Benchmark::HumanEval | Benchmark::Mbpp => BenchmarkFamily::Code,
        }
    }

    /// Capability record for this benchmark
    pub fn capabilities(&self) -> &'static Capabilities {
        match self.family() {
            BenchmarkFamily::Qa => &QA_CAPABILITIES,
            BenchmarkFamily::Math => &MATH_CAPABILITIES,
            BenchmarkFamily::Code => &CODE_CAPABILITIES,
        }
    }
}

impl std::fmt::Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action extracted from model output.
///
/// An empty `action_type` is the sentinel for output that could not be parsed;
/// environments answer it with an invalid-action observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAction {
    pub action_type: String,
    pub argument: String,
}

impl ParsedAction {
    pub fn new(action_type: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            argument: argument.into(),
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn is_invalid(&self) -> bool {
        self.action_type.is_empty()
    }

    /// Render as `Type[argument]`, the form used in scratchpads
    pub fn render(&self) -> String {
        format!("{}[{}]", self.action_type, self.argument)
    }
}

/// Everything benchmark-specific the agents need, selected once at construction
pub struct Capabilities {
    pub family: BenchmarkFamily,
    /// Think/act prompt. Placeholders: `{examples}`, `{reflections}`, `{question}`, `{scratchpad}`
    pub prompt_template: &'static str,
    /// Self-reflection prompt. Placeholders: `{examples}`, `{question}`, `{scratchpad}`
    pub reflect_template: &'static str,
    /// Value prompt. Placeholders: `{examples}`, `{question}`, `{scratchpad}`
    pub value_template: &'static str,
    pub fewshot_examples: &'static str,
    pub action_parser: fn(&str) -> ParsedAction,
    pub answer_matches: fn(&str, &str) -> bool,
    pub valid_actions: &'static [&'static str],
    /// Action names that submit an answer; the first is the one prompts advertise
    pub terminal_actions: &'static [&'static str],
}

impl Capabilities {
    pub fn parse_action(&self, text: &str) -> ParsedAction {
        (self.action_parser)(text)
    }

    pub fn is_correct(&self, answer: &str, key: &str) -> bool {
        (self.answer_matches)(answer, key)
    }

    pub fn is_finish(&self, action_type: &str) -> bool {
        self.terminal_actions
            .iter()
            .any(|name| action_type.eq_ignore_ascii_case(name))
    }

    pub fn invalid_action_message(&self) -> String {
        format!(
            "Invalid Action. Valid Actions are {}.",
            self.valid_actions
                .iter()
                .map(|a| format!("{}[<argument>]", a))
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("family", &self.family)
            .field("valid_actions", &self.valid_actions)
            .field("terminal_actions", &self.terminal_actions)
            .finish()
    }
}

const TERMINAL_ACTIONS: &[&str] = &["Finish", "Answer"];

const REFLECT_TEMPLATE: &str = r#"You are an advanced reasoning agent that can improve based on self reflection. You were unsuccessful in answering the question below, either because you guessed the wrong answer or ran out of steps. Diagnose the likely reason for failure in a few sentences and devise a concise, high level plan that avoids the same failure.
{examples}
Question: {question}
{scratchpad}

Reflection:"#;

const VALUE_TEMPLATE: &str = r#"Analyze the trajectory below, then rate how likely it is to lead to a correct answer on a scale from 1 to 10. Respond with the reasoning followed by a line of the form "Thus the correctness score is s".
{examples}
Question: {question}
{scratchpad}

Analysis:"#;

static QA_CAPABILITIES: Capabilities = Capabilities {
    family: BenchmarkFamily::Qa,
    prompt_template: r#"Solve a question answering task with interleaving Thought, Action, Observation steps. Thought can reason about the current situation, and Action can be three types:
(1) Search[entity], which searches the exact entity and returns the first paragraph if it exists.
(2) Lookup[keyword], which returns the next sentence containing keyword in the current passage.
(3) Finish[answer], which returns the answer and finishes the task.
{examples}
{reflections}
Question: {question}
{scratchpad}"#,
    reflect_template: REFLECT_TEMPLATE,
    value_template: VALUE_TEMPLATE,
    fewshot_examples: r#"Question: What is the elevation range for the area that the eastern sector of the Colorado orogeny extends into?
Thought 1: I need to search Colorado orogeny and find the area the eastern sector extends into.
Action 1: Search[Colorado orogeny]
Observation 1: The Colorado orogeny was an episode of mountain building in Colorado and surrounding areas.
Thought 2: The eastern sector extends into the High Plains, so I need the elevation range of the High Plains.
Action 2: Search[High Plains]
Observation 2: The High Plains rise in elevation from around 1,800 to 7,000 ft.
Thought 3: The elevation range is 1,800 to 7,000 ft.
Action 3: Finish[1,800 to 7,000 ft]"#,
    action_parser: parse_qa_action,
    answer_matches: exact_match,
    valid_actions: &["Search", "Lookup", "Finish"],
    terminal_actions: TERMINAL_ACTIONS,
};

static MATH_CAPABILITIES: Capabilities = Capabilities {
    family: BenchmarkFamily::Math,
    prompt_template: r#"Answer a math question with interleaving Thought, Action, Observation steps. Action can be two types:
(1) Calculate[code], which executes a python snippet and returns the value of `answer`.
(2) Finish[answer], which returns the final numeric answer and finishes the task.
{examples}
{reflections}
Question: {question}
{scratchpad}"#,
    reflect_template: REFLECT_TEMPLATE,
    value_template: VALUE_TEMPLATE,
    fewshot_examples: r#"Question: Jason had 20 lollipops. He gave Denny some lollipops. Now Jason has 12 lollipops. How many lollipops did Jason give to Denny?
Thought 1: I subtract what Jason has left from what he started with.
Action 1: Calculate[
```python
answer = 20 - 12
```
]
Observation 1: answer = 8
Thought 2: Jason gave Denny 8 lollipops.
Action 2: Finish[8]"#,
    action_parser: parse_math_action,
    answer_matches: numeric_match,
    valid_actions: &["Calculate", "Finish"],
    terminal_actions: TERMINAL_ACTIONS,
};

static CODE_CAPABILITIES: Capabilities = Capabilities {
    family: BenchmarkFamily::Code,
    prompt_template: r#"Implement a python function with interleaving Thought, Action, Observation steps. Action can be three types:
(1) Implement[code], which writes an implementation and returns its execution status.
(2) Test[code], which runs the given tests against the implementation.
(3) Finish[code], which submits the implementation and finishes the task.
{examples}
{reflections}
Question: {question}
{scratchpad}"#,
    reflect_template: REFLECT_TEMPLATE,
    value_template: VALUE_TEMPLATE,
    fewshot_examples: r#"Question: Write a python function `add(a, b)` returning the sum of two integers.
Thought 1: A single return statement is enough.
Action 1: Implement[
```python
def add(a, b):
    return a + b
```
]
Observation 1: Executed successfully.
Thought 2: The implementation is complete.
Action 2: Finish[
```python
def add(a, b):
    return a + b
```
]"#,
    action_parser: parse_code_action,
    answer_matches: code_match,
    valid_actions: &["Implement", "Test", "Finish"],
    terminal_actions: TERMINAL_ACTIONS,
};

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^\s*(\w+)\[(.*)\]").expect("action pattern is valid"))
}

fn fenced_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:python|py)?\s*(.*?)```").expect("fence pattern is valid")
    })
}

fn article_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(a|an|the)\b").expect("article pattern is valid"))
}

/// Parse `Type[argument]`; anything else yields the empty sentinel
pub fn parse_qa_action(text: &str) -> ParsedAction {
    match action_regex().captures(text) {
        Some(caps) => ParsedAction::new(&caps[1], caps[2].trim()),
        None => ParsedAction::invalid(),
    }
}

/// Like [`parse_qa_action`], with a fenced code block argument unwrapped
pub fn parse_math_action(text: &str) -> ParsedAction {
    let mut action = parse_qa_action(text);
    if !action.is_invalid() {
        action.argument = strip_code_fence(&action.argument);
    }
    action
}

pub fn parse_code_action(text: &str) -> ParsedAction {
    parse_math_action(text)
}

pub fn strip_code_fence(argument: &str) -> String {
    match fenced_code_regex().captures(argument) {
        Some(caps) => caps[1].trim().to_string(),
        None => argument.trim().to_string(),
    }
}

/// Lowercase, drop punctuation and articles, collapse whitespace
pub fn normalize_answer(s: &str) -> String {
    let lowered: String = s
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let without_articles = article_regex().replace_all(&lowered, " ");
    without_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn exact_match(answer: &str, key: &str) -> bool {
    normalize_answer(answer) == normalize_answer(key)
}

pub fn numeric_match(answer: &str, key: &str) -> bool {
    match (parse_number(answer), parse_number(key)) {
        (Some(a), Some(b)) => (a - b).abs() < 1e-6,
        _ => exact_match(answer, key),
    }
}

pub fn code_match(answer: &str, key: &str) -> bool {
    let squash = |s: &str| strip_code_fence(s).split_whitespace().collect::<Vec<_>>().join(" ");
    squash(answer) == squash(key)
}

fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();
    cleaned.parse::<f64>().ok()
}
