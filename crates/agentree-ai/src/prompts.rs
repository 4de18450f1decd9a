// ABOUTME: Renders capability-record templates into concrete prompts
// ABOUTME: Also formats reflections and extracts values from evaluation replies

use crate::gateway::PromptContext;
use agentree_core::Capabilities;
use regex::Regex;
use std::sync::OnceLock;

const REFLECTION_HEADER: &str =
    "You have attempted to answer the following question before and failed. The following reflection(s) give a plan to avoid failing to answer the question in the same way you did previously. Use them to improve your strategy of correctly answering the given question.";

/// Format stored reflections for the think/act prompt; empty when there are none
pub fn format_reflections(reflections: &[String]) -> String {
    if reflections.is_empty() {
        return String::new();
    }
    let body = reflections
        .iter()
        .map(|r| format!("- {}", r.trim()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\nReflections:\n{}", REFLECTION_HEADER, body)
}

fn fill(template: &str, ctx: &PromptContext<'_>, scratchpad: &str) -> String {
    template
        .replace("{examples}", ctx.examples)
        .replace("{reflections}", &format_reflections(ctx.reflections))
        .replace("{question}", ctx.question)
        .replace("{scratchpad}", scratchpad)
}

pub fn thought_prompt(caps: &Capabilities, ctx: &PromptContext<'_>) -> String {
    let scratchpad = format!("{}\nThought {}:", ctx.scratchpad, ctx.step);
    fill(caps.prompt_template, ctx, &scratchpad)
}

pub fn action_prompt(caps: &Capabilities, ctx: &PromptContext<'_>) -> String {
    let scratchpad = format!("{}\nAction {}:", ctx.scratchpad, ctx.step);
    fill(caps.prompt_template, ctx, &scratchpad)
}

pub fn value_prompt(caps: &Capabilities, ctx: &PromptContext<'_>, candidate: &str) -> String {
    fill(caps.value_template, ctx, candidate)
}

pub fn reflect_prompt(caps: &Capabilities, ctx: &PromptContext<'_>) -> String {
    fill(caps.reflect_template, ctx, ctx.scratchpad)
}

/// First line of a reply with any echoed `Label N:` prefix removed
pub fn first_line_without_label(text: &str, label: &str) -> String {
    let line = text.trim().lines().next().unwrap_or("").trim();
    strip_label(line, label)
}

/// Whole reply with an echoed `Label N:` prefix removed; multi-line code actions need this
pub fn strip_label(text: &str, label: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix(label) {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == ' ');
        if let Some(rest) = rest.strip_prefix(':') {
            return rest.trim().to_string();
        }
    }
    trimmed.to_string()
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)score is\s*(-?\d+(?:\.\d+)?)").expect("score pattern is valid")
    })
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern is valid"))
}

/// Value in [0, 1] from an evaluation reply.
///
/// "... score is N" is read on the 1-10 scale the value prompt asks for. Without
/// that form the first number is used: a fraction below 1 as is, anything else
/// on the 1-10 scale. Negative scores and replies without a number score 0.
pub fn parse_value(text: &str) -> f64 {
    if let Some(score) = score_regex()
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
    {
        return (score / 10.0).clamp(0.0, 1.0);
    }

    match number_regex()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        Some(v) if v < 0.0 => 0.0,
        Some(v) if v < 1.0 => v,
        Some(v) => (v / 10.0).clamp(0.0, 1.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentree_core::Benchmark;

    fn ctx<'a>(reflections: &'a [String]) -> PromptContext<'a> {
        PromptContext {
            question: "Who wrote Hamlet?",
            scratchpad: "\nThought 1: Search the play.\nAction 1: Search[Hamlet]\nObservation 1: Hamlet is a tragedy by William Shakespeare.",
            step: 2,
            examples: "EXAMPLES",
            reflections,
        }
    }

    #[test]
    fn test_thought_prompt_ends_with_cue() {
        let caps = Benchmark::HotpotQA.capabilities();
        let prompt = thought_prompt(caps, &ctx(&[]));
        assert!(prompt.contains("Question: Who wrote Hamlet?"));
        assert!(prompt.contains("EXAMPLES"));
        assert!(prompt.ends_with("Thought 2:"));
        assert!(!prompt.contains("{reflections}"));
        assert!(!prompt.contains("Reflections:"));
    }

    #[test]
    fn test_reflections_are_injected() {
        let caps = Benchmark::HotpotQA.capabilities();
        let reflections = vec!["Search the author directly.".to_string()];
        let prompt = action_prompt(caps, &ctx(&reflections));
        assert!(prompt.contains("Reflections:\n- Search the author directly."));
        assert!(prompt.ends_with("Action 2:"));
    }

    #[test]
    fn test_strip_label() {
        assert_eq!(strip_label("Thought 3: look it up", "Thought"), "look it up");
        assert_eq!(strip_label("Action: Finish[x]", "Action"), "Finish[x]");
        assert_eq!(strip_label("Finish[x]", "Action"), "Finish[x]");
        assert_eq!(
            first_line_without_label("I should search.\nAction 1: Search[x]", "Thought"),
            "I should search."
        );
    }

    #[test]
    fn test_parse_value() {
        assert!((parse_value("Good progress. Thus the correctness score is 7") - 0.7).abs() < 1e-9);
        assert!((parse_value("0.4") - 0.4).abs() < 1e-9);
        assert_eq!(parse_value("score is 15"), 1.0);
        assert_eq!(parse_value("no idea"), 0.0);
    }

    #[test]
    fn test_parse_value_follows_ten_point_scale() {
        let worst = parse_value("Dead end. Thus the correctness score is 1");
        let good = parse_value("Close to the answer. Thus the correctness score is 9");
        assert!(worst < good);
        assert!((worst - 0.1).abs() < 1e-9);
        assert!((good - 0.9).abs() < 1e-9);
        assert!((parse_value("I would give it 3") - 0.3).abs() < 1e-9);
        assert_eq!(parse_value("Thus the correctness score is -1"), 0.0);
        assert_eq!(parse_value("-0.5"), 0.0);
    }
}
