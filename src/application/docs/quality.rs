//! Heuristic quality scoring of generated documentation.

use std::collections::BTreeSet;

use crate::application::spec::ParsedSpecification;
use crate::domain::entities::QualityMetrics;
use crate::domain::types::SpecFormat;

const ESSENTIAL_TERMS: [&str; 9] = [
    "overview",
    "introduction",
    "description",
    "endpoint",
    "api",
    "method",
    "parameter",
    "response",
    "example",
];
const GRAPHQL_TERMS: [&str; 5] = ["query", "mutation", "subscription", "type", "field"];
const EXPLANATION_MARKERS: [&str; 5] = ["i.e.", "e.g.", "that is", "in other words", "specifically"];
const PLACEHOLDERS: [&str; 5] = ["todo", "tbd", "placeholder", "example.com", "lorem ipsum"];

pub fn score_documentation(documentation: &str, parsed: &ParsedSpecification) -> QualityMetrics {
    let lower = documentation.to_lowercase();

    let completeness = completeness(documentation, &lower, parsed);
    let clarity = clarity(documentation, &lower);
    let accuracy = accuracy(documentation, &lower, parsed);

    let mut suggestions = Vec::new();
    push_suggestions(
        &mut suggestions,
        completeness,
        [
            "Add more detailed descriptions for API endpoints",
            "Include more code examples in different programming languages",
        ],
        [
            "Ensure all specification elements are documented",
            "Add comprehensive parameter and response descriptions",
        ],
    );
    push_suggestions(
        &mut suggestions,
        clarity,
        [
            "Use shorter, more concise sentences",
            "Add more structure with headers and bullet points",
        ],
        [
            "Explain technical terms and jargon",
            "Improve formatting and organization",
        ],
    );
    push_suggestions(
        &mut suggestions,
        accuracy,
        [
            "Verify all endpoint descriptions match the specification",
            "Remove placeholder text and ensure all examples are valid",
        ],
        [
            "Review parameter types and response formats for accuracy",
            "Ensure consistent terminology throughout the documentation",
        ],
    );

    QualityMetrics::new(completeness, clarity, accuracy, suggestions)
}

fn push_suggestions(out: &mut Vec<String>, score: u8, below_70: [&str; 2], below_50: [&str; 2]) {
    if score < 70 {
        out.extend(below_70.iter().map(|s| s.to_string()));
    }
    if score < 50 {
        out.extend(below_50.iter().map(|s| s.to_string()));
    }
}

fn completeness(documentation: &str, lower: &str, parsed: &ParsedSpecification) -> u8 {
    let found = ESSENTIAL_TERMS.iter().filter(|term| lower.contains(*term)).count();
    let sections = (found as f64 / ESSENTIAL_TERMS.len() as f64 * 40.0).min(40.0);

    let coverage = match parsed.format {
        SpecFormat::OpenApi => openapi_coverage(lower, parsed),
        SpecFormat::Graphql => {
            let found = GRAPHQL_TERMS.iter().filter(|term| lower.contains(*term)).count();
            (20.0 + found as f64 / GRAPHQL_TERMS.len() as f64 * 10.0).min(30.0).floor()
        }
        SpecFormat::JsonSchema => 30.0,
    };

    let code_signals = [
        has_fenced_language(documentation),
        has_inline_code(documentation),
        followed_by_whitespace(documentation, "curl"),
        followed_by_whitespace(documentation, "POST"),
        followed_by_whitespace(documentation, "GET"),
    ];
    let examples = (code_signals.iter().filter(|hit| **hit).count() as f64 * 10.0).min(30.0);

    to_score(sections + coverage + examples)
}

fn openapi_coverage(lower: &str, parsed: &ParsedSpecification) -> f64 {
    let paths: BTreeSet<String> = parsed
        .endpoints
        .iter()
        .map(|endpoint| endpoint.path.to_lowercase())
        .collect();

    let mut score = 0.0;
    if !paths.is_empty() {
        let documented = paths.iter().filter(|path| lower.contains(path.as_str())).count();
        score += documented as f64 / paths.len() as f64 * 20.0;
    }
    if !parsed.schemas.is_empty() {
        let documented = parsed
            .schemas
            .iter()
            .filter(|schema| lower.contains(&schema.name.to_lowercase()))
            .count();
        score += documented as f64 / parsed.schemas.len() as f64 * 10.0;
    }
    score.min(30.0).floor()
}

fn clarity(documentation: &str, lower: &str) -> u8 {
    let lines: Vec<&str> = documentation.split('\n').collect();
    let structured = lines.iter().filter(|line| is_structured(line.trim())).count();
    let structure = (structured as f64 / lines.len() as f64 * 100.0).min(30.0);

    let sentences: Vec<usize> = documentation
        .split(['.', '!', '?'])
        .map(|sentence| sentence.split_whitespace().count())
        .filter(|words| *words > 0)
        .collect();
    let length = if sentences.is_empty() {
        25.0
    } else {
        match sentences.iter().sum::<usize>() as f64 / sentences.len() as f64 {
            avg if avg <= 20.0 => 25.0,
            avg if avg <= 30.0 => 15.0,
            _ => 5.0,
        }
    };

    let explanations = (EXPLANATION_MARKERS
        .iter()
        .filter(|marker| lower.contains(*marker))
        .count() as f64
        * 5.0)
        .min(25.0);

    to_score(structure + length + explanations + 20.0)
}

fn accuracy(documentation: &str, lower: &str, parsed: &ParsedSpecification) -> u8 {
    let mut score = 80.0;

    match parsed.format {
        SpecFormat::OpenApi => {
            let upper = documentation.to_uppercase();
            let hits = parsed
                .endpoints
                .iter()
                .filter(|endpoint| upper.contains(&endpoint.method))
                .count();
            score += (hits as f64 * 2.0).min(20.0);
        }
        SpecFormat::Graphql => score += 15.0,
        SpecFormat::JsonSchema => {}
    }

    score -= PLACEHOLDERS.iter().filter(|p| lower.contains(*p)).count() as f64 * 5.0;

    if lower.contains("api") && lower.contains("endpoint") {
        score += 5.0;
    }

    to_score(score)
}

fn to_score(raw: f64) -> u8 {
    raw.floor().clamp(0.0, 100.0) as u8
}

fn is_structured(line: &str) -> bool {
    if let Some(rest) = line.strip_prefix('#') {
        let rest = rest.trim_start_matches('#');
        return rest.starts_with(char::is_whitespace);
    }
    if line.starts_with("* ") || line.starts_with("| ") {
        return true;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(". ")
}

fn has_fenced_language(text: &str) -> bool {
    text.match_indices("```").any(|(idx, _)| {
        text[idx + 3..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
    })
}

fn has_inline_code(text: &str) -> bool {
    let segments: Vec<&str> = text.split('`').collect();
    segments.len() > 2
        && segments[1..segments.len() - 1]
            .iter()
            .any(|inner| !inner.is_empty())
}

fn followed_by_whitespace(text: &str, needle: &str) -> bool {
    text.match_indices(needle).any(|(idx, _)| {
        text[idx + needle.len()..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
    })
}
