//! Parsing of free-form model replies into decision fields.
//!
//! Prompts ask for `- field: value` lines. A field's value runs until the
//! next line that starts with `-`, so multi-line comments survive. Night
//! decisions are requested as a JSON object, optionally inside a ```json
//! fence.

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    Number,
}

pub type Schema = &'static [(&'static str, FieldKind)];

pub const DISCUSSION_SCHEMA: Schema = &[
    ("speak", FieldKind::Flag),
    ("comment", FieldKind::Text),
    ("urgency", FieldKind::Number),
];

pub const VOTE_SCHEMA: Schema = &[("target", FieldKind::Text), ("reason", FieldKind::Text)];

pub const NIGHT_SCHEMA: Schema = &[("target", FieldKind::Text), ("reason", FieldKind::Text)];

/// The format block appended to prompts that expect structured replies.
pub fn format_instructions(schema: Schema) -> String {
    let fields: Vec<String> = schema
        .iter()
        .map(|(name, kind)| {
            let hint = match kind {
                FieldKind::Text => "string",
                FieldKind::Flag => "true/false",
                FieldKind::Number => "number",
            };
            format!("- {} ({})", name, hint)
        })
        .collect();
    let example: Vec<String> = schema
        .iter()
        .map(|(name, _)| format!("- {}: [your response here]", name))
        .collect();
    format!(
        "IMPORTANT: Respond ONLY with the following format (no extra text, no markdown, no explanations):\n{}\n\nExample format:\n{}",
        fields.join("\n"),
        example.join("\n")
    )
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Structured {
    fields: HashMap<String, String>,
}

impl Structured {
    pub fn parse(text: &str, schema: Schema) -> Self {
        let mut fields: HashMap<String, String> = HashMap::new();
        let mut current: Option<&str> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            let body = trimmed.strip_prefix('-').map(str::trim_start);
            let candidate = body.unwrap_or(trimmed);

            if let Some((name, value)) = field_start(candidate, schema) {
                fields.insert(name.to_string(), value.to_string());
                current = Some(name);
                continue;
            }
            if body.is_some() {
                current = None;
                continue;
            }
            if let Some(name) = current {
                if let Some(value) = fields.get_mut(name) {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                }
            }
        }

        for value in fields.values_mut() {
            *value = value.trim().to_string();
        }
        Self { fields }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// `true`, `yes` and `1` are true; anything else, including a missing
    /// field, is false.
    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .map(|v| {
                let v = v.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                matches!(v.as_str(), "true" | "yes" | "1")
            })
            .unwrap_or(false)
    }

    pub fn number(&self, name: &str) -> Option<i64> {
        let value = self.text(name)?;
        let digits: String = value
            .trim()
            .chars()
            .skip_while(|c| !c.is_ascii_digit() && *c != '-')
            .take_while(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        digits.parse().ok()
    }
}

fn field_start<'a>(line: &'a str, schema: Schema) -> Option<(&'static str, &'a str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().trim_matches('*').trim();
    schema
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(name, _)| (*name, value.trim()))
}

/// Extracts a JSON object from a reply, looking inside a ```json fence
/// first and then at the outermost braces.
pub fn parse_json_object(text: &str) -> Option<Value> {
    let candidate = match text.find("```json") {
        Some(start) => {
            let rest = &text[start + "```json".len()..];
            let end = rest.find("```").unwrap_or(rest.len());
            rest[..end].trim()
        }
        None => text.trim(),
    };
    if let Ok(value @ Value::Object(_)) = serde_json::from_str(candidate) {
        return Some(value);
    }
    let open = candidate.find('{')?;
    let close = candidate.rfind('}')?;
    if close <= open {
        return None;
    }
    match serde_json::from_str(&candidate[open..=close]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_discussion_reply() {
        let reply = "- speak: true\n- comment: Boris has been too quiet.\nWatch him.\n- urgency: 4";
        let parsed = Structured::parse(reply, DISCUSSION_SCHEMA);
        assert!(parsed.flag("speak"));
        assert_eq!(
            parsed.text("comment"),
            Some("Boris has been too quiet.\nWatch him.")
        );
        assert_eq!(parsed.number("urgency"), Some(4));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed = Structured::parse("I'd rather not say anything.", DISCUSSION_SCHEMA);
        assert!(!parsed.flag("speak"));
        assert_eq!(parsed.text("comment"), None);
        assert_eq!(parsed.number("urgency"), None);
    }

    #[test]
    fn tolerates_markdown_noise() {
        let parsed =
            Structured::parse("**target**: Elena\n- Reason: she dodged twice", VOTE_SCHEMA);
        assert_eq!(parsed.text("target"), Some("Elena"));
        assert_eq!(parsed.text("reason"), Some("she dodged twice"));
    }

    #[test]
    fn number_ignores_surrounding_text() {
        let parsed = Structured::parse("- urgency: 5 (being accused)", DISCUSSION_SCHEMA);
        assert_eq!(parsed.number("urgency"), Some(5));
    }

    #[test]
    fn extracts_fenced_json() {
        let reply = "Here you go:\n```json\n{\"target\": \"Sam\", \"reason\": \"too quiet\"}\n```";
        let value = parse_json_object(reply).unwrap();
        assert_eq!(value["target"], "Sam");
    }

    #[test]
    fn extracts_bare_json() {
        let value =
            parse_json_object("Sure! {\"target\": \"Zoe\", \"reason\": \"chaos\"}").unwrap();
        assert_eq!(value["reason"], "chaos");
        assert!(parse_json_object("no json here").is_none());
    }
}
