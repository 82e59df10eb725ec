//! Turning a natural-language request into a rule via an external text generator.
//!
//! The generator itself is a collaborator behind [`TextGenerator`]; this module
//! owns the prompt, the extraction of a JSON object from free-form output and
//! the validation of that object as a rule.

use crate::error::GenerationError;
use crate::node::Node;
use crate::parser::Parser;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

pub const SYSTEM_PROMPT: &str = "You are a JSON Logic expert. Convert natural language conditions \
into valid JSON Logic format. Return only the JSON object without any explanation.";

const RULES: &str = "Rules:
1. Use standard JSON Logic operators (==, !=, >, <, >=, <=, in, nin, and, or, not)
2. Always use the \"var\" operator for variable references
3. Handle numeric values appropriately
4. Support array operations for 'in' and 'nin' operators
5. Support logical operators (and, or, not)

Example:
Input: \"age is greater than 18 and country is USA\"
Output: {\"and\":[{\">\":[{\"var\":\"age\"},18]},{\"==\":[{\"var\":\"country\"},\"USA\"]}]}";

/// Instruction pair sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Both roles as one text, for generators without a separate system channel.
    pub fn to_text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

pub fn build_prompt(request: &str) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!(
            "Convert this natural language condition into JSON Logic format:\n\n{}\n\n{RULES}",
            request.trim()
        ),
    }
}

/// Anything that can answer a prompt with free-form text.
pub trait TextGenerator {
    fn complete(
        &self,
        prompt: &Prompt,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Slice from the first `{` to the last `}` of `response`, parsed as JSON.
pub fn extract_candidate(response: &str) -> Result<Value, GenerationError> {
    let start = response.find('{').ok_or(GenerationError::NoJson)?;
    let end = response.rfind('}').ok_or(GenerationError::NoJson)?;
    if end < start {
        return Err(GenerationError::NoJson);
    }
    serde_json::from_str(&response[start..=end])
        .map_err(|err| GenerationError::InvalidJson(err.to_string()))
}

/// Accepted generator output: the JSON as produced plus its parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRule {
    pub json: Value,
    pub node: Node,
}

impl GeneratedRule {
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.json).unwrap_or_else(|_| self.json.to_string())
    }
}

pub async fn generate_rule<G>(
    generator: &G,
    parser: &Parser,
    request: &str,
) -> Result<GeneratedRule, GenerationError>
where
    G: TextGenerator + ?Sized,
{
    let prompt = build_prompt(request);
    let response = generator.complete(&prompt).await?;
    tracing::debug!(bytes = response.len(), "generator responded");
    let json = extract_candidate(&response)?;
    let node = parser
        .parse_value(&json)
        .map_err(GenerationError::InvalidRule)?;
    Ok(GeneratedRule { json, node })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;
    use serde_json::json;
    use std::future::ready;
    use std::time::Duration;

    struct Canned(Result<String, GenerationError>);

    impl TextGenerator for Canned {
        fn complete(
            &self,
            _prompt: &Prompt,
        ) -> impl Future<Output = Result<String, GenerationError>> + Send {
            ready(self.0.clone())
        }
    }

    async fn run(reply: Result<&str, GenerationError>) -> Result<GeneratedRule, GenerationError> {
        let generator = Canned(reply.map(str::to_string));
        generate_rule(&generator, &Parser::default(), "age over 18").await
    }

    #[test]
    fn prompt_embeds_request_and_example() {
        let prompt = build_prompt("  age is over 18 ");
        assert_eq!(prompt.system, SYSTEM_PROMPT);
        assert!(prompt.user.contains("format:\n\nage is over 18\n\nRules:"));
        assert!(prompt.user.contains(r#"Output: {"and":[{">":[{"var":"age"},18]}"#));
        assert!(prompt.to_text().starts_with("You are a JSON Logic expert."));
    }

    #[test]
    fn candidate_inside_prose() {
        let value = extract_candidate("Sure! Here it is:\n{\"==\": [1, 1]}\nHope this helps.")
            .expect("candidate");
        assert_eq!(value, json!({"==": [1, 1]}));
    }

    #[test]
    fn candidate_spans_first_to_last_brace() {
        let err = extract_candidate("{\"a\": 1} and also {\"b\": 2}").expect_err("two objects");
        assert_eq!(err.code(), "invalid-json");
    }

    #[test]
    fn candidate_missing() {
        assert_eq!(extract_candidate("no rule here"), Err(GenerationError::NoJson));
        assert_eq!(extract_candidate("} backwards {"), Err(GenerationError::NoJson));
    }

    #[tokio::test]
    async fn generates_rule_from_reply() {
        let rule = run(Ok(r#"```json
{"and":[{">":[{"var":"age"},18]},{"==":[{"var":"country"},"USA"]}]}
```"#))
        .await
        .expect("rule");
        assert_eq!(rule.node.tag(), Some("and"));
        assert!(rule.pretty().contains("\"country\""));
    }

    #[tokio::test]
    async fn collaborator_failure_passes_through() {
        let after = Duration::from_secs(30);
        let err = run(Err(GenerationError::Timeout { after })).await.expect_err("timeout");
        assert_eq!(err, GenerationError::Timeout { after });
    }

    #[tokio::test]
    async fn structurally_invalid_candidate_is_generation_failure() {
        let err = run(Ok(r#"{"a": 1, "b": 2}"#)).await.expect_err("ambiguous");
        let GenerationError::InvalidRule(parse) = err else {
            panic!("expected invalid rule, got {err:?}");
        };
        assert_eq!(parse.kind, ParseErrorKind::AmbiguousOperator);
    }
}
