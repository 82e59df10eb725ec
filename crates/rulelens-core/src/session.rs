//! Editing session over one rule, and its persisted snapshot.
//!
//! A snapshot stores text, never identifiers: on restore the tree and its
//! identifiers are recomputed from `rule_text`, and expansion state starts
//! empty.

use crate::engine::Engine;
use crate::error::{GenerationError, SessionError};
use crate::generation::GeneratedRule;
use crate::identity::IdentityMap;
use crate::node::Node;
use crate::visual::Expansion;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialized form of a session. Field names match the stored state of the
/// resolver and generator screens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde(rename = "jsonLogic")]
    pub rule_text: String,
    /// Informational; never trusted on restore.
    #[serde(rename = "parsedLogic")]
    pub parsed: Option<Value>,
    pub test_data: String,
    pub test_result: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    engine: Engine,
    rule_text: String,
    tree: Option<Node>,
    test_data: String,
    test_result: Option<Value>,
    error: Option<String>,
    expansion: Expansion,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    pub fn from_snapshot(engine: Engine, snapshot: Snapshot) -> Self {
        let mut session = Self::new(engine);
        session.test_data = snapshot.test_data;
        session.test_result = snapshot.test_result;
        if !snapshot.rule_text.trim().is_empty() {
            // A parse failure here records its own message.
            let _ = session.set_rule_text(snapshot.rule_text);
        } else {
            session.rule_text = snapshot.rule_text;
        }
        if session.error.is_none() {
            session.error = snapshot.error;
        }
        session
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            rule_text: self.rule_text.clone(),
            parsed: self.tree.as_ref().map(Node::to_value),
            test_data: self.test_data.clone(),
            test_result: self.test_result.clone(),
            error: self.error.clone(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }

    /// Current tree; `None` when the text is empty or did not parse.
    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    pub fn ids(&self) -> IdentityMap {
        self.tree
            .as_ref()
            .map(|tree| self.engine.ids(tree))
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn test_data(&self) -> &str {
        &self.test_data
    }

    pub fn test_result(&self) -> Option<&Value> {
        self.test_result.as_ref()
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    pub fn expansion_mut(&mut self) -> &mut Expansion {
        &mut self.expansion
    }

    /// Replace the rule text and re-parse it. On failure the tree is dropped,
    /// since a rejected rule must not be rendered.
    pub fn set_rule_text(&mut self, text: impl Into<String>) -> Result<&Node, SessionError> {
        self.rule_text = text.into();
        match self.engine.parse(&self.rule_text) {
            Ok(node) => Ok(self.accept(node)),
            Err(err) => {
                self.tree = None;
                Err(self.fail(err.into()))
            }
        }
    }

    /// Evaluate the current rule against `data_text`, keeping both the data and
    /// the outcome in the session.
    pub fn evaluate_with(&mut self, data_text: impl Into<String>) -> Result<Value, SessionError> {
        self.test_data = data_text.into();
        let outcome = self.run_test();
        match outcome {
            Ok(value) => {
                self.test_result = Some(value.clone());
                self.error = None;
                Ok(value)
            }
            Err(err) => {
                self.test_result = None;
                Err(self.fail(err))
            }
        }
    }

    fn run_test(&self) -> Result<Value, SessionError> {
        let reparsed;
        let tree = match &self.tree {
            Some(tree) => tree,
            None => {
                reparsed = self.engine.parse(&self.rule_text)?;
                &reparsed
            }
        };
        let data: Value = serde_json::from_str(&self.test_data)
            .map_err(|err| SessionError::InvalidData(err.to_string()))?;
        Ok(self.engine.evaluate(tree, &data)?)
    }

    /// Adopt a generator result. A failure is recorded but leaves the current
    /// text and tree in place.
    pub fn apply_generation(
        &mut self,
        result: Result<GeneratedRule, GenerationError>,
    ) -> Result<&Node, SessionError> {
        match result {
            Ok(generated) => {
                self.rule_text = generated.pretty();
                Ok(self.accept(generated.node))
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.engine.clone());
    }

    fn accept(&mut self, node: Node) -> &Node {
        self.error = None;
        let ids = self.engine.ids(&node);
        self.expansion.retain_valid(&ids);
        self.tree.insert(node)
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        tracing::debug!(code = err.code(), "session action failed: {err}");
        self.error = Some(err.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NodeId;
    use crate::parser::parse_value;
    use serde_json::json;
    use std::time::Duration;

    const RULE: &str = r#"{"and":[{">":[{"var":"age"},18]},{"==":[{"var":"country"},"USA"]}]}"#;

    fn session_with_rule() -> Session {
        let mut session = Session::default();
        session.set_rule_text(RULE).expect("rule parses");
        session
    }

    #[test]
    fn snapshot_uses_stored_field_names() {
        let mut session = session_with_rule();
        session.evaluate_with(r#"{"age": 25, "country": "USA"}"#).expect("evaluates");
        let value = serde_json::to_value(session.snapshot()).expect("serialize");
        assert_eq!(value["jsonLogic"], json!(RULE));
        assert_eq!(value["parsedLogic"]["and"][0][">"][1], json!(18));
        assert_eq!(value["testData"], json!(r#"{"age": 25, "country": "USA"}"#));
        assert_eq!(value["testResult"], json!(true));
        assert_eq!(value["error"], Value::Null);
    }

    #[test]
    fn restore_rederives_from_text_only() {
        let snapshot = Snapshot {
            rule_text: RULE.into(),
            parsed: Some(json!({"bogus": "ignored"})),
            ..Snapshot::default()
        };
        let session = Session::from_snapshot(Engine::default(), snapshot);
        let expected = parse_value(&serde_json::from_str(RULE).expect("json")).expect("parse");
        assert_eq!(session.tree(), Some(&expected));
        assert_eq!(session.ids(), session_with_rule().ids());
        assert!(session.expansion().is_empty());
    }

    #[test]
    fn restore_tolerates_partial_snapshot() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"jsonLogic": "{\"var\": \"a\"}"}"#)
            .expect("partial snapshot");
        let session = Session::from_snapshot(Engine::default(), snapshot);
        assert!(session.tree().is_some());
        assert_eq!(session.test_data(), "");
    }

    #[test]
    fn restore_of_broken_text_reports_parse_error() {
        let snapshot = Snapshot {
            rule_text: "{not json".into(),
            ..Snapshot::default()
        };
        let session = Session::from_snapshot(Engine::default(), snapshot);
        assert!(session.tree().is_none());
        assert!(session.error().is_some_and(|e| e.contains("invalid-json")));
    }

    #[test]
    fn invalid_rule_drops_tree() {
        let mut session = session_with_rule();
        let err = session.set_rule_text(r#"{"a": 1, "b": 2}"#).expect_err("ambiguous");
        assert_eq!(err.code(), "ambiguous-operator");
        assert!(session.tree().is_none());
        assert!(session.error().is_some());
    }

    #[test]
    fn evaluation_failures_are_recorded() {
        let mut session = session_with_rule();
        let err = session.evaluate_with("[1, 2]").expect_err("array context");
        assert_eq!(err.code(), "invalid-context");
        let err = session.evaluate_with("{oops").expect_err("bad data");
        assert_eq!(err.code(), "invalid-data");
        assert_eq!(session.test_result(), None);
        assert_eq!(session.test_data(), "{oops");

        assert_eq!(session.evaluate_with(r#"{"age": 10}"#), Ok(json!(false)));
        assert_eq!(session.error(), None);
    }

    #[test]
    fn failed_generation_keeps_previous_tree() {
        let mut session = session_with_rule();
        let before = session.tree().cloned();
        let err = session
            .apply_generation(Err(GenerationError::Timeout {
                after: Duration::from_secs(30),
            }))
            .expect_err("timeout");
        assert_eq!(err.code(), "timeout");
        assert_eq!(session.tree().cloned(), before);
        assert_eq!(session.rule_text(), RULE);
        assert!(session.error().is_some_and(|e| e.contains("timed out")));
    }

    #[test]
    fn successful_generation_replaces_rule_and_prunes_expansion() {
        let mut session = session_with_rule();
        session.expansion_mut().toggle(&NodeId::from("root/and"));
        session.expansion_mut().toggle(&NodeId::from("root/and/1/=="));

        let json = json!({"or": [{"var": "vip"}, {"==": [{"var": "country"}, "USA"]}]});
        let node = parse_value(&json).expect("parse");
        session
            .apply_generation(Ok(GeneratedRule { json, node }))
            .expect("applied");

        assert_eq!(session.tree().and_then(Node::tag), Some("or"));
        assert!(session.rule_text().contains("\"vip\""));
        assert!(session.expansion().is_empty());
    }

    #[test]
    fn clear_keeps_engine_only() {
        let mut session = session_with_rule();
        session.evaluate_with("{}").expect("evaluates");
        session.clear();
        assert_eq!(session.snapshot(), Snapshot::default());
    }
}
