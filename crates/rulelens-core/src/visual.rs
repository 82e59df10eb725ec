//! Collapsible section tree for display.
//!
//! The builder recurses through [`Node::children`] with the same path rules
//! as [`crate::identity`], so every identifier gets exactly one section and
//! every section carries an identifier from the same set.

use crate::identity::{IdentityMap, NodeId, child_path, node_id};
use crate::node::{Branch, Node, OperandForm, operands_value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Display {
    Section(Section),
    /// Inline value, not collapsible.
    Badge { text: String },
    /// Array of expressions: children are shown in place, with no section of its own.
    Group { children: Vec<Child> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: NodeId,
    pub label: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub children: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Child {
    pub branch: Branch,
    pub display: Display,
}

pub fn build(node: &Node, prefix: &str) -> Display {
    display(node, prefix)
}

fn display(node: &Node, path: &str) -> Display {
    let (label, summary, badge) = match node {
        Node::Literal(value) => {
            return Display::Badge {
                text: value.to_string(),
            };
        }
        Node::List(items) => {
            return Display::Group {
                children: items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let branch = Branch::Index(i);
                        Child {
                            branch,
                            display: display(item, &child_path(path, branch)),
                        }
                    })
                    .collect(),
            };
        }
        Node::Var(var) => (
            "VAR".to_string(),
            item_count(var.form, var.operands.len()),
            Some(format!(
                "Variable: {}",
                var.static_path()
                    .unwrap_or_else(|| operands_value(&var.operands, var.form).to_string())
            )),
        ),
        Node::Operation(operation) => {
            let badge = (!operation.op.is_known()).then(|| {
                format!(
                    "{}: {}",
                    operation.op.tag(),
                    operands_value(&operation.operands, operation.form)
                )
            });
            (
                operation.op.label(),
                item_count(operation.form, operation.operands.len()),
                badge,
            )
        }
        Node::Conditional(cond) => (
            "IF-THEN-ELSE".to_string(),
            item_count(OperandForm::List, 2 + usize::from(cond.otherwise.is_some())),
            None,
        ),
    };
    let Some(id) = node_id(path, node) else {
        return Display::Badge {
            text: node.to_value().to_string(),
        };
    };

    // Var and opaque operands are already spelled out in the badge.
    let inline_literals = badge.is_none();
    let children = node
        .children()
        .into_iter()
        .filter(|(_, child)| inline_literals || !child.is_literal())
        .map(|(branch, child)| Child {
            branch,
            display: display(child, &child_path(id.as_str(), branch)),
        })
        .collect();

    Display::Section(Section {
        id,
        label,
        summary,
        badge,
        children,
    })
}

fn item_count(form: OperandForm, n: usize) -> String {
    match form {
        OperandForm::List => format!("{n} items"),
        OperandForm::Single => "1 item".to_string(),
    }
}

impl Display {
    /// Identifiers of every section, in pre-order.
    pub fn section_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        collect_ids(self, &mut out);
        out
    }

    pub fn find(&self, id: &NodeId) -> Option<&Section> {
        match self {
            Display::Section(section) if &section.id == id => Some(section),
            Display::Section(Section { children, .. }) | Display::Group { children } => {
                children.iter().find_map(|child| child.display.find(id))
            }
            Display::Badge { .. } => None,
        }
    }

    /// Indented text outline. Collapsed sections hide their children; with no
    /// expansion state everything is shown.
    pub fn outline(&self, expansion: Option<&Expansion>) -> String {
        let mut out = String::new();
        write_outline(self, None, 0, expansion, &mut out);
        out
    }
}

fn collect_ids(display: &Display, out: &mut Vec<NodeId>) {
    match display {
        Display::Section(section) => {
            out.push(section.id.clone());
            for child in &section.children {
                collect_ids(&child.display, out);
            }
        }
        Display::Group { children } => {
            for child in children {
                collect_ids(&child.display, out);
            }
        }
        Display::Badge { .. } => {}
    }
}

fn write_outline(
    display: &Display,
    branch: Option<Branch>,
    depth: usize,
    expansion: Option<&Expansion>,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    let caption = branch
        .and_then(Branch::caption)
        .map(|c| format!("{c}: "))
        .unwrap_or_default();
    match display {
        Display::Badge { text } => {
            let _ = writeln!(out, "{indent}{caption}{text}");
        }
        Display::Group { children } => {
            let _ = writeln!(out, "{indent}{caption}[{} entries]", children.len());
            for child in children {
                write_outline(&child.display, Some(child.branch), depth + 1, expansion, out);
            }
        }
        Display::Section(section) => {
            let open = expansion.is_none_or(|state| state.is_expanded(&section.id));
            let marker = if open { "[-]" } else { "[+]" };
            let badge = section
                .badge
                .as_ref()
                .map(|b| format!(" {b}"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{indent}{caption}{marker} {} ({}){badge}  #{}",
                section.label, section.summary, section.id
            );
            if open {
                for child in &section.children {
                    write_outline(&child.display, Some(child.branch), depth + 1, expansion, out);
                }
            }
        }
    }
}

/// Expand/collapse state keyed by node identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    expanded: BTreeSet<NodeId>,
}

impl Expansion {
    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    /// Flip one section; returns whether it is now expanded.
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        }
    }

    pub fn expand_all(&mut self, ids: &IdentityMap) {
        self.expanded = ids.iter().cloned().collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Drop keys that no longer name a node, e.g. after the tree was replaced.
    pub fn retain_valid(&mut self, ids: &IdentityMap) {
        self.expanded.retain(|id| ids.contains(id));
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{DEFAULT_PREFIX, assign};
    use crate::parser::parse_value;
    use serde_json::json;

    fn built(value: serde_json::Value) -> (Node, Display) {
        let node = parse_value(&value).expect("parse");
        let display = build(&node, DEFAULT_PREFIX);
        (node, display)
    }

    #[test]
    fn sections_match_identifiers() {
        let (node, display) = built(json!({"and": [
            {">": [{"var": "age"}, 18]},
            {"not": {"in": [{"var": "c"}, ["x", "y"]]}},
            [{"var": "vip"}, {"var": "a"}, {"cat": ["b", {"var": "d"}]}]
        ]}));
        assert_eq!(display.section_ids(), assign(&node, DEFAULT_PREFIX).ids());
    }

    #[test]
    fn comparison_section_shows_operands() {
        let (_, display) = built(json!({">": [{"var": "age"}, 18]}));
        let Display::Section(section) = display else {
            panic!("expected section");
        };
        assert_eq!(section.label, ">");
        assert_eq!(section.summary, "2 items");
        assert_eq!(section.children.len(), 2);
        let Display::Section(var) = &section.children[0].display else {
            panic!("expected var section");
        };
        assert_eq!(var.badge.as_deref(), Some("Variable: age"));
        assert!(var.children.is_empty());
        assert_eq!(
            section.children[1].display,
            Display::Badge { text: "18".into() }
        );
    }

    #[test]
    fn shorthand_and_explicit_if_build_identically() {
        let (_, explicit) = built(json!({"if": [{"var": "a"}, 1, 2]}));
        let (_, shorthand) = built(json!([{"var": "a"}, 1, 2]));
        assert_eq!(explicit, shorthand);
        let Display::Section(section) = explicit else {
            panic!("expected section");
        };
        assert_eq!(section.label, "IF-THEN-ELSE");
        let branches: Vec<Branch> = section.children.iter().map(|c| c.branch).collect();
        assert_eq!(branches, vec![Branch::Condition, Branch::Then, Branch::Else]);
    }

    #[test]
    fn unknown_operator_is_opaque_but_keeps_nested_sections() {
        let (node, display) = built(json!({"regex": ["^a", {"var": "s"}]}));
        let Display::Section(section) = &display else {
            panic!("expected section");
        };
        assert_eq!(section.label, "REGEX");
        assert_eq!(section.badge.as_deref(), Some(r#"regex: ["^a",{"var":"s"}]"#));
        assert_eq!(section.children.len(), 1);
        assert_eq!(display.section_ids(), assign(&node, DEFAULT_PREFIX).ids());
    }

    #[test]
    fn literal_root_is_a_badge() {
        let (_, display) = built(json!("hello"));
        assert_eq!(display, Display::Badge { text: "\"hello\"".into() });
        assert!(display.section_ids().is_empty());
    }

    #[test]
    fn find_locates_nested_section() {
        let (_, display) = built(json!({"or": [{"var": "a"}, {"==": [1, 1]}]}));
        let found = display.find(&NodeId::from("root/or/1/==")).expect("section");
        assert_eq!(found.label, "==");
    }

    #[test]
    fn expansion_state() {
        let (node, display) = built(json!({"and": [{"var": "a"}, {"var": "b"}]}));
        let ids = assign(&node, DEFAULT_PREFIX);
        let mut state = Expansion::default();
        assert!(state.toggle(&NodeId::from("root/and")));
        assert!(state.is_expanded(&NodeId::from("root/and")));
        assert!(!state.toggle(&NodeId::from("root/and")));

        state.expand_all(&ids);
        assert_eq!(state.len(), 3);
        state.collapse_all();
        assert!(state.is_empty());

        state.toggle(&NodeId::from("root/and"));
        state.toggle(&NodeId::from("root/gone"));
        state.retain_valid(&ids);
        assert_eq!(state.len(), 1);

        let outline = display.outline(Some(&state));
        assert!(outline.contains("[-] AND (2 items)"));
        assert!(outline.contains("[+] VAR (1 item) Variable: a"));
    }

    #[test]
    fn collapsed_root_hides_children() {
        let (_, display) = built(json!({"and": [{"var": "a"}]}));
        let outline = display.outline(Some(&Expansion::default()));
        assert_eq!(outline.lines().count(), 1);
        assert_eq!(display.outline(None).lines().count(), 2);
    }
}
