//! Tree evaluator.
//!
//! Evaluation is pure: the tree and the data context are only borrowed, and
//! the same pair always yields the same value. Missing variables, wrong
//! operand counts and unknown operators degrade to `null` instead of failing;
//! see [`crate::value`] for the coercion rules.

use crate::error::EvalError;
use crate::node::{Conditional, DEFAULT_MAX_DEPTH, Node, VarRef};
use crate::operator::Operator;
use crate::value::{compare, loose_eq, number_value, strict_eq, to_display_string, to_number, truthy};
use serde_json::Value;
use std::cmp::Ordering;

pub type EvalResult = Result<Value, EvalError>;

/// Evaluate with the default depth limit.
pub fn evaluate(node: &Node, data: &Value) -> EvalResult {
    Evaluator::default().evaluate(node, data)
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Evaluator {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// `data` must be a JSON object, or `null` for "no context".
    pub fn evaluate(&self, node: &Node, data: &Value) -> EvalResult {
        match data {
            Value::Object(_) | Value::Null => {}
            other => return Err(EvalError::InvalidContext(kind_name(other).to_string())),
        }
        eval(
            node,
            Scope {
                data,
                depth: 0,
                max_depth: self.max_depth,
            },
        )
    }
}

#[derive(Clone, Copy)]
struct Scope<'a> {
    data: &'a Value,
    depth: usize,
    max_depth: usize,
}

impl<'a> Scope<'a> {
    /// Enter a node at `self.depth`; the root sits at depth 0.
    fn descend(self) -> Result<Self, EvalError> {
        if self.depth > self.max_depth {
            return Err(EvalError::TooDeep {
                limit: self.max_depth,
            });
        }
        Ok(Self {
            depth: self.depth + 1,
            ..self
        })
    }

    fn with_data<'b>(self, data: &'b Value) -> Scope<'b> {
        Scope {
            data,
            depth: self.depth,
            max_depth: self.max_depth,
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn eval(node: &Node, scope: Scope<'_>) -> EvalResult {
    let scope = scope.descend()?;
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::List(items) => Ok(Value::Array(eval_all(items, scope)?)),
        Node::Var(var) => op_var(var, scope),
        Node::Conditional(cond) => op_conditional(cond, scope),
        Node::Operation(operation) => {
            let args = operation.operands.as_slice();
            match &operation.op {
                Operator::And => op_and(args, scope),
                Operator::Or => op_or(args, scope),
                Operator::Not => Ok(Value::Bool(!truthy(&arg(args, 0, scope)?))),
                Operator::Eq => Ok(Value::Bool(loose_eq(&arg(args, 0, scope)?, &arg(args, 1, scope)?))),
                Operator::Neq => Ok(Value::Bool(!loose_eq(&arg(args, 0, scope)?, &arg(args, 1, scope)?))),
                Operator::Gt => op_compare(args, scope, |o| o == Ordering::Greater),
                Operator::Gte => op_compare(args, scope, |o| o != Ordering::Less),
                Operator::Lt => op_between(args, scope, |o| o == Ordering::Less),
                Operator::Lte => op_between(args, scope, |o| o != Ordering::Greater),
                Operator::In => Ok(Value::Bool(op_in(args, scope)?)),
                Operator::Nin => Ok(Value::Bool(!op_in(args, scope)?)),
                Operator::Missing => op_missing(args, scope),
                Operator::MissingSome => op_missing_some(args, scope),
                Operator::All => op_quantifier(args, scope, Quantifier::All),
                Operator::SomeOf => op_quantifier(args, scope, Quantifier::Any),
                Operator::NoneOf => op_quantifier(args, scope, Quantifier::NoneMatch),
                Operator::Merge => op_merge(args, scope),
                Operator::Cat => op_cat(args, scope),
                Operator::Substr => op_substr(args, scope),
                Operator::Log => op_log(args, scope),
                Operator::Add => op_add(args, scope),
                Operator::Sub => op_sub(args, scope),
                Operator::Mul => op_mul(args, scope),
                Operator::Div => Ok(number_value(num_arg(args, 0, scope)? / num_arg(args, 1, scope)?)),
                Operator::Mod => Ok(number_value(num_arg(args, 0, scope)? % num_arg(args, 1, scope)?)),
                Operator::Min => op_extremum(args, scope, f64::min),
                Operator::Max => op_extremum(args, scope, f64::max),
                // `if` and `var` never reach here; see `Node::operation`.
                Operator::If | Operator::Var | Operator::Opaque(_) => {
                    tracing::debug!(tag = %operation.op.tag(), "unknown operator evaluates to null");
                    Ok(Value::Null)
                }
            }
        }
    }
}

/// Operand `index`, or `null` when the operand list is too short.
fn arg(args: &[Node], index: usize, scope: Scope<'_>) -> EvalResult {
    match args.get(index) {
        Some(node) => eval(node, scope),
        None => Ok(Value::Null),
    }
}

/// Numeric operand `index`; a missing operand is NaN so the result is `null`.
fn num_arg(args: &[Node], index: usize, scope: Scope<'_>) -> Result<f64, EvalError> {
    match args.get(index) {
        Some(node) => Ok(to_number(&eval(node, scope)?)),
        None => Ok(f64::NAN),
    }
}

fn eval_all(args: &[Node], scope: Scope<'_>) -> Result<Vec<Value>, EvalError> {
    args.iter().map(|node| eval(node, scope)).collect()
}

fn lookup(data: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(data.clone());
    }
    let mut current = data;
    for part in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn op_var(var: &VarRef, scope: Scope<'_>) -> EvalResult {
    let path = match var.path() {
        Some(node) => eval(node, scope)?,
        None => Value::Null,
    };
    let key = match &path {
        Value::Null => String::new(),
        other => to_display_string(other),
    };
    match lookup(scope.data, &key) {
        Some(value) if !value.is_null() => Ok(value),
        _ => match var.default() {
            Some(default) => eval(default, scope),
            None => Ok(Value::Null),
        },
    }
}

fn op_conditional(cond: &Conditional, scope: Scope<'_>) -> EvalResult {
    if truthy(&eval(&cond.condition, scope)?) {
        eval(&cond.then, scope)
    } else if let Some(otherwise) = &cond.otherwise {
        eval(otherwise, scope)
    } else {
        Ok(Value::Null)
    }
}

fn op_and(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let mut last = Value::Null;
    for node in args {
        last = eval(node, scope)?;
        if !truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn op_or(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let mut last = Value::Null;
    for node in args {
        last = eval(node, scope)?;
        if truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn op_compare<F>(args: &[Node], scope: Scope<'_>, accept: F) -> EvalResult
where
    F: Fn(Ordering) -> bool,
{
    let a = arg(args, 0, scope)?;
    let b = arg(args, 1, scope)?;
    Ok(Value::Bool(compare(&a, &b).is_some_and(accept)))
}

/// `<` and `<=` also take a third operand: `a < b < c`.
fn op_between<F>(args: &[Node], scope: Scope<'_>, accept: F) -> EvalResult
where
    F: Fn(Ordering) -> bool,
{
    let a = arg(args, 0, scope)?;
    let b = arg(args, 1, scope)?;
    let first = compare(&a, &b).is_some_and(&accept);
    if args.len() < 3 || !first {
        return Ok(Value::Bool(first));
    }
    let c = arg(args, 2, scope)?;
    Ok(Value::Bool(compare(&b, &c).is_some_and(&accept)))
}

fn op_in(args: &[Node], scope: Scope<'_>) -> Result<bool, EvalError> {
    let needle = arg(args, 0, scope)?;
    let haystack = arg(args, 1, scope)?;
    Ok(match haystack {
        Value::String(s) => s.contains(&to_display_string(&needle)),
        Value::Array(items) => items.iter().any(|item| strict_eq(item, &needle)),
        _ => false,
    })
}

fn missing_keys(keys: &[Value], data: &Value) -> Vec<Value> {
    keys.iter()
        .filter(|key| {
            let path = to_display_string(key);
            match lookup(data, &path) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            }
        })
        .cloned()
        .collect()
}

fn op_missing(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let values = eval_all(args, scope)?;
    let keys = match values.first() {
        Some(Value::Array(list)) => list.clone(),
        _ => values,
    };
    Ok(Value::Array(missing_keys(&keys, scope.data)))
}

fn op_missing_some(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let need = num_arg(args, 0, scope)?;
    let keys = match arg(args, 1, scope)? {
        Value::Array(list) => list,
        Value::Null => Vec::new(),
        single => vec![single],
    };
    let missing = missing_keys(&keys, scope.data);
    let present = (keys.len() - missing.len()) as f64;
    if present >= need {
        Ok(Value::Array(Vec::new()))
    } else {
        Ok(Value::Array(missing))
    }
}

#[derive(Clone, Copy)]
enum Quantifier {
    All,
    Any,
    NoneMatch,
}

fn op_quantifier(args: &[Node], scope: Scope<'_>, quantifier: Quantifier) -> EvalResult {
    let items = match arg(args, 0, scope)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    let test = args.get(1);
    let passes = |item: &Value| -> Result<bool, EvalError> {
        match test {
            Some(node) => Ok(truthy(&eval(node, scope.with_data(item))?)),
            None => Ok(false),
        }
    };
    let result = match quantifier {
        Quantifier::All => {
            if items.is_empty() {
                false
            } else {
                let mut all = true;
                for item in &items {
                    if !passes(item)? {
                        all = false;
                        break;
                    }
                }
                all
            }
        }
        Quantifier::Any | Quantifier::NoneMatch => {
            let mut any = false;
            for item in &items {
                if passes(item)? {
                    any = true;
                    break;
                }
            }
            matches!(quantifier, Quantifier::Any) == any
        }
    };
    Ok(Value::Bool(result))
}

fn op_merge(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let mut out = Vec::new();
    for value in eval_all(args, scope)? {
        match value {
            Value::Array(items) => out.extend(items),
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

fn op_cat(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let mut out = String::new();
    for value in eval_all(args, scope)? {
        if !value.is_null() {
            out.push_str(&to_display_string(&value));
        }
    }
    Ok(Value::String(out))
}

fn op_substr(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let source: Vec<char> = to_display_string(&arg(args, 0, scope)?).chars().collect();
    let len = source.len() as i64;
    let start = offset(num_arg(args, 1, scope)?);
    let start = if start < 0 {
        len.saturating_add(start).max(0)
    } else {
        start.min(len)
    };
    let end = match args.get(2) {
        None => len,
        Some(node) => match eval(node, scope)? {
            Value::Null => len,
            count => {
                let count = offset(to_number(&count));
                if count < 0 {
                    len.saturating_add(count).max(start)
                } else {
                    start.saturating_add(count).min(len)
                }
            }
        },
    };
    let (start, end) = (start as usize, end.max(start) as usize);
    Ok(Value::String(source[start..end].iter().collect()))
}

/// Whole-number offset; NaN is 0 and out-of-range values saturate.
fn offset(n: f64) -> i64 {
    if n.is_nan() { 0 } else { n as i64 }
}

fn op_log(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let value = arg(args, 0, scope)?;
    tracing::info!(target: "rulelens::log", value = %value, "log");
    Ok(value)
}

fn op_add(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let mut total = 0.0;
    for node in args {
        total += to_number(&eval(node, scope)?);
    }
    Ok(number_value(total))
}

fn op_sub(args: &[Node], scope: Scope<'_>) -> EvalResult {
    let a = num_arg(args, 0, scope)?;
    if args.len() == 1 {
        return Ok(number_value(-a));
    }
    Ok(number_value(a - num_arg(args, 1, scope)?))
}

fn op_mul(args: &[Node], scope: Scope<'_>) -> EvalResult {
    if args.is_empty() {
        return Ok(Value::Null);
    }
    let mut product = 1.0;
    for node in args {
        product *= to_number(&eval(node, scope)?);
    }
    Ok(number_value(product))
}

fn op_extremum(args: &[Node], scope: Scope<'_>, pick: fn(f64, f64) -> f64) -> EvalResult {
    let mut acc: Option<f64> = None;
    for node in args {
        let n = to_number(&eval(node, scope)?);
        if n.is_nan() {
            return Ok(Value::Null);
        }
        acc = Some(acc.map_or(n, |current| pick(current, n)));
    }
    Ok(acc.map(number_value).unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_value;
    use serde_json::json;

    fn run(rule: Value, data: Value) -> Value {
        let node = parse_value(&rule).expect("parse");
        evaluate(&node, &data).expect("evaluate")
    }

    #[test]
    fn and_of_comparisons() {
        let rule = json!({"and": [
            {">": [{"var": "age"}, 18]},
            {"==": [{"var": "country"}, "USA"]}
        ]});
        assert_eq!(run(rule.clone(), json!({"age": 25, "country": "USA"})), json!(true));
        assert_eq!(run(rule, json!({"age": 15, "country": "USA"})), json!(false));
    }

    #[test]
    fn missing_variable_is_null() {
        assert_eq!(run(json!({"var": "missing.path"}), json!({})), Value::Null);
    }

    #[test]
    fn var_descends_dotted_paths_and_arrays() {
        let data = json!({"user": {"tags": ["a", "b"], "name": "Ada"}});
        assert_eq!(run(json!({"var": "user.name"}), data.clone()), json!("Ada"));
        assert_eq!(run(json!({"var": "user.tags.1"}), data.clone()), json!("b"));
        assert_eq!(run(json!({"var": ["user.age", 30]}), data.clone()), json!(30));
        assert_eq!(run(json!({"var": ""}), data.clone()), data);
    }

    #[test]
    fn and_or_return_operand_values() {
        assert_eq!(run(json!({"and": [1, "", 3]}), json!({})), json!(""));
        assert_eq!(run(json!({"and": [1, 2, 3]}), json!({})), json!(3));
        assert_eq!(run(json!({"or": [0, null, "x"]}), json!({})), json!("x"));
        assert_eq!(run(json!({"or": [0, false]}), json!({})), json!(false));
    }

    #[test]
    fn not_uses_truthiness() {
        assert_eq!(run(json!({"not": [[]]}), json!({})), json!(true));
        assert_eq!(run(json!({"not": {"var": "x"}}), json!({"x": "0"})), json!(false));
    }

    #[test]
    fn comparisons_coerce() {
        assert_eq!(run(json!({"==": [1, "1"]}), json!({})), json!(true));
        assert_eq!(run(json!({"!=": [1, 2]}), json!({})), json!(true));
        assert_eq!(run(json!({">=": ["b", "a"]}), json!({})), json!(true));
        assert_eq!(run(json!({"<": [1, 5, 10]}), json!({})), json!(true));
        assert_eq!(run(json!({"<=": [1, 11, 10]}), json!({})), json!(false));
        assert_eq!(run(json!({">": [1]}), json!({})), json!(true));
    }

    #[test]
    fn only_less_than_takes_a_third_operand() {
        assert_eq!(run(json!({"<": [1, 5, 3]}), json!({})), json!(false));
        assert_eq!(run(json!({"<=": [1, 1, 1]}), json!({})), json!(true));
        // A stray third operand of `>` / `>=` is ignored.
        assert_eq!(run(json!({">": [5, 3, 10]}), json!({})), json!(true));
        assert_eq!(run(json!({">=": [5, 5, 10]}), json!({})), json!(true));
    }

    #[test]
    fn membership() {
        assert_eq!(run(json!({"in": ["Spring", "Springfield"]}), json!({})), json!(true));
        assert_eq!(run(json!({"in": [2, [1, 2, 3]]}), json!({})), json!(true));
        assert_eq!(run(json!({"nin": ["x", ["a", "b"]]}), json!({})), json!(true));
        assert_eq!(run(json!({"in": ["x", null]}), json!({})), json!(false));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run(json!({"+": [1, 2, "3"]}), json!({})), json!(6));
        assert_eq!(run(json!({"+": ["3.5"]}), json!({})), json!(3.5));
        assert_eq!(run(json!({"-": [10, 4]}), json!({})), json!(6));
        assert_eq!(run(json!({"-": [2]}), json!({})), json!(-2));
        assert_eq!(run(json!({"*": [2, 3, 4]}), json!({})), json!(24));
        assert_eq!(run(json!({"/": [7, 2]}), json!({})), json!(3.5));
        assert_eq!(run(json!({"%": [7, 3]}), json!({})), json!(1));
        assert_eq!(run(json!({"min": [3, 1, 2]}), json!({})), json!(1));
        assert_eq!(run(json!({"max": [3, 1, 2]}), json!({})), json!(3));
    }

    #[test]
    fn arithmetic_degrades_to_null() {
        assert_eq!(run(json!({"/": [1, 0]}), json!({})), Value::Null);
        assert_eq!(run(json!({"%": [1, 0]}), json!({})), Value::Null);
        assert_eq!(run(json!({"-": []}), json!({})), Value::Null);
        assert_eq!(run(json!({"max": []}), json!({})), Value::Null);
        assert_eq!(run(json!({"+": ["abc", 1]}), json!({})), Value::Null);
    }

    #[test]
    fn conditionals() {
        let rule = json!({"if": [{">": [{"var": "t"}, 30]}, "hot", "cold"]});
        assert_eq!(run(rule.clone(), json!({"t": 35})), json!("hot"));
        assert_eq!(run(rule, json!({"t": 10})), json!("cold"));
        assert_eq!(run(json!({"if": [false, "x"]}), json!({})), Value::Null);
        let chain = json!({"if": [{"var": "a"}, 1, {"var": "b"}, 2, 3]});
        assert_eq!(run(chain.clone(), json!({"b": true})), json!(2));
        assert_eq!(run(chain, json!({})), json!(3));
    }

    #[test]
    fn shorthand_conditional_evaluates_like_if() {
        let data = json!({"vip": true});
        assert_eq!(
            run(json!([{"var": "vip"}, "gold", "std"]), data.clone()),
            run(json!({"if": [{"var": "vip"}, "gold", "std"]}), data)
        );
    }

    #[test]
    fn missing_operators() {
        let data = json!({"a": 1, "b": "", "c": null});
        assert_eq!(run(json!({"missing": ["a", "b", "c", "d"]}), data.clone()), json!(["b", "c", "d"]));
        assert_eq!(run(json!({"missing": [["a", "z"]]}), data.clone()), json!(["z"]));
        assert_eq!(run(json!({"missing_some": [1, ["a", "z"]]}), data.clone()), json!([]));
        assert_eq!(run(json!({"missing_some": [2, ["a", "z"]]}), data), json!(["z"]));
    }

    #[test]
    fn quantifiers_scope_items() {
        let data = json!({"scores": [7, 9, 12]});
        let all = json!({"all": [{"var": "scores"}, {">": [{"var": ""}, 5]}]});
        let some = json!({"some": [{"var": "scores"}, {">": [{"var": ""}, 10]}]});
        let none = json!({"none": [{"var": "scores"}, {">": [{"var": ""}, 20]}]});
        assert_eq!(run(all, data.clone()), json!(true));
        assert_eq!(run(some, data.clone()), json!(true));
        assert_eq!(run(none, data), json!(true));
        assert_eq!(run(json!({"all": [[], true]}), json!({})), json!(false));
        assert_eq!(run(json!({"none": [[], true]}), json!({})), json!(true));
    }

    #[test]
    fn string_operators() {
        assert_eq!(run(json!({"cat": ["I love ", {"var": "x"}, null, 2]}), json!({"x": "pie"})), json!("I love pie2"));
        assert_eq!(run(json!({"substr": ["jsonlogic", 4]}), json!({})), json!("logic"));
        assert_eq!(run(json!({"substr": ["jsonlogic", -5]}), json!({})), json!("logic"));
        assert_eq!(run(json!({"substr": ["jsonlogic", 1, 3]}), json!({})), json!("son"));
        assert_eq!(run(json!({"substr": ["jsonlogic", 4, -2]}), json!({})), json!("log"));
        assert_eq!(run(json!({"merge": [[1, 2], 3, [[4]]]}), json!({})), json!([1, 2, 3, [4]]));
    }

    #[test]
    fn substr_clamps_huge_offsets() {
        let cases = [
            (json!(["abc", 1, 1e300]), "bc"),
            (json!(["abc", 1, -1e300]), ""),
            (json!(["abc", 1e300]), ""),
            (json!(["abc", -1e300]), "abc"),
            (json!(["abc", -1e300, 2]), "ab"),
            (json!(["abc", -1e300, 1e300]), "abc"),
            (json!(["abc", 1e300, -1e300]), ""),
        ];
        for (operands, expected) in cases {
            assert_eq!(run(json!({"substr": operands.clone()}), json!({})), json!(expected), "{operands}");
        }
    }

    #[test]
    fn log_returns_its_operand() {
        assert_eq!(run(json!({"log": "apple"}), json!({})), json!("apple"));
    }

    #[test]
    fn unknown_operator_is_null() {
        assert_eq!(run(json!({"regex": ["a", "b"]}), json!({})), Value::Null);
    }

    #[test]
    fn lists_evaluate_element_wise() {
        assert_eq!(run(json!([1, {"var": "a"}]), json!({"a": "x"})), json!([1, "x"]));
    }

    #[test]
    fn non_object_context_is_an_error() {
        let node = parse_value(&json!({"var": "a"})).expect("parse");
        let err = evaluate(&node, &json!([1, 2])).expect_err("array context");
        assert_eq!(err.code(), "invalid-context");
        assert_eq!(evaluate(&node, &Value::Null).expect("null context"), Value::Null);
    }

    #[test]
    fn depth_limit_is_a_runtime_error() {
        let node = parse_value(&json!({"not": {"not": {"not": true}}})).expect("parse");
        let err = Evaluator::with_max_depth(2).evaluate(&node, &json!({})).expect_err("too deep");
        assert_eq!(err, EvalError::TooDeep { limit: 2 });
        // `true` sits at depth 3.
        assert_eq!(Evaluator::with_max_depth(3).evaluate(&node, &json!({})), Ok(json!(false)));
    }

    #[test]
    fn evaluation_does_not_mutate_inputs() {
        let node = parse_value(&json!({"merge": [{"var": "xs"}, 4]})).expect("parse");
        let data = json!({"xs": [1, 2, 3]});
        let before = (node.clone(), data.clone());
        let first = evaluate(&node, &data).expect("evaluate");
        let second = evaluate(&node, &data).expect("evaluate");
        assert_eq!(first, second);
        assert_eq!((node, data), before);
    }
}
