//! The top-level layouts a module document is known to use.

use serde_json::{Map, Value};

const FLOWS: &str = "flows";
const USER_FLOWS: &str = "user_flows";

/// Where the flow list lives inside a nested wrapper object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedShape {
    Flows,
    UserFlows,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentShape {
    /// `[ ...flows ]`
    List,
    /// `{ "flows": [...] }`
    Flows,
    /// `{ "user_flows": [...] }`
    UserFlows,
    /// `{ "<key>": { "flows" | "user_flows": [...] } }` or `{ "<key>": [...] }`
    Nested { key: String, inner: NestedShape },
    /// Nothing recognisable; reads as an empty list.
    Unrecognised,
}

fn array_at<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    obj.get(key).and_then(Value::as_array)
}

impl DocumentShape {
    /// Detection order: bare list, `flows`, `user_flows`, then the first
    /// top-level key (document order) whose value wraps a list.
    pub fn detect(doc: &Value) -> Self {
        let obj = match doc {
            Value::Array(_) => return DocumentShape::List,
            Value::Object(obj) => obj,
            _ => return DocumentShape::Unrecognised,
        };
        if array_at(obj, FLOWS).is_some() {
            return DocumentShape::Flows;
        }
        if array_at(obj, USER_FLOWS).is_some() {
            return DocumentShape::UserFlows;
        }
        for (key, value) in obj {
            let inner = match value {
                Value::Object(inner) if array_at(inner, FLOWS).is_some() => NestedShape::Flows,
                Value::Object(inner) if array_at(inner, USER_FLOWS).is_some() => {
                    NestedShape::UserFlows
                }
                Value::Array(_) => NestedShape::List,
                _ => continue,
            };
            return DocumentShape::Nested {
                key: key.clone(),
                inner,
            };
        }
        DocumentShape::Unrecognised
    }

    /// The raw flow records, if the shape holds any.
    pub fn extract<'a>(&self, doc: &'a Value) -> &'a [Value] {
        let found = match self {
            DocumentShape::List => doc.as_array(),
            DocumentShape::Flows => doc.get(FLOWS).and_then(Value::as_array),
            DocumentShape::UserFlows => doc.get(USER_FLOWS).and_then(Value::as_array),
            DocumentShape::Nested { key, inner } => {
                let nested = doc.get(key.as_str());
                match inner {
                    NestedShape::Flows => nested.and_then(|n| n.get(FLOWS)),
                    NestedShape::UserFlows => nested.and_then(|n| n.get(USER_FLOWS)),
                    NestedShape::List => nested,
                }
                .and_then(Value::as_array)
            }
            DocumentShape::Unrecognised => None,
        };
        found.map(Vec::as_slice).unwrap_or_default()
    }

    /// Put `flows` back where they were found, leaving every other key alone.
    pub fn replace(&self, doc: &mut Value, flows: Vec<Value>) {
        let list = Value::Array(flows);
        match self {
            DocumentShape::List => *doc = list,
            DocumentShape::Flows => insert(doc, FLOWS, list),
            DocumentShape::UserFlows => insert(doc, USER_FLOWS, list),
            DocumentShape::Nested { key, inner } => {
                if let Some(nested) = doc.get_mut(key.as_str()) {
                    match inner {
                        NestedShape::Flows => insert(nested, FLOWS, list),
                        NestedShape::UserFlows => insert(nested, USER_FLOWS, list),
                        NestedShape::List => *nested = list,
                    }
                } else {
                    insert(doc, FLOWS, list);
                }
            }
            DocumentShape::Unrecognised => insert(doc, FLOWS, list),
        }
    }
}

fn insert(target: &mut Value, key: &str, list: Value) {
    match target {
        Value::Object(obj) => {
            obj.insert(key.to_string(), list);
        }
        other => {
            let mut obj = Map::new();
            obj.insert(key.to_string(), list);
            *other = Value::Object(obj);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_every_known_layout() {
        assert_eq!(DocumentShape::detect(&json!([])), DocumentShape::List);
        assert_eq!(DocumentShape::detect(&json!({"flows": []})), DocumentShape::Flows);
        assert_eq!(
            DocumentShape::detect(&json!({"user_flows": [], "module": "x"})),
            DocumentShape::UserFlows
        );
        assert_eq!(
            DocumentShape::detect(&json!({"meta": {"v": 1}, "publish": {"user_flows": []}})),
            DocumentShape::Nested {
                key: "publish".into(),
                inner: NestedShape::UserFlows
            }
        );
        assert_eq!(
            DocumentShape::detect(&json!({"measure_flows": [{"flow_id": "a"}]})),
            DocumentShape::Nested {
                key: "measure_flows".into(),
                inner: NestedShape::List
            }
        );
        assert_eq!(DocumentShape::detect(&json!({"a": 1})), DocumentShape::Unrecognised);
        assert_eq!(DocumentShape::detect(&json!("text")), DocumentShape::Unrecognised);
    }

    #[test]
    fn flows_wins_over_user_flows() {
        let doc = json!({"user_flows": [1], "flows": [2]});
        let shape = DocumentShape::detect(&doc);
        assert_eq!(shape, DocumentShape::Flows);
        assert_eq!(shape.extract(&doc), &[json!(2)]);
    }

    #[test]
    fn replace_keeps_sibling_keys() {
        let mut doc = json!({
            "metadata": {"owner": "docs"},
            "wrapper": {"version": 2, "flows": [{"flow_id": "a"}]}
        });
        let shape = DocumentShape::detect(&doc);
        shape.replace(&mut doc, vec![json!({"flow_id": "b"})]);
        assert_eq!(
            doc,
            json!({
                "metadata": {"owner": "docs"},
                "wrapper": {"version": 2, "flows": [{"flow_id": "b"}]}
            })
        );
    }

    #[test]
    fn unrecognised_gains_a_flows_key() {
        let mut doc = json!({"title": "empty"});
        let shape = DocumentShape::detect(&doc);
        assert!(shape.extract(&doc).is_empty());
        shape.replace(&mut doc, vec![json!({"flow_id": "x"})]);
        assert_eq!(doc, json!({"title": "empty", "flows": [{"flow_id": "x"}]}));
    }
}
