//! JSON Schema checks and input sanitising for write bodies.

use jsonschema::Validator;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{FieldError, FlowError, Result};

static SCRIPT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("script pattern compiles"));
static IFRAME_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<iframe\b.*?</iframe\s*>").expect("iframe pattern compiles"));

static FLOW_VALIDATOR: Lazy<Validator> =
    Lazy::new(|| jsonschema::validator_for(&flow_schema()).expect("flow schema compiles"));
static WORKFLOW_VALIDATOR: Lazy<Validator> = Lazy::new(|| {
    jsonschema::validator_for(&cross_module_schema()).expect("cross-module schema compiles")
});

fn string_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

pub fn flow_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Flow",
        "type": "object",
        "required": ["flow_name", "description", "steps"],
        "properties": {
            "flow_id": { "type": "string", "pattern": "^[A-Z0-9_]+$" },
            "flow_name": { "type": "string", "minLength": 1, "maxLength": 200 },
            "description": { "type": "string", "minLength": 1 },
            "flowCategory": { "type": "string" },
            "categoryDescription": { "type": "string" },
            "steps": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "oneOf": [
                        { "type": "string" },
                        {
                            "type": "object",
                            "properties": {
                                "step_id": { "type": ["string", "number"] },
                                "description": { "type": "string" },
                                "action": { "type": "string" },
                                "module": { "type": "string" }
                            }
                        }
                    ]
                }
            },
            "prerequisites": string_list(),
            "dependencies": string_list(),
            "related_flows": string_list(),
            "source_documents": string_list(),
            "isPrerequisite": { "type": "boolean" },
            "tags": string_list(),
            "version": { "type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$" },
            "created_at": { "type": "string", "format": "date-time" },
            "updated_at": { "type": "string", "format": "date-time" },
            "change_log": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "version": { "type": "string" },
                        "date": { "type": "string" },
                        "changes": string_list(),
                        "source": { "type": "string" }
                    }
                }
            }
        }
    })
}

pub fn cross_module_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "CrossModuleWorkflow",
        "type": "object",
        "required": ["workflow_id", "workflow_name", "description", "workflow_steps"],
        "properties": {
            "workflow_id": { "type": "string", "pattern": "^[A-Z0-9_]+$" },
            "workflow_name": { "type": "string", "minLength": 1, "maxLength": 200 },
            "description": { "type": "string", "minLength": 1 },
            "modules_involved": {
                "type": "array",
                "minItems": 2,
                "items": { "type": "string" }
            },
            "business_value": { "type": "string" },
            "workflow_steps": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["step_id", "module", "step_description"],
                    "properties": {
                        "step_id": { "type": ["string", "number"] },
                        "module": { "type": "string" },
                        "module_flow_reference": {
                            "type": "object",
                            "properties": {
                                "flow_name": { "type": "string" },
                                "flow_id": { "type": "string" },
                                "description": { "type": "string" }
                            }
                        },
                        "step_description": { "type": "string" },
                        "outputs": string_list(),
                        "inputs": string_list()
                    }
                }
            },
            "prerequisites": string_list(),
            "source_documents": string_list()
        }
    })
}

fn collect(validator: &Validator, instance: &Value) -> Vec<FieldError> {
    validator
        .iter_errors(instance)
        .map(|e| FieldError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect()
}

fn check(validator: &Validator, instance: &Value, message: &str) -> Result<()> {
    let details = collect(validator, instance);
    if details.is_empty() {
        Ok(())
    } else {
        Err(FlowError::Validation {
            message: message.to_string(),
            details,
        })
    }
}

pub fn validate_flow(body: &Value) -> Result<()> {
    check(&FLOW_VALIDATOR, body, "Invalid flow data")
}

pub fn validate_patched_flow(body: &Value) -> Result<()> {
    check(&FLOW_VALIDATOR, body, "Invalid flow data after patch")
}

pub fn validate_workflow(body: &Value) -> Result<()> {
    check(&WORKFLOW_VALIDATOR, body, "Invalid workflow data")
}

/// Turn an already validated body into a typed record.
pub fn decode<T: DeserializeOwned>(body: Value, message: &str) -> Result<T> {
    serde_json::from_value(body).map_err(|e| FlowError::Validation {
        message: message.to_string(),
        details: vec![FieldError {
            path: String::new(),
            message: e.to_string(),
        }],
    })
}

/// Schema problems for a stored flow, without wrapping them in an error.
pub fn flow_problems(flow: &Value) -> Vec<FieldError> {
    collect(&FLOW_VALIDATOR, flow)
}

pub fn workflow_problems(workflow: &Value) -> Vec<FieldError> {
    collect(&WORKFLOW_VALIDATOR, workflow)
}

/// Strip `<script>`/`<iframe>` elements and trim every string, recursively.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let s = SCRIPT_TAG.replace_all(&s, "");
            let s = IFRAME_TAG.replace_all(&s, "");
            Value::String(s.trim().to_string())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect()),
        other => other,
    }
}
