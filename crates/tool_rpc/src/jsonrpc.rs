use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON‑RPC 2.0 core types for tool servers talking over stdin/stdout.
///
/// These structs mirror the [JSON‑RPC 2.0 spec](https://www.jsonrpc.org/specification)
/// and carry no transport assumptions.
///
/// ```ignore
/// use serde_json::json;
/// use tool_rpc::jsonrpc::{Id, Request};
///
/// let req = Request::call(Id::Number(1), "tools/list", Some(json!({})));
/// let s = serde_json::to_string(&req).unwrap();
/// ```
pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// `id` MAY be a string, number or null. We support all forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    String(String),
    Null,
}

/// JSON‑RPC 2.0 Request object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Omitted for *notifications*.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_owned()
}

/// JSON‑RPC 2.0 Error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Error {
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found", Some(Value::String(method.to_owned())))
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, "Invalid params", Some(Value::String(detail.into())))
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, "Internal error", Some(Value::String(detail.into())))
    }
}

/// JSON‑RPC 2.0 Response object.
/// Exactly one of `result` or `error` **must** be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    pub id: Id,
}

/// Lets callers `serde_json::from_str::<Message>()` without inspecting the type first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Request {
    /// Create a *notification* (no response expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id: None,
        }
    }

    /// Create a *call* expecting a response.
    pub fn call(id: Id, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }
}

impl Response {
    pub fn success(id: Id, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn fail(id: Id, error: Error) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// Methods a tool server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolMethod {
    Initialize,
    Initialized,
    Ping,
    ToolsList,
    ToolsCall,
}

impl ToolMethod {
    /// Returns the canonical JSON‑RPC method string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ToolMethod::Initialize => "initialize",
            ToolMethod::Initialized => "notifications/initialized",
            ToolMethod::Ping => "ping",
            ToolMethod::ToolsList => "tools/list",
            ToolMethod::ToolsCall => "tools/call",
        }
    }
}

impl From<ToolMethod> for String {
    fn from(m: ToolMethod) -> Self {
        m.as_str().to_owned()
    }
}

impl std::str::FromStr for ToolMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialize" => Ok(ToolMethod::Initialize),
            "notifications/initialized" => Ok(ToolMethod::Initialized),
            "ping" => Ok(ToolMethod::Ping),
            "tools/list" => Ok(ToolMethod::ToolsList),
            "tools/call" => Ok(ToolMethod::ToolsCall),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_keeps_method_and_id() {
        let req = Request::call(Id::Number(1), ToolMethod::ToolsCall, Some(json!({"name": "get_flow"})));
        let s = serde_json::to_string(&req).unwrap();
        let de: Request = serde_json::from_str(&s).unwrap();
        assert_eq!(de.method, "tools/call");
        assert_eq!(de.id, Some(Id::Number(1)));
    }

    #[test]
    fn notification_has_no_id() {
        let req = Request::notification("notifications/initialized", None);
        let s = serde_json::to_string(&req).unwrap();
        assert!(!s.contains("\"id\""));
    }

    #[test]
    fn failure_omits_result() {
        let resp = Response::fail(Id::String("abc".into()), Error::method_not_found("nope"));
        let v = serde_json::to_value(&resp).unwrap();
        assert!(v.get("result").is_none());
        assert_eq!(v["error"]["code"], json!(METHOD_NOT_FOUND));
    }

    #[test]
    fn tool_method_parse() {
        let m: ToolMethod = "tools/list".parse().unwrap();
        assert_eq!(m, ToolMethod::ToolsList);
        assert_eq!(m.as_str(), "tools/list");
        assert!("resources/list".parse::<ToolMethod>().is_err());
    }
}
