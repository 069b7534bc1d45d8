//! Line-delimited JSON‑RPC loop that wires a reader/writer pair (normally
//! stdin/stdout) to a user‑supplied [`RpcHandler`].
//!
//! * Requests → method dispatch → one response line
//! * Notifications (no `id`) → fire‑and‑forget
//! * Unparsable lines, including ones that are not UTF-8 → `-32700` with a
//!   null id
//!
//! Nothing but protocol frames is written to the writer, so handlers must log
//! somewhere other than stdout.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::jsonrpc::{self, Id, Message, Response};

#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Answer a call. The returned value becomes `result`.
    async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, jsonrpc::Error>;

    /// Called for notifications. Default ignores them.
    async fn notify(&self, _method: &str, _params: Option<Value>) {}
}

/// Process a single input line. Returns the response to write, if any.
pub async fn dispatch_line<H: RpcHandler + ?Sized>(handler: &H, line: &str) -> Option<Response> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Message>(line) {
        Ok(Message::Request(req)) => match req.id {
            Some(id) => {
                tracing::debug!(method = %req.method, "rpc call");
                let resp = match handler.handle(&req.method, req.params).await {
                    Ok(result) => Response::success(id, result),
                    Err(err) => {
                        tracing::debug!(method = %req.method, code = err.code, "rpc call failed");
                        Response::fail(id, err)
                    }
                };
                Some(resp)
            }
            None => {
                handler.notify(&req.method, req.params).await;
                None
            }
        },
        // stray responses on the input are ignored
        Ok(Message::Response(_)) => None,
        Err(e) => {
            tracing::warn!(error = %e, "unparsable rpc line");
            Some(parse_error(e.to_string()))
        }
    }
}

fn parse_error(detail: String) -> Response {
    Response::fail(
        Id::Null,
        jsonrpc::Error::new(jsonrpc::PARSE_ERROR, "Parse error", Some(json!(detail))),
    )
}

/// Read requests from `reader` until EOF, writing one response per line.
pub async fn serve<H, R, W>(handler: &H, reader: R, writer: W) -> Result<()>
where
    H: RpcHandler + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = reader;
    let mut writer = BufWriter::new(writer);
    let mut buf = Vec::new();

    while reader.read_until(b'\n', &mut buf).await? != 0 {
        let reply = match std::str::from_utf8(&buf) {
            Ok(line) => dispatch_line(handler, line).await,
            Err(e) => {
                tracing::warn!(error = %e, "rpc line is not UTF-8");
                Some(parse_error(e.to_string()))
            }
        };
        if let Some(resp) = reply {
            let mut out = serde_json::to_string(&resp)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
        buf.clear();
    }

    writer.flush().await?;
    Ok(())
}

/// Serve on the process' stdin/stdout.
pub async fn run_stdio<H: RpcHandler + ?Sized>(handler: &H) -> Result<()> {
    serve(handler, BufReader::new(io::stdin()), io::stdout()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{METHOD_NOT_FOUND, PARSE_ERROR};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Echo {
        notified: AtomicUsize,
    }

    #[async_trait]
    impl RpcHandler for Echo {
        async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, jsonrpc::Error> {
            match method {
                "echo" => Ok(params.unwrap_or(Value::Null)),
                other => Err(jsonrpc::Error::method_not_found(other)),
            }
        }

        async fn notify(&self, _method: &str, _params: Option<Value>) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn call_gets_result() {
        let h = Echo::default();
        let resp = dispatch_line(&h, r#"{"jsonrpc":"2.0","id":7,"method":"echo","params":{"a":1}}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, Id::Number(7));
        assert_eq!(resp.result, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn unknown_method_is_32601() {
        let h = Echo::default();
        let resp = dispatch_line(&h, r#"{"jsonrpc":"2.0","id":"x","method":"nope"}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn garbage_is_parse_error_with_null_id() {
        let h = Echo::default();
        let resp = dispatch_line(&h, "{not json").await.unwrap();
        assert_eq!(resp.id, Id::Null);
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn notification_produces_no_output() {
        let h = Echo::default();
        let resp = dispatch_line(&h, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert!(resp.is_none());
        assert_eq!(h.notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn serve_writes_one_line_per_call() {
        let h = Echo::default();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"echo","params":1}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"echo","params":2}"#,
            "\n"
        );
        let mut out: Vec<u8> = Vec::new();
        serve(&h, input.as_bytes(), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Response = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.result, Some(json!(2)));
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_stop_the_loop() {
        let h = Echo::default();
        let mut input: Vec<u8> = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"echo\",\"params\":\"".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b"\"}\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"echo","params":2}"#);
        input.push(b'\n');

        let mut out: Vec<u8> = Vec::new();
        serve(&h, input.as_slice(), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Response = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.id, Id::Null);
        assert_eq!(first.error.unwrap().code, PARSE_ERROR);
        let second: Response = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.result, Some(json!(2)));
    }
}
