pub mod jsonrpc;
pub mod runtime;

pub use jsonrpc::{Id, Message, Request, Response, ToolMethod};
pub use runtime::{RpcHandler, dispatch_line, run_stdio, serve};
