//! Shared behavior for RPCs this emulator does not implement:
//! transactions, real-time listeners, and streaming writes. All of them
//! end the same way — a logged `UNIMPLEMENTED`, or a panic if configured
//! to throw — so the behavior lives in one place rather than being
//! copy-pasted per handler.

use tonic::{Request, Response, Status};

use crate::config::{Config, OnUnimplemented};

fn unimplemented(config: &Config, method: &str, detail: &str) -> Status {
    let message = format!("{method}: {detail}");
    match config.on_unimplemented {
        OnUnimplemented::Warn => {
            tracing::warn!(method, "unimplemented RPC invoked");
            Status::unimplemented(message)
        }
        OnUnimplemented::Throw => panic!("{message}"),
    }
}

/// Reject a unary RPC outright.
pub fn unimplemented_unary<Req, Resp>(
    config: &Config,
    method: &str,
    _request: Request<Req>,
) -> Result<Response<Resp>, Status> {
    Err(unimplemented(
        config,
        method,
        "not supported by this emulator",
    ))
}

/// Reject a streaming RPC before it produces any items — real-time
/// change notification (`Listen`) and the bidi `Write` stream have no
/// in-memory equivalent here.
pub fn unimplemented_stream<Req, Resp>(
    config: &Config,
    method: &str,
    _request: Request<tonic::Streaming<Req>>,
) -> Result<Response<std::pin::Pin<Box<dyn tokio_stream::Stream<Item = Result<Resp, Status>> + Send>>>, Status>
{
    Err(unimplemented(
        config,
        method,
        "real-time streaming is not supported by this emulator",
    ))
}
