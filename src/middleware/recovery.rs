//! Panic recovery boundary.
//!
//! Installed twice: directly around each pipeline's handlers, so logging and
//! metrics observe the resulting 500, and around the whole router for panics
//! raised by a stage itself. Either way the panic is logged, the client gets
//! the generic 500 body and the server keeps serving.

use std::any::Any;

use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::AppError;

pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

pub fn layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };

    tracing::error!(panic = %detail, "request handler panicked");
    AppError::Internal.into_response()
}
