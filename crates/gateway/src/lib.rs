//! Outbound HTTP gateway: lets the backend send text and files through the
//! live WhatsApp session.
//!
//! - `POST /send` `{to, text}`
//! - `POST /send-media` `{to, filePath, caption?}`
//! - `GET /status`, `GET /health`

pub mod error;
pub mod routes;
pub mod server;

pub use {
    error::GatewayError,
    routes::mime_for_path,
    server::{GatewayState, bind_gateway, build_gateway_app, start_gateway},
};
