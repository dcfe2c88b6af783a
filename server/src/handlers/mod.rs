//! Request handlers for firmware update operations.

mod rpc;
mod websocket;

pub use rpc::SharedService;
pub use websocket::handle_websocket_connection;
