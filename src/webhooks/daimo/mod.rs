pub mod http_server;
pub mod webhook_handlers;
