pub mod bot_service;
pub mod keyboards;
