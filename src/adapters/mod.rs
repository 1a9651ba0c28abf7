pub mod agent_handler;
pub mod error;
pub mod health_handler;
