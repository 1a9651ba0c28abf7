//! Use cases sitting between the HTTP adapters and the repositories

pub mod agent_service;

pub use agent_service::AgentService;
