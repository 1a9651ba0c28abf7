pub mod agent;

pub use agent::{
    Agent, AgentPatch, AgentValidationError, NewAgent, MAX_NAME_LEN, MAX_STATUS_LEN,
    STATUS_DRAFT, STATUS_PUBLISHED,
};
