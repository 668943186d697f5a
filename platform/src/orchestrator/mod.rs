//! Agent orchestration
//!
//! Agent records, the persistence seam, and the workflow executor that drives
//! agents through the model backends.

mod agent;
mod executor;
mod metrics;

pub use agent::{
    Agent, AgentDescriptor, AgentStatus, AgentStore, InMemoryAgentStore, DEFAULT_LLM_TYPE,
    DEFAULT_MODEL_NAME,
};
pub use executor::{
    AgentOutcome, ExecutionMode, WorkflowExecutor, WorkflowResult, WorkflowStatus,
};
pub use metrics::{AgentMetrics, PerformanceSnapshot};
