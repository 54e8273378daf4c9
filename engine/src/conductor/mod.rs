//! Conductor System
//!
//! Classifies questions, plans the single tool action, and executes it.

pub mod classifier;
pub mod executor;
pub mod planner;
pub mod types;

pub use classifier::Classifier;
pub use executor::Executor;
pub use planner::Planner;
pub use types::{
    Action, Confidence, Plan, PlanStep, RetrievalDecision, StepResult, ToolResult,
};
