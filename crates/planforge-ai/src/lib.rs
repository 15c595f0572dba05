pub mod context;
pub mod engine;
pub mod gemini;
pub mod planner;
pub mod prompt;
pub mod retry;
pub mod schema;

pub use context::ContextBuilder;
pub use engine::PlanningEngine;
pub use gemini::{GeminiPlanner, HttpTransport, PlanTransport};
pub use planner::*;
pub use prompt::PromptComposer;
pub use retry::RetryPolicy;
pub use schema::{output_schema_json, parse_plan};
