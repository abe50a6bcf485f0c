mod config;
mod error;
mod executor;
mod sample;
mod scenario;
mod stats;

pub mod runner;

pub use config::{
    ConversationTarget, DEFAULT_CONCURRENCY, DEFAULT_CREATE_BODY, DEFAULT_MESSAGE_BODY_TEMPLATE,
    DEFAULT_MESSAGES_PER_CONVERSATION, DEFAULT_PLACEHOLDER, DEFAULT_TIMEOUT, HttpMethod,
    RequestBody, RequestTarget, RunConfig, RunMode, StopCondition,
};
pub use error::{Error, Result};
pub use executor::{Outcome, PreparedRequest, TIMEOUT_ERROR, execute};
pub use sample::{SampleRecord, StepKind};
pub use scenario::{ConversationPlan, ID_FIELD, extract_id, run_conversation};
pub use stats::{ResultSummary, percentile, summarize_by_kind};
