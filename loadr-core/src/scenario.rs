//! Conversation mode: create a resource, then post `K` messages that reference its id.

use std::time::{Duration, Instant};

use loadr_http::HttpClient;

use crate::config::{ConversationTarget, HttpMethod, RequestBody, RunConfig};
use crate::error::Result;
use crate::executor::{PreparedRequest, execute};
use crate::sample::{SampleRecord, StepKind};

/// Field of the create response that carries the identifier.
pub const ID_FIELD: &str = "id";

/// Everything one conversation needs, encoded once per run.
#[derive(Debug, Clone)]
pub struct ConversationPlan {
    create: PreparedRequest,
    message: PreparedRequest,
    template: String,
    placeholder: String,
    messages: u64,
}

impl ConversationPlan {
    pub fn new(cfg: &RunConfig, target: &ConversationTarget) -> Result<Self> {
        let create = PreparedRequest::new(
            HttpMethod::Post,
            &target.create_url,
            &cfg.headers,
            Some(&RequestBody::Text(target.create_body.clone())),
        )?;
        let message =
            PreparedRequest::new(HttpMethod::Post, &target.message_url, &cfg.headers, None)?;

        Ok(Self {
            create,
            message,
            template: target.message_body_template.clone(),
            placeholder: target.placeholder.clone(),
            messages: target.messages_per_conversation,
        })
    }

    /// Replace every occurrence of the placeholder with `id`.
    pub fn render_message(&self, id: &str) -> String {
        self.template.replace(&self.placeholder, id)
    }
}

/// Run one conversation. Returns one `create` sample, followed by one `message` sample per
/// follow-up when the create step succeeded and yielded an id. Never fails.
pub async fn run_conversation(
    client: &HttpClient,
    plan: &ConversationPlan,
    timeout: Duration,
    epoch: Instant,
) -> Vec<SampleRecord> {
    let mut out = Vec::with_capacity(1 + plan.messages.min(64) as usize);

    let created = execute(client, &plan.create, timeout).await;
    out.push(created.to_sample(StepKind::Create, epoch));

    if !created.ok {
        return out;
    }
    let Some(id) = created.body.as_deref().and_then(extract_id) else {
        tracing::debug!(url = plan.create.url(), "create response had no usable id");
        return out;
    };

    for _ in 0..plan.messages {
        let req = plan.message.with_body(plan.render_message(&id));
        let sent = execute(client, &req, timeout).await;
        out.push(sent.to_sample(StepKind::Message, epoch));
    }

    out
}

/// Pull a usable identifier out of a JSON object body: a non-empty string, or a non-zero
/// number rendered as text.
pub fn extract_id(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get(ID_FIELD)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunMode, StopCondition};

    #[test]
    fn extract_id_accepts_strings_and_numbers() {
        assert_eq!(extract_id(br#"{"id":"abc"}"#).as_deref(), Some("abc"));
        assert_eq!(extract_id(br#"{"id":42,"x":1}"#).as_deref(), Some("42"));
    }

    #[test]
    fn extract_id_rejects_missing_or_empty_ids() {
        assert_eq!(extract_id(b"not json"), None);
        assert_eq!(extract_id(br#"{"title":"x"}"#), None);
        assert_eq!(extract_id(br#"{"id":""}"#), None);
        assert_eq!(extract_id(br#"{"id":0}"#), None);
        assert_eq!(extract_id(br#"{"id":null}"#), None);
        assert_eq!(extract_id(br#"[{"id":"a"}]"#), None);
    }

    #[test]
    fn render_replaces_every_placeholder() {
        let mut target = ConversationTarget::new("http://h/c", "http://h/m");
        target.message_body_template = "{{conversationId}}-{{conversationId}}".to_string();
        let cfg = RunConfig::new(
            RunMode::Conversation(target.clone()),
            StopCondition::Total(1),
        );

        let plan = match ConversationPlan::new(&cfg, &target) {
            Ok(v) => v,
            Err(err) => panic!("plan failed: {err}"),
        };
        assert_eq!(plan.render_message("c1"), "c1-c1");
    }
}
