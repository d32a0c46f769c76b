// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use crmdesk_api::{ChatReply, Client};
use crmdesk_app::{
    DashboardCounts, DataSnapshot, EntityKind, FormSubmission, TagCategory, TagCategoryDetail,
    TagId,
};
use crmdesk_chat::ChatRequest;
use crmdesk_tui::{ChatOutcome, InternalEvent};
use serde_json::Value;
use std::sync::mpsc::Sender;
use std::thread;

/// Backend runtime over the REST API. Chat requests run on their own thread
/// so the UI keeps drawing while the model thinks.
pub struct ApiRuntime {
    client: Client,
    chat_enabled: bool,
}

impl ApiRuntime {
    pub fn new(client: Client, chat_enabled: bool) -> Self {
        Self {
            client,
            chat_enabled,
        }
    }
}

/// Create and update replies carry `{"error": ...}` on failure.
fn reject_error_body(endpoint: &str, reply: &Value) -> Result<()> {
    if let Some(error) = reply.get("error").and_then(Value::as_str) {
        bail!("{endpoint}: {error}");
    }
    Ok(())
}

impl crmdesk_tui::AppRuntime for ApiRuntime {
    fn load_snapshot(&mut self) -> Result<DataSnapshot> {
        self.client.load_snapshot()
    }

    fn load_dashboard(&mut self) -> Result<DashboardCounts> {
        self.client.dashboard()
    }

    fn load_tag_categories(&mut self) -> Result<Vec<TagCategory>> {
        self.client.tag_categories()
    }

    fn load_tag_category(&mut self, name: &str) -> Result<TagCategoryDetail> {
        self.client.tag_category(name)
    }

    fn submit_form(&mut self, submission: &FormSubmission) -> Result<()> {
        let reply = self.client.submit(submission)?;
        reject_error_body(&submission.endpoint(), &reply)
    }

    fn delete_record(&mut self, entity: EntityKind, id: i64) -> Result<()> {
        let reply = self.client.delete(entity, id)?;
        reject_error_body(&format!("{}/{id}", entity.endpoint()), &reply)
    }

    fn create_tag(&mut self, category: &str, payload: &Value) -> Result<()> {
        self.client.create_tag(category, payload)?;
        Ok(())
    }

    fn update_tag(&mut self, tag_id: TagId, payload: &Value) -> Result<()> {
        self.client.update_tag(tag_id, payload)?;
        Ok(())
    }

    fn delete_tag(&mut self, tag_id: TagId) -> Result<()> {
        self.client.delete_tag(tag_id)
    }

    fn send_chat(&mut self, request: &ChatRequest) -> Result<ChatReply> {
        self.client.chat(request)
    }

    fn chat_enabled(&self) -> bool {
        self.chat_enabled
    }

    fn spawn_chat(
        &mut self,
        ticket: u64,
        request: ChatRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("crmdesk-chat-{ticket}"))
            .spawn(move || {
                let outcome = match client.chat(&request) {
                    Ok(reply) => ChatOutcome::Reply(reply),
                    Err(error) => ChatOutcome::Transport(format!("{error:#}")),
                };
                if tx.send(InternalEvent::Chat { ticket, outcome }).is_err() {
                    tracing::debug!(ticket, "chat reply dropped; UI already exited");
                }
            })
            .map_err(|error| anyhow!("spawn chat worker: {error}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::Result;
    use crmdesk_api::{ChatReply, Client};
    use crmdesk_app::{EntityKind, FormSubmission, FormTarget};
    use crmdesk_chat::ChatRequest;
    use crmdesk_testkit::{MockBackend, sample_snapshot};
    use crmdesk_tui::{AppRuntime, ChatOutcome, InternalEvent};
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::Duration;

    fn runtime(backend: &MockBackend) -> Result<ApiRuntime> {
        Ok(ApiRuntime::new(
            Client::new(backend.base_url(), Some(Duration::from_secs(2)))?,
            true,
        ))
    }

    #[test]
    fn submit_surfaces_error_bodies() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route_json(
            "POST",
            "contacts",
            &json!({"error": "department_id is required"}),
        );
        let mut runtime = runtime(&backend)?;

        let error = runtime
            .submit_form(&FormSubmission {
                entity: EntityKind::Contact,
                target: FormTarget::Create,
                payload: json!({"name": "Ada"}),
            })
            .expect_err("error body should fail the submit");
        assert!(error.to_string().contains("department_id is required"));
        Ok(())
    }

    #[test]
    fn delete_succeeds_on_message_body() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route_json("DELETE", "activities/40", &json!({"message": "deleted"}));
        let mut runtime = runtime(&backend)?;

        runtime.delete_record(EntityKind::Activity, 40)?;
        assert_eq!(backend.mutations()[0].path, "activities/40");
        Ok(())
    }

    #[test]
    fn snapshot_loads_through_client() -> Result<()> {
        let backend = MockBackend::start()?;
        let expected = sample_snapshot();
        backend.serve_snapshot(&expected)?;
        let mut runtime = runtime(&backend)?;

        assert_eq!(runtime.load_snapshot()?, expected);
        Ok(())
    }

    #[test]
    fn spawned_chat_reports_back_over_channel() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route_json("POST", "chat", &json!({"response": "hello"}));
        let mut runtime = runtime(&backend)?;
        let (tx, rx) = mpsc::channel();

        runtime.spawn_chat(
            7,
            ChatRequest {
                message: "hi".to_owned(),
                history: Vec::new(),
            },
            tx,
        )?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            event,
            InternalEvent::Chat {
                ticket: 7,
                outcome: ChatOutcome::Reply(ChatReply::Answer("hello".to_owned())),
            }
        );
        Ok(())
    }

    #[test]
    fn spawned_chat_reports_transport_failures() -> Result<()> {
        let mut runtime = ApiRuntime::new(
            Client::new("http://127.0.0.1:1/api", Some(Duration::from_millis(100)))?,
            true,
        );
        let (tx, rx) = mpsc::channel();

        runtime.spawn_chat(
            1,
            ChatRequest {
                message: "hi".to_owned(),
                history: Vec::new(),
            },
            tx,
        )?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert!(matches!(
            event,
            InternalEvent::Chat {
                ticket: 1,
                outcome: ChatOutcome::Transport(_),
            }
        ));
        Ok(())
    }
}
