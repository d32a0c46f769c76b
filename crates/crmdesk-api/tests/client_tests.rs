// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use crmdesk_api::{ApiError, ChatReply, Client};
use crmdesk_app::{EntityKind, FormSubmission, FormTarget, TagId};
use crmdesk_chat::{ChatRequest, ChatRole, HistoryMessage};
use crmdesk_testkit::{MockBackend, sample_snapshot};
use reqwest::Method;
use serde_json::json;
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Response, Server};

#[test]
fn unreachable_backend_has_actionable_message() {
    let client = Client::new("http://127.0.0.1:1/api", Some(Duration::from_millis(50)))
        .expect("client should initialize");

    let error = client
        .list_departments()
        .expect_err("list should fail for unreachable endpoint");
    assert!(matches!(
        error.downcast_ref::<ApiError>(),
        Some(ApiError::Unreachable { .. })
    ));
    assert!(error.to_string().contains("start the backend"));
}

#[test]
fn call_sends_json_content_type_and_body() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/departments");
        assert_eq!(request.method().to_string(), "POST");
        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("body should read");
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&body).expect("json body"),
            json!({"name": "Parks Canada"})
        );
        request
            .respond(Response::from_string(r#"{"department_id": 9}"#).with_status_code(201))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None)?;
    let reply = client.call(
        "departments",
        Method::POST,
        Some(&json!({"name": "Parks Canada"})),
    )?;
    assert_eq!(reply, json!({"department_id": 9}));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn call_returns_error_bodies_without_inspecting_status() -> Result<()> {
    let backend = MockBackend::start()?;
    backend.route("GET", "dashboard", 500, r#"{"error":"database locked"}"#);

    let client = Client::new(backend.base_url(), None)?;
    let value = client.call("dashboard", Method::GET, None)?;
    assert_eq!(value, json!({"error": "database locked"}));

    let typed = client.dashboard();
    assert!(typed.is_ok(), "unknown fields are ignored: {typed:?}");
    Ok(())
}

#[test]
fn load_snapshot_reads_every_collection() -> Result<()> {
    let backend = MockBackend::start()?;
    let expected = sample_snapshot();
    backend.serve_snapshot(&expected)?;

    let client = Client::new(backend.base_url(), Some(Duration::from_secs(2)))?;
    let snapshot = client.load_snapshot()?;
    assert_eq!(snapshot, expected);

    let paths = backend
        .requests()
        .into_iter()
        .map(|request| request.path)
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec![
            "departments",
            "applications",
            "integrations",
            "contacts",
            "activities",
            "incidents",
            "tags",
        ]
    );
    Ok(())
}

#[test]
fn snapshot_load_fails_as_a_whole() -> Result<()> {
    let backend = MockBackend::start()?;
    backend.serve_snapshot(&sample_snapshot())?;
    backend.route("GET", "contacts", 200, "<html>oops</html>");

    let client = Client::new(backend.base_url(), None)?;
    let error = client.load_snapshot().expect_err("garbage body should fail");
    assert!(matches!(
        error.downcast_ref::<ApiError>(),
        Some(ApiError::Decode { what, .. }) if what == "contacts"
    ));
    Ok(())
}

#[test]
fn tag_category_detail_decodes() -> Result<()> {
    let backend = MockBackend::start()?;
    backend.serve_snapshot(&sample_snapshot())?;

    let client = Client::new(backend.base_url(), None)?;
    let detail = client.tag_category("application_auth_type")?;
    assert_eq!(detail.category.name, "application_auth_type");
    assert_eq!(detail.tags.len(), 3);
    Ok(())
}

#[test]
fn submit_routes_create_and_update() -> Result<()> {
    let backend = MockBackend::start()?;
    backend.route_json("POST", "applications", &json!({"app_id": 77}));
    backend.route_json("PUT", "applications/77", &json!({"app_id": 77}));
    let client = Client::new(backend.base_url(), None)?;

    let payload = json!({"app_name": "Grants", "auth_type": ["GC Key", "Interact Sign In"]});
    client.submit(&FormSubmission {
        entity: EntityKind::Application,
        target: FormTarget::Create,
        payload: payload.clone(),
    })?;
    client.submit(&FormSubmission {
        entity: EntityKind::Application,
        target: FormTarget::Update(77),
        payload: payload.clone(),
    })?;

    let mutations = backend.mutations();
    assert_eq!(mutations.len(), 2);
    assert_eq!(mutations[0].method, "POST");
    assert_eq!(mutations[0].path, "applications");
    assert_eq!(mutations[1].method, "PUT");
    assert_eq!(mutations[1].path, "applications/77");
    assert_eq!(mutations[1].json()?, payload);
    Ok(())
}

#[test]
fn delete_is_refused_locally_for_integrations() -> Result<()> {
    let backend = MockBackend::start()?;
    let client = Client::new(backend.base_url(), None)?;

    assert!(client.delete(EntityKind::Integration, 3).is_err());
    assert!(backend.requests().is_empty());

    backend.route_json("DELETE", "contacts/3", &json!({"message": "deleted"}));
    client.delete(EntityKind::Contact, 3)?;
    assert_eq!(backend.mutations()[0].path, "contacts/3");
    Ok(())
}

#[test]
fn tag_delete_refusal_is_verbatim() -> Result<()> {
    let backend = MockBackend::start()?;
    backend.route(
        "DELETE",
        "tags/5",
        400,
        r#"{"error":"Tag \"live\" is used by 4 applications","suggestion":"Deactivate the tag instead"}"#,
    );
    let client = Client::new(backend.base_url(), None)?;

    let error = client
        .delete_tag(TagId::new(5))
        .expect_err("refusal expected");
    match error.downcast_ref::<ApiError>() {
        Some(ApiError::Refused { error, suggestion }) => {
            assert_eq!(error, "Tag \"live\" is used by 4 applications");
            assert_eq!(suggestion.as_deref(), Some("Deactivate the tag instead"));
        }
        other => panic!("expected refusal, got {other:?}"),
    }
    Ok(())
}

#[test]
fn tag_mutation_with_html_error_page_is_refused_by_status() -> Result<()> {
    let backend = MockBackend::start()?;
    backend.route(
        "PUT",
        "tags/9",
        500,
        "<html><body>Internal Server Error</body></html>",
    );
    let client = Client::new(backend.base_url(), None)?;

    let error = client
        .update_tag(TagId::new(9), &json!({"label": "Live"}))
        .expect_err("500 should refuse");
    match error.downcast_ref::<ApiError>() {
        Some(ApiError::Refused { error, suggestion }) => {
            assert_eq!(error, "server returned 500");
            assert_eq!(suggestion, &None);
        }
        other => panic!("expected refusal, got {other:?}"),
    }
    Ok(())
}

#[test]
fn tag_create_and_update_use_category_and_id() -> Result<()> {
    let backend = MockBackend::start()?;
    backend.route_json("POST", "tags/contact_role", &json!({"tag_id": 31}));
    backend.route_json("PUT", "tags/31", &json!({"tag_id": 31}));
    let client = Client::new(backend.base_url(), None)?;

    client.create_tag("contact_role", &json!({"label": "Legal", "value": "legal"}))?;
    client.update_tag(TagId::new(31), &json!({"is_active": false}))?;

    let paths = backend
        .mutations()
        .into_iter()
        .map(|request| format!("{} {}", request.method, request.path))
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["POST tags/contact_role", "PUT tags/31"]);
    Ok(())
}

#[test]
fn chat_distinguishes_answers_from_errors() -> Result<()> {
    let backend = MockBackend::start()?;
    let client = Client::new(backend.base_url(), None)?;
    let request = ChatRequest {
        message: "How many departments?".to_owned(),
        history: vec![HistoryMessage {
            role: ChatRole::User,
            content: "hi".to_owned(),
        }],
    };

    backend.route_json("POST", "chat", &json!({"response": "There are **6**."}));
    assert_eq!(
        client.chat(&request)?,
        ChatReply::Answer("There are **6**.".to_owned())
    );
    assert_eq!(
        backend.mutations()[0].json()?,
        json!({
            "message": "How many departments?",
            "history": [{"role": "user", "content": "hi"}],
        })
    );

    backend.route("POST", "chat", 500, r#"{"error":"Gemini API key not configured"}"#);
    assert_eq!(
        client.chat(&request)?,
        ChatReply::Error("Gemini API key not configured".to_owned())
    );
    Ok(())
}
