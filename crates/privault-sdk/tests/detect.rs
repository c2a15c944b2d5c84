//! Integration tests for text and file de-identification.

mod common;

use std::time::Duration;

use privault_sdk::{
    DeidentifyFileRequest, DeidentifyTextRequest, DetectEntity, FileInput, ReidentifyTextRequest,
    RunStatus, TokenFormat,
};
use serde_json::json;
use wiremock::matchers::{any, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{api_key_client, VAULT_ID};

const RUN_PATH: &str = "/v1/detect/runs/run-1";

fn run_body(status: &str) -> serde_json::Value {
    json!({"run_id": "run-1", "status": status})
}

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/detect/deidentify/file"))
        .and(body_partial_json(json!({
            "vault_id": VAULT_ID,
            "file": {"data_format": "txt"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"run_id": "run-1"})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_deidentify_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/detect/deidentify/string"))
        .and(body_partial_json(json!({
            "text": "Call Ada on 555-0100",
            "vault_id": VAULT_ID,
            "entity_types": ["name", "phone_number"],
            "token_type": {"default": "vault_token"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "processed_text": "Call [NAME_1] on [PHONE_NUMBER_1]",
            "entities": [{
                "token": "NAME_1",
                "value": "Ada",
                "entity_type": "NAME",
                "location": {"start_index": 5, "end_index": 8}
            }],
            "word_count": 4,
            "character_count": 20
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = DeidentifyTextRequest::new("Call Ada on 555-0100")
        .with_entities(vec![DetectEntity::Name, DetectEntity::PhoneNumber])
        .with_token_format(TokenFormat::VaultToken);
    let result = api_key_client(&server)
        .detect()
        .deidentify_text(request)
        .await
        .unwrap();

    assert_eq!(result.processed_text, "Call [NAME_1] on [PHONE_NUMBER_1]");
    assert_eq!(result.entities[0].value, "Ada");
    assert_eq!(result.entities[0].location.end, 8);
    assert_eq!(result.word_count, 4);
}

#[tokio::test]
async fn test_reidentify_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/detect/reidentify/string"))
        .and(body_partial_json(json!({
            "text": "Call [NAME_1]",
            "format": {"plaintext": ["name"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Call Ada"})))
        .mount(&server)
        .await;

    let request = ReidentifyTextRequest::new("Call [NAME_1]").plain_text(vec![DetectEntity::Name]);
    let result = api_key_client(&server)
        .detect()
        .reidentify_text(request)
        .await
        .unwrap();

    assert_eq!(result.processed_text, "Call Ada");
}

#[tokio::test]
async fn test_deidentify_file_polls_until_terminal() {
    let server = MockServer::start().await;
    mount_submit(&server).await;
    Mock::given(method("GET"))
        .and(path(RUN_PATH))
        .and(query_param("vault_id", VAULT_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("IN_PROGRESS")))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RUN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run_id": "run-1",
            "status": "SUCCESS",
            "output": [
                {
                    "processed_file": "W05BTUVfMV0=",
                    "processed_file_type": "redacted_file",
                    "processed_file_extension": "txt"
                },
                {
                    "processed_file": "e30=",
                    "processed_file_type": "entities",
                    "processed_file_extension": "json"
                }
            ],
            "word_character_count": {"word_count": 1, "character_count": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = DeidentifyFileRequest::new(FileInput::from_bytes(b"Ada", "txt"));
    let run = api_key_client(&server)
        .detect()
        .deidentify_file(request)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.run_id, "run-1");
    assert_eq!(run.processed_file().unwrap().processed_file, "W05BTUVfMV0=");
    assert_eq!(run.entity_reports().count(), 1);
    assert_eq!(run.word_character_count.unwrap().word_count, 1);
}

#[tokio::test]
async fn test_deidentify_file_returns_in_progress_when_wait_elapses() {
    let server = MockServer::start().await;
    mount_submit(&server).await;
    // Polls at 0, 10 and 30 ms of a 30 ms budget.
    Mock::given(method("GET"))
        .and(path(RUN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("IN_PROGRESS")))
        .expect(3)
        .mount(&server)
        .await;

    let request = DeidentifyFileRequest::new(FileInput::from_bytes(b"Ada", "txt"))
        .with_wait_time(Duration::from_millis(30));
    let run = api_key_client(&server)
        .detect()
        .deidentify_file(request)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::InProgress);
    assert_eq!(run.run_id, "run-1");
}

#[tokio::test]
async fn test_deidentify_file_rejects_excessive_wait_time() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = DeidentifyFileRequest::new(FileInput::from_bytes(b"Ada", "txt"))
        .with_wait_time(Duration::from_secs(65));
    let err = api_key_client(&server)
        .detect()
        .deidentify_file(request)
        .await
        .unwrap_err();

    assert!(err.is_validation());
}

#[tokio::test]
async fn test_get_run_fills_missing_run_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/detect/runs/run-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED",
            "message": "Unsupported file"
        })))
        .mount(&server)
        .await;

    let run = api_key_client(&server)
        .detect()
        .get_run("run-9")
        .await
        .unwrap();

    assert_eq!(run.run_id, "run-9");
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.message.as_deref(), Some("Unsupported file"));
}

#[tokio::test]
async fn test_get_run_rejects_blank_id() {
    let server = MockServer::start().await;
    let err = api_key_client(&server).detect().get_run(" ").await.unwrap_err();
    assert!(err.is_validation());
}
