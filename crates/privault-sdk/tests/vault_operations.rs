//! Integration tests for record and token operations against a mock vault.

mod common;

use privault_sdk::{
    Credentials, DeleteRequest, DetokenizeRequest, Error, GetRequest, InsertRecord, InsertRequest,
    QueryRequest, RedactionType, TokenMode, TokenizeRequest, UpdateRecord, UpdateRequest,
    VaultClient, VaultRecord,
};
use serde_json::json;
use wiremock::matchers::{
    any, body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{api_key_client, vault_path};

fn not_found(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": {"http_code": 404, "message": message}
    }))
}

// ============================================================================
// Insert
// ============================================================================

#[tokio::test]
async fn test_insert_sends_single_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("cards")))
        .and(header("authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({"tokenization": true, "byot": "DISABLE"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"skyflow_id": "id-1"}, {"skyflow_id": "id-2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = InsertRequest::new(
        "cards",
        vec![
            InsertRecord::default().with_field("number", "4111"),
            InsertRecord::default().with_field("number", "4222"),
        ],
    )
    .with_return_tokens(true);

    let inserted = api_key_client(&server).vault().insert(request).await.unwrap();

    let ids: Vec<_> = inserted.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["id-1", "id-2"]);
}

#[tokio::test]
async fn test_insert_batch_failure_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("cards")))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-request-id", "req-1")
                .set_body_json(json!({
                    "error": {"http_code": 400, "message": "Invalid field number"}
                })),
        )
        .mount(&server)
        .await;

    let request = InsertRequest::new(
        "cards",
        vec![InsertRecord::default().with_field("number", "x")],
    );
    let err = api_key_client(&server)
        .vault()
        .insert(request)
        .await
        .unwrap_err();

    match err {
        Error::Api {
            code,
            message,
            request_id,
        } => {
            assert_eq!(code, 400);
            assert_eq!(message, "Invalid field number - request id: req-1");
            assert_eq!(request_id.as_deref(), Some("req-1"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_insert_continue_on_error_reports_partial_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("customers")))
        .and(body_string_contains("ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"skyflow_id": "id-ada"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(vault_path("customers")))
        .and(body_string_contains("not-an-email"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"http_code": 400, "message": "Invalid email"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(vault_path("customers")))
        .and(body_string_contains("alan@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"skyflow_id": "id-alan"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = InsertRequest::new(
        "customers",
        vec![
            InsertRecord::default().with_field("email", "ada@example.com"),
            InsertRecord::default().with_field("email", "not-an-email"),
            InsertRecord::default().with_field("email", "alan@example.com"),
        ],
    )
    .with_continue_on_error(true);

    let err = api_key_client(&server)
        .vault()
        .insert(request)
        .await
        .unwrap_err();
    let result = err.into_aggregate().expect("aggregate error");

    assert!(result.partial);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].id(), Some("id-ada"));
    assert_eq!(result.records[1].id(), Some("id-alan"));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(result.errors[0].code, Some(400));
    assert_eq!(result.errors[0].description, "Invalid email");
}

#[tokio::test]
async fn test_insert_continue_on_error_all_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("customers")))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let request = InsertRequest::new(
        "customers",
        vec![
            InsertRecord::default().with_field("email", "a@example.com"),
            InsertRecord::default().with_field("email", "b@example.com"),
        ],
    )
    .with_continue_on_error(true);

    let err = api_key_client(&server)
        .vault()
        .insert(request)
        .await
        .unwrap_err();
    let result = err.aggregate().expect("aggregate error");

    assert!(!result.partial);
    assert!(result.records.is_empty());
    let indexes: Vec<_> = result.errors.iter().map(|e| e.index).collect();
    assert_eq!(indexes, [0, 1]);
    assert!(result.errors.iter().all(|e| e.code == Some(500)));
}

#[tokio::test]
async fn test_insert_empty_response_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("customers")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&server)
        .await;

    let request = InsertRequest::new(
        "customers",
        vec![InsertRecord::default().with_field("email", "a@example.com")],
    )
    .with_continue_on_error(true);

    let err = api_key_client(&server)
        .vault()
        .insert(request)
        .await
        .unwrap_err();
    let result = err.aggregate().expect("aggregate error");

    assert_eq!(result.errors[0].code, Some(200));
    assert_eq!(result.errors[0].description, "Insert response contained no record");
}

#[tokio::test]
async fn test_strict_token_mode_rejects_missing_token_before_sending() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let record = InsertRecord::default()
        .with_field("name", "Ada")
        .with_field("ssn", "123-45-6789")
        .with_token("name", "tok-name");
    let request = InsertRequest::new("people", vec![record]).with_token_mode(TokenMode::EnableStrict);

    let err = api_key_client(&server)
        .vault()
        .insert(request)
        .await
        .unwrap_err();

    assert!(err.is_validation());
}

#[tokio::test]
async fn test_tokens_rejected_when_token_mode_disabled() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let record = InsertRecord::default()
        .with_field("name", "Ada")
        .with_token("name", "tok-name");
    let request = InsertRequest::new("people", vec![record]);

    let err = api_key_client(&server)
        .vault()
        .insert(request)
        .await
        .unwrap_err();

    assert!(err.is_validation());
}

// ============================================================================
// Get / Update / Delete
// ============================================================================

#[tokio::test]
async fn test_get_by_ids_reports_missing_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(vault_path("cards")))
        .and(query_param("skyflow_ids", "id-1"))
        .and(query_param("redaction", "PLAIN_TEXT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"fields": {"skyflow_id": "id-1", "number": "4111"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(vault_path("cards")))
        .and(query_param("skyflow_ids", "id-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(&server)
        .await;

    let request = GetRequest::by_ids("cards", vec!["id-1".into(), "id-2".into()])
        .with_redaction(RedactionType::PlainText);
    let err = api_key_client(&server).vault().get(request).await.unwrap_err();
    let result = err.into_aggregate().expect("aggregate error");

    assert!(result.partial);
    match &result.records[0] {
        VaultRecord::Fetched(record) => {
            assert_eq!(record.id(), Some("id-1"));
            assert_eq!(record.fields["number"], "4111");
        }
        other => panic!("unexpected record {other:?}"),
    }
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(result.errors[0].code, Some(404));
    assert_eq!(result.errors[0].description, "No record found for id id-2");
}

#[tokio::test]
async fn test_get_by_column_is_single_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(vault_path("customers")))
        .and(query_param("column_name", "email"))
        .and(query_param("column_values", "ada@example.com"))
        .and(query_param("tokenization", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"fields": {"skyflow_id": "id-1", "email": "ada@example.com"}},
                {"fields": {"skyflow_id": "id-2", "email": "alan@example.com"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = GetRequest::by_column(
        "customers",
        "email",
        vec!["ada@example.com".into(), "alan@example.com".into()],
    );
    let records = api_key_client(&server).vault().get(request).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id(), Some("id-2"));
}

#[tokio::test]
async fn test_get_rejects_redaction_with_tokens() {
    let server = MockServer::start().await;
    let request = GetRequest::by_ids("cards", vec!["id-1".into()])
        .with_redaction(RedactionType::Masked)
        .with_return_tokens(true);

    let err = api_key_client(&server).vault().get(request).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_update_records() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(vault_path("cards/id-1")))
        .and(body_partial_json(json!({
            "record": {"fields": {"expiry": "12/30"}},
            "tokenization": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "skyflow_id": "id-1",
            "tokens": {"expiry": "tok-expiry"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut fields = serde_json::Map::new();
    fields.insert("expiry".into(), json!("12/30"));
    let request =
        UpdateRequest::new("cards", vec![UpdateRecord::new("id-1", fields)]).with_return_tokens(true);

    let updated = api_key_client(&server).vault().update(request).await.unwrap();

    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, "id-1");
    assert_eq!(updated[0].tokens.as_ref().unwrap()["expiry"], "tok-expiry");
}

#[tokio::test]
async fn test_delete_records() {
    let server = MockServer::start().await;
    for id in ["id-1", "id-2"] {
        Mock::given(method("DELETE"))
            .and(path(vault_path(&format!("cards/{id}"))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "skyflow_id": id,
                "deleted": true
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let request = DeleteRequest::new("cards", vec!["id-1".into(), "id-2".into()]);
    let deleted = api_key_client(&server).vault().delete(request).await.unwrap();

    let ids: Vec<_> = deleted.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["id-1", "id-2"]);
    assert!(deleted.iter().all(|r| r.deleted));
}

#[tokio::test]
async fn test_unreachable_vault_failures_are_aggregated() {
    // Nothing listens on the discard port.
    let client = VaultClient::builder()
        .vault_id(common::VAULT_ID)
        .vault_url("http://127.0.0.1:9")
        .credentials(Credentials::api_key("test-api-key"))
        .build()
        .unwrap();

    let request = DeleteRequest::new("cards", vec!["a".into(), "b".into()]);
    let err = client.vault().delete(request).await.unwrap_err();
    let result = err.into_aggregate().expect("aggregate error");

    assert!(!result.partial);
    assert!(result.records.is_empty());
    let errors: Vec<_> = result.errors.iter().map(|e| (e.index, e.code)).collect();
    assert_eq!(errors, [(0, None), (1, None)]);
}

// ============================================================================
// Tokens
// ============================================================================

#[tokio::test]
async fn test_detokenize_partial_failure() {
    let server = MockServer::start().await;
    for (token, value) in [("tok1", "4111"), ("tok3", "4333")] {
        Mock::given(method("POST"))
            .and(path(vault_path("detokenize")))
            .and(body_string_contains(format!("\"{token}\"")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{"token": token, "value": value}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(vault_path("detokenize")))
        .and(body_string_contains("\"tok2\""))
        .respond_with(not_found("Token not found for tok2"))
        .expect(1)
        .mount(&server)
        .await;

    let err = api_key_client(&server)
        .vault()
        .detokenize(DetokenizeRequest::new(["tok1", "tok2", "tok3"]))
        .await
        .unwrap_err();
    let result = err.into_aggregate().expect("aggregate error");

    assert!(result.partial);
    let values: Vec<_> = result
        .records
        .iter()
        .filter_map(VaultRecord::as_detokenized)
        .map(|r| (r.token.as_str(), r.value.as_str()))
        .collect();
    assert_eq!(values, [("tok1", "4111"), ("tok3", "4333")]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(result.errors[0].code, Some(404));
    assert_eq!(result.errors[0].description, "Token not found for tok2");
}

#[tokio::test]
async fn test_detokenize_all_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("detokenize")))
        .and(body_partial_json(json!({
            "detokenizationParameters": [{"token": "tok1", "redaction": "MASKED"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"token": "tok1", "value": "XXXX-1111", "valueType": "STRING"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = DetokenizeRequest::new(["tok1"]).with_redaction(RedactionType::Masked);
    let records = api_key_client(&server)
        .vault()
        .detokenize(request)
        .await
        .unwrap();

    assert_eq!(records[0].value, "XXXX-1111");
    assert_eq!(records[0].value_type.as_deref(), Some("STRING"));
}

#[tokio::test]
async fn test_tokenize_single_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("tokenize")))
        .and(body_partial_json(json!({
            "tokenizationParameters": [
                {"value": "4111", "columnGroup": "cards"},
                {"value": "4222", "columnGroup": "cards"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"token": "t1"}, {"token": "t2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = TokenizeRequest::new(Vec::new())
        .with_value("4111", "cards")
        .with_value("4222", "cards");
    let tokens = api_key_client(&server).vault().tokenize(request).await.unwrap();

    let tokens: Vec<_> = tokens.iter().map(|t| t.token.as_str()).collect();
    assert_eq!(tokens, ["t1", "t2"]);
}

#[tokio::test]
async fn test_query_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("query")))
        .and(body_partial_json(json!({"query": "select * from cards limit 1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"fields": {"skyflow_id": "id-1", "number": "4111"}}]
        })))
        .mount(&server)
        .await;

    let records = api_key_client(&server)
        .vault()
        .query(QueryRequest::new("select * from cards limit 1"))
        .await
        .unwrap();

    assert_eq!(records[0].id(), Some("id-1"));
}

#[tokio::test]
async fn test_query_failure_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(vault_path("query")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"http_code": 400, "message": "Invalid query"}
        })))
        .mount(&server)
        .await;

    let err = api_key_client(&server)
        .vault()
        .query(QueryRequest::new("select nonsense"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(400));
}
