//! Integration tests for the HTTP service

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use covenant_domain::{Obligation, ObligationPage};
use covenant_llm::MockProvider;
use covenant_server::{
    build_state,
    config::ServerConfig,
    handlers::{create_router, FileIssueResponse, HealthCheckResponse, UploadResponse},
};
use docx_rs::{Docx, Paragraph, Run};
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

const DOCX_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CONTRACT_REPLY: &str = r#"{"parties":[
    {"name":"buyer","obligations":[
        {"obligation_text":"Pay the purchase price within 30 days","deadline":"30 days"}
    ]},
    {"name":"Seller","obligations":[
        {"obligation_text":"Deliver the goods immediately","deadline":"Immediately"}
    ]}
]}"#;

/// Helper to create a test application backed by the mock LLM and tracker
fn create_test_app() -> Router {
    let llm = MockProvider::new("null");
    llm.add_response("shall pay", CONTRACT_REPLY);
    let state = build_state(&ServerConfig::default_test_config(), llm).unwrap();
    create_router(state)
}

fn contract_docx() -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Section 1: Payment")))
        .add_paragraph(
            Paragraph::new().add_run(Run::new().add_text("The Buyer shall pay within 30 days.")),
        )
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("The Seller shall deliver the goods immediately.")),
        )
        .build()
        .pack(&mut buf)
        .unwrap();
    buf.into_inner()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn upload_contract(app: &Router) -> UploadResponse {
    let request = Request::builder()
        .method("POST")
        .uri("/upload-document?filename=contract.docx")
        .header("content-type", DOCX_TYPE)
        .body(Body::from(contract_docx()))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn first_stored(app: &Router) -> Obligation {
    let (status, body) = send(app, get("/obligations")).await;
    assert_eq!(status, StatusCode::OK);
    let page: ObligationPage = serde_json::from_slice(&body).unwrap();
    page.obligations.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_app();

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let health: HealthCheckResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.model, "mock");
    assert_eq!(health.stored_obligations, 0);
}

#[tokio::test]
async fn test_upload_docx_extracts_and_stores() {
    let app = create_test_app();

    let upload = upload_contract(&app).await;

    assert_eq!(upload.filename.as_deref(), Some("contract.docx"));
    assert_eq!(upload.total_chunks, 1);
    assert_eq!(upload.total_obligations, 2);
    assert_eq!(upload.stored, 2);
    assert_eq!(upload.total_pages, 1);
    assert!(!upload.pagination.has_next);

    let names: Vec<&str> = upload
        .obligations
        .parties
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["Buyer", "Seller"]);

    let pay = &upload.obligations.parties[0].obligations[0];
    assert_eq!(pay.section, "1");
    assert_eq!(pay.page_number, Some(0));

    let stored = first_stored(&app).await;
    assert_eq!(stored.party_name, "Buyer");
    assert_eq!(stored.source_document.as_deref(), Some("contract.docx"));
    assert_eq!(stored.source_page, Some(0));
}

#[tokio::test]
async fn test_upload_paginates_parties() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/upload-document?page=2&page_size=1")
        .header("content-type", DOCX_TYPE)
        .body(Body::from(contract_docx()))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let upload: UploadResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(upload.total_pages, 2);
    assert_eq!(upload.current_page, 2);
    assert_eq!(upload.obligations.parties.len(), 1);
    assert_eq!(upload.obligations.parties[0].name, "Seller");
    assert!(upload.pagination.has_previous);
    assert_eq!(upload.total_obligations, 2);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/upload-document")
        .header("content-type", "text/plain")
        .body(Body::from("The Buyer shall pay."))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("text/plain"));
}

#[tokio::test]
async fn test_upload_rejects_unreadable_pdf() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/upload-document")
        .header("content-type", "application/pdf")
        .body(Body::from("definitely not a pdf"))
        .unwrap();

    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_obligations_filters_by_party() {
    let app = create_test_app();
    upload_contract(&app).await;

    let (status, body) = send(&app, get("/obligations?party_name=SELLER")).await;

    assert_eq!(status, StatusCode::OK);
    let page: ObligationPage = serde_json::from_slice(&body).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.obligations[0].party_name, "Seller");
}

#[tokio::test]
async fn test_list_obligations_rejects_bad_page_size() {
    let app = create_test_app();

    let (status, _) = send(&app, get("/obligations?page_size=500")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_obligation_lifecycle() {
    let app = create_test_app();
    upload_contract(&app).await;
    let stored = first_stored(&app).await;
    let uri = format!("/obligations/{}", stored.id);

    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Obligation = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched, stored);

    let (status, body) = send(
        &app,
        with_json("PUT", &uri, json!({ "deadline": "45 days" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Obligation = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated.deadline.as_deref(), Some("45 days"));
    assert_eq!(updated.obligation_text, stored.obligation_text);

    let (status, _) = send(&app, with_json("PUT", &uri, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_issue_for_stored_obligation() {
    let app = create_test_app();
    upload_contract(&app).await;
    let stored = first_stored(&app).await;
    let issue_uri = format!("/obligations/{}/issue", stored.id);

    let request = Request::builder()
        .method("POST")
        .uri(&issue_uri)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let filed: FileIssueResponse = serde_json::from_slice(&body).unwrap();
    assert!(filed.created);
    assert!(filed.issue_id.starts_with("MOCK-"));
    let issue = filed.issue.unwrap();
    assert!(issue.title.starts_with("Legal Obligation: "));
    assert!(issue.labels.contains(&"party-buyer".to_string()));

    // Filing again returns the recorded issue
    let request = Request::builder()
        .method("POST")
        .uri(&issue_uri)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let again: FileIssueResponse = serde_json::from_slice(&body).unwrap();
    assert!(!again.created);
    assert_eq!(again.issue_id, filed.issue_id);

    // Text is frozen once an issue exists
    let uri = format!("/obligations/{}", stored.id);
    let (status, _) = send(
        &app,
        with_json("PUT", &uri, json!({ "obligation_text": "Something else" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, get(&uri)).await;
    let record: Obligation = serde_json::from_slice(&body).unwrap();
    assert_eq!(record.issue_id.as_deref(), Some(filed.issue_id.as_str()));
}

#[tokio::test]
async fn test_create_issues_and_manage_them() {
    let app = create_test_app();
    let results = json!([{"parties":[
        {"name":"Buyer","obligations":[
            {"obligation_text":"Pay the purchase price","deadline":"No deadline","section":"1"}
        ]},
        {"name":"Seller","obligations":[
            {"obligation_text":"Deliver the goods","deadline":null,"section":"2"}
        ]}
    ]}]);

    let (status, body) = send(&app, with_json("POST", "/create-issues", results)).await;
    assert_eq!(status, StatusCode::OK);
    let created: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["success_count"], 2);
    assert_eq!(created["failed_count"], 0);
    assert_eq!(created["results"][0]["outcome"]["status"], "created");
    assert_eq!(created["results"][0]["outcome"]["detail"]["priority"], "Low");
    let key = created["results"][1]["outcome"]["detail"]["key"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = send(&app, get("/issues")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed["backend"], "mock");
    assert_eq!(listed["issues"].as_array().unwrap().len(), 2);

    let uri = format!("/issues/{}", key);
    let (status, body) = send(&app, with_json("PUT", &uri, json!({ "status": "Done" }))).await;
    assert_eq!(status, StatusCode::OK);
    let updated: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated["status"], "Done");

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_project_tool() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        with_json("POST", "/create-issues?project_tool=trello", json!([])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains("Supported tools are: jira, mock"));
}
