//! End-to-end webhook export against mocked Monday and Dropbox APIs

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use eob_bridge::{create_app, Config};
use serde_json::{json, Value};
use std::collections::HashMap;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(server: &MockServer, extra: &[(&str, &str)]) -> Router {
    let base = server.uri();
    let guidelines = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/commercial_guidelines.json");
    let mut env: HashMap<String, String> = HashMap::from([
        ("MONDAY_API_TOKEN".to_string(), "monday-token".to_string()),
        ("MONDAY_FILE_COLUMN_ID".to_string(), "files".to_string()),
        ("MONDAY_API_URL".to_string(), format!("{base}/v2")),
        ("MONDAY_FILE_API_URL".to_string(), format!("{base}/v2/file")),
        ("EOB_GUIDELINES_PATH".to_string(), guidelines.to_string()),
        ("DROPBOX_API_URL".to_string(), format!("{base}/2")),
        ("DROPBOX_CONTENT_URL".to_string(), format!("{base}/2")),
        ("DROPBOX_ALLOWED_ROOT".to_string(), "/Team/Clients".to_string()),
    ]);
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    create_app(Config::from_lookup(|key| env.get(key).cloned())).unwrap()
}

fn column(id: &str, title: &str, text: &str) -> Value {
    json!({"id": id, "text": text, "column": {"title": title}})
}

async fn mount_item(server: &MockServer, columns: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"items": [{"id": "42", "name": "Jane Doe", "column_values": columns}]}
        })))
        .mount(server)
        .await;
}

async fn mount_file_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"add_file_to_column": {"id": "9001"}}
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn post_webhook(app: Router, payload: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/monday/webhook/export-eob")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn residential_columns() -> Vec<Value> {
    vec![
        column("text1", "Property Address", "12 Elm St"),
        column("status", "Tier", "SFR$$"),
        column("numbers", "Basis", "$450,000"),
        column("date4", "Date Placed in Service", "2021-06-01"),
        column("numbers1", "Tax Year of CSS", "2025"),
        column("empty", "Notes", ""),
    ]
}

#[tokio::test]
async fn test_residential_export_uploads_to_monday_and_dropbox() {
    let server = MockServer::start().await;
    mount_item(&server, residential_columns()).await;
    mount_file_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"root_info": {}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/create_folder_v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    let uploaded_path = "/Team/Clients/Client Documents/J/Jane Doe/2021/MCSS/12 Elm St/EOB_Proposal_Payment/EOB 12 Elm St.xlsx";
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"path_display": uploaded_path})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = app(
        &server,
        &[("DROPBOX_ENABLE", "1"), ("DROPBOX_ACCESS_TOKEN", "dbx-token")],
    );
    let (status, body) = post_webhook(app, json!({"event": {"itemId": 42, "boardId": 7}})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "ok": true,
            "uploaded": true,
            "itemId": 42,
            "mode": "residential",
            "filename": "EOB 12 Elm St.xlsx",
            "dropboxPath": uploaded_path,
        })
    );

    let requests = server.received_requests().await.unwrap();
    let graphql = requests.iter().find(|r| r.url.path() == "/v2").unwrap();
    assert_eq!(
        graphql.headers.get("authorization").unwrap().to_str().unwrap(),
        "monday-token"
    );
    let upload = requests.iter().find(|r| r.url.path() == "/v2/file").unwrap();
    let form = String::from_utf8_lossy(&upload.body);
    assert!(form.contains("add_file_to_column(item_id: 42, column_id: \"files\""));
    assert!(form.contains("filename=\"EOB 12 Elm St.xlsx\""));
    assert!(form.contains("PK"));

    let dropbox_upload = requests
        .iter()
        .find(|r| r.url.path() == "/2/files/upload")
        .unwrap();
    let arg = dropbox_upload
        .headers
        .get("Dropbox-API-Arg")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(arg.contains("/Team/Clients/Client Documents/J/Jane Doe/2021/MCSS/12 Elm St"));
    assert!(arg.contains("\"overwrite\""));
}

#[tokio::test]
async fn test_commercial_export_with_dropbox_disabled() {
    let server = MockServer::start().await;
    mount_item(
        &server,
        vec![
            column("text1", "Property Address", "900 Main St"),
            column("type", "Property Type", "Medical Center"),
            column("numbers", "Basis", "2,750,000"),
            column("date4", "In-Service Date", "2018-06-15"),
            column("numbers1", "Study Tax Year", "2025"),
        ],
    )
    .await;
    mount_file_upload(&server).await;

    let (status, body) = post_webhook(
        app(&server, &[("EXPORT_FILENAME", "EOB.xlsx")]),
        json!({"payload": {"inboundFieldValues": {"itemId": "42"}}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uploaded"], json!(true));
    assert_eq!(body["mode"], json!("commercial"));
    assert_eq!(body["filename"], json!("EOB.xlsx"));
    assert_eq!(body["dropboxPath"], Value::Null);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().starts_with("/2/")));
}

#[tokio::test]
async fn test_monday_upload_error_reported_without_retry_status() {
    let server = MockServer::start().await;
    mount_item(&server, residential_columns()).await;
    Mock::given(method("POST"))
        .and(path("/v2/file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Column not found"}]
        })))
        .mount(&server)
        .await;

    let (status, body) = post_webhook(app(&server, &[]), json!({"event": {"itemId": 42}})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["uploaded"], json!(false));
    assert_eq!(body["itemId"], json!(42));
    assert!(body["error"].as_str().unwrap().contains("Column not found"));
}

#[tokio::test]
async fn test_out_of_range_board_values_answer_uploaded_false() {
    let bad_columns = [
        column("date4", "Date Placed in Service", "99999999999999999999"),
        column("numbers2", "Tenant Cnt", "100000000000000000000000"),
    ];
    for bad in bad_columns {
        let server = MockServer::start().await;
        let mut columns = residential_columns();
        columns.retain(|c| c["column"]["title"] != bad["column"]["title"]);
        columns.push(bad.clone());
        mount_item(&server, columns).await;

        let (status, body) =
            post_webhook(app(&server, &[]), json!({"event": {"itemId": 42}})).await;

        assert_eq!(status, StatusCode::OK, "column {bad}");
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["uploaded"], json!(false));
        assert_eq!(body["itemId"], json!(42));
        assert!(body["error"].as_str().unwrap().contains("out of range"));

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.url.path() != "/v2/file"));
    }
}

#[tokio::test]
async fn test_challenge_skips_monday_entirely() {
    let server = MockServer::start().await;
    let (status, body) = post_webhook(
        app(&server, &[]),
        json!({"challenge": "abc", "event": {"itemId": 42}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"challenge": "abc"}));
    assert!(server.received_requests().await.unwrap().is_empty());
}
