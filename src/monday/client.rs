/// Monday.com API client
///
/// GraphQL reads go to `/v2`, file uploads to `/v2/file` as a GraphQL multipart request.
/// The token is sent as a bare `Authorization` header value, which is what Monday expects.

use super::types::{BoardsData, Item, ItemSummary, ItemsData};
use crate::config::{ConfigError, MondayConfig};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use thiserror::Error;

const BODY_PREVIEW: usize = 500;

#[derive(Debug, Error)]
pub enum MondayError {
    #[error("monday request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("monday HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("monday: non-JSON response {status}: {body}")]
    NonJson { status: u16, body: String },
    #[error("monday returned errors: {0}")]
    GraphQl(String),
    #[error("monday response missing field: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no item returned for item_id={0}")]
    ItemNotFound(u64),
    #[error("no board returned for board_id={0}")]
    BoardNotFound(u64),
    #[error("invalid item id '{0}' on board")]
    InvalidItemId(String),
}

fn preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW).collect()
}

/// Best-effort MIME type from the file extension
pub fn guess_mime(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "json" => "application/json",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Upload mutation with the item and column inlined; only `$file` is a variable
pub fn upload_mutation(item_id: u64, column_id: &str) -> String {
    format!(
        "mutation ($file: File!) {{ add_file_to_column(item_id: {item_id}, column_id: \"{column_id}\", file: $file) {{ id }} }}"
    )
}

#[derive(Debug, Clone)]
pub struct MondayClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
    file_api_url: String,
}

impl MondayClient {
    pub fn new(
        http: reqwest::Client,
        token: impl Into<String>,
        api_url: impl Into<String>,
        file_api_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            api_url: api_url.into(),
            file_api_url: file_api_url.into(),
        }
    }

    pub fn from_config(http: reqwest::Client, config: &MondayConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            http,
            config.require_token()?,
            config.api_url.clone(),
            config.file_api_url.clone(),
        ))
    }

    /// Decode a response body as JSON, surfacing HTTP and GraphQL errors
    async fn read_response(response: reqwest::Response) -> Result<Value, MondayError> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        let payload: Value = serde_json::from_str(&text).map_err(|_| MondayError::NonJson {
            status,
            body: preview(&text),
        })?;

        if status >= 400 {
            return Err(MondayError::Status {
                status,
                body: preview(&payload.to_string()),
            });
        }
        match payload.get("errors") {
            Some(Value::Array(errors)) if !errors.is_empty() => {
                Err(MondayError::GraphQl(preview(&payload.to_string())))
            }
            Some(Value::Null) | None => Ok(payload),
            Some(Value::Array(_)) => Ok(payload),
            Some(other) => Err(MondayError::GraphQl(preview(&other.to_string()))),
        }
    }

    /// Run a GraphQL query and return its `data`
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value, MondayError> {
        tracing::debug!("🔎 Monday GraphQL request to {}", self.api_url);
        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", &self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let payload = Self::read_response(response).await?;
        Ok(payload.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Item name plus every column value with its column title
    pub async fn fetch_item(&self, item_id: u64) -> Result<Item, MondayError> {
        let query = r#"
            query ($item_id: [ID!]!) {
              items(ids: $item_id) {
                id
                name
                column_values { id text column { title } }
              }
            }
        "#;
        let data = self.graphql(query, json!({ "item_id": [item_id] })).await?;
        let items: ItemsData = serde_json::from_value(data)?;
        items
            .items
            .into_iter()
            .next()
            .ok_or(MondayError::ItemNotFound(item_id))
    }

    /// First page (up to 100) of items on a board
    pub async fn list_board_items(&self, board_id: u64) -> Result<Vec<ItemSummary>, MondayError> {
        let query = r#"
            query ($board_id: [ID!]!) {
              boards(ids: $board_id) {
                items_page(limit: 100) {
                  items { id name }
                }
              }
            }
        "#;
        let data = self.graphql(query, json!({ "board_id": [board_id] })).await?;
        let boards: BoardsData = serde_json::from_value(data)?;
        let board = boards
            .boards
            .into_iter()
            .next()
            .ok_or(MondayError::BoardNotFound(board_id))?;

        board
            .items_page
            .unwrap_or_default()
            .items
            .into_iter()
            .map(|raw| {
                let id = raw
                    .id
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| MondayError::InvalidItemId(raw.id.clone()))?;
                Ok(ItemSummary {
                    id,
                    name: raw.name.unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Attach a file to an item's file column
    pub async fn upload_file_to_column(
        &self,
        item_id: u64,
        column_id: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<Value, MondayError> {
        let image = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(guess_mime(filename))?;
        // Monday expects the plain filename, not the RFC 5987 form
        let form = Form::new()
            .percent_encode_noop()
            .text("query", upload_mutation(item_id, column_id))
            .text("map", json!({ "image": "variables.file" }).to_string())
            .part("image", image);

        tracing::info!(
            "📤 Uploading {} to item {} column {}",
            filename,
            item_id,
            column_id
        );
        let response = self
            .http
            .post(&self.file_api_url)
            .header("Authorization", &self.token)
            .multipart(form)
            .send()
            .await?;
        Self::read_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> MondayClient {
        MondayClient::new(
            reqwest::Client::new(),
            "secret-token",
            format!("{}/v2", server.uri()),
            format!("{}/v2/file", server.uri()),
        )
    }

    #[test]
    fn test_upload_mutation_inlines_ids() {
        assert_eq!(
            upload_mutation(42, "files"),
            "mutation ($file: File!) { add_file_to_column(item_id: 42, column_id: \"files\", file: $file) { id } }"
        );
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(
            guess_mime("EOB 1 Main St.xlsx"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(guess_mime("notes.PDF"), "application/pdf");
        assert_eq!(guess_mime("blob"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_fetch_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2"))
            .and(header("Authorization", "secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"items": [{
                    "id": "123",
                    "name": "Jane Doe",
                    "column_values": [
                        {"id": "text1", "text": "12 Elm St", "column": {"title": "Property Address"}},
                        {"id": "num", "text": "", "column": {"title": "Basis"}}
                    ]
                }]}
            })))
            .mount(&server)
            .await;

        let item = client(&server).fetch_item(123).await.unwrap();
        assert_eq!(item.name, "Jane Doe");
        assert_eq!(item.column_values.len(), 2);
        assert_eq!(item.column_values[0].title(), "Property Address");
    }

    #[tokio::test]
    async fn test_fetch_item_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"items": []}})))
            .mount(&server)
            .await;

        let err = client(&server).fetch_item(9).await.unwrap_err();
        assert!(matches!(err, MondayError::ItemNotFound(9)));
    }

    #[tokio::test]
    async fn test_graphql_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{"message": "Not Authenticated"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .graphql("query { me { id } }", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MondayError::GraphQl(_)));
        assert!(err.to_string().contains("Not Authenticated"));
    }

    #[tokio::test]
    async fn test_list_board_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2"))
            .and(body_string_contains("items_page(limit: 100)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"boards": [{"items_page": {"items": [
                    {"id": "1", "name": "First"},
                    {"id": "2", "name": null}
                ]}}]}
            })))
            .mount(&server)
            .await;

        let items = client(&server).list_board_items(77).await.unwrap();
        assert_eq!(
            items,
            vec![
                ItemSummary { id: 1, name: "First".into() },
                ItemSummary { id: 2, name: String::new() },
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_file_to_column() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/file"))
            .and(header("Authorization", "secret-token"))
            .and(body_string_contains("add_file_to_column(item_id: 5, column_id: \"files\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"add_file_to_column": {"id": "99"}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .upload_file_to_column(5, "files", b"PK".to_vec(), "EOB.xlsx")
            .await
            .unwrap();
        assert_eq!(result["data"]["add_file_to_column"]["id"], "99");
    }

    #[tokio::test]
    async fn test_upload_http_error_and_non_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/file"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error_message": "boom"})),
            )
            .mount(&server)
            .await;
        let err = client(&server)
            .upload_file_to_column(5, "files", vec![1, 2, 3], "x.xlsx")
            .await
            .unwrap_err();
        assert!(matches!(err, MondayError::Status { status: 500, .. }));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/file"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;
        let err = client(&server)
            .upload_file_to_column(5, "files", vec![1, 2, 3], "x.xlsx")
            .await
            .unwrap_err();
        assert!(matches!(err, MondayError::NonJson { status: 502, .. }));
    }
}
