//! Typed Bangumi API operations
//!
//! Each method maps one backend resource operation onto a single HTTP call and
//! returns the `(status, body)` pair uninterpreted. Status codes >= 400 are
//! data, not errors; only transport failures and undecodable bodies are `Err`.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use urlencoding::encode;

use crate::error::Result;

use super::transport::{ApiRequest, RawResponse, ReqwestTransport, Transport};

/// Backend answer: status code plus decoded JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Backend reported a failure (status >= 400)
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Cover image sizes accepted by `/v0/subjects/{id}/image`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Small,
    Grid,
    Large,
    Medium,
    Common,
}

impl ImageType {
    pub const ALL: [ImageType; 5] = [
        Self::Small,
        Self::Grid,
        Self::Large,
        Self::Medium,
        Self::Common,
    ];

    /// Parse from the wire name; anything outside the enum is rejected
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "small" => Some(Self::Small),
            "grid" => Some(Self::Grid),
            "large" => Some(Self::Large),
            "medium" => Some(Self::Medium),
            "common" => Some(Self::Common),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Grid => "grid",
            Self::Large => "large",
            Self::Medium => "medium",
            Self::Common => "common",
        }
    }
}

/// Flatten a JSON object into query pairs, dropping nulls.
///
/// Arrays are joined with commas; nested objects are skipped.
pub fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(map) = params.as_object() else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null | Value::Object(_) => return None,
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

/// Bangumi REST client; one instance is shared by every tool invocation
#[derive(Clone)]
pub struct BangumiClient {
    transport: Arc<dyn Transport>,
}

impl BangumiClient {
    /// Wrap an existing transport (e.g. a mock)
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build a client over a pooled HTTP connection
    pub fn connect(base_url: &str, token: Option<&str>, user_agent: &str) -> Result<Self> {
        let transport = ReqwestTransport::new(base_url, token, user_agent)?;
        Ok(Self::new(Arc::new(transport)))
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let label = format!("{} {}", request.method, request.path);
        let raw = self.transport.execute(request).await?;
        let response = Self::decode(raw)?;
        if response.is_error() {
            warn!("{} -> {}", label, response.status);
        } else {
            debug!("{} -> {}", label, response.status);
        }
        Ok(response)
    }

    /// Decode a raw body; an empty body is an empty object (no-content success)
    fn decode(raw: RawResponse) -> Result<ApiResponse> {
        let body = if raw.body.iter().all(u8::is_ascii_whitespace) {
            json!({})
        } else {
            serde_json::from_slice(&raw.body)?
        };
        Ok(ApiResponse::new(raw.status, body))
    }

    // Subjects

    /// GET /calendar
    pub async fn get_calendar(&self) -> Result<ApiResponse> {
        self.send(ApiRequest::get("/calendar")).await
    }

    /// POST /v0/search/subjects
    pub async fn search_subjects(&self, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::post("/v0/search/subjects").with_body(body))
            .await
    }

    /// GET /v0/subjects
    pub async fn get_subjects(&self, params: &Value) -> Result<ApiResponse> {
        self.send(ApiRequest::get("/v0/subjects").with_query(query_pairs(params)))
            .await
    }

    pub async fn get_subject_info(&self, subject_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/subjects/{}", subject_id)))
            .await
    }

    /// GET /v0/subjects/{id}/image, answered with a 302 to the image.
    ///
    /// The redirect is not followed; its target comes back as `{"url": ...}`
    /// with the 302 status preserved.
    pub async fn get_subject_image(&self, subject_id: u64, image_type: ImageType) -> Result<ApiResponse> {
        let request = ApiRequest::get(format!("/v0/subjects/{}/image", subject_id))
            .with_query(vec![("type".to_string(), image_type.as_str().to_string())]);
        let raw = self.transport.execute(request).await?;
        if raw.status == 302 {
            let url = raw.location.unwrap_or_default();
            debug!("GET /v0/subjects/{}/image -> 302 {}", subject_id, url);
            return Ok(ApiResponse::new(raw.status, json!({ "url": url })));
        }
        Self::decode(raw)
    }

    pub async fn get_subject_persons(&self, subject_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/subjects/{}/persons", subject_id)))
            .await
    }

    pub async fn get_subject_characters(&self, subject_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/subjects/{}/characters", subject_id)))
            .await
    }

    pub async fn get_subject_relations(&self, subject_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/subjects/{}/subjects", subject_id)))
            .await
    }

    // Episodes

    /// GET /v0/episodes
    pub async fn get_episodes(&self, params: &Value) -> Result<ApiResponse> {
        self.send(ApiRequest::get("/v0/episodes").with_query(query_pairs(params)))
            .await
    }

    pub async fn get_episode_info(&self, episode_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/episodes/{}", episode_id)))
            .await
    }

    // Characters

    pub async fn search_characters(&self, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::post("/v0/search/characters").with_body(body))
            .await
    }

    pub async fn get_character_info(&self, character_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/characters/{}", character_id)))
            .await
    }

    pub async fn get_character_subjects(&self, character_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/characters/{}/subjects", character_id)))
            .await
    }

    pub async fn get_character_persons(&self, character_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/characters/{}/persons", character_id)))
            .await
    }

    pub async fn post_character_collection(&self, character_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::post(format!("/v0/characters/{}/collect", character_id)))
            .await
    }

    pub async fn delete_character_collection(&self, character_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(format!("/v0/characters/{}/collect", character_id)))
            .await
    }

    // Persons

    pub async fn search_persons(&self, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::post("/v0/search/persons").with_body(body))
            .await
    }

    pub async fn get_person_info(&self, person_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/persons/{}", person_id)))
            .await
    }

    pub async fn get_person_subjects(&self, person_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/persons/{}/subjects", person_id)))
            .await
    }

    pub async fn get_person_characters(&self, person_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/persons/{}/characters", person_id)))
            .await
    }

    pub async fn post_person_collection(&self, person_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::post(format!("/v0/persons/{}/collect", person_id)))
            .await
    }

    pub async fn delete_person_collection(&self, person_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(format!("/v0/persons/{}/collect", person_id)))
            .await
    }

    // Users

    pub async fn get_user_info(&self, username: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/users/{}", encode(username))))
            .await
    }

    /// GET /v0/me; requires a token
    pub async fn get_me_info(&self) -> Result<ApiResponse> {
        self.send(ApiRequest::get("/v0/me")).await
    }

    // Collections

    pub async fn get_user_collections(&self, username: &str, params: &Value) -> Result<ApiResponse> {
        let request = ApiRequest::get(format!("/v0/users/{}/collections", encode(username)))
            .with_query(query_pairs(params));
        self.send(request).await
    }

    pub async fn get_user_collection_info(&self, username: &str, subject_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!(
            "/v0/users/{}/collections/{}",
            encode(username), subject_id
        )))
        .await
    }

    /// POST /v0/users/-/collections/{subject_id}; creates or updates
    pub async fn post_my_collection(&self, subject_id: u64, body: Value) -> Result<ApiResponse> {
        let request = ApiRequest::post(format!("/v0/users/-/collections/{}", subject_id)).with_body(body);
        self.send(request).await
    }

    /// PATCH /v0/users/-/collections/{subject_id}; updates an existing entry
    pub async fn patch_my_collection(&self, subject_id: u64, body: Value) -> Result<ApiResponse> {
        let request = ApiRequest::patch(format!("/v0/users/-/collections/{}", subject_id)).with_body(body);
        self.send(request).await
    }

    pub async fn get_my_episode_collections(&self, subject_id: u64, params: &Value) -> Result<ApiResponse> {
        let request = ApiRequest::get(format!("/v0/users/-/collections/{}/episodes", subject_id))
            .with_query(query_pairs(params));
        self.send(request).await
    }

    pub async fn patch_my_episode_collections(&self, subject_id: u64, body: Value) -> Result<ApiResponse> {
        let request =
            ApiRequest::patch(format!("/v0/users/-/collections/{}/episodes", subject_id)).with_body(body);
        self.send(request).await
    }

    pub async fn get_my_episode_collection_info(&self, episode_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!(
            "/v0/users/-/collections/-/episodes/{}",
            episode_id
        )))
        .await
    }

    /// PUT /v0/users/-/collections/-/episodes/{episode_id}; idempotent replace
    pub async fn put_my_episode_collection_info(&self, episode_id: u64, body: Value) -> Result<ApiResponse> {
        let request =
            ApiRequest::put(format!("/v0/users/-/collections/-/episodes/{}", episode_id)).with_body(body);
        self.send(request).await
    }

    pub async fn get_user_character_collections(&self, username: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!(
            "/v0/users/{}/collections/-/characters",
            encode(username)
        )))
        .await
    }

    pub async fn get_user_character_collection_info(
        &self,
        username: &str,
        character_id: u64,
    ) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!(
            "/v0/users/{}/collections/-/characters/{}",
            encode(username), character_id
        )))
        .await
    }

    pub async fn get_user_person_collections(&self, username: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!("/v0/users/{}/collections/-/persons", encode(username))))
            .await
    }

    pub async fn get_user_person_collection_info(&self, username: &str, person_id: u64) -> Result<ApiResponse> {
        self.send(ApiRequest::get(format!(
            "/v0/users/{}/collections/-/persons/{}",
            encode(username), person_id
        )))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockTransport;
    use crate::error::BangumiError;
    use reqwest::Method;

    fn client_with(mock: MockTransport) -> (BangumiClient, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        (BangumiClient::new(mock.clone()), mock)
    }

    #[test]
    fn test_image_type_from_str() {
        assert_eq!(ImageType::from_str("small"), Some(ImageType::Small));
        assert_eq!(ImageType::from_str("common"), Some(ImageType::Common));
        assert_eq!(ImageType::from_str("huge"), None);
        assert_eq!(ImageType::from_str("Small"), None);
        for image_type in ImageType::ALL {
            assert_eq!(ImageType::from_str(image_type.as_str()), Some(image_type));
        }
    }

    #[test]
    fn test_query_pairs_skips_nulls_and_objects() {
        let pairs = query_pairs(&json!({
            "type": 2,
            "sort": null,
            "series": false,
            "platform": "PC",
            "nested": {"a": 1},
            "ids": [1, 2]
        }));
        assert!(pairs.contains(&("type".to_string(), "2".to_string())));
        assert!(pairs.contains(&("series".to_string(), "false".to_string())));
        assert!(pairs.contains(&("platform".to_string(), "PC".to_string())));
        assert!(pairs.contains(&("ids".to_string(), "1,2".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "sort" || k == "nested"));
    }

    #[test]
    fn test_query_pairs_non_object() {
        assert!(query_pairs(&json!([1, 2])).is_empty());
        assert!(query_pairs(&Value::Null).is_empty());
    }

    #[test]
    fn test_api_response_is_error() {
        assert!(!ApiResponse::new(200, json!({})).is_error());
        assert!(!ApiResponse::new(302, json!({})).is_error());
        assert!(ApiResponse::new(400, json!({})).is_error());
        assert!(ApiResponse::new(503, json!({})).is_error());
    }

    #[tokio::test]
    async fn test_get_subject_info_path() {
        let (client, mock) = client_with(MockTransport::new().with_response(
            Method::GET,
            "/v0/subjects/8",
            RawResponse::json(200, &json!({"id": 8, "name": "Code Geass"})),
        ));

        let response = client.get_subject_info(8).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["name"], "Code Geass");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_not_err() {
        let (client, _mock) = client_with(MockTransport::new().with_response(
            Method::GET,
            "/v0/subjects/999999",
            RawResponse::json(404, &json!({"title": "Not Found", "description": "subject not found"})),
        ));

        let response = client.get_subject_info(999_999).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body["title"], "Not Found");
    }

    #[tokio::test]
    async fn test_image_redirect_returns_location() {
        let (client, mock) = client_with(MockTransport::new().with_response(
            Method::GET,
            "/v0/subjects/12/image",
            RawResponse::redirect(302, "https://x/img.jpg"),
        ));

        let response = client.get_subject_image(12, ImageType::Small).await.unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(response.body, json!({"url": "https://x/img.jpg"}));
        assert_eq!(mock.last_request().unwrap().query_value("type"), Some("small"));
    }

    #[tokio::test]
    async fn test_image_error_body_decoded() {
        let (client, _mock) = client_with(MockTransport::new().with_response(
            Method::GET,
            "/v0/subjects/12/image",
            RawResponse::json(400, &json!({"title": "Bad Request"})),
        ));

        let response = client.get_subject_image(12, ImageType::Grid).await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(response.body["title"], "Bad Request");
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        let (client, mock) = client_with(MockTransport::new().with_response(
            Method::POST,
            "/v0/characters/5/collect",
            RawResponse::empty(200),
        ));

        let response = client.post_character_collection(5).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({}));
        assert_eq!(mock.last_request().unwrap().method, Method::POST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_err() {
        let (client, _mock) = client_with(MockTransport::new().with_response(
            Method::GET,
            "/v0/episodes/3",
            RawResponse::bytes(200, "<html>oops</html>"),
        ));

        let result = client.get_episode_info(3).await;
        assert!(matches!(result, Err(BangumiError::Json(_))));
    }

    #[tokio::test]
    async fn test_get_subjects_builds_query() {
        let (client, mock) = client_with(MockTransport::new());

        client
            .get_subjects(&json!({"type": 2, "limit": 30, "offset": 0, "sort": null}))
            .await
            .unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.path, "/v0/subjects");
        assert_eq!(request.query_value("type"), Some("2"));
        assert_eq!(request.query_value("limit"), Some("30"));
        assert_eq!(request.query_value("sort"), None);
    }

    #[tokio::test]
    async fn test_collection_paths_and_methods() {
        let (client, mock) = client_with(MockTransport::new());

        client.post_my_collection(7, json!({"type": 2})).await.unwrap();
        client.patch_my_collection(7, json!({"comment": "ok"})).await.unwrap();
        client
            .patch_my_episode_collections(7, json!({"episode_id": [1, 2], "type": 2}))
            .await
            .unwrap();
        client.put_my_episode_collection_info(9, json!({"type": 2})).await.unwrap();
        client.delete_person_collection(4).await.unwrap();

        let seen: Vec<(Method, String)> = mock
            .requests()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        assert_eq!(
            seen,
            vec![
                (Method::POST, "/v0/users/-/collections/7".to_string()),
                (Method::PATCH, "/v0/users/-/collections/7".to_string()),
                (Method::PATCH, "/v0/users/-/collections/7/episodes".to_string()),
                (Method::PUT, "/v0/users/-/collections/-/episodes/9".to_string()),
                (Method::DELETE, "/v0/persons/4/collect".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_user_collection_paths() {
        let (client, mock) = client_with(MockTransport::new());

        client.get_user_character_collections("sai").await.unwrap();
        client.get_user_character_collection_info("sai", 3).await.unwrap();
        client.get_user_person_collections("sai").await.unwrap();
        client.get_user_person_collection_info("sai", 5).await.unwrap();
        client.get_user_collection_info("sai", 8).await.unwrap();

        let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/v0/users/sai/collections/-/characters",
                "/v0/users/sai/collections/-/characters/3",
                "/v0/users/sai/collections/-/persons",
                "/v0/users/sai/collections/-/persons/5",
                "/v0/users/sai/collections/8",
            ]
        );
    }
}
