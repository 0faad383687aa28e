//! HTTP implementation of [`MediaService`] backed by Overseerr's v1 API.

use super::http_utils::{create_http_client, parse_json_response, parse_optional_json_response};
use super::types::{CreatedRequest, ResultPage, ResultRecord};
use super::{
    MediaDetails, MediaService, MediaType, OverseerrError, RequestPayload, RottenTomatoesRating,
    SearchResultItem,
};
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::json;
use tracing::{debug, info};

/// Overseerr API client
#[derive(Clone)]
pub struct OverseerrClient {
    http: HttpClient,
    base_url: String,
}

impl OverseerrClient {
    /// Create a client for the given instance.
    ///
    /// # Errors
    ///
    /// Returns `OverseerrError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, OverseerrError> {
        Ok(Self {
            http: create_http_client(api_key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns `OverseerrError::Config` if the HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self, OverseerrError> {
        let client = Self::new(settings.overseerr_base_url(), &settings.overseerr_api_key)?;
        info!("Overseerr client initialized for {}", client.base_url);
        Ok(client)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// Search URL with the query percent-encoded (`%20` for spaces, reserved
    /// characters escaped), which Overseerr requires.
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        self.endpoint(&format!(
            "/search?query={}",
            urlencoding::encode(query.trim())
        ))
    }

    fn media_path(media_type: MediaType, media_id: u64) -> String {
        format!("/{}/{media_id}", media_type.as_str())
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, OverseerrError> {
        request
            .send()
            .await
            .map_err(|e| OverseerrError::Network(e.to_string()))
    }

    fn into_items(page: ResultPage, fallback_type: MediaType) -> Vec<SearchResultItem> {
        page.results
            .into_iter()
            .filter_map(|record: ResultRecord| record.into_item(fallback_type))
            .collect()
    }
}

#[async_trait]
impl MediaService for OverseerrClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResultItem>, OverseerrError> {
        let url = self.search_url(query);
        debug!("Overseerr search: {url}");
        let response = Self::send(self.http.get(&url)).await?;
        let page: ResultPage = parse_json_response(response).await?;
        let total = page.results.len();
        let items = Self::into_items(page, MediaType::Movie);
        debug!("Search returned {total} records, {} movie/tv items", items.len());
        Ok(items)
    }

    async fn recommendations(
        &self,
        media_type: MediaType,
        media_id: u64,
    ) -> Result<Vec<SearchResultItem>, OverseerrError> {
        let url = self.endpoint(&format!(
            "{}/recommendations",
            Self::media_path(media_type, media_id)
        ));
        debug!("Overseerr recommendations: {url}");
        let response = Self::send(self.http.get(&url).query(&[("page", 1)])).await?;
        let page: Option<ResultPage> = parse_optional_json_response(response).await?;

        // Recommendations belong to the same media type as their source title
        Ok(page
            .map(|page| {
                page.results
                    .into_iter()
                    .filter_map(|mut record| {
                        record.media_type = Some(media_type.as_str().to_string());
                        record.into_item(media_type)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_request(
        &self,
        media_type: MediaType,
        media_id: u64,
        is_4k: bool,
    ) -> Result<CreatedRequest, OverseerrError> {
        let payload = RequestPayload::new(media_type, media_id, is_4k);
        info!("Creating Overseerr request for {media_type} {media_id} (4k: {is_4k})");
        let response = Self::send(self.http.post(self.endpoint("/request")).json(&payload)).await?;
        parse_json_response(response).await
    }

    async fn approve_request(&self, request_id: u64, is_4k: bool) -> Result<(), OverseerrError> {
        let url = self.endpoint(&format!("/request/{request_id}/approve"));
        info!("Approving Overseerr request {request_id}");
        let response = Self::send(self.http.post(&url).json(&json!({ "is4k": is_4k }))).await?;
        let _: serde_json::Value = parse_json_response(response).await?;
        Ok(())
    }

    async fn details(
        &self,
        media_type: MediaType,
        media_id: u64,
    ) -> Result<MediaDetails, OverseerrError> {
        let url = self.endpoint(&Self::media_path(media_type, media_id));
        let response = Self::send(self.http.get(&url)).await?;
        parse_json_response(response).await
    }

    async fn ratings(
        &self,
        media_type: MediaType,
        media_id: u64,
    ) -> Result<Option<RottenTomatoesRating>, OverseerrError> {
        let url = self.endpoint(&format!(
            "{}/ratings",
            Self::media_path(media_type, media_id)
        ));
        let response = Self::send(self.http.get(&url)).await?;
        parse_optional_json_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::header::{HeaderName, CONTENT_TYPE};
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::Router;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    const API_KEY: &str = "k3y";

    #[derive(Debug, Clone)]
    struct Recorded {
        method: Method,
        uri: String,
        api_key: Option<String>,
        accept: Option<String>,
        body: String,
    }

    impl Recorded {
        fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap_or(Value::Null)
        }
    }

    /// Fake Overseerr answering canned bodies by path; unknown paths get 404.
    #[derive(Default)]
    struct StubOverseerr {
        routes: HashMap<String, (u16, String)>,
        seen: Mutex<Vec<Recorded>>,
    }

    impl StubOverseerr {
        fn requests(&self) -> Vec<Recorded> {
            self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
        }
    }

    async fn answer(
        State(stub): State<Arc<StubOverseerr>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, [(HeaderName, &'static str); 1], String) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        if let Ok(mut seen) = stub.seen.lock() {
            seen.push(Recorded {
                method,
                uri: uri.to_string(),
                api_key: header("x-api-key"),
                accept: header("accept"),
                body,
            });
        }

        let (status, body) = stub
            .routes
            .get(uri.path())
            .cloned()
            .unwrap_or((404, r#"{"message":"Not Found"}"#.to_string()));
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [(CONTENT_TYPE, "application/json")],
            body,
        )
    }

    async fn spawn_stub(routes: &[(&str, u16, &str)]) -> (OverseerrClient, Arc<StubOverseerr>) {
        let stub = Arc::new(StubOverseerr {
            routes: routes
                .iter()
                .map(|(path, status, body)| ((*path).to_string(), (*status, (*body).to_string())))
                .collect(),
            ..StubOverseerr::default()
        });

        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("stub listener should bind");
        };
        let Ok(address) = listener.local_addr() else {
            panic!("stub listener should have an address");
        };
        let app = Router::new().fallback(answer).with_state(stub.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let Ok(client) = OverseerrClient::new(&format!("http://{address}/"), API_KEY) else {
            panic!("client should build");
        };
        (client, stub)
    }

    fn client() -> Option<OverseerrClient> {
        OverseerrClient::new("https://seerr.example.com/", "key").ok()
    }

    #[test]
    fn test_search_url_encoding() {
        let Some(client) = client() else {
            panic!("client should build");
        };
        assert_eq!(
            client.search_url("  The Lord of the Rings: Two Towers "),
            "https://seerr.example.com/api/v1/search?query=The%20Lord%20of%20the%20Rings%3A%20Two%20Towers"
        );
        assert_eq!(
            client.search_url("Tom & Jerry?"),
            "https://seerr.example.com/api/v1/search?query=Tom%20%26%20Jerry%3F"
        );
    }

    #[test]
    fn test_media_paths() {
        let Some(client) = client() else {
            panic!("client should build");
        };
        assert_eq!(
            client.endpoint(&OverseerrClient::media_path(MediaType::Tv, 1399)),
            "https://seerr.example.com/api/v1/tv/1399"
        );
        assert_eq!(
            OverseerrClient::media_path(MediaType::Movie, 438_631),
            "/movie/438631"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let Ok(client) = OverseerrClient::new("http://127.0.0.1:9", "key") else {
            panic!("client should build");
        };
        let result = client.search("Dune").await;
        assert!(
            matches!(result, Err(OverseerrError::Network(_))),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_search_sends_key_and_encoded_query() {
        let (client, stub) = spawn_stub(&[(
            "/api/v1/search",
            200,
            r#"{"page":1,"results":[
                {"id":693134,"mediaType":"movie","title":"Dune: Part Two","releaseDate":"2024-02-27"},
                {"id":1,"mediaType":"person","name":"Zendaya"}
            ]}"#,
        )])
        .await;

        let items = match client.search(" Dune Part Two ").await {
            Ok(items) => items,
            Err(e) => panic!("search should succeed: {e}"),
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Dune: Part Two");
        assert_eq!(items[0].year.as_deref(), Some("2024"));

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].uri, "/api/v1/search?query=Dune%20Part%20Two");
        assert_eq!(requests[0].api_key.as_deref(), Some(API_KEY));
        assert_eq!(requests[0].accept.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let (client, _stub) = spawn_stub(&[(
            "/api/v1/search",
            500,
            "<!DOCTYPE html><html><body>Internal Server Error</body></html>",
        )])
        .await;

        match client.search("Dune").await {
            Err(OverseerrError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Server returned HTML error page");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recommendations_first_page_and_missing_title() {
        let (client, stub) = spawn_stub(&[(
            "/api/v1/movie/438631/recommendations",
            200,
            r#"{"results":[{"id":693134,"title":"Dune: Part Two","mediaType":"tv"}]}"#,
        )])
        .await;

        let items = match client.recommendations(MediaType::Movie, 438_631).await {
            Ok(items) => items,
            Err(e) => panic!("recommendations should succeed: {e}"),
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].media_type, MediaType::Movie);
        assert_eq!(
            stub.requests()[0].uri,
            "/api/v1/movie/438631/recommendations?page=1"
        );

        // Unknown titles answer 404, which reads as "nothing to recommend"
        let missing = client.recommendations(MediaType::Tv, 5).await;
        assert!(
            matches!(&missing, Ok(items) if items.is_empty()),
            "unexpected result: {missing:?}"
        );
        assert_eq!(stub.requests()[1].uri, "/api/v1/tv/5/recommendations?page=1");
    }

    #[tokio::test]
    async fn test_create_request_bodies() {
        let (client, stub) = spawn_stub(&[("/api/v1/request", 201, r#"{"id":9}"#)]).await;

        let tv = match client.create_request(MediaType::Tv, 1399, false).await {
            Ok(created) => created,
            Err(e) => panic!("request should succeed: {e}"),
        };
        assert_eq!(tv.request_id(), Some(9));
        assert!(client
            .create_request(MediaType::Movie, 438_631, true)
            .await
            .is_ok());

        let requests = stub.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].uri, "/api/v1/request");
        assert_eq!(
            requests[0].json(),
            serde_json::json!({ "mediaId": 1399, "mediaType": "tv", "seasons": "all" })
        );
        assert_eq!(
            requests[1].json(),
            serde_json::json!({ "mediaId": 438631, "mediaType": "movie", "is4k": true })
        );
    }

    #[tokio::test]
    async fn test_approve_request() {
        let (client, stub) =
            spawn_stub(&[("/api/v1/request/9/approve", 200, r#"{"id":9,"status":2}"#)]).await;

        let result = client.approve_request(9, false).await;
        assert!(result.is_ok(), "unexpected result: {result:?}");

        let requests = stub.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].json(), serde_json::json!({ "is4k": false }));

        let missing = client.approve_request(10, false).await;
        assert!(matches!(
            missing,
            Err(OverseerrError::Api { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_details_and_ratings() {
        let (client, _stub) = spawn_stub(&[
            (
                "/api/v1/movie/438631",
                200,
                r#"{"id":438631,"externalIds":{"imdbId":"tt1160419"},"relatedVideos":null}"#,
            ),
            (
                "/api/v1/movie/438631/ratings",
                200,
                r#"{"title":"Dune","url":"https://www.rottentomatoes.com/m/dune_2021","criticsScore":83,"audienceScore":90}"#,
            ),
        ])
        .await;

        let details = match client.details(MediaType::Movie, 438_631).await {
            Ok(details) => details,
            Err(e) => panic!("details should succeed: {e}"),
        };
        assert_eq!(
            details.imdb_url().as_deref(),
            Some("https://www.imdb.com/title/tt1160419")
        );

        let ratings = client.ratings(MediaType::Movie, 438_631).await;
        assert!(
            matches!(&ratings, Ok(Some(rt)) if rt.critics_score == Some(83) && rt.audience_score == Some(90)),
            "unexpected result: {ratings:?}"
        );

        // No ratings known for this title
        let missing = client.ratings(MediaType::Tv, 1399).await;
        assert!(
            matches!(missing, Ok(None)),
            "unexpected result: {missing:?}"
        );
    }
}
