// Dispatcher against in-process axum servers over real HTTP: content negotiation, headers,
// no response caching, and the ML alias scope end to end.

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::RawQuery;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Json;
    use http::Method;
    use httpmock::prelude::*;
    use serde::Deserialize;

    use crate::client::{user_agent, Client, ClientOptions, ContentType, QueryParams, ResponseBody};
    use crate::config::settings::{ClientConfig, EnvironmentConfig, IdentityConfig};
    use crate::credentials::signals::EnvironmentSignals;
    use crate::credentials::CredentialProvider;
    use crate::helpers::time::now_i64;
    use crate::resolver::environment::Environment;
    use crate::tests::common::{build_reqwest_client, json, spawn_axum, Router, StaticProvider};
    use crate::utils::constants::{IMDS_API_VERSION, MANAGEMENT_SCOPE};

    const PROTOBUF_BYTES: &[u8] = &[0x0a, 0x03, b'a', b'b', b'c', 0x10, 0x96, 0x01];

    fn client_for(base_url: String, resource_id: &str) -> Client<StaticProvider> {
        Client::with_parts(
            Environment::new(resource_id, base_url),
            StaticProvider::default(),
            build_reqwest_client(),
            ClientOptions::default(),
        )
    }

    async fn negotiate(headers: HeaderMap) -> impl IntoResponse {
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if accept.contains("protobuf") {
            ([(header::CONTENT_TYPE, accept)], PROTOBUF_BYTES.to_vec()).into_response()
        } else {
            Json(json!({"data": [{"id": "abc", "datapoints": [{"time": "2024-01-01T00:00:00Z", "value": 1.5, "status": 192}]}]}))
                .into_response()
        }
    }

    #[tokio::test]
    async fn accept_type_selects_decoding() {
        let router = Router::new().route("/ts/abc/data", get(negotiate));
        let (handle, addr) = spawn_axum(router).await;
        let client = client_for(format!("http://{addr}/ts"), "api://ts");
        let url = format!("{}/abc/data", client.base_url());

        let json_body = client.request(Method::GET, &url, ContentType::Json, None, None).await.unwrap();
        assert_eq!(json_body.as_json().unwrap()["data"][0]["datapoints"][0]["status"], 192);

        for accept in [ContentType::Protobuf, ContentType::XGoogleProtobuf] {
            let body = client.request(Method::GET, &url, accept, None, None).await.unwrap();
            assert_eq!(body, ResponseBody::Bytes(PROTOBUF_BYTES.to_vec()));
        }

        handle.abort();
    }

    #[tokio::test]
    async fn identical_requests_are_not_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let router = Router::new().route(
            "/ts/facets/source",
            get(move || {
                let hits = hits_clone.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    Json(json!({"hit": n}))
                }
            }),
        );
        let (handle, addr) = spawn_axum(router).await;
        let client = client_for(format!("http://{addr}/ts"), "api://ts");
        let url = format!("{}/facets/source", client.base_url());

        let first: serde_json::Value = client.request_json(Method::GET, &url, None, None).await.unwrap();
        let second: serde_json::Value = client.request_json(Method::GET, &url, None, None).await.unwrap();

        assert_eq!(first, json!({"hit": 1}));
        assert_eq!(second, json!({"hit": 2}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        // one token serves both
        assert_eq!(client.tokens().provider().acquisitions(), 1);

        handle.abort();
    }

    #[derive(Debug, Deserialize)]
    struct Echo {
        authorization: String,
        accept: String,
        content_type: String,
        user_agent: String,
        query: Option<String>,
        body: Option<serde_json::Value>,
    }

    async fn echo(headers: HeaderMap, RawQuery(query): RawQuery, body: String) -> Json<serde_json::Value> {
        let get_header = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned()
        };
        let body: Option<serde_json::Value> = serde_json::from_str(&body).ok();
        Json(json!({
            "authorization": get_header(header::AUTHORIZATION),
            "accept": get_header(header::ACCEPT),
            "content_type": get_header(header::CONTENT_TYPE),
            "user_agent": get_header(header::USER_AGENT),
            "query": query,
            "body": body,
        }))
    }

    #[tokio::test]
    async fn wire_headers_query_and_payload() {
        let router = Router::new().route("/ts/query/data", get(echo).post(echo));
        let (handle, addr) = spawn_axum(router).await;
        let client = client_for(format!("http://{addr}/ts/"), "api://ts");
        let url = format!("{}/query/data", client.base_url());

        let params = QueryParams::new()
            .scalar("name", "PT-1234")
            .list("status", [192, 0])
            .scalar("includeOutsidePoints", false);
        let echoed: Echo = client
            .request_json(Method::POST, &url, Some(json!([{"id": "abc"}])), Some(&params))
            .await
            .unwrap();

        assert_eq!(echoed.authorization, "Bearer token-1-for-api://ts/.default");
        assert_eq!(echoed.accept, "application/json");
        assert_eq!(echoed.content_type, "application/json");
        assert_eq!(echoed.user_agent, user_agent());
        assert_eq!(
            echoed.query.as_deref(),
            Some("name=PT-1234&status=192&status=0&includeOutsidePoints=false")
        );
        assert_eq!(echoed.body, Some(json!([{"id": "abc"}])));

        handle.abort();
    }

    #[tokio::test]
    async fn ml_alias_resource_uses_management_scope_end_to_end() {
        let expected = format!("Bearer token-1-for-{MANAGEMENT_SCOPE}");
        let router = Router::new().route(
            "/workspace/items",
            get(move |headers: HeaderMap| {
                let expected = expected.clone();
                async move {
                    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
                    if auth == Some(expected.as_str()) {
                        (StatusCode::OK, Json(json!({"items": []})))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({"message": "wrong audience"})))
                    }
                }
            }),
        );
        let (handle, addr) = spawn_axum(router).await;
        let client = client_for(format!("http://{addr}/workspace"), "https://ml.azure.com/workspaces/plant");
        assert_eq!(client.scope(), MANAGEMENT_SCOPE);

        let url = format!("{}/items", client.base_url());
        let body = client.request(Method::GET, &url, ContentType::Json, None, None).await.unwrap();

        assert_eq!(body, ResponseBody::Json(json!({"items": []})));
        assert_eq!(client.tokens().provider().scopes(), vec![MANAGEMENT_SCOPE.to_string()]);

        handle.abort();
    }

    #[tokio::test]
    async fn configured_client_uses_user_assigned_identity() {
        let identity = MockServer::start_async().await;
        let imds = identity
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/metadata/identity/oauth2/token")
                    .header("Metadata", "true")
                    .query_param("api-version", IMDS_API_VERSION)
                    .query_param("resource", "api://omnia-ts")
                    .query_param("client_id", "uami-client-id");
                then.status(200).json_body(json!({
                    "access_token": "uami-token",
                    "expires_on": (now_i64() + 3600).to_string(),
                }));
            })
            .await;

        let router = Router::new().route(
            "/ts/facets/facility",
            get(|headers: HeaderMap| async move {
                match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                    Some("Bearer uami-token") => (StatusCode::OK, Json(json!({"data": ["JSV"]}))),
                    _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
                }
            }),
        );
        let (handle, addr) = spawn_axum(router).await;

        let config = ClientConfig {
            environment: EnvironmentConfig::Custom {
                resource_id: "api://omnia-ts".into(),
                base_url: format!("http://{addr}/ts"),
            },
            identity: IdentityConfig {
                client_id: Some("uami-client-id".into()),
                imds_endpoint: Some(identity.url("/metadata/identity/oauth2/token")),
                ..Default::default()
            },
            ..Default::default()
        };
        let client = Client::from_config_with_signals(&config, &EnvironmentSignals::default()).unwrap();
        assert_eq!(client.tokens().provider().kind(), "managed_identity");

        let url = format!("{}/facets/facility", client.base_url());
        for _ in 0..2 {
            let body: serde_json::Value = client.request_json(Method::GET, &url, None, None).await.unwrap();
            assert_eq!(body, json!({"data": ["JSV"]}));
        }

        // cached after the first call
        imds.assert_async().await;
        handle.abort();
    }
}
