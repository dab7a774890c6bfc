use idp_connect::{
    AccessToken, ApiResponse, AuthorizationCode, ErrorBody, FacebookProvider, GithubProvider,
    IdentityProvider, OAuthClient, OAuthError, Params, ProviderConfig, RefreshToken, TokenMethod, User,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Provider whose endpoints all live on a mock server.
struct MockProvider {
    base: String,
    authorize: String,
    token: String,
    token_method: TokenMethod,
}

impl MockProvider {
    fn new(server: &MockServer) -> Self {
        Self {
            base: server.uri(),
            authorize: format!("{}/authorize", server.uri()),
            token: format!("{}/token", server.uri()),
            token_method: TokenMethod::Post,
        }
    }
}

impl IdentityProvider for MockProvider {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn authorize_url(&self) -> &str {
        &self.authorize
    }

    fn token_url(&self) -> &str {
        &self.token
    }

    fn user_details_url(&self, token: &AccessToken) -> String {
        format!("{}/me?access_token={}", self.base, token.access_token)
    }

    fn token_method(&self) -> TokenMethod {
        self.token_method
    }

    fn user_details(&self, raw: &Value, _token: &AccessToken) -> Result<User, OAuthError> {
        let mut user = User::new(raw["id"].as_str().unwrap_or_default());
        user.name = raw["name"].as_str().map(str::to_string);
        user.image_url = raw["picture"].as_str().map(str::to_string);
        Ok(user)
    }

    fn picture_url(&self, user: &User, _token: &AccessToken) -> Option<String> {
        Some(format!("{}/users/{}/picture", self.base, user.uid))
    }
}

fn config() -> ProviderConfig {
    ProviderConfig::new("client-id", "secret", "http://localhost:8765/callback")
}

fn mock_client(server: &MockServer) -> OAuthClient<MockProvider> {
    OAuthClient::new(MockProvider::new(server), config()).unwrap()
}

#[tokio::test]
async fn exchanges_code_with_form_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=c0de"))
        .and(body_string_contains("client_secret=secret"))
        .and(body_string_contains("client_id=client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "rt-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let token = client
        .get_access_token(&AuthorizationCode::new("c0de"), Params::new())
        .await
        .unwrap();

    assert_eq!(token.access_token, "at-1");
    assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(token.expires_in, Some(3600));
}

#[tokio::test]
async fn caller_params_override_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("redirect_uri=http%3A%2F%2Fother%2Fcb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "at"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let params = Params::from([("redirect_uri".to_string(), "http://other/cb".to_string())]);
    let token = client
        .get_access_token(&AuthorizationCode::new("c"), params)
        .await
        .unwrap();
    assert_eq!(token.access_token, "at");
}

#[tokio::test]
async fn get_method_sends_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(query_param("refresh_token", "rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "at-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut provider = MockProvider::new(&server);
    provider.token_method = TokenMethod::Get;
    let client = OAuthClient::new(provider, config()).unwrap();
    let token = client
        .get_access_token(&RefreshToken::new("rt-1"), Params::new())
        .await
        .unwrap();

    assert_eq!(token.access_token, "at-2");
    assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
}

#[tokio::test]
async fn configured_method_wins_over_provider_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("code", "c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "at"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config().with_method(TokenMethod::Get);
    let client = OAuthClient::new(MockProvider::new(&server), config).unwrap();
    client
        .get_access_token(&AuthorizationCode::new("c"), Params::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn token_error_carries_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let err = client
        .get_access_token(&AuthorizationCode::new("expired"), Params::new())
        .await
        .unwrap_err();

    match err {
        OAuthError::IdentityProvider { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, ErrorBody::Json(json!({"error": "invalid_grant"})));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn token_error_falls_back_to_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string("error=bad_verification_code&error_description=expired"),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let err = client
        .get_access_token(&AuthorizationCode::new("c"), Params::new())
        .await
        .unwrap_err();

    match err {
        OAuthError::IdentityProvider { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body.error_code(), Some("bad_verification_code"));
            assert!(matches!(body, ErrorBody::Form(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn token_response_without_access_token_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let err = client
        .get_access_token(&AuthorizationCode::new("c"), Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::InvalidResponse { .. }));
}

#[tokio::test]
async fn user_details_resolve_picture_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(query_param("access_token", "at"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1", "name": "Ada"})))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/users/u1/picture"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://cdn.example.com/u1.jpg"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let user = client.get_user_details(&AccessToken::new("at")).await.unwrap();

    assert_eq!(user.uid, "u1");
    assert_eq!(user.name.as_deref(), Some("Ada"));
    assert_eq!(user.image_url.as_deref(), Some("https://cdn.example.com/u1.jpg"));
}

#[tokio::test]
async fn profile_picture_skips_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u3",
            "picture": "https://cdn.example.com/u3.png",
        })))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/users/u3/picture"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/other.jpg"))
        .expect(0)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let user = client.get_user_details(&AccessToken::new("at")).await.unwrap();

    assert_eq!(user.image_url.as_deref(), Some("https://cdn.example.com/u3.png"));
}

#[tokio::test]
async fn failed_picture_lookup_leaves_image_unset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u2"})))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/users/u2/picture"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let user = client.get_user_details(&AccessToken::new("at")).await.unwrap();

    assert_eq!(user.uid, "u2");
    assert_eq!(user.image_url, None);
}

#[tokio::test]
async fn user_details_error_keeps_text_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let err = client
        .get_user_details(&AccessToken::new("at"))
        .await
        .unwrap_err();

    match err {
        OAuthError::IdentityProvider { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, ErrorBody::Text("Service Unavailable".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn call_api_degrades_on_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/things"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let params = Params::from([("limit".to_string(), "5".to_string())]);
    let response = client
        .call_api("get", &format!("{}/api/things", server.uri()), &params)
        .await
        .unwrap();

    assert_eq!(
        response,
        ApiResponse::Raw {
            status: 502,
            body: "<html>bad gateway</html>".to_string(),
        }
    );
}

#[tokio::test]
async fn call_api_returns_json_even_for_errors() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/things/1"))
        .and(body_string_contains("name=new"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error": "invalid"})))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let params = Params::from([("name".to_string(), "new".to_string())]);
    let response = client
        .call_api("PATCH", &format!("{}/api/things/1", server.uri()), &params)
        .await
        .unwrap();

    assert_eq!(response.json(), Some(&json!({"error": "invalid"})));
}

#[tokio::test]
async fn call_api_rejects_unsupported_method() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let err = client
        .call_api("options", &server.uri(), &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::UnsupportedMethod(method) if method == "options"));
}

#[tokio::test]
async fn call_api_with_token_uses_provider_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(header("authorization", "token gho_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "repo"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = OAuthClient::new(GithubProvider, config()).unwrap();
    let response = client
        .call_api_with_token(
            "get",
            &format!("{}/user/repos", server.uri()),
            &Params::new(),
            Some(&AccessToken::new("gho_abc")),
        )
        .await
        .unwrap();

    assert_eq!(response.json(), Some(&json!([{"name": "repo"}])));
}

#[tokio::test]
async fn call_api_with_token_puts_token_in_query_for_url_providers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/friends"))
        .and(query_param("access_token", "fb_tok"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OAuthClient::new(FacebookProvider, config()).unwrap();
    let params = Params::from([("limit".to_string(), "10".to_string())]);
    let response = client
        .call_api_with_token(
            "GET",
            &format!("{}/me/friends", server.uri()),
            &params,
            Some(&AccessToken::new("fb_tok")),
        )
        .await
        .unwrap();

    assert_eq!(response.json(), Some(&json!({"data": []})));
}
