//! Minimal Supabase client: GoTrue email/password auth and PostgREST tables.

mod client;
mod error;
mod types;

pub use client::SupabaseClient;
pub use error::SupabaseError;
pub use types::{Filter, Session, User};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: String,
        credits: i64,
    }

    fn create_test_client(mock_server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(mock_server.uri(), "service-key", None).unwrap()
    }

    fn user_json(id: &str, email: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "aud": "authenticated",
            "role": "authenticated",
            "email": email,
            "created_at": "2024-05-01T10:00:00.123456Z",
            "user_metadata": {}
        })
    }

    #[tokio::test]
    async fn test_sign_up_returns_bare_user() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(header("apikey", "service-key"))
            .and(body_json(serde_json::json!({
                "email": "a@x.com",
                "password": "pw123456"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u-1", "a@x.com")))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let user = client.sign_up("a@x.com", "pw123456").await.unwrap();

        assert_eq!(user.id, "u-1");
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
        assert!(user.created_at.is_some());
    }

    #[tokio::test]
    async fn test_sign_up_returns_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "jwt",
                "token_type": "bearer",
                "expires_in": 3600,
                "expires_at": 1714560000,
                "refresh_token": "refresh",
                "user": user_json("u-2", "b@x.com")
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let user = client.sign_up("b@x.com", "pw123456").await.unwrap();

        assert_eq!(user.id, "u-2");
    }

    #[tokio::test]
    async fn test_sign_up_error_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "code": 422,
                "error_code": "user_already_exists",
                "msg": "User already registered"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client.sign_up("a@x.com", "pw123456").await.unwrap_err();

        assert!(matches!(err, SupabaseError::Auth { status: 422, .. }));
        assert_eq!(err.remote_message(), Some("User already registered"));
    }

    #[tokio::test]
    async fn test_sign_in_with_password() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "jwt-token",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "refresh",
                "user": user_json("u-1", "a@x.com")
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let session = client
            .sign_in_with_password("a@x.com", "pw123456")
            .await
            .unwrap();

        assert_eq!(session.access_token, "jwt-token");
        assert_eq!(session.expires_at, None);
        assert_eq!(session.user.id, "u-1");
    }

    #[tokio::test]
    async fn test_sign_in_bad_credentials() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client
            .sign_in_with_password("a@x.com", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.remote_message(), Some("Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_get_user_uses_access_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer user-jwt"))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u-1", "a@x.com")))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let user = client.get_user("user-jwt").await.unwrap();

        assert_eq!(user.id, "u-1");
    }

    #[tokio::test]
    async fn test_get_user_invalid_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "msg": "invalid JWT"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client.get_user("expired").await;

        assert!(matches!(result, Err(SupabaseError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_select_with_filters() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("select", "id,credits"))
            .and(query_param("id", "eq.u-1"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "u-1", "credits": 7 }
            ])))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let rows: Vec<Row> = client
            .select("users", "id,credits", &[Filter::eq("id", "u-1")])
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![Row {
                id: "u-1".into(),
                credits: 7
            }]
        );
    }

    #[tokio::test]
    async fn test_insert_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/users"))
            .and(header("prefer", "return=minimal"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "code": "23505",
                "details": "Key (id)=(u-1) already exists.",
                "hint": null,
                "message": "duplicate key value violates unique constraint \"users_pkey\""
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client
            .insert(
                "users",
                &[Row {
                    id: "u-1".into(),
                    credits: 100,
                }],
            )
            .await
            .unwrap_err();

        match err {
            SupabaseError::Postgrest { status, code, .. } => {
                assert_eq!(status, 409);
                assert_eq!(code.as_deref(), Some("23505"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conditional_update_no_match() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/users"))
            .and(query_param("id", "eq.u-1"))
            .and(query_param("credits", "eq.5"))
            .and(header("prefer", "return=representation"))
            .and(body_json(serde_json::json!({ "credits": 4 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let rows: Vec<Row> = client
            .update(
                "users",
                &serde_json::json!({ "credits": 4 }),
                &[Filter::eq("id", "u-1"), Filter::eq("credits", 5)],
            )
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[test]
    fn test_filter_rendering() {
        assert_eq!(
            Filter::eq("credits", 5).to_query(),
            ("credits".to_string(), "eq.5".to_string())
        );
        assert_eq!(
            Filter::eq("email", "a@x.com").to_query(),
            ("email".to_string(), "eq.a@x.com".to_string())
        );
    }
}
