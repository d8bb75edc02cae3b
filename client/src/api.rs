use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub credits: i32,
    pub is_subscriber: bool,
}

#[derive(Debug, Serialize)]
struct MutationBody<'a> {
    action: &'a str,
    amount: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationResponse {
    new_balance: i32,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Thin HTTP client for the credits endpoint. Keeps the session cookie set
/// by `/auth/login` for subsequent calls.
#[derive(Debug, Clone)]
pub struct CreditsClient {
    http: Client,
    base_url: Url,
}

impl CreditsClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(http, Url::parse(base_url)?))
    }

    /// Uses a caller-built client, which should have a cookie store enabled.
    /// Any path on `base_url` is kept as a prefix of every endpoint.
    pub fn with_client(http: Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let prefix = format!("{}/", base_url.path());
            base_url.set_path(&prefix);
        }
        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<()> {
        let response = self
            .http
            .post(self.endpoint("auth/login")?)
            .json(&LoginBody { email, password })
            .send()
            .await?;

        ensure_success(response).await.map(|_| ())
    }

    #[instrument(skip(self))]
    pub async fn balance(&self) -> ClientResult<Balance> {
        let response = self.http.get(self.endpoint("api/credits")?).send().await?;
        Ok(ensure_success(response).await?.json::<Balance>().await?)
    }

    pub async fn deduct(&self, amount: i32) -> ClientResult<i32> {
        self.mutate("deduct", amount).await
    }

    pub async fn add(&self, amount: i32) -> ClientResult<i32> {
        self.mutate("add", amount).await
    }

    #[instrument(skip(self))]
    async fn mutate(&self, action: &str, amount: i32) -> ClientResult<i32> {
        let response = self
            .http
            .post(self.endpoint("api/credits")?)
            .json(&MutationBody { action, amount })
            .send()
            .await?;

        let body: MutationResponse = ensure_success(response).await?.json().await?;
        debug!(new_balance = body.new_balance, "Credits mutated");
        Ok(body.new_balance)
    }
}

/// Turns a non-2xx answer into [`ClientError::Api`], preferring the server's
/// own `error` string over the status reason.
async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(ClientError::Api { status, message })
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn reads_balance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/credits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "success": true, "credits": 6, "isSubscriber": false }),
            ))
            .mount(&server)
            .await;

        let client = CreditsClient::new(&server.uri()).unwrap();
        assert_eq!(
            client.balance().await.unwrap(),
            Balance {
                credits: 6,
                is_subscriber: false
            }
        );
    }

    #[tokio::test]
    async fn base_url_path_is_kept_as_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shop/api/credits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "success": true, "credits": 3, "isSubscriber": true }),
            ))
            .expect(2)
            .mount(&server)
            .await;

        for base in [format!("{}/shop", server.uri()), format!("{}/shop/", server.uri())] {
            let client = CreditsClient::new(&base).unwrap();
            assert_eq!(
                client.balance().await.unwrap(),
                Balance {
                    credits: 3,
                    is_subscriber: true
                }
            );
        }
    }

    #[tokio::test]
    async fn sends_mutation_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/credits"))
            .and(body_json(json!({ "action": "add", "amount": 5 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true, "newBalance": 11 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = CreditsClient::new(&server.uri()).unwrap();
        assert_eq!(client.add(5).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn api_error_carries_literal_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/credits"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "success": false, "error": "积分不足" })),
            )
            .mount(&server)
            .await;

        let client = CreditsClient::new(&server.uri()).unwrap();
        let error = client.deduct(9).await.unwrap_err();

        assert_eq!(error.to_string(), "积分不足");
        assert!(matches!(error, ClientError::Api { status, .. } if status == StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn non_json_error_falls_back_to_status_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/credits"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .mount(&server)
            .await;

        let client = CreditsClient::new(&server.uri()).unwrap();
        let error = client.balance().await.unwrap_err();
        assert_eq!(error.to_string(), "Too Many Requests");
    }

    #[tokio::test]
    async fn login_cookie_is_sent_on_later_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "sid=abc123; Path=/; HttpOnly")
                    .set_body_json(json!({ "ok": true })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/credits"))
            .and(header("cookie", "sid=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "success": true, "credits": 3, "isSubscriber": true }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = CreditsClient::new(&server.uri()).unwrap();
        client.login("user@example.com", "pw").await.unwrap();
        assert_eq!(client.balance().await.unwrap().credits, 3);
    }
}
