use crate::config::GhostCredentials;
use anyhow::Context;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::time::Duration;

const TOKEN_TTL_SECS: i64 = 300;
const TOKEN_AUDIENCE: &str = "/admin/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub html: String,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codeinjection_head: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codeinjection_foot: Option<String>,
}

#[async_trait::async_trait]
pub trait BlogPublisher: Send + Sync {
    /// Created post JSON, or `None` when the platform rejected the request.
    async fn create_post(&self, post: &PostDraft) -> Option<serde_json::Value>;
}

#[derive(Debug, Serialize)]
struct AdminClaims<'a> {
    iat: i64,
    exp: i64,
    aud: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePostBody<'a> {
    posts: [&'a PostDraft; 1],
}

#[derive(Clone)]
pub struct GhostClient {
    http: reqwest::Client,
    url: String,
    key_id: String,
    secret: Vec<u8>,
}

impl GhostClient {
    /// `admin_api_key` is `id:hexsecret`.
    pub fn from_credentials(creds: &GhostCredentials) -> anyhow::Result<Self> {
        let (key_id, secret_hex) = creds
            .admin_api_key
            .split_once(':')
            .context("GHOST_ADMIN_API_KEY must be formatted as id:secret")?;
        let secret = hex::decode(secret_hex.trim()).context("GHOST_ADMIN_API_KEY secret is not hex")?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build ghost http client")?;

        Ok(Self {
            http,
            url: creds.api_url.trim_end_matches('/').to_string(),
            key_id: key_id.trim().to_string(),
            secret,
        })
    }

    /// Short-lived HS256 token; `kid` carries the key id.
    pub fn admin_token(&self, now: i64) -> anyhow::Result<String> {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());
        let claims = AdminClaims {
            iat: now,
            exp: now + TOKEN_TTL_SECS,
            aud: TOKEN_AUDIENCE,
        };
        jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(&self.secret))
            .context("failed to sign ghost admin token")
    }

    async fn try_create_post(&self, post: &PostDraft) -> anyhow::Result<Option<serde_json::Value>> {
        let token = self.admin_token(chrono::Utc::now().timestamp())?;
        let endpoint = format!("{}/ghost/api/admin/posts/?source=html", self.url);

        let res = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Ghost {token}"))
            .json(&CreatePostBody { posts: [post] })
            .send()
            .await
            .context("ghost request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read ghost response")?;
        if !status.is_success() {
            tracing::error!(%status, body = %text, "ghost API rejected post");
            return Ok(None);
        }

        let value = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("ghost response is not valid JSON: {text}"))?;
        Ok(Some(value))
    }
}

#[async_trait::async_trait]
impl BlogPublisher for GhostClient {
    async fn create_post(&self, post: &PostDraft) -> Option<serde_json::Value> {
        match self.try_create_post(post).await {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "ghost API error");
                None
            }
        }
    }
}

/// Title of the first post in a create-post response.
pub fn created_title(response: &serde_json::Value) -> Option<&str> {
    response["posts"][0]["title"].as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Decoded {
        iat: i64,
        exp: i64,
        aud: String,
    }

    fn client() -> GhostClient {
        GhostClient::from_credentials(&GhostCredentials {
            api_url: "https://blog.example.com/".to_string(),
            admin_api_key: "64f0abc:a1b2c3d4e5f60718".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn token_is_signed_with_hex_secret_and_expires_in_five_minutes() {
        let c = client();
        let now = chrono::Utc::now().timestamp();
        let token = c.admin_token(now).unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("64f0abc"));
        assert_eq!(header.alg, Algorithm::HS256);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["/admin/"]);
        let secret = hex::decode("a1b2c3d4e5f60718").unwrap();
        let data =
            jsonwebtoken::decode::<Decoded>(&token, &DecodingKey::from_secret(&secret), &validation)
                .unwrap();
        assert_eq!(data.claims.exp - data.claims.iat, 300);
        assert_eq!(data.claims.aud, "/admin/");
        assert_eq!(c.url, "https://blog.example.com");
    }

    #[test]
    fn rejects_malformed_admin_key() {
        let bad = GhostClient::from_credentials(&GhostCredentials {
            api_url: "https://blog.example.com".to_string(),
            admin_api_key: "no-colon".to_string(),
        });
        assert!(bad.is_err());

        let bad = GhostClient::from_credentials(&GhostCredentials {
            api_url: "https://blog.example.com".to_string(),
            admin_api_key: "id:not-hex".to_string(),
        });
        assert!(bad.is_err());
    }

    #[test]
    fn post_body_omits_absent_optionals() {
        let post = PostDraft {
            title: "T".to_string(),
            html: "<p>x</p>".to_string(),
            status: PostStatus::Draft,
            tags: vec!["Market Report".to_string()],
            codeinjection_head: None,
            codeinjection_foot: Some("<script></script>".to_string()),
        };
        let v = serde_json::to_value(CreatePostBody { posts: [&post] }).unwrap();
        assert_eq!(v["posts"][0]["status"], json!("draft"));
        assert_eq!(v["posts"][0]["tags"], json!(["Market Report"]));
        assert!(v["posts"][0].get("codeinjection_head").is_none());
        assert!(v["posts"][0].get("codeinjection_foot").is_some());
    }

    #[test]
    fn created_title_reads_first_post() {
        let v = json!({"posts": [{"title": "US Market Close Report"}]});
        assert_eq!(created_title(&v), Some("US Market Close Report"));
        assert_eq!(created_title(&json!({})), None);
    }
}
