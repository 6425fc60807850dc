// Plain HTTPS endpoints: search suggestions and public vote counts

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::errors::{BackendError, Result};
use super::models::Votes;
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct WebClient {
    client: reqwest::Client,
    suggest_url: String,
    votes_url: String,
    language: String,
    region: String,
}

impl WebClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.socket_timeout_secs.into()))
            // connections never outlive the runtime that opened them
            .pool_max_idle_per_host(0);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            suggest_url: config.suggest_url.clone(),
            votes_url: config.votes_url.clone(),
            language: config.language.clone(),
            region: config.region.clone(),
        })
    }

    /// Search-as-you-type suggestions for `query`
    pub async fn suggestions(&self, query: &str) -> Result<Vec<String>> {
        debug!(query, "fetching suggestions");
        let body = self
            .client
            .get(&self.suggest_url)
            .query(&[
                ("client", "firefox"),
                ("ds", "yt"),
                ("hl", self.language.as_str()),
                ("gl", self.region.as_str()),
                ("q", query),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_suggestions(&body)
    }

    /// Like/dislike counts for a video
    pub async fn votes(&self, video_id: &str) -> Result<Votes> {
        debug!(video_id, "fetching votes");
        let votes = self
            .client
            .get(&self.votes_url)
            .query(&[("videoId", video_id)])
            .send()
            .await?
            .error_for_status()?
            .json::<Votes>()
            .await?;
        Ok(votes)
    }
}

/// `["query", ["s1", "s2", ...], ...]`, possibly wrapped in a JSONP callback
fn parse_suggestions(body: &str) -> Result<Vec<String>> {
    let not_array = || BackendError::Parse("Suggestion response is not an array".to_string());
    let start = body.find('[').ok_or_else(not_array)?;
    let end = body.rfind(']').filter(|&end| end > start).ok_or_else(not_array)?;
    let json: Value = serde_json::from_str(&body[start..=end])
        .map_err(|e| BackendError::Parse(format!("Invalid suggestion JSON: {}", e)))?;

    let suggestions = json[1]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    // older clients nest each suggestion as [text, ...]
                    Value::Array(parts) => parts.first()?.as_str().map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_plain_and_jsonp() {
        assert_eq!(
            parse_suggestions(r#"["rust",["rust lang","rust game"]]"#).unwrap(),
            vec!["rust lang", "rust game"]
        );
        assert_eq!(
            parse_suggestions(r#"window.google.ac.h(["rust",[["rust lang",0,[512]]],{"k":1}])"#)
                .unwrap(),
            vec!["rust lang"]
        );
        assert!(parse_suggestions(r#"["nothing"]"#).unwrap().is_empty());
        assert!(parse_suggestions("<html>").is_err());
        assert!(matches!(parse_suggestions("]oops["), Err(BackendError::Parse(_))));
        assert!(matches!(parse_suggestions("[unterminated"), Err(BackendError::Parse(_))));
    }

    async fn client_for(server: &MockServer) -> WebClient {
        let config = Config::default()
            .with_suggest_url(format!("{}/complete/search", server.uri()))
            .with_votes_url(format!("{}/votes", server.uri()));
        WebClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_suggestions_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/complete/search"))
            .and(query_param("q", "lofi"))
            .and(query_param("ds", "yt"))
            .and(query_param("hl", "en"))
            .and(query_param("gl", "US"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"["lofi",["lofi hip hop","lofi girl"],[],{}]"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.suggestions("lofi").await.unwrap(),
            vec!["lofi hip hop", "lofi girl"]
        );
    }

    #[tokio::test]
    async fn test_votes_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/votes"))
            .and(query_param("videoId", "dQw4w9WgXcQ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "dQw4w9WgXcQ",
                "likes": 17000000,
                "dislikes": 450000,
                "rating": 4.9,
                "viewCount": 1500000000u64
            })))
            .mount(&server)
            .await;

        let votes = client_for(&server).await.votes("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(votes.likes, 17_000_000);
        assert_eq!(votes.dislikes, 450_000);
    }

    #[tokio::test]
    async fn test_votes_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/votes"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = client_for(&server).await.votes("bad").await.unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
    }
}
