use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Url};
use scrollbulk_core::transport::{Method, Request, Response, ResponseBody, Transport};
use scrollbulk_core::{ClientConfig, ClientError, Result};
use std::time::Duration;

/// reqwest-backed transport. Connection pooling is reqwest's.
pub struct HttpTransport {
    base_url: Url,
    client: HttpClient,
    username: String,
    password: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(config.url.trim())
            .map_err(|e| ClientError::Connection(format!("invalid url {:?}: {}", config.url, e)))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::Connection(format!(
                "unsupported url scheme {:?}",
                base_url.scheme()
            )));
        }
        if base_url.host_str().is_none() {
            return Err(ClientError::Connection(format!(
                "url {:?} has no host",
                config.url
            )));
        }

        let mut builder = HttpClient::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path under the base url, keeping any path prefix
    /// of a proxied endpoint.
    fn url_for(&self, request: &Request) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", prefix, request.path));
        url.set_query(None);

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, request: &Request) -> Result<Response> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url_for(request));
        if !self.username.is_empty() {
            builder = builder.basic_auth(&self.username, Some(&self.password));
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, request.content_type)
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Response::new(
            response.status().as_u16(),
            Some(Box::new(StreamedBody(Some(response)))),
        ))
    }
}

/// Unread reqwest response. Dropping it frees the connection.
struct StreamedBody(Option<reqwest::Response>);

#[async_trait]
impl ResponseBody for StreamedBody {
    async fn read_all(&mut self) -> Result<Vec<u8>> {
        match self.0.take() {
            Some(response) => response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ClientError::Transport(format!("failed to read response body: {}", e))),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(url: &str) -> Result<HttpTransport> {
        HttpTransport::new(&ClientConfig::new(url))
    }

    #[test]
    fn test_rejects_unusable_urls() {
        assert!(matches!(transport("not a url"), Err(ClientError::Connection(_))));
        assert!(matches!(
            transport("ftp://example.com"),
            Err(ClientError::Connection(_))
        ));
        assert!(matches!(transport(""), Err(ClientError::Connection(_))));
    }

    #[test]
    fn test_url_for_keeps_prefix_and_query() {
        let transport = transport("http://proxy.local:8080/es/").unwrap();
        let request = Request::new(Method::Post, "/accounts/_search")
            .query("size", "9000")
            .query("scroll", "600001ms");

        assert_eq!(
            transport.url_for(&request).as_str(),
            "http://proxy.local:8080/es/accounts/_search?size=9000&scroll=600001ms"
        );

        let request = Request::new(Method::Delete, "/_search/scroll");
        assert_eq!(
            transport.url_for(&request).as_str(),
            "http://proxy.local:8080/es/_search/scroll"
        );
    }

    #[test]
    fn test_url_for_bare_host() {
        let transport = transport("http://localhost:9200").unwrap();
        let request = Request::new(Method::Post, "/_bulk");
        assert_eq!(
            transport.url_for(&request).as_str(),
            "http://localhost:9200/_bulk"
        );
    }
}
