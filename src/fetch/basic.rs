use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// Plain `reqwest` client with connect and whole-request timeouts, so a stalled
/// vendor endpoint is abandoned instead of holding a worker forever.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> anyhow::Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self(inner))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
