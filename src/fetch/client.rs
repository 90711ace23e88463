use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a fully built request. Implemented by the real client, by auth
/// decorators, and by in-memory doubles in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
