use async_trait::async_trait;
use gemini::{Gemini, Request, Response};

/// Something that can answer a generation request.
///
/// Implemented for the real [`Gemini`] client and by
/// [`ScriptedModel`](crate::testing::ScriptedModel) for tests.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: Request) -> Result<Response, gemini::Error>;
}

#[async_trait]
impl Generator for Gemini {
    async fn generate(&self, request: Request) -> Result<Response, gemini::Error> {
        Gemini::generate(self, request).await
    }
}
