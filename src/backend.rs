use async_trait::async_trait;

use crate::error::BackendError;

/// A text-generation backend: one free-text instruction in, one free-text
/// answer out. No schema is enforced at this seam; callers that need
/// structure parse the answer themselves.
#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn generate_text(&self, instruction: &str) -> Result<String, BackendError>;
}

/// An image-generation backend: one prompt in, raw encoded image bytes
/// out. Decoding the bytes is the caller's job.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, BackendError>;
}
