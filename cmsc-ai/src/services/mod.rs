//! External service clients

pub mod ai_client;
pub mod backend_gateway;
pub mod envelope;
pub mod media_uploader;
pub mod rate_limiter;

pub use ai_client::{AiClient, AiEndpoint, ChatContext, ChatMessage, ChatRequest, ChatRole};
pub use backend_gateway::{BackendGateway, GatewayError, GatewaySettings, HttpGateway};
pub use media_uploader::{HttpMediaUploader, MediaUploader, UploadError};
pub use rate_limiter::RateLimiter;
