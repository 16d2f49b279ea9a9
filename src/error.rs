use thiserror::Error;

/// Failures of the two backend calls. The detail is only ever logged; the
/// transcript gets a fixed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("chat request failed: {0}")]
    ChatRequestFailed(String),
}
