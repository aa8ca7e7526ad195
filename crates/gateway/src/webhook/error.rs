/// Why a single webhook attempt did not succeed
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Subscriber answered with status {code}")]
    Status { code: u16 },

    #[error("Failed to encode payload: {message}")]
    Encode { message: String },
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::Encode {
            message: e.to_string(),
        }
    }
}

impl From<ureq::Error> for DispatchError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => DispatchError::Status { code },
            other => DispatchError::Transport {
                message: other.to_string(),
            },
        }
    }
}
