use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] core_gateway::ApiError),
}

impl CoreError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Gateway(error) => error.user_message(),
            CoreError::Auth(core_auth::AuthError::AuthorizationDenied { .. }) => {
                "Sign-in was cancelled or denied.".to_string()
            }
            CoreError::Auth(error) if error.is_recoverable() => {
                "Sign-in failed. Please try again.".to_string()
            }
            _ => "The app is not set up correctly. Please contact support.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
