use thiserror::Error;

/// Shown for every backend failure. Backend errors are not told apart.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors surfaced by the client logic.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Backend client is not initialized")]
    NotInitialized,

    #[error("Backend client is already initialized")]
    AlreadyInitialized,

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("You need to sign in first")]
    NotSignedIn,

    #[error("Admin access required")]
    NotAdmin,

    /// A route was opened with a missing or malformed parameter.
    #[error("Invalid navigation parameter `{name}`: {reason}")]
    InvalidRoute { name: &'static str, reason: String },

    #[error("Camera permission not granted")]
    PermissionDenied,

    /// User input rejected before anything was written.
    #[error("{0}")]
    Validation(String),

    /// Any read or write failure reported by the backend.
    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// How a screen reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Show an alert, then pop the screen.
    AlertAndGoBack,
    /// Show an alert and stay.
    Alert,
    /// Keep the in-view permission request visible. No alert.
    PermissionPrompt,
}

impl ClientError {
    pub fn action(&self) -> ErrorAction {
        match self {
            Self::NotSignedIn | Self::NotAdmin | Self::InvalidRoute { .. } => ErrorAction::AlertAndGoBack,
            Self::PermissionDenied => ErrorAction::PermissionPrompt,
            Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::MissingConfig(_)
            | Self::Validation(_)
            | Self::Backend(_) => ErrorAction::Alert,
        }
    }

    /// Text for the alert. Backend details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_collapse_to_generic_message() {
        let err = ClientError::from(anyhow::anyhow!("UNAVAILABLE: deadline exceeded on shard 7"));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        assert_eq!(err.action(), ErrorAction::Alert);
    }

    #[test]
    fn auth_and_route_errors_go_back() {
        assert_eq!(ClientError::NotAdmin.action(), ErrorAction::AlertAndGoBack);
        assert_eq!(ClientError::NotSignedIn.action(), ErrorAction::AlertAndGoBack);

        let err = ClientError::InvalidRoute {
            name: "chatId",
            reason: "missing".into(),
        };
        assert_eq!(err.action(), ErrorAction::AlertAndGoBack);
        assert!(err.user_message().contains("chatId"));
    }

    #[test]
    fn permission_denied_never_alerts() {
        assert_eq!(ClientError::PermissionDenied.action(), ErrorAction::PermissionPrompt);
    }
}
