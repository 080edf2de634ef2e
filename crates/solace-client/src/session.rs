use tracing::warn;

use solace_gateway::Backend;
use solace_types::models::{UserProfile, collections};

use crate::error::{ClientError, Result};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

/// Point lookup of a profile document.
pub async fn load_profile<B: Backend>(backend: &B, user_id: &str) -> Result<Option<UserProfile>> {
    let doc = backend.get(collections::PROFILES, user_id).await?;
    Ok(doc.map(|d| d.decode()).transpose()?)
}

/// Gate for admin-only screens. Returns the admin's profile.
pub async fn require_admin<B: Backend>(backend: &B, session: Option<&Session>) -> Result<UserProfile> {
    let session = session.ok_or(ClientError::NotSignedIn)?;

    match load_profile(backend, &session.user_id).await? {
        Some(profile) if profile.is_admin => Ok(profile),
        _ => {
            warn!(user = %session.user_id, "non-admin opened an admin screen");
            Err(ClientError::NotAdmin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fields, local};
    use serde_json::json;

    fn session(user_id: &str) -> Session {
        Session {
            user_id: user_id.into(),
            email: format!("{user_id}@example.com"),
        }
    }

    #[tokio::test]
    async fn admin_gate() {
        let backend = local();
        backend
            .set(collections::PROFILES, "boss", fields(json!({ "firstName": "Ida", "isAdmin": true })))
            .await
            .unwrap();
        backend
            .set(collections::PROFILES, "u1", fields(json!({ "firstName": "Ana" })))
            .await
            .unwrap();

        let admin = require_admin(&backend, Some(&session("boss"))).await.unwrap();
        assert_eq!(admin.first_name, "Ida");

        assert!(matches!(
            require_admin(&backend, Some(&session("u1"))).await,
            Err(ClientError::NotAdmin)
        ));
        assert!(matches!(
            require_admin(&backend, Some(&session("nobody"))).await,
            Err(ClientError::NotAdmin)
        ));
        assert!(matches!(require_admin(&backend, None).await, Err(ClientError::NotSignedIn)));
    }
}
