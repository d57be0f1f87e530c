//! Viewer identity carried in trusted headers set by the upstream auth layer.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::types::Role;

pub const VIEWER_ID_HEADER: &str = "x-viewer-id";
pub const VIEWER_ROLE_HEADER: &str = "x-viewer-role";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerIdentity {
    pub user_id: Option<String>,
    pub role: Role,
}

impl ViewerIdentity {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
        }
    }

    pub fn require_admin(&self) -> Result<&str, AppError> {
        match (&self.role, self.user_id.as_deref()) {
            (Role::Admin, Some(id)) => Ok(id),
            _ => Err(AppError::Forbidden("admin role required".to_string())),
        }
    }

    /// Signed-in viewer of any role.
    pub fn require_user(&self) -> Result<&str, AppError> {
        match (&self.role, self.user_id.as_deref()) {
            (Role::Admin | Role::User, Some(id)) => Ok(id),
            _ => Err(AppError::Forbidden("sign in required".to_string())),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ViewerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role: Role = header(parts, VIEWER_ROLE_HEADER).unwrap_or("").parse()?;
        let user_id = header(parts, VIEWER_ID_HEADER).map(str::to_string);

        match (role, user_id) {
            (Role::Anonymous, _) | (_, None) => Ok(Self::anonymous()),
            (role, user_id) => Ok(Self { user_id, role }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<ViewerIdentity, AppError> {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ViewerIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_headers_mean_anonymous() {
        assert_eq!(extract(&[]).await.unwrap(), ViewerIdentity::anonymous());
        // A role without an id carries no entitlements.
        let role_only = extract(&[(VIEWER_ROLE_HEADER, "admin")]).await.unwrap();
        assert_eq!(role_only, ViewerIdentity::anonymous());
    }

    #[tokio::test]
    async fn admin_and_user_roles() {
        let admin = extract(&[(VIEWER_ID_HEADER, "root"), (VIEWER_ROLE_HEADER, "Admin")])
            .await
            .unwrap();
        assert_eq!(admin.require_admin().unwrap(), "root");

        let user = extract(&[(VIEWER_ID_HEADER, "u1"), (VIEWER_ROLE_HEADER, "user")])
            .await
            .unwrap();
        assert_eq!(user.require_user().unwrap(), "u1");
        assert!(matches!(user.require_admin(), Err(AppError::Forbidden(_))));
        assert!(ViewerIdentity::anonymous().require_user().is_err());
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let err = extract(&[(VIEWER_ID_HEADER, "u1"), (VIEWER_ROLE_HEADER, "owner")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownRole(_)));
    }
}
