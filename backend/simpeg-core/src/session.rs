// src/session.rs
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use tracing::debug;

use crate::api::AppState;
use crate::error::AppError;
use crate::models::{Admin, Role, User};
use crate::store::Database;

pub const USER_HEADER: &str = "x-simpeg-user";
pub const ROLE_HEADER: &str = "x-simpeg-role";

/// Identity as issued by the login front end. Opaque to this service apart
/// from the lookups below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user: String,
    pub role: Role,
}

impl SessionIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let user = header_value(headers, USER_HEADER).ok_or(AppError::Unauthorized)?;
        let role = header_value(headers, ROLE_HEADER)
            .and_then(Role::parse)
            .ok_or(AppError::Unauthorized)?;
        Ok(Self {
            user: user.to_string(),
            role,
        })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Admins are looked up by ID or username.
pub fn resolve_admin(db: &Database, identity: &SessionIdentity) -> Result<Admin, AppError> {
    if identity.role != Role::Admin {
        return Err(AppError::Forbidden(identity.role.as_str().to_string()));
    }
    db.admins
        .iter()
        .find(|a| a.id == identity.user || a.username == identity.user)
        .cloned()
        .ok_or(AppError::Unauthorized)
}

/// Users are looked up by employee ID, or by account ID.
pub fn resolve_user(db: &Database, identity: &SessionIdentity) -> Result<User, AppError> {
    if identity.role != Role::User {
        return Err(AppError::Forbidden(identity.role.as_str().to_string()));
    }
    db.users
        .iter()
        .find(|u| u.employee_id == identity.user)
        .or_else(|| db.users.iter().find(|u| u.id == identity.user))
        .cloned()
        .ok_or(AppError::Unauthorized)
}

// --- Extractors ---

pub struct AdminSession(pub Admin);

pub struct UserSession(pub User);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = SessionIdentity::from_headers(&parts.headers)?;
        let store = state.store.lock().await;
        let admin = resolve_admin(store.read(), &identity)?;
        debug!("Admin session for {}", admin.username);
        Ok(AdminSession(admin))
    }
}

impl FromRequestParts<AppState> for UserSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = SessionIdentity::from_headers(&parts.headers)?;
        let store = state.store.lock().await;
        let user = resolve_user(store.read(), &identity)?;
        debug!("User session for employee {}", user.employee_id);
        Ok(UserSession(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::seed::initial_data;
    use axum::http::HeaderValue;

    fn headers(user: Option<&str>, role: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(user) = user {
            map.insert(USER_HEADER, HeaderValue::from_str(user).unwrap());
        }
        if let Some(role) = role {
            map.insert(ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        }
        map
    }

    #[test]
    fn missing_or_unknown_values_are_unauthorized() {
        for (user, role) in [(None, Some("admin")), (Some("admin"), None), (Some("admin"), Some("root"))] {
            assert!(matches!(
                SessionIdentity::from_headers(&headers(user, role)),
                Err(AppError::Unauthorized)
            ));
        }
    }

    #[test]
    fn identities_resolve_against_accounts() {
        let db = initial_data(&Clock::fixed("2024-05-20 09:00:00").unwrap());

        let admin = SessionIdentity::from_headers(&headers(Some("admin"), Some("admin"))).unwrap();
        assert_eq!(resolve_admin(&db, &admin).unwrap().id, "a1");

        let user = SessionIdentity::from_headers(&headers(Some("e2"), Some("user"))).unwrap();
        assert_eq!(resolve_user(&db, &user).unwrap().id, "usr2");

        let by_account = SessionIdentity::from_headers(&headers(Some("usr1"), Some("user"))).unwrap();
        assert_eq!(resolve_user(&db, &by_account).unwrap().employee_id, "e1");

        let stranger = SessionIdentity::from_headers(&headers(Some("e9"), Some("user"))).unwrap();
        assert!(matches!(resolve_user(&db, &stranger), Err(AppError::Unauthorized)));
    }

    #[test]
    fn wrong_portal_is_forbidden() {
        let db = initial_data(&Clock::fixed("2024-05-20 09:00:00").unwrap());
        let user = SessionIdentity::from_headers(&headers(Some("e1"), Some("user"))).unwrap();
        assert!(matches!(resolve_admin(&db, &user), Err(AppError::Forbidden(_))));

        let admin = SessionIdentity::from_headers(&headers(Some("a1"), Some("admin"))).unwrap();
        assert!(matches!(resolve_user(&db, &admin), Err(AppError::Forbidden(_))));
    }
}
