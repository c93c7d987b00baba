use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{Authorization, authorization::Bearer};

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::{AppState, DEV_SESSION_KEY};
use crate::session::Session;

/// The caller's session, resolved from `Authorization: Bearer <token>`.
/// `session` is a snapshot; mutations go through `AppState::with_session`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session_key: String,
    pub session: Session,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .ok();

            let session_key = match bearer {
                Some(TypedHeader(authz)) => hash_access_token(authz.token()),
                None if state.auth_bypass => {
                    state.ensure_dev_session().await;
                    DEV_SESSION_KEY.to_string()
                }
                None => return Err(ApiError::session_expired()),
            };

            let mut sessions = state.sessions.write().await;
            let session = sessions
                .get(&session_key)
                .cloned()
                .ok_or_else(ApiError::session_expired)?;

            if session.is_expired(Utc::now()) {
                sessions.remove(&session_key);
                tracing::info!(user = %session.user.email, "session expired");
                return Err(ApiError::session_expired());
            }

            Ok(AuthContext {
                session_key,
                session,
            })
        }
    }
}
