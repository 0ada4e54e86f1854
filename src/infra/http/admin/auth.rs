use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::entities::UserId;

use super::AdminState;
use super::errors::AdminApiError;

/// The acting admin user, identified by the trusted header the upstream
/// authentication layer sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminUser(pub UserId);

impl FromRequestParts<AdminState> for AdminUser {
    type Rejection = AdminApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AdminState,
    ) -> Result<Self, Self::Rejection> {
        let header = &state.user_header;
        let value = parts
            .headers
            .get(header)
            .ok_or_else(|| AdminApiError::unauthorized(format!("missing `{header}` header")))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<UserId>().ok())
            .filter(|id| *id > 0)
            .map(AdminUser)
            .ok_or_else(|| AdminApiError::unauthorized(format!("malformed `{header}` header")))
    }
}
