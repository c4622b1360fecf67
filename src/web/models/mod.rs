use serde::{Deserialize, Serialize};

use crate::db::enums::Role;
use crate::services::auth_service::Claims;

/// The caller, as established by the auth middleware.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub name: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        AuthenticatedUser {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
            name: claims.name,
        }
    }
}

/// `?page=&limit=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn page_request(&self) -> crate::db::services::PageRequest {
        crate::db::services::PageRequest::new(self.page, self.limit)
    }
}

/// Shared body of the admin status/memo edit on leads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdateRequest<S> {
    pub status: Option<S>,
    pub admin_memo: Option<String>,
}
