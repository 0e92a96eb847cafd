//! Role resources
//!
//! A role grants its scopes to anything holding `assume:<roleId>`. Roles are
//! the main unit of access control, so they are also the kind most often
//! declared in several places at once; same-id declarations merge by scope
//! union.

use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, ResourceResult};
use crate::scopes;

use super::resource::FieldValue;
use super::{normalize_description, normalize_scope_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_id: String,
    pub description: String,
    pub scopes: Vec<String>,
}

impl Role {
    pub fn new(role_id: impl Into<String>, description: &str, scopes: Vec<String>) -> Self {
        Self {
            role_id: role_id.into(),
            description: normalize_description(description),
            scopes: normalize_scope_list(scopes),
        }
    }

    pub(crate) fn normalized(self) -> Self {
        Self {
            role_id: self.role_id,
            description: normalize_description(&self.description),
            scopes: normalize_scope_list(self.scopes),
        }
    }

    /// Merge with another declaration of the same role
    pub fn merge(&self, other: &Role) -> ResourceResult<Role> {
        debug_assert_eq!(self.role_id, other.role_id);
        if self.description != other.description {
            return Err(ResourceError::MergeConflict {
                id: format!("Role={}", self.role_id),
                field: "description",
            });
        }
        let mut scopes = self.scopes.clone();
        scopes.extend(other.scopes.iter().cloned());
        Ok(Role {
            role_id: self.role_id.clone(),
            description: self.description.clone(),
            scopes: scopes::normalize_scopes(scopes),
        })
    }

    /// Payload for the auth service's create/update role endpoints
    pub fn to_api(&self) -> serde_json::Value {
        serde_json::json!({
            "description": self.description,
            "scopes": self.scopes,
        })
    }

    pub(crate) fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("roleId", FieldValue::Text(self.role_id.clone())),
            ("description", FieldValue::Text(self.description.clone())),
            ("scopes", FieldValue::List(self.scopes.clone())),
        ]
    }
}
