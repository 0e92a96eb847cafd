//! Client resources
//!
//! Clients are managed like roles: declared scopes, merged by union. Access
//! tokens are not handled here; where a client is needed, reset its token
//! manually and distribute the result out of band. Managed clients never
//! expire.

use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, ResourceResult};
use crate::scopes;

use super::resource::FieldValue;
use super::{normalize_description, normalize_scope_list, EXPIRES_FOREVER};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub client_id: String,
    pub description: String,
    pub scopes: Vec<String>,
}

impl Client {
    pub fn new(client_id: impl Into<String>, description: &str, scopes: Vec<String>) -> Self {
        Self {
            client_id: client_id.into(),
            description: normalize_description(description),
            scopes: normalize_scope_list(scopes),
        }
    }

    pub(crate) fn normalized(self) -> Self {
        Self {
            client_id: self.client_id,
            description: normalize_description(&self.description),
            scopes: normalize_scope_list(self.scopes),
        }
    }

    /// Merge with another declaration of the same client
    pub fn merge(&self, other: &Client) -> ResourceResult<Client> {
        debug_assert_eq!(self.client_id, other.client_id);
        if self.description != other.description {
            return Err(ResourceError::MergeConflict {
                id: format!("Client={}", self.client_id),
                field: "description",
            });
        }
        let mut scopes = self.scopes.clone();
        scopes.extend(other.scopes.iter().cloned());
        Ok(Client {
            client_id: self.client_id.clone(),
            description: self.description.clone(),
            scopes: scopes::normalize_scopes(scopes),
        })
    }

    /// Payload for the auth service's create/update client endpoints
    pub fn to_api(&self) -> serde_json::Value {
        serde_json::json!({
            "description": self.description,
            "scopes": self.scopes,
            "expires": EXPIRES_FOREVER,
            "deleteOnExpiration": false,
        })
    }

    pub(crate) fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("clientId", FieldValue::Text(self.client_id.clone())),
            ("description", FieldValue::Text(self.description.clone())),
            ("scopes", FieldValue::List(self.scopes.clone())),
        ]
    }
}
