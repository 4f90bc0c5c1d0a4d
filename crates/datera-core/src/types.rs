//! Response envelopes of the Datera management API.
//!
//! Every call returns its payload wrapped in an envelope that also carries
//! version, tenant and pagination metadata.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Metadata key holding the total number of items a list call can return.
pub const TOTAL_COUNT_KEY: &str = "total_count";

/// Envelope around a single resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiOuter {
    /// Resource fields
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    /// API version that served the request
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Protocol metadata
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Server processing time
    #[serde(default, skip_serializing_if = "is_zero")]
    pub request_time: i64,
    /// Tenant the request was served under
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    /// Request path echoed back by the server
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl ApiOuter {
    /// Decode the resource fields into a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ParseError`] if the data does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Returns a single field of the resource.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Envelope around a list of resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiListOuter {
    /// Resources, in server order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Value>,
    /// API version that served the request
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Protocol metadata (including `total_count`)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Server processing time
    #[serde(default, skip_serializing_if = "is_zero")]
    pub request_time: i64,
    /// Tenant the request was served under
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    /// Request path echoed back by the server
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl ApiListOuter {
    /// Total number of items reported by the server, if present.
    #[must_use]
    pub fn total_count(&self) -> Option<usize> {
        let value = self.metadata.get(TOTAL_COUNT_KEY)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .and_then(|v| usize::try_from(v).ok())
    }

    /// Returns true if the server reported fewer items than it holds.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.total_count()
            .is_some_and(|total| self.data.len() < total)
    }

    /// Decode every item into a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ParseError`] if any item does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.data
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(Into::into))
            .collect()
    }
}

/// Login response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLogin {
    /// Session key to present as `Auth-Token`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// API version that served the login
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Server processing time
    #[serde(default, skip_serializing_if = "is_zero")]
    pub request_time: i64,
}

/// Login request body.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    /// Account name
    pub name: String,
    /// Account password
    pub password: String,
    /// LDAP server to authenticate against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_server: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("name", &self.name)
            .field("password", &"********")
            .field("remote_server", &self.remote_server)
            .finish()
    }
}

/// Versions supported by the appliance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersions {
    /// Supported API versions (e.g. `"2.2"`)
    #[serde(default)]
    pub api_versions: Vec<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_total_count_accepts_integer_and_float() {
        let mut outer = ApiListOuter::default();
        outer.metadata.insert(TOTAL_COUNT_KEY.into(), json!(120));
        assert_eq!(outer.total_count(), Some(120));

        outer.metadata.insert(TOTAL_COUNT_KEY.into(), json!(120.0));
        assert_eq!(outer.total_count(), Some(120));

        outer.metadata.insert(TOTAL_COUNT_KEY.into(), json!("many"));
        assert_eq!(outer.total_count(), None);
    }

    #[test]
    fn list_is_partial() {
        let outer: ApiListOuter = serde_json::from_value(json!({
            "data": [{"name": "a"}, {"name": "b"}],
            "metadata": {"total_count": 3}
        }))
        .unwrap();
        assert!(outer.is_partial());

        let outer: ApiListOuter = serde_json::from_value(json!({
            "data": [{"name": "a"}]
        }))
        .unwrap();
        assert!(!outer.is_partial());
    }

    #[test]
    fn outer_decode_into_model() {
        #[derive(Deserialize)]
        struct System {
            sw_version: String,
        }

        let outer: ApiOuter = serde_json::from_value(json!({
            "data": {"sw_version": "3.3.5", "name": "cluster-1"},
            "version": "v2.2",
            "tenant": "/root"
        }))
        .unwrap();

        let system: System = outer.decode().unwrap();
        assert_eq!(system.sw_version, "3.3.5");
        assert_eq!(outer.field("name"), Some(&json!("cluster-1")));
    }

    #[test]
    fn login_request_skips_missing_ldap_and_hides_password() {
        let request = LoginRequest {
            name: "admin".into(),
            password: "hunter2".into(),
            remote_server: None,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"name": "admin", "password": "hunter2"}));
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
