//! The auth module models the authentication configuration a connector
//! group carries on the platform. The wire shape is always
//! `{"type": ..., "details": {...}}` with a closed field set per type;
//! field names are case-sensitive on the platform side, so they are
//! fixed here as serde renames rather than free-form JSON.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// How the platform authenticates calls made through a connector group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "camelCase")]
pub enum AuthSpec {
    Oauth(OauthDetails),
    Basic(BasicDetails),
    ApiKey(ApiKeyDetails),
    BearerToken(BearerTokenDetails),
    CustomInput(CustomInputDetails),
    None,
}

impl AuthSpec {
    /// Checks the never-empty-details invariant: every type except
    /// `none` must carry at least one input field.
    ///
    /// # Errors
    ///
    /// Returns an error when a `customInput` spec has no fields.
    pub fn validate(&self) -> Result<()> {
        if let Self::CustomInput(details) = self
            && details.fields.is_empty()
        {
            bail!("customInput auth requires at least one input field");
        }
        Ok(())
    }

    /// The bearer-token shape the platform expects: an `access_token`
    /// password field plus the hidden `expires_in` stub.
    pub fn bearer_token() -> Self {
        Self::BearerToken(BearerTokenDetails {
            access_token: AuthField::required("Token").password(),
            expires_in: AuthField::expires_in(),
        })
    }

    pub fn api_key() -> Self {
        Self::ApiKey(ApiKeyDetails {
            api_key_name: AuthField::required("Key").with_default("key"),
            api_key_value: AuthField::required("Value").password(),
        })
    }

    pub fn basic() -> Self {
        Self::Basic(BasicDetails {
            user_name: AuthField::required("Username"),
            password: AuthField::required("Password").password(),
        })
    }

    /// A custom-input spec from named fields; the hidden `expires_in`
    /// stub the platform expects is appended automatically.
    pub fn custom_input(fields: impl IntoIterator<Item = (String, AuthField)>) -> Self {
        let mut map: BTreeMap<String, AuthField> = fields.into_iter().collect();
        map.insert("expires_in".to_string(), AuthField::expires_in());
        Self::CustomInput(CustomInputDetails { fields: map })
    }
}

/// Value kinds the platform renders differently in its input forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Password,
    Number,
}

/// One input field of an auth `details` object. Only the attributes
/// actually set are serialized; the platform treats absent and false
/// differently for `hidden`/`disabled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl AuthField {
    pub fn required(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            required: Some(true),
            ..Self::default()
        }
    }

    pub fn optional(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Self::default()
        }
    }

    pub fn password(mut self) -> Self {
        self.kind = Some(FieldKind::Password);
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default = Some(serde_json::Value::String(value.to_string()));
        self
    }

    /// The hidden token-lifetime stub every non-oauth example carries.
    pub fn expires_in() -> Self {
        Self {
            kind: Some(FieldKind::Number),
            default: Some(serde_json::Value::from(100_000)),
            hidden: Some(true),
            disabled: Some(true),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicDetails {
    #[serde(rename = "userName")]
    pub user_name: AuthField,
    pub password: AuthField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyDetails {
    pub api_key_name: AuthField,
    pub api_key_value: AuthField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearerTokenDetails {
    pub access_token: AuthField,
    pub expires_in: AuthField,
}

/// Free-form field set for platforms whose auth is neither OAuth nor a
/// single key, e.g. instance name + username + password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomInputDetails {
    #[serde(flatten)]
    pub fields: BTreeMap<String, AuthField>,
}

/// OAuth 2.0 configuration: the authorize endpoint, client credentials
/// and the grant block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OauthDetails {
    pub base_url: String,
    pub client_id: String,
    pub secret: String,
    pub params: BTreeMap<String, String>,
    pub required_attributes: Vec<String>,
    pub tenant_id: String,
    pub authorization: OauthGrant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OauthGrant {
    pub oauth_grant_type: String,
    pub access_token_url: String,
    pub refresh_token_grant_type: String,
}
