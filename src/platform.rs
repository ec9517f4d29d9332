//! The platform module holds the typed requests for the integration
//! platform's connector-creation helper and a thin HTTP client for
//! dispatching them. Every remote function gets its own request struct
//! with a fixed field set, validated before dispatch, instead of a
//! free-form JSON argument bag.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use serde::Serialize;
use serde_json::json;

use crate::auth::AuthSpec;
use crate::constants::{
    PLATFORM_HOST_ENV_NAME, PLATFORM_SPACE_ID_ENV_NAME, PLATFORM_TOKEN_ENV_NAME,
};

/// Creates a connector group with its authentication configuration.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub auth: AuthSpec,
}

impl CreateGroupRequest {
    /// # Errors
    ///
    /// Returns an error when the group name is empty or contains
    /// whitespace (group names are single words on the platform), or
    /// when the auth spec violates its own invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("connector group name must not be empty");
        }
        if self.name.contains(char::is_whitespace) {
            bail!("connector group name must be a single word: {:?}", self.name);
        }
        self.auth.validate()
    }
}

/// Creates one endpoint under an existing connector group from a
/// normalized cURL command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEndpointRequest {
    pub name: String,
    pub curl: String,
    pub connector_group_id: String,
}

impl CreateEndpointRequest {
    /// # Errors
    ///
    /// Returns an error when any field is empty; commands reach this
    /// type only after normalization, so grammar violations are a bug
    /// upstream, not re-checked here.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("endpoint name must not be empty");
        }
        if self.curl.trim().is_empty() {
            bail!("endpoint command must not be empty");
        }
        if self.connector_group_id.trim().is_empty() {
            bail!("connector group id must not be empty");
        }
        Ok(())
    }
}

/// Creates a connector backed by a server-side Python function instead
/// of a cURL command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePythonConnectorRequest {
    pub name: String,
    pub python_code: String,
    pub input_schema: serde_json::Value,
    pub connector_group_id: String,
}

impl CreatePythonConnectorRequest {
    /// # Errors
    ///
    /// Returns an error when the code is empty, the schema is not a
    /// JSON object, or the group id is missing. The platform rejects
    /// schema-less functions, so that is caught before dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.python_code.trim().is_empty() {
            bail!("python connector requires a function body");
        }
        if !self.input_schema.is_object() {
            bail!("python connector requires an object input schema");
        }
        if self.connector_group_id.trim().is_empty() {
            bail!("connector group id must not be empty");
        }
        Ok(())
    }
}

/// Client for the platform's connector-creation helper endpoint.
///
/// The bearer token comes from the environment; token exchange and
/// refresh are the platform tooling's job, not this client's.
pub struct PlatformClient {
    http: reqwest::Client,
    host: String,
    space_id: String,
    token: String,
}

impl PlatformClient {
    /// Builds a client from the `DOCFORGE_PLATFORM_*` environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the host, space id or token variable is
    /// unset.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var(PLATFORM_HOST_ENV_NAME)
            .with_context(|| format!("{PLATFORM_HOST_ENV_NAME} is not set"))?;
        let space_id = std::env::var(PLATFORM_SPACE_ID_ENV_NAME)
            .with_context(|| format!("{PLATFORM_SPACE_ID_ENV_NAME} is not set"))?;
        let token = std::env::var(PLATFORM_TOKEN_ENV_NAME)
            .with_context(|| format!("{PLATFORM_TOKEN_ENV_NAME} is not set"))?;

        Ok(Self {
            http: reqwest::Client::new(),
            host,
            space_id,
            token,
        })
    }

    /// Creates a connector group and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the request fails, or the
    /// response carries no group id.
    pub async fn create_group(&self, request: &CreateGroupRequest) -> Result<String> {
        request.validate()?;
        let response = self
            .call("create_connector_group", serde_json::to_value(request)?)
            .await?;

        let group_id = response
            .get("connectorGroupId")
            .or_else(|| response.get("id"))
            .and_then(|value| value.as_str())
            .ok_or_else(|| anyhow!("platform response carries no connector group id"))?;

        info!("Created connector group {} ({group_id})", request.name);
        Ok(group_id.to_string())
    }

    /// Creates one endpoint under a connector group.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the request fails.
    pub async fn create_endpoint(&self, request: &CreateEndpointRequest) -> Result<()> {
        request.validate()?;
        self.call(
            "create_connector_endpoint_under_group",
            serde_json::to_value(request)?,
        )
        .await?;
        info!("Created endpoint {}", request.name);
        Ok(())
    }

    /// Creates a Python-function connector under a connector group.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the request fails.
    pub async fn create_python_connector(
        &self,
        request: &CreatePythonConnectorRequest,
    ) -> Result<()> {
        request.validate()?;
        self.call(
            "create_connector_from_python_function",
            serde_json::to_value(request)?,
        )
        .await?;
        info!("Created python connector {}", request.name);
        Ok(())
    }

    /// POSTs one helper invocation; the wire envelope is
    /// `{"input": {"function": ..., "arguments": ...}}` plus the space
    /// headers the platform routes on.
    async fn call(&self, function: &str, arguments: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("https://{}/api/v1/connectorCreationHelper", self.host);
        let payload = json!({
            "input": {
                "clientId": self.space_id,
                "env": self.host,
                "function": function,
                "arguments": arguments,
                "data": {}
            }
        });

        debug!("Calling platform function {function}");
        let response = self
            .http
            .post(&url)
            .header("x-fastn-space-id", &self.space_id)
            .header("x-fastn-space-tenantid", "")
            .header("stage", "DRAFT")
            .header("x-fastn-custom-auth", "true")
            .header("authorization", &self.token)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("platform call {function} failed to send"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("platform call {function} failed: {status} {body}");
        }

        response
            .json()
            .await
            .with_context(|| format!("platform call {function} returned invalid JSON"))
    }
}
