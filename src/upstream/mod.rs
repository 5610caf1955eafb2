pub mod area_paths;
pub mod relations;
pub mod transport;
pub mod work_items;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::model::credential::Credential;
use crate::model::work_item::UpdateOperation;
use transport::{dispatch, Method, RequestBody, Transport, UpstreamRequest, UpstreamResponse};

/// Every upstream call pins this API version.
pub const API_VERSION: &str = "6.0";

pub const DEFAULT_HOST: &str = "dev.azure.com";

/// Connection parameters shared by every client handle.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub host: String,
    pub timeout: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// An authenticated client bound to one organization and project.
pub struct ClientHandle {
    credential: Credential,
    host: String,
    base_url: String,
    auth_header: String,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl ClientHandle {
    pub fn new(
        credential: Credential,
        settings: &UpstreamSettings,
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
    ) -> Self {
        let base_url = format!(
            "https://{}/{}/{}/_apis",
            settings.host,
            urlencoding::encode(credential.organization()),
            urlencoding::encode(credential.project()),
        );
        let auth_header = credential.basic_auth_header();
        Self {
            credential,
            host: settings.host.clone(),
            base_url,
            auth_header,
            timeout: settings.timeout,
            transport,
            cancel,
        }
    }

    pub fn organization(&self) -> &str {
        self.credential.organization()
    }

    pub fn project(&self) -> &str {
        self.credential.project()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Aborts every in-flight and future call made through this handle.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn org_url(&self) -> String {
        format!(
            "https://{}/{}/_apis",
            self.host,
            urlencoding::encode(self.organization())
        )
    }

    /// Checks the PAT, organization and project against the upstream.
    ///
    /// Rejections come back as [`AdapterError::AuthRejected`] with a message
    /// naming what was wrong; connection failures keep their own kind.
    pub async fn validate(&self) -> Result<()> {
        let projects_url = format!("{}/projects?api-version={API_VERSION}", self.org_url());
        self.send(Method::Get, projects_url, None, "connect to Azure DevOps")
            .await
            .map_err(|err| match status_of(&err) {
                Some((401, _)) => AdapterError::auth("invalid Personal Access Token"),
                Some((404, _)) => AdapterError::auth(format!(
                    "organization '{}' not found",
                    self.organization()
                )),
                Some((_, status)) => {
                    AdapterError::auth(format!("authentication failed: {status}"))
                }
                None => err,
            })?;

        let project_url = format!(
            "{}/projects/{}?api-version={API_VERSION}",
            self.org_url(),
            urlencoding::encode(self.project())
        );
        self.send(Method::Get, project_url, None, "validate project access")
            .await
            .map_err(|err| match status_of(&err) {
                Some((404, _)) => AdapterError::auth(format!(
                    "project '{}' not found or access denied",
                    self.project()
                )),
                Some((_, status)) => {
                    AdapterError::auth(format!("project validation failed: {status}"))
                }
                None => err,
            })?;

        Ok(())
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<RequestBody>,
        phase: &'static str,
    ) -> Result<UpstreamResponse> {
        let request = UpstreamRequest {
            method,
            url,
            authorization: self.auth_header.clone(),
            body,
            phase,
        };
        dispatch(self.transport.as_ref(), request, self.timeout, &self.cancel).await
    }

    /// Submits `ops` as one JSON patch document.
    pub(crate) async fn patch(
        &self,
        method: Method,
        url: String,
        ops: &[UpdateOperation],
        phase: &'static str,
    ) -> Result<UpstreamResponse> {
        for op in ops {
            debug!(op = %op.op, path = %op.path, phase, "patch operation");
        }
        let body = serde_json::to_value(ops).map_err(|e| AdapterError::decode(phase, e))?;
        self.send(method, url, Some(RequestBody::Patch(body)), phase).await
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn status_of(err: &AdapterError) -> Option<(u16, String)> {
    match err {
        AdapterError::UpstreamStatus { status, .. } => Some((err.status_code()?, status.clone())),
        _ => None,
    }
}
