//! CRI runtime client.
//!
//! Thin request/response wrappers over [`CriTransport`]. Each operation
//! validates its identifiers, then makes exactly one remote call through
//! [`traced`]. Nothing is retried and no state is kept between calls.

use std::fmt::Debug;
use std::future::Future;

use tonic::Status;
use tracing::{field, Instrument, Span};

use vkcri_core::error::{CriError, Result};

use crate::cri_api::{
    Container, ContainerConfig, ContainerFilter, ContainerStatus, ContainerStatusRequest,
    CreateContainerRequest, ImageSpec, ListContainersRequest, ListPodSandboxRequest,
    PodSandbox, PodSandboxConfig, PodSandboxStatus, PodSandboxStatusRequest,
    PullImageRequest, RemovePodSandboxRequest, RunPodSandboxRequest, StartContainerRequest,
    StopPodSandboxRequest, VersionRequest, VersionResponse,
};
use crate::transport::CriTransport;

/// CRI API version requested by [`RuntimeClient::version`].
pub const CRI_API_VERSION: &str = "v1";

/// Run one remote call inside a `cri` debug span.
///
/// The span carries the operation name, the request and response are
/// logged at debug level, and a failure is recorded on the span before the
/// status is returned as [`CriError::Remote`].
pub async fn traced<Req, Resp, F, Fut>(op: &'static str, request: Req, call: F) -> Result<Resp>
where
    Req: Debug,
    Resp: Debug,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = std::result::Result<Resp, Status>>,
{
    let span = tracing::debug_span!("cri", otel.name = op, error = field::Empty);
    async move {
        tracing::debug!(request = ?request, "CRI request");
        match call(request).await {
            Ok(response) => {
                tracing::debug!(response = ?response, "CRI response");
                Ok(response)
            }
            Err(status) => {
                Span::current().record("error", field::display(&status));
                tracing::debug!(code = ?status.code(), detail = status.message(), "CRI call failed");
                Err(CriError::Remote(status))
            }
        }
    }
    .instrument(span)
    .await
}

fn require_id(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CriError::empty_id(what));
    }
    Ok(())
}

fn missing_status(op: &str) -> CriError {
    CriError::Remote(Status::internal(format!("{op}: response carried no status")))
}

/// Client for the CRI RuntimeService and ImageService.
pub struct RuntimeClient<T> {
    transport: T,
    runtime_handler: String,
}

impl<T: CriTransport> RuntimeClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            runtime_handler: String::new(),
        }
    }

    /// Runtime handler passed on sandbox creation. Empty means the
    /// runtime's default.
    pub fn with_runtime_handler(mut self, handler: impl Into<String>) -> Self {
        self.runtime_handler = handler.into();
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runtime name and versions.
    pub async fn version(&self) -> Result<VersionResponse> {
        let req = VersionRequest {
            version: CRI_API_VERSION.to_string(),
        };
        traced("cri.version", req, |r| self.transport.version(r)).await
    }

    /// Create and start a pod sandbox. Returns the runtime-assigned ID.
    pub async fn create_pod_sandbox(&self, config: PodSandboxConfig) -> Result<String> {
        let req = RunPodSandboxRequest {
            config: Some(config),
            runtime_handler: self.runtime_handler.clone(),
        };
        let resp = traced("cri.run_pod_sandbox", req, |r| {
            self.transport.run_pod_sandbox(r)
        })
        .await?;
        Ok(resp.pod_sandbox_id)
    }

    pub async fn stop_pod_sandbox(&self, sandbox_id: &str) -> Result<()> {
        require_id(sandbox_id, "sandbox ID")?;
        let req = StopPodSandboxRequest {
            pod_sandbox_id: sandbox_id.to_string(),
        };
        traced("cri.stop_pod_sandbox", req, |r| {
            self.transport.stop_pod_sandbox(r)
        })
        .await?;
        Ok(())
    }

    pub async fn remove_pod_sandbox(&self, sandbox_id: &str) -> Result<()> {
        require_id(sandbox_id, "sandbox ID")?;
        let req = RemovePodSandboxRequest {
            pod_sandbox_id: sandbox_id.to_string(),
        };
        traced("cri.remove_pod_sandbox", req, |r| {
            self.transport.remove_pod_sandbox(r)
        })
        .await?;
        Ok(())
    }

    /// Every sandbox the runtime knows about.
    pub async fn list_pod_sandboxes(&self) -> Result<Vec<PodSandbox>> {
        let resp = traced("cri.list_pod_sandbox", ListPodSandboxRequest::default(), |r| {
            self.transport.list_pod_sandbox(r)
        })
        .await?;
        Ok(resp.items)
    }

    pub async fn pod_sandbox_status(&self, sandbox_id: &str) -> Result<PodSandboxStatus> {
        require_id(sandbox_id, "sandbox ID")?;
        let req = PodSandboxStatusRequest {
            pod_sandbox_id: sandbox_id.to_string(),
            verbose: false,
        };
        let resp = traced("cri.pod_sandbox_status", req, |r| {
            self.transport.pod_sandbox_status(r)
        })
        .await?;
        resp.status
            .ok_or_else(|| missing_status("PodSandboxStatus"))
    }

    /// Create a container in `sandbox_id`. Returns the container ID.
    pub async fn create_container(
        &self,
        config: ContainerConfig,
        sandbox_config: PodSandboxConfig,
        sandbox_id: &str,
    ) -> Result<String> {
        let req = CreateContainerRequest {
            pod_sandbox_id: sandbox_id.to_string(),
            config: Some(config),
            sandbox_config: Some(sandbox_config),
        };
        let resp = traced("cri.create_container", req, |r| {
            self.transport.create_container(r)
        })
        .await?;
        Ok(resp.container_id)
    }

    pub async fn start_container(&self, container_id: &str) -> Result<()> {
        require_id(container_id, "container ID")?;
        let req = StartContainerRequest {
            container_id: container_id.to_string(),
        };
        traced("cri.start_container", req, |r| {
            self.transport.start_container(r)
        })
        .await?;
        Ok(())
    }

    pub async fn container_status(&self, container_id: &str) -> Result<ContainerStatus> {
        require_id(container_id, "container ID")?;
        let req = ContainerStatusRequest {
            container_id: container_id.to_string(),
            verbose: false,
        };
        let resp = traced("cri.container_status", req, |r| {
            self.transport.container_status(r)
        })
        .await?;
        resp.status
            .ok_or_else(|| missing_status("ContainerStatus"))
    }

    /// Containers belonging to `sandbox_id`.
    ///
    /// An empty ID is not rejected: the runtime treats an empty filter
    /// field as unset and returns every container.
    pub async fn list_containers_for_sandbox(&self, sandbox_id: &str) -> Result<Vec<Container>> {
        let req = ListContainersRequest {
            filter: Some(ContainerFilter {
                pod_sandbox_id: sandbox_id.to_string(),
                ..Default::default()
            }),
        };
        let resp = traced("cri.list_containers", req, |r| {
            self.transport.list_containers(r)
        })
        .await?;
        Ok(resp.containers)
    }

    /// Pull `image`. Returns the runtime's resolved image reference.
    pub async fn pull_image(&self, image: &str) -> Result<String> {
        require_id(image, "image reference")?;
        let req = PullImageRequest {
            image: Some(ImageSpec {
                image: image.to_string(),
                ..Default::default()
            }),
            auth: None,
            sandbox_config: None,
        };
        let resp = traced("cri.pull_image", req, |r| self.transport.pull_image(r)).await?;
        Ok(resp.image_ref)
    }
}
