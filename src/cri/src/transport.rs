//! Transport to a CRI runtime.
//!
//! [`CriTransport`] is one method per CRI RPC the client issues. The
//! production implementation speaks gRPC over the runtime's Unix socket;
//! tests substitute an in-memory runtime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tonic::Status;
use tower::service_fn;

use vkcri_core::error::{CriError, Result};

use crate::cri_api::image_service_client::ImageServiceClient;
use crate::cri_api::runtime_service_client::RuntimeServiceClient;
use crate::cri_api::{
    ContainerStatusRequest, ContainerStatusResponse, CreateContainerRequest,
    CreateContainerResponse, ListContainersRequest, ListContainersResponse,
    ListPodSandboxRequest, ListPodSandboxResponse, PodSandboxStatusRequest,
    PodSandboxStatusResponse, PullImageRequest, PullImageResponse, RemovePodSandboxRequest,
    RemovePodSandboxResponse, RunPodSandboxRequest, RunPodSandboxResponse,
    StartContainerRequest, StartContainerResponse, StopPodSandboxRequest,
    StopPodSandboxResponse, VersionRequest, VersionResponse,
};

/// One call per CRI RPC. Errors are the runtime's status, untouched.
#[async_trait]
pub trait CriTransport: Send + Sync {
    async fn version(&self, req: VersionRequest) -> std::result::Result<VersionResponse, Status>;

    async fn run_pod_sandbox(
        &self,
        req: RunPodSandboxRequest,
    ) -> std::result::Result<RunPodSandboxResponse, Status>;

    async fn stop_pod_sandbox(
        &self,
        req: StopPodSandboxRequest,
    ) -> std::result::Result<StopPodSandboxResponse, Status>;

    async fn remove_pod_sandbox(
        &self,
        req: RemovePodSandboxRequest,
    ) -> std::result::Result<RemovePodSandboxResponse, Status>;

    async fn pod_sandbox_status(
        &self,
        req: PodSandboxStatusRequest,
    ) -> std::result::Result<PodSandboxStatusResponse, Status>;

    async fn list_pod_sandbox(
        &self,
        req: ListPodSandboxRequest,
    ) -> std::result::Result<ListPodSandboxResponse, Status>;

    async fn create_container(
        &self,
        req: CreateContainerRequest,
    ) -> std::result::Result<CreateContainerResponse, Status>;

    async fn start_container(
        &self,
        req: StartContainerRequest,
    ) -> std::result::Result<StartContainerResponse, Status>;

    async fn list_containers(
        &self,
        req: ListContainersRequest,
    ) -> std::result::Result<ListContainersResponse, Status>;

    async fn container_status(
        &self,
        req: ContainerStatusRequest,
    ) -> std::result::Result<ContainerStatusResponse, Status>;

    async fn pull_image(
        &self,
        req: PullImageRequest,
    ) -> std::result::Result<PullImageResponse, Status>;
}

/// gRPC transport over a Unix domain socket.
///
/// Both service clients share one channel. Clients are cheap to clone, so
/// each call works on its own copy and `&self` is enough.
#[derive(Clone)]
pub struct GrpcTransport {
    runtime: RuntimeServiceClient<Channel>,
    image: ImageServiceClient<Channel>,
}

impl GrpcTransport {
    /// Connect to the runtime listening on `socket_path`.
    pub async fn connect(socket_path: &Path, timeout: Duration) -> Result<Self> {
        let path: PathBuf = socket_path.to_path_buf();
        tracing::debug!(socket = %path.display(), "Connecting to CRI runtime");

        // The URI is required by tonic but ignored by the connector.
        let channel = Endpoint::try_from("http://[::]:50051")
            .map_err(|e| CriError::Transport(e.to_string()))?
            .connect_timeout(timeout)
            .connect_with_connector(service_fn(move |_: Uri| {
                UnixStream::connect(path.clone())
            }))
            .await
            .map_err(|e| {
                CriError::Transport(format!(
                    "cannot connect to {}: {}",
                    socket_path.display(),
                    e
                ))
            })?;

        Ok(Self::from_channel(channel))
    }

    pub fn from_channel(channel: Channel) -> Self {
        Self {
            runtime: RuntimeServiceClient::new(channel.clone()),
            image: ImageServiceClient::new(channel),
        }
    }
}

#[async_trait]
impl CriTransport for GrpcTransport {
    async fn version(&self, req: VersionRequest) -> std::result::Result<VersionResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.version(req).await?.into_inner())
    }

    async fn run_pod_sandbox(
        &self,
        req: RunPodSandboxRequest,
    ) -> std::result::Result<RunPodSandboxResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.run_pod_sandbox(req).await?.into_inner())
    }

    async fn stop_pod_sandbox(
        &self,
        req: StopPodSandboxRequest,
    ) -> std::result::Result<StopPodSandboxResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.stop_pod_sandbox(req).await?.into_inner())
    }

    async fn remove_pod_sandbox(
        &self,
        req: RemovePodSandboxRequest,
    ) -> std::result::Result<RemovePodSandboxResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.remove_pod_sandbox(req).await?.into_inner())
    }

    async fn pod_sandbox_status(
        &self,
        req: PodSandboxStatusRequest,
    ) -> std::result::Result<PodSandboxStatusResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.pod_sandbox_status(req).await?.into_inner())
    }

    async fn list_pod_sandbox(
        &self,
        req: ListPodSandboxRequest,
    ) -> std::result::Result<ListPodSandboxResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.list_pod_sandbox(req).await?.into_inner())
    }

    async fn create_container(
        &self,
        req: CreateContainerRequest,
    ) -> std::result::Result<CreateContainerResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.create_container(req).await?.into_inner())
    }

    async fn start_container(
        &self,
        req: StartContainerRequest,
    ) -> std::result::Result<StartContainerResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.start_container(req).await?.into_inner())
    }

    async fn list_containers(
        &self,
        req: ListContainersRequest,
    ) -> std::result::Result<ListContainersResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.list_containers(req).await?.into_inner())
    }

    async fn container_status(
        &self,
        req: ContainerStatusRequest,
    ) -> std::result::Result<ContainerStatusResponse, Status> {
        let mut client = self.runtime.clone();
        Ok(client.container_status(req).await?.into_inner())
    }

    async fn pull_image(
        &self,
        req: PullImageRequest,
    ) -> std::result::Result<PullImageResponse, Status> {
        let mut client = self.image.clone();
        Ok(client.pull_image(req).await?.into_inner())
    }
}
