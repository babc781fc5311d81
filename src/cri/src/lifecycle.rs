//! Pod lifecycle orchestration.
//!
//! Sequences translated configs through [`RuntimeClient`] calls. Every flow
//! is linear and stops at the first failing step; nothing already created
//! is rolled back.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tonic::Status;

use vkcri_core::error::{CriError, Result};
use vkcri_core::pod::PodDeclaration;
use vkcri_core::PlatformPaths;

use crate::client::RuntimeClient;
use crate::config_mapper::{build_container_config, build_pod_sandbox_config};
use crate::cri_api::{ContainerState, ContainerStatus, PodSandboxStatus};
use crate::transport::CriTransport;
use crate::volume::VolumeResolver;

/// A pod whose sandbox and containers are all started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningPod {
    pub sandbox_id: String,
    /// `(container name, container ID)` in declaration order.
    pub containers: Vec<(String, String)>,
}

/// Pod phase summarized from CRI container states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Status of a sandbox and everything running in it.
#[derive(Debug, Clone, Serialize)]
pub struct PodReport {
    pub phase: PodPhase,
    pub sandbox: PodSandboxStatus,
    pub containers: Vec<ContainerStatus>,
}

/// Derive a pod phase from its containers' statuses.
///
/// Unknown beats everything, then any container not yet started keeps the
/// pod pending, then any running container makes it running. Once every
/// container has exited the pod failed if any exit code was non-zero.
pub fn pod_phase(containers: &[ContainerStatus]) -> PodPhase {
    if containers.is_empty() {
        return PodPhase::Pending;
    }

    let state_of = |c: &ContainerStatus| {
        ContainerState::try_from(c.state).unwrap_or(ContainerState::ContainerUnknown)
    };
    let any = |wanted: ContainerState| containers.iter().any(|c| state_of(c) == wanted);

    if any(ContainerState::ContainerUnknown) {
        PodPhase::Unknown
    } else if any(ContainerState::ContainerCreated) {
        PodPhase::Pending
    } else if any(ContainerState::ContainerRunning) {
        PodPhase::Running
    } else if containers.iter().any(|c| c.exit_code != 0) {
        PodPhase::Failed
    } else {
        PodPhase::Succeeded
    }
}

/// Runs, tears down and describes pods against one CRI runtime.
pub struct PodLifecycle<T, R> {
    client: RuntimeClient<T>,
    resolver: R,
    paths: PlatformPaths,
    log_dir: PathBuf,
}

impl<T: CriTransport, R: VolumeResolver> PodLifecycle<T, R> {
    pub fn new(client: RuntimeClient<T>, resolver: R, paths: PlatformPaths, log_dir: PathBuf) -> Self {
        Self {
            client,
            resolver,
            paths,
            log_dir,
        }
    }

    pub fn client(&self) -> &RuntimeClient<T> {
        &self.client
    }

    /// Sandbox log directory: `<log_dir>/<namespace>_<name>_<uid>`.
    pub fn sandbox_log_dir(&self, pod: &PodDeclaration) -> PathBuf {
        self.log_dir.join(format!(
            "{}_{}_{}",
            pod.metadata.namespace, pod.metadata.name, pod.metadata.uid
        ))
    }

    /// Create the sandbox, then pull and configure every container, then
    /// create them all, then start them all.
    pub async fn run_pod(&self, pod: &PodDeclaration, attempt: u32) -> Result<RunningPod> {
        let pod_name = pod.full_name();
        tracing::info!(pod = %pod_name, attempt, "Running pod");

        let volume_root = self.paths.pod_volume_root(&pod.metadata.uid)?;
        let sandbox_config = build_pod_sandbox_config(pod, &self.sandbox_log_dir(pod), attempt);
        let sandbox_id = self.client.create_pod_sandbox(sandbox_config.clone()).await?;
        if sandbox_id.is_empty() {
            return Err(CriError::Remote(Status::internal(
                "RunPodSandbox returned an empty sandbox ID",
            )));
        }
        tracing::info!(pod = %pod_name, sandbox_id = %sandbox_id, "Pod sandbox created");

        let mut configs = Vec::with_capacity(pod.spec.containers.len());
        for container in &pod.spec.containers {
            let image_ref = self.client.pull_image(&container.image).await?;
            tracing::debug!(container = %container.name, image_ref = %image_ref, "Image pulled");
            let config = build_container_config(
                container,
                pod,
                &image_ref,
                &volume_root,
                attempt,
                &self.resolver,
            )?;
            configs.push((container.name.clone(), config));
        }

        let mut containers = Vec::with_capacity(configs.len());
        for (name, config) in configs {
            let id = self
                .client
                .create_container(config, sandbox_config.clone(), &sandbox_id)
                .await?;
            tracing::debug!(container = %name, container_id = %id, "Container created");
            containers.push((name, id));
        }

        for (name, id) in &containers {
            self.client.start_container(id).await?;
            tracing::info!(pod = %pod_name, container = %name, container_id = %id, "Container started");
        }

        Ok(RunningPod {
            sandbox_id,
            containers,
        })
    }

    /// Stop the sandbox, then remove it.
    pub async fn teardown(&self, sandbox_id: &str) -> Result<()> {
        tracing::info!(sandbox_id = %sandbox_id, "Tearing down pod");
        self.client.stop_pod_sandbox(sandbox_id).await?;
        self.client.remove_pod_sandbox(sandbox_id).await?;
        Ok(())
    }

    /// Sandbox status plus the status of each of its containers.
    pub async fn describe(&self, sandbox_id: &str) -> Result<PodReport> {
        let sandbox = self.client.pod_sandbox_status(sandbox_id).await?;

        let listed = self.client.list_containers_for_sandbox(sandbox_id).await?;
        let mut containers = Vec::with_capacity(listed.len());
        for container in &listed {
            containers.push(self.client.container_status(&container.id).await?);
        }

        Ok(PodReport {
            phase: pod_phase(&containers),
            sandbox,
            containers,
        })
    }
}
