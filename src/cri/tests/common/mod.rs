//! In-memory CRI runtime for integration tests.
//!
//! Keeps sandboxes and containers in `RwLock` maps and records the name of
//! every RPC it receives, in order.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tonic::Status;

use vkcri::cri_api::*;
use vkcri::{CriTransport, HostVolumeResolver, PodLifecycle, RuntimeClient, StaticResources};
use vkcri_core::PlatformPaths;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub status: ContainerStatus,
    pub sandbox_id: String,
    pub config: ContainerConfig,
}

#[derive(Default)]
struct State {
    sandboxes: RwLock<BTreeMap<String, PodSandboxStatus>>,
    containers: RwLock<BTreeMap<String, FakeContainer>>,
    calls: Mutex<Vec<&'static str>>,
    fail_on: Mutex<HashSet<&'static str>>,
    missing_images: Mutex<HashSet<String>>,
    empty_sandbox_id: Mutex<bool>,
    next_id: AtomicU64,
}

/// Cloneable handle; clones share state.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<State>,
}

fn now_ns() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of `op` with `UNAVAILABLE`.
    pub fn fail_on(&self, op: &'static str) {
        self.state.fail_on.lock().unwrap().insert(op);
    }

    /// Make pulls of `image` fail with `NOT_FOUND`.
    pub fn missing_image(&self, image: &str) {
        self.state
            .missing_images
            .lock()
            .unwrap()
            .insert(image.to_string());
    }

    /// Answer RunPodSandbox with an empty ID.
    pub fn return_empty_sandbox_id(&self) {
        *self.state.empty_sandbox_id.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.calls.lock().unwrap().clone()
    }

    pub async fn sandbox_count(&self) -> usize {
        self.state.sandboxes.read().await.len()
    }

    pub async fn container(&self, id: &str) -> Option<FakeContainer> {
        self.state.containers.read().await.get(id).cloned()
    }

    /// Mark a container exited with `exit_code`.
    pub async fn exit_container(&self, id: &str, exit_code: i32) {
        if let Some(c) = self.state.containers.write().await.get_mut(id) {
            c.status.state = ContainerState::ContainerExited.into();
            c.status.finished_at = now_ns();
            c.status.exit_code = exit_code;
        }
    }

    fn record(&self, op: &'static str) -> Result<(), Status> {
        self.state.calls.lock().unwrap().push(op);
        if self.state.fail_on.lock().unwrap().contains(op) {
            return Err(Status::unavailable(format!("{op}: runtime unavailable")));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n:04}")
    }
}

#[async_trait]
impl CriTransport for FakeRuntime {
    async fn version(&self, req: VersionRequest) -> Result<VersionResponse, Status> {
        self.record("version")?;
        Ok(VersionResponse {
            version: req.version,
            runtime_name: "fake-runtime".to_string(),
            runtime_version: "0.0.1".to_string(),
            runtime_api_version: "v1".to_string(),
        })
    }

    async fn run_pod_sandbox(
        &self,
        req: RunPodSandboxRequest,
    ) -> Result<RunPodSandboxResponse, Status> {
        self.record("run_pod_sandbox")?;
        let config = req
            .config
            .ok_or_else(|| Status::invalid_argument("sandbox config required"))?;

        if *self.state.empty_sandbox_id.lock().unwrap() {
            return Ok(RunPodSandboxResponse::default());
        }

        let id = self.next_id("sb");
        let status = PodSandboxStatus {
            id: id.clone(),
            metadata: config.metadata,
            state: PodSandboxState::SandboxReady.into(),
            created_at: now_ns(),
            network: Some(PodSandboxNetworkStatus {
                ip: "10.88.0.2".to_string(),
                additional_ips: vec![],
            }),
            labels: config.labels,
            annotations: config.annotations,
            runtime_handler: req.runtime_handler,
        };
        self.state.sandboxes.write().await.insert(id.clone(), status);
        Ok(RunPodSandboxResponse { pod_sandbox_id: id })
    }

    async fn stop_pod_sandbox(
        &self,
        req: StopPodSandboxRequest,
    ) -> Result<StopPodSandboxResponse, Status> {
        self.record("stop_pod_sandbox")?;
        let mut sandboxes = self.state.sandboxes.write().await;
        let sandbox = sandboxes
            .get_mut(&req.pod_sandbox_id)
            .ok_or_else(|| Status::not_found(format!("sandbox {} not found", req.pod_sandbox_id)))?;
        sandbox.state = PodSandboxState::SandboxNotready.into();

        let mut containers = self.state.containers.write().await;
        for c in containers.values_mut() {
            if c.sandbox_id == req.pod_sandbox_id
                && c.status.state == ContainerState::ContainerRunning as i32
            {
                c.status.state = ContainerState::ContainerExited.into();
                c.status.finished_at = now_ns();
                c.status.exit_code = 137;
            }
        }
        Ok(StopPodSandboxResponse {})
    }

    async fn remove_pod_sandbox(
        &self,
        req: RemovePodSandboxRequest,
    ) -> Result<RemovePodSandboxResponse, Status> {
        self.record("remove_pod_sandbox")?;
        self.state
            .sandboxes
            .write()
            .await
            .remove(&req.pod_sandbox_id);
        self.state
            .containers
            .write()
            .await
            .retain(|_, c| c.sandbox_id != req.pod_sandbox_id);
        Ok(RemovePodSandboxResponse {})
    }

    async fn pod_sandbox_status(
        &self,
        req: PodSandboxStatusRequest,
    ) -> Result<PodSandboxStatusResponse, Status> {
        self.record("pod_sandbox_status")?;
        let status = self
            .state
            .sandboxes
            .read()
            .await
            .get(&req.pod_sandbox_id)
            .cloned()
            .ok_or_else(|| Status::not_found(format!("sandbox {} not found", req.pod_sandbox_id)))?;
        Ok(PodSandboxStatusResponse {
            status: Some(status),
            info: BTreeMap::new(),
        })
    }

    async fn list_pod_sandbox(
        &self,
        _req: ListPodSandboxRequest,
    ) -> Result<ListPodSandboxResponse, Status> {
        self.record("list_pod_sandbox")?;
        let items = self
            .state
            .sandboxes
            .read()
            .await
            .values()
            .map(|s| PodSandbox {
                id: s.id.clone(),
                metadata: s.metadata.clone(),
                state: s.state,
                created_at: s.created_at,
                labels: s.labels.clone(),
                annotations: s.annotations.clone(),
                runtime_handler: s.runtime_handler.clone(),
            })
            .collect();
        Ok(ListPodSandboxResponse { items })
    }

    async fn create_container(
        &self,
        req: CreateContainerRequest,
    ) -> Result<CreateContainerResponse, Status> {
        self.record("create_container")?;
        if !self
            .state
            .sandboxes
            .read()
            .await
            .contains_key(&req.pod_sandbox_id)
        {
            return Err(Status::not_found(format!(
                "sandbox {} not found",
                req.pod_sandbox_id
            )));
        }
        let config = req
            .config
            .ok_or_else(|| Status::invalid_argument("container config required"))?;

        let id = self.next_id("ctr");
        let image_ref = config
            .image
            .as_ref()
            .map(|i| i.image.clone())
            .unwrap_or_default();
        let status = ContainerStatus {
            id: id.clone(),
            metadata: config.metadata.clone(),
            state: ContainerState::ContainerCreated.into(),
            created_at: now_ns(),
            image: config.image.clone(),
            image_ref,
            labels: config.labels.clone(),
            annotations: config.annotations.clone(),
            mounts: config.mounts.clone(),
            log_path: config.log_path.clone(),
            ..Default::default()
        };
        self.state.containers.write().await.insert(
            id.clone(),
            FakeContainer {
                status,
                sandbox_id: req.pod_sandbox_id,
                config,
            },
        );
        Ok(CreateContainerResponse { container_id: id })
    }

    async fn start_container(
        &self,
        req: StartContainerRequest,
    ) -> Result<StartContainerResponse, Status> {
        self.record("start_container")?;
        let mut containers = self.state.containers.write().await;
        let c = containers
            .get_mut(&req.container_id)
            .ok_or_else(|| Status::not_found(format!("container {} not found", req.container_id)))?;
        c.status.state = ContainerState::ContainerRunning.into();
        c.status.started_at = now_ns();
        Ok(StartContainerResponse {})
    }

    async fn list_containers(
        &self,
        req: ListContainersRequest,
    ) -> Result<ListContainersResponse, Status> {
        self.record("list_containers")?;
        let sandbox_filter = req
            .filter
            .map(|f| f.pod_sandbox_id)
            .unwrap_or_default();
        let containers = self
            .state
            .containers
            .read()
            .await
            .iter()
            .filter(|(_, c)| sandbox_filter.is_empty() || c.sandbox_id == sandbox_filter)
            .map(|(id, c)| Container {
                id: id.clone(),
                pod_sandbox_id: c.sandbox_id.clone(),
                metadata: c.status.metadata.clone(),
                image: c.status.image.clone(),
                image_ref: c.status.image_ref.clone(),
                state: c.status.state,
                created_at: c.status.created_at,
                labels: c.status.labels.clone(),
                annotations: c.status.annotations.clone(),
            })
            .collect();
        Ok(ListContainersResponse { containers })
    }

    async fn container_status(
        &self,
        req: ContainerStatusRequest,
    ) -> Result<ContainerStatusResponse, Status> {
        self.record("container_status")?;
        let status = self
            .state
            .containers
            .read()
            .await
            .get(&req.container_id)
            .map(|c| c.status.clone())
            .ok_or_else(|| Status::not_found(format!("container {} not found", req.container_id)))?;
        Ok(ContainerStatusResponse {
            status: Some(status),
            info: BTreeMap::new(),
        })
    }

    async fn pull_image(&self, req: PullImageRequest) -> Result<PullImageResponse, Status> {
        self.record("pull_image")?;
        let image = req.image.map(|i| i.image).unwrap_or_default();
        if self.state.missing_images.lock().unwrap().contains(&image) {
            return Err(Status::not_found(format!("image {image} not found")));
        }
        Ok(PullImageResponse {
            image_ref: format!("sha256:{image}"),
        })
    }
}

pub type TestLifecycle = PodLifecycle<FakeRuntime, HostVolumeResolver<StaticResources>>;

/// Lifecycle over `runtime` with all host paths under `root`.
pub fn lifecycle(runtime: FakeRuntime, root: &Path, resources: StaticResources) -> TestLifecycle {
    let paths = PlatformPaths {
        socket_path: root.join("cri.sock"),
        volume_root: root.join("volumes"),
        secret_dir: "secrets".into(),
        configmap_dir: "configmaps".into(),
    };
    PodLifecycle::new(
        RuntimeClient::new(runtime).with_runtime_handler("fake"),
        HostVolumeResolver::new(paths.clone(), resources),
        paths,
        root.join("logs"),
    )
}

pub const DEMO_POD: &str = r#"
metadata:
  name: demo
  namespace: shop
  uid: 6f1c9a2e
  labels:
    app: demo
spec:
  volumes:
    - name: scratch
      emptyDir: {}
    - name: creds
      secret:
        secretName: db-pass
  containers:
    - name: web
      image: nginx:1.25
      ports:
        - containerPort: 80
          hostPort: 8080
      volumeMounts:
        - name: scratch
          mountPath: /cache
    - name: worker
      image: busybox
      command: ["sh", "-c", "sleep 3600"]
      volumeMounts:
        - name: creds
          mountPath: /etc/creds
          readOnly: true
"#;

pub const DEMO_RESOURCES: &str = r#"
secrets:
  - namespace: shop
    name: db-pass
    data:
      password: s3cret
"#;
