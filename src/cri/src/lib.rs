//! vkcri - drive a CRI v1 runtime from Kubernetes-style pod declarations.
//!
//! Pieces, bottom up:
//! - `transport`: one async call per CRI RPC, gRPC over the runtime socket
//! - `client`: validated, traced request/response operations
//! - `config_mapper`: pod and container declarations to CRI configs
//! - `volume`: container mounts to host paths
//! - `lifecycle`: run, tear down and describe whole pods

pub mod client;
pub mod config_mapper;
pub mod lifecycle;
pub mod transport;
pub mod volume;

/// Generated CRI v1 protobuf types.
pub mod cri_api {
    tonic::include_proto!("runtime.v1");
}

pub use client::RuntimeClient;
pub use lifecycle::{PodLifecycle, PodPhase, PodReport, RunningPod};
pub use transport::{CriTransport, GrpcTransport};
pub use volume::{HostVolumeResolver, ResourceManager, StaticResources, VolumeResolver};
