//! Map pod/container declarations to CRI configuration messages.
//!
//! Everything here is deterministic. The only fallible step is mount
//! resolution, which runs before the container config is assembled so a
//! failure never yields a partial config.
//!
//! Well-known labels written on every sandbox and container:
//! - `io.kubernetes.pod.name`, `io.kubernetes.pod.namespace`,
//!   `io.kubernetes.pod.uid` → identity of the owning pod
//! - `io.kubernetes.container.name` → container name (containers only)

use std::collections::BTreeMap;
use std::path::Path;

use vkcri_core::error::Result;
use vkcri_core::pod::{
    ContainerDeclaration, DnsPolicy, PodDeclaration, PodDnsConfig, SeLinuxOptions,
};

use crate::cri_api::{
    Capability, ContainerConfig, ContainerMetadata, DnsConfig, ImageSpec, Int64Value, KeyValue,
    LinuxContainerConfig, LinuxContainerSecurityContext, LinuxPodSandboxConfig,
    LinuxSandboxSecurityContext, Mount, NamespaceMode, NamespaceOption, PodSandboxConfig,
    PodSandboxMetadata, PortMapping, Protocol, SeLinuxOption,
};
use crate::volume::{ResolvedMount, VolumeResolver};

pub const LABEL_POD_NAME: &str = "io.kubernetes.pod.name";
pub const LABEL_POD_NAMESPACE: &str = "io.kubernetes.pod.namespace";
pub const LABEL_POD_UID: &str = "io.kubernetes.pod.uid";
pub const LABEL_CONTAINER_NAME: &str = "io.kubernetes.container.name";
pub const ANN_CONTAINER_ATTEMPT: &str = "io.kubernetes.container.attempt";

/// Build the CRI sandbox config for a pod.
pub fn build_pod_sandbox_config(
    pod: &PodDeclaration,
    log_dir: &Path,
    attempt: u32,
) -> PodSandboxConfig {
    PodSandboxConfig {
        metadata: Some(PodSandboxMetadata {
            name: pod.metadata.name.clone(),
            uid: pod.metadata.uid.clone(),
            namespace: pod.metadata.namespace.clone(),
            attempt,
        }),
        hostname: pod_hostname(pod),
        log_directory: log_dir.to_string_lossy().into_owned(),
        dns_config: pod_dns_config(pod),
        port_mappings: port_mappings(pod),
        labels: pod_labels(pod),
        annotations: pod.metadata.annotations.clone(),
        linux: Some(pod_linux_config(pod)),
    }
}

/// Build the CRI container config for one container of a pod.
///
/// `image_ref` is the reference returned by the image pull, and
/// `volume_root` the pod-specific directory for generated volume content.
pub fn build_container_config(
    container: &ContainerDeclaration,
    pod: &PodDeclaration,
    image_ref: &str,
    volume_root: &Path,
    attempt: u32,
    resolver: &dyn VolumeResolver,
) -> Result<ContainerConfig> {
    let mounts = resolver
        .resolve(pod, container, volume_root)?
        .into_iter()
        .map(to_cri_mount)
        .collect();

    Ok(ContainerConfig {
        metadata: Some(ContainerMetadata {
            name: container.name.clone(),
            attempt,
        }),
        image: Some(ImageSpec {
            image: image_ref.to_string(),
            annotations: BTreeMap::new(),
        }),
        command: container.command.clone(),
        args: container.args.clone(),
        working_dir: container.working_dir.clone(),
        envs: container_envs(container),
        mounts,
        labels: container_labels(container, pod),
        annotations: container_annotations(pod, attempt),
        log_path: container_log_path(&container.name, attempt),
        stdin: container.stdin,
        stdin_once: container.stdin_once,
        tty: container.tty,
        linux: Some(container_linux_config(container, pod)),
    })
}

/// Log file of a container, relative to the sandbox log directory.
///
/// Two containers with the same name and attempt collide; callers keep
/// the pair unique.
pub fn container_log_path(name: &str, attempt: u32) -> String {
    format!("{}-{}.log", name, attempt)
}

fn to_cri_mount(mount: ResolvedMount) -> Mount {
    Mount {
        container_path: mount.container_path,
        host_path: mount.host_path.to_string_lossy().into_owned(),
        readonly: mount.read_only,
        ..Default::default()
    }
}

fn identity_labels(pod: &PodDeclaration) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_POD_NAME.to_string(), pod.metadata.name.clone()),
        (LABEL_POD_NAMESPACE.to_string(), pod.metadata.namespace.clone()),
        (LABEL_POD_UID.to_string(), pod.metadata.uid.clone()),
    ])
}

/// Pod labels plus the pod identity labels. Identity labels win on clash.
fn pod_labels(pod: &PodDeclaration) -> BTreeMap<String, String> {
    let mut labels = pod.metadata.labels.clone();
    labels.extend(identity_labels(pod));
    labels
}

fn container_labels(container: &ContainerDeclaration, pod: &PodDeclaration) -> BTreeMap<String, String> {
    let mut labels = identity_labels(pod);
    labels.insert(LABEL_CONTAINER_NAME.to_string(), container.name.clone());
    labels
}

fn container_annotations(pod: &PodDeclaration, attempt: u32) -> BTreeMap<String, String> {
    let mut annotations = pod.metadata.annotations.clone();
    annotations.insert(ANN_CONTAINER_ATTEMPT.to_string(), attempt.to_string());
    annotations
}

fn container_envs(container: &ContainerDeclaration) -> Vec<KeyValue> {
    container
        .env
        .iter()
        .map(|e| KeyValue {
            key: e.name.clone(),
            value: e.value.clone(),
        })
        .collect()
}

/// Host network pods take the node hostname from the runtime.
fn pod_hostname(pod: &PodDeclaration) -> String {
    if pod.spec.host_network {
        return String::new();
    }
    [&pod.spec.hostname, &pod.spec.node_name, &pod.metadata.name]
        .into_iter()
        .find(|h| !h.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// `None` leaves DNS to the runtime defaults.
fn pod_dns_config(pod: &PodDeclaration) -> Option<DnsConfig> {
    match (pod.spec.dns_policy, pod.spec.dns_config.as_ref()) {
        (DnsPolicy::None, declared) => Some(to_cri_dns(&declared.cloned().unwrap_or_default())),
        (_, Some(declared)) => Some(to_cri_dns(declared)),
        (_, None) => None,
    }
}

fn to_cri_dns(config: &PodDnsConfig) -> DnsConfig {
    DnsConfig {
        servers: config.nameservers.clone(),
        searches: config.searches.clone(),
        options: config.options.iter().map(|o| o.to_resolv_option()).collect(),
    }
}

fn port_mappings(pod: &PodDeclaration) -> Vec<PortMapping> {
    pod.spec
        .containers
        .iter()
        .flat_map(|c| c.ports.iter())
        .map(|p| {
            let protocol = match p.protocol.to_ascii_uppercase().as_str() {
                "UDP" => Protocol::Udp,
                "SCTP" => Protocol::Sctp,
                _ => Protocol::Tcp,
            };
            PortMapping {
                protocol: protocol.into(),
                container_port: p.container_port,
                host_port: p.host_port,
                host_ip: p.host_ip.clone(),
            }
        })
        .collect()
}

fn namespace_options(pod: &PodDeclaration) -> NamespaceOption {
    let mode = |host: bool, fallback: NamespaceMode| -> i32 {
        if host {
            NamespaceMode::Node.into()
        } else {
            fallback.into()
        }
    };
    let pid_fallback = if pod.spec.share_process_namespace {
        NamespaceMode::Pod
    } else {
        NamespaceMode::Container
    };

    NamespaceOption {
        network: mode(pod.spec.host_network, NamespaceMode::Pod),
        pid: mode(pod.spec.host_pid, pid_fallback),
        ipc: mode(pod.spec.host_ipc, NamespaceMode::Pod),
        target_id: String::new(),
    }
}

/// Pod supplemental groups with `fsGroup` appended if not already listed.
fn supplemental_groups(pod: &PodDeclaration) -> Vec<i64> {
    let Some(sc) = pod.spec.security_context.as_ref() else {
        return Vec::new();
    };
    let mut groups = sc.supplemental_groups.clone();
    if let Some(fs_group) = sc.fs_group {
        if !groups.contains(&fs_group) {
            groups.push(fs_group);
        }
    }
    groups
}

fn to_cri_selinux(options: &SeLinuxOptions) -> SeLinuxOption {
    SeLinuxOption {
        user: options.user.clone(),
        role: options.role.clone(),
        r#type: options.type_.clone(),
        level: options.level.clone(),
    }
}

fn int64(value: i64) -> Int64Value {
    Int64Value { value }
}

fn pod_linux_config(pod: &PodDeclaration) -> LinuxPodSandboxConfig {
    let sc = pod.spec.security_context.as_ref();
    let privileged = pod.spec.containers.iter().any(|c| {
        c.security_context
            .as_ref()
            .and_then(|s| s.privileged)
            .unwrap_or(false)
    });

    LinuxPodSandboxConfig {
        cgroup_parent: String::new(),
        security_context: Some(LinuxSandboxSecurityContext {
            namespace_options: Some(namespace_options(pod)),
            selinux_options: sc
                .and_then(|s| s.se_linux_options.as_ref())
                .map(to_cri_selinux),
            run_as_user: sc.and_then(|s| s.run_as_user).map(int64),
            run_as_group: sc.and_then(|s| s.run_as_group).map(int64),
            readonly_rootfs: false,
            supplemental_groups: supplemental_groups(pod),
            privileged,
        }),
        sysctls: sc
            .map(|s| {
                s.sysctls
                    .iter()
                    .map(|x| (x.name.clone(), x.value.clone()))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Container settings override pod settings field by field.
fn container_linux_config(
    container: &ContainerDeclaration,
    pod: &PodDeclaration,
) -> LinuxContainerConfig {
    let pod_sc = pod.spec.security_context.as_ref();
    let sc = container.security_context.as_ref();

    let run_as_user = sc
        .and_then(|s| s.run_as_user)
        .or_else(|| pod_sc.and_then(|p| p.run_as_user));
    let run_as_group = sc
        .and_then(|s| s.run_as_group)
        .or_else(|| pod_sc.and_then(|p| p.run_as_group));
    let selinux = sc
        .and_then(|s| s.se_linux_options.as_ref())
        .or_else(|| pod_sc.and_then(|p| p.se_linux_options.as_ref()));

    LinuxContainerConfig {
        security_context: Some(LinuxContainerSecurityContext {
            capabilities: sc.and_then(|s| s.capabilities.as_ref()).map(|c| Capability {
                add_capabilities: c.add.clone(),
                drop_capabilities: c.drop.clone(),
            }),
            privileged: sc.and_then(|s| s.privileged).unwrap_or(false),
            namespace_options: Some(namespace_options(pod)),
            selinux_options: selinux.map(to_cri_selinux),
            run_as_user: run_as_user.map(int64),
            run_as_group: run_as_group.map(int64),
            run_as_username: String::new(),
            readonly_rootfs: sc
                .and_then(|s| s.read_only_root_filesystem)
                .unwrap_or(false),
            supplemental_groups: supplemental_groups(pod),
            no_new_privs: sc.and_then(|s| s.allow_privilege_escalation) == Some(false),
        }),
    }
}
