//! Kubernetes-shaped pod and container declarations.
//!
//! These are the adapter's input: read-only values supplied by the
//! scheduling agent, deserialized from the same camelCase YAML/JSON shape
//! a Pod manifest uses. Only the fields the adapter translates are
//! modelled; unknown keys are ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CriError, Result};

/// A pod: metadata plus spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodDeclaration {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
}

impl PodDeclaration {
    /// Parse a pod from YAML (JSON is valid YAML).
    pub fn from_yaml(content: &str) -> Result<Self> {
        let pod: PodDeclaration = serde_yaml::from_str(content)?;
        if pod.metadata.name.is_empty() {
            return Err(CriError::ConfigError("pod metadata.name is required".to_string()));
        }
        Ok(pod)
    }

    /// Read and parse a pod manifest file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CriError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// `namespace/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    /// Look up a pod-level volume by name.
    pub fn find_volume(&self, name: &str) -> Option<&Volume> {
        self.spec.volumes.iter().find(|v| v.name == name)
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Identity and free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Default for ObjectMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            namespace: default_namespace(),
            uid: String::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}

/// Pod spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    pub containers: Vec<ContainerDeclaration>,
    pub volumes: Vec<Volume>,
    pub hostname: String,
    pub node_name: String,
    pub dns_policy: DnsPolicy,
    pub dns_config: Option<PodDnsConfig>,
    /// Extra /etc/hosts entries. CRI has no field for these; they are
    /// carried so callers can inspect them.
    pub host_aliases: Vec<HostAlias>,
    pub host_network: bool,
    #[serde(rename = "hostPID")]
    pub host_pid: bool,
    #[serde(rename = "hostIPC")]
    pub host_ipc: bool,
    pub share_process_namespace: bool,
    pub security_context: Option<PodSecurityContext>,
}

/// How a pod's DNS is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnsPolicy {
    #[default]
    ClusterFirst,
    ClusterFirstWithHostNet,
    Default,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodDnsConfig {
    pub nameservers: Vec<String>,
    pub searches: Vec<String>,
    pub options: Vec<PodDnsConfigOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodDnsConfigOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl PodDnsConfigOption {
    /// resolv.conf form: `name` or `name:value`.
    pub fn to_resolv_option(&self) -> String {
        match &self.value {
            Some(v) => format!("{}:{}", self.name, v),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostAlias {
    pub ip: String,
    pub hostnames: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSecurityContext {
    pub run_as_user: Option<i64>,
    pub run_as_group: Option<i64>,
    pub run_as_non_root: Option<bool>,
    pub supplemental_groups: Vec<i64>,
    pub fs_group: Option<i64>,
    pub sysctls: Vec<Sysctl>,
    #[serde(rename = "seLinuxOptions")]
    pub se_linux_options: Option<SeLinuxOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sysctl {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeLinuxOptions {
    pub user: String,
    pub role: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub level: String,
}

/// One container in a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerDeclaration {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub working_dir: String,
    pub env: Vec<EnvVar>,
    pub ports: Vec<ContainerPort>,
    pub stdin: bool,
    pub stdin_once: bool,
    pub tty: bool,
    pub security_context: Option<SecurityContext>,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    #[serde(default)]
    pub name: String,
    pub container_port: i32,
    #[serde(default)]
    pub host_port: i32,
    #[serde(rename = "hostIP", default)]
    pub host_ip: String,
    /// TCP, UDP or SCTP; anything else is treated as TCP.
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityContext {
    pub privileged: Option<bool>,
    pub run_as_user: Option<i64>,
    pub run_as_group: Option<i64>,
    pub run_as_non_root: Option<bool>,
    pub read_only_root_filesystem: Option<bool>,
    pub allow_privilege_escalation: Option<bool>,
    pub capabilities: Option<Capabilities>,
    #[serde(rename = "seLinuxOptions")]
    pub se_linux_options: Option<SeLinuxOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub add: Vec<String>,
    pub drop: Vec<String>,
}

/// A request to mount one of the pod's volumes into a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub sub_path: String,
    pub read_only: bool,
}

/// A named pod volume. Exactly one source is expected to be set; a volume
/// with none of the supported sources is [`VolumeKind::Unsupported`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub host_path: Option<HostPathSource>,
    #[serde(default)]
    pub empty_dir: Option<EmptyDirSource>,
    #[serde(default)]
    pub secret: Option<SecretSource>,
    #[serde(default)]
    pub config_map: Option<ConfigMapSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostPathSource {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmptyDirSource {
    pub medium: String,
    pub size_limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretSource {
    pub secret_name: String,
    pub optional: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigMapSource {
    pub name: String,
    pub optional: Option<bool>,
}

/// Borrowed view of a volume's source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeKind<'a> {
    HostPath(&'a HostPathSource),
    EmptyDir(&'a EmptyDirSource),
    Secret(&'a SecretSource),
    ConfigMap(&'a ConfigMapSource),
    Unsupported,
}

impl Volume {
    /// The first populated source, checked in hostPath, emptyDir, secret,
    /// configMap order.
    pub fn kind(&self) -> VolumeKind<'_> {
        if let Some(src) = &self.host_path {
            VolumeKind::HostPath(src)
        } else if let Some(src) = &self.empty_dir {
            VolumeKind::EmptyDir(src)
        } else if let Some(src) = &self.secret {
            VolumeKind::Secret(src)
        } else if let Some(src) = &self.config_map {
            VolumeKind::ConfigMap(src)
        } else {
            VolumeKind::Unsupported
        }
    }
}
