use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{CriError, Result};

/// Host paths the adapter depends on.
///
/// Resolved once at process start and handed to the components that need
/// them; nothing below the binary reads platform constants directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlatformPaths {
    /// CRI runtime Unix socket
    pub socket_path: PathBuf,

    /// Root under which per-pod volume directories are created
    pub volume_root: PathBuf,

    /// Where secret volume content is written.
    ///
    /// A relative path is taken relative to the pod's volume root.
    pub secret_dir: PathBuf,

    /// Where config-map volume content is written (same rules as `secret_dir`).
    pub configmap_dir: PathBuf,
}

impl PlatformPaths {
    /// Defaults for the operating system this binary was built for.
    #[cfg(target_os = "macos")]
    pub fn host_default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/containerd/containerd.sock"),
            volume_root: PathBuf::from("/var/run/vk-cri/volumes"),
            secret_dir: PathBuf::from("/var/lib/vk-cri/secrets"),
            configmap_dir: PathBuf::from("/var/lib/vk-cri/configmaps"),
        }
    }

    /// Defaults for the operating system this binary was built for.
    #[cfg(not(target_os = "macos"))]
    pub fn host_default() -> Self {
        Self {
            socket_path: PathBuf::from("/run/containerd/containerd.sock"),
            volume_root: PathBuf::from("/run/vk-cri/volumes"),
            secret_dir: PathBuf::from("secrets"),
            configmap_dir: PathBuf::from("configmaps"),
        }
    }

    /// Volume root for a single pod, keyed by its UID.
    ///
    /// The UID must be a single plain path segment.
    pub fn pod_volume_root(&self, pod_uid: &str) -> Result<PathBuf> {
        if !is_plain_name(pod_uid) {
            return Err(CriError::InvalidInput(format!(
                "pod UID {pod_uid:?} is not a plain path segment"
            )));
        }
        Ok(self.volume_root.join(pod_uid))
    }
}

/// True when `name` is exactly one normal path component: not empty, not
/// absolute, no separators, no `.` or `..`.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
}

impl Default for PlatformPaths {
    fn default() -> Self {
        Self::host_default()
    }
}

/// Adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Platform paths (socket, volume roots)
    pub paths: PlatformPaths,

    /// Directory the runtime writes container logs under
    pub log_dir: PathBuf,

    /// CRI runtime handler passed to RunPodSandbox (empty = runtime default)
    pub runtime_handler: String,

    /// Seconds to wait for the runtime socket to accept a connection
    pub connect_timeout_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            paths: PlatformPaths::host_default(),
            log_dir: PathBuf::from("/var/log/vk-cri"),
            runtime_handler: String::new(),
            connect_timeout_secs: 10,
        }
    }
}

impl AdapterConfig {
    /// Default location of the config file (~/.vkcri/config.yaml).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".vkcri"))
            .unwrap_or_else(|| PathBuf::from(".vkcri"))
            .join("config.yaml")
    }

    /// Load configuration from a YAML file. Missing keys take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CriError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AdapterConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    tracing::debug!(path = %default.display(), "Loading default config file");
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
