//! Volume resolution for container mounts.
//!
//! Turns a container's `volumeMounts` into concrete host paths. Secret and
//! config-map content comes from a [`ResourceManager`] and is written to
//! disk under the configured directories so the runtime can bind-mount it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use vkcri_core::error::{CriError, Result};
use vkcri_core::pod::{ContainerDeclaration, PodDeclaration, VolumeKind};
use vkcri_core::{is_plain_name, PlatformPaths};

/// A mount resolved to host content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMount {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

/// Resolves a container's declared mounts against its pod's volumes.
pub trait VolumeResolver: Send + Sync {
    /// Resolve every mount of `container`, in declaration order.
    ///
    /// `volume_root` is the pod-specific directory for generated content.
    fn resolve(
        &self,
        pod: &PodDeclaration,
        container: &ContainerDeclaration,
        volume_root: &Path,
    ) -> Result<Vec<ResolvedMount>>;
}

/// Source of secret and config-map content.
pub trait ResourceManager: Send + Sync {
    /// Secret data by key, or `None` if the secret does not exist.
    fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<BTreeMap<String, Vec<u8>>>>;

    /// Config-map data by key, or `None` if the config map does not exist.
    fn get_config_map(&self, namespace: &str, name: &str)
        -> Result<Option<BTreeMap<String, String>>>;
}

/// One secret or config map in a [`StaticResources`] file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// In-memory resources, typically loaded from a YAML file:
///
/// ```yaml
/// secrets:
///   - name: db-pass
///     data:
///       password: hunter2
/// configMaps:
///   - namespace: web
///     name: app-config
///     data:
///       app.conf: "listen 8080"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticResources {
    pub secrets: Vec<ResourceEntry>,
    pub config_maps: Vec<ResourceEntry>,
}

impl StaticResources {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CriError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    fn find<'a>(entries: &'a [ResourceEntry], namespace: &str, name: &str) -> Option<&'a ResourceEntry> {
        entries
            .iter()
            .find(|e| e.namespace == namespace && e.name == name)
    }
}

impl ResourceManager for StaticResources {
    fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<BTreeMap<String, Vec<u8>>>> {
        Ok(Self::find(&self.secrets, namespace, name).map(|entry| {
            entry
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.as_bytes().to_vec()))
                .collect()
        }))
    }

    fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        Ok(Self::find(&self.config_maps, namespace, name).map(|entry| entry.data.clone()))
    }
}

/// Resolver backed by the host filesystem.
///
/// - hostPath: the declared path, untouched
/// - emptyDir: `<volume_root>/<volume>`, created on demand
/// - secret / configMap: one file per key under the secret / config-map
///   directory
/// - anything else: a resolution error
pub struct HostVolumeResolver<M> {
    paths: PlatformPaths,
    resources: M,
}

impl<M: ResourceManager> HostVolumeResolver<M> {
    pub fn new(paths: PlatformPaths, resources: M) -> Self {
        Self { paths, resources }
    }

    /// Directory that receives the files of a secret or config-map volume.
    ///
    /// A relative `base` lives under the pod's volume root; an absolute one
    /// is shared by all pods, so the pod UID is added to the path.
    fn content_dir(
        base: &Path,
        volume_root: &Path,
        pod: &PodDeclaration,
        volume: &str,
    ) -> Result<PathBuf> {
        if !base.is_absolute() {
            return Ok(volume_root.join(base).join(volume));
        }
        if !is_plain_name(&pod.metadata.uid) {
            return Err(resolution_error(
                volume,
                format!("pod UID {:?} is not a plain path segment", pod.metadata.uid),
            ));
        }
        Ok(base.join(&pod.metadata.uid).join(volume))
    }

    /// Replace the contents of `dir` with one file per key.
    ///
    /// Every key is checked before anything is written; files left over
    /// from an earlier resolution are removed.
    fn write_files<'a, I>(volume: &str, dir: &Path, files: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a String, &'a [u8])>,
    {
        let files: Vec<_> = files.into_iter().collect();
        if let Some((key, _)) = files.iter().find(|(key, _)| !is_plain_name(key)) {
            return Err(resolution_error(
                volume,
                format!("key {key:?} is not a plain file name"),
            ));
        }

        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;
        for (key, value) in files {
            let path = dir.join(key);
            tracing::debug!(path = %path.display(), "Writing volume file");
            fs::write(&path, value)?;
        }
        Ok(())
    }
}

fn resolution_error(volume: &str, message: String) -> CriError {
    CriError::VolumeResolution {
        volume: volume.to_string(),
        message,
    }
}

impl<M: ResourceManager> VolumeResolver for HostVolumeResolver<M> {
    fn resolve(
        &self,
        pod: &PodDeclaration,
        container: &ContainerDeclaration,
        volume_root: &Path,
    ) -> Result<Vec<ResolvedMount>> {
        let namespace = &pod.metadata.namespace;
        let mut mounts = Vec::with_capacity(container.volume_mounts.len());

        for mount in &container.volume_mounts {
            let Some(volume) = pod.find_volume(&mount.name) else {
                tracing::debug!(
                    container = %container.name,
                    volume = %mount.name,
                    "Container volume mount not found in pod spec"
                );
                continue;
            };

            if !is_plain_name(&volume.name) {
                return Err(resolution_error(
                    &volume.name,
                    "volume name is not a plain path segment".to_string(),
                ));
            }

            let host_path = match volume.kind() {
                VolumeKind::HostPath(src) => PathBuf::from(&src.path),
                VolumeKind::EmptyDir(_) => {
                    let dir = volume_root.join(&volume.name);
                    fs::create_dir_all(&dir)?;
                    dir
                }
                VolumeKind::Secret(src) => {
                    match self.resources.get_secret(namespace, &src.secret_name)? {
                        Some(data) => {
                            let dir = Self::content_dir(
                                &self.paths.secret_dir,
                                volume_root,
                                pod,
                                &volume.name,
                            )?;
                            Self::write_files(
                                &volume.name,
                                &dir,
                                data.iter().map(|(k, v)| (k, v.as_slice())),
                            )?;
                            dir
                        }
                        None if src.optional == Some(true) => {
                            tracing::debug!(secret = %src.secret_name, "Optional secret missing, skipping mount");
                            continue;
                        }
                        None => {
                            return Err(CriError::VolumeResolution {
                                volume: volume.name.clone(),
                                message: format!(
                                    "secret {} is required by pod {} and does not exist",
                                    src.secret_name,
                                    pod.full_name()
                                ),
                            });
                        }
                    }
                }
                VolumeKind::ConfigMap(src) => {
                    match self.resources.get_config_map(namespace, &src.name)? {
                        Some(data) => {
                            let dir = Self::content_dir(
                                &self.paths.configmap_dir,
                                volume_root,
                                pod,
                                &volume.name,
                            )?;
                            Self::write_files(
                                &volume.name,
                                &dir,
                                data.iter().map(|(k, v)| (k, v.as_bytes())),
                            )?;
                            dir
                        }
                        None if src.optional == Some(true) => {
                            tracing::debug!(config_map = %src.name, "Optional config map missing, skipping mount");
                            continue;
                        }
                        None => {
                            return Err(CriError::VolumeResolution {
                                volume: volume.name.clone(),
                                message: format!(
                                    "config map {} is required by pod {} and does not exist",
                                    src.name,
                                    pod.full_name()
                                ),
                            });
                        }
                    }
                }
                VolumeKind::Unsupported => {
                    return Err(CriError::VolumeResolution {
                        volume: volume.name.clone(),
                        message: format!(
                            "pod {} requires a volume of an unsupported type",
                            pod.full_name()
                        ),
                    });
                }
            };

            mounts.push(ResolvedMount {
                host_path,
                container_path: container_path(&mount.mount_path, &mount.sub_path),
                read_only: mount.read_only,
            });
        }

        Ok(mounts)
    }
}

/// Mount path joined with an optional sub path.
fn container_path(mount_path: &str, sub_path: &str) -> String {
    let sub_path = sub_path.trim_start_matches('/');
    if sub_path.is_empty() {
        mount_path.to_string()
    } else {
        Path::new(mount_path)
            .join(sub_path)
            .to_string_lossy()
            .into_owned()
    }
}
