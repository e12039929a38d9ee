//! System-wide constants and default paths.

/// Default directory that is prepared as the container root.
pub const DEFAULT_ROOTFS_DIR: &str = "/tmp/burrow/rootfs";

/// Default memory ceiling in bytes (500 MiB), kept in its textual form.
pub const DEFAULT_MEMORY_LIMIT: &str = "524288000";

/// Default relative CPU share weight.
pub const DEFAULT_CPU_SHARES: &str = "512";

/// Shell launched as the final session process.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Hostname set inside the new UTS namespace.
pub const CONTAINER_HOSTNAME: &str = "burrow";

/// Prompt exported to the session so it is visibly distinct from the host.
pub const SESSION_PROMPT: &str = "-[burrow]- # ";

/// Terminal type exported to the session; enables full-screen programs.
pub const SESSION_TERM: &str = "xterm";

/// `argv[0]` marker that routes a re-executed process into the staged init.
pub const INIT_STAGE_MARKER: &str = "burrow-init";

/// Cgroup v1 hierarchy, relative to the container root.
pub const CGROUP_V1_PATH: &str = "sys/fs/cgroup";

/// Name of the per-container sub-group under each controller.
pub const CGROUP_GROUP_NAME: &str = "container";

/// Hidden directory that receives the old root during `pivot_root(2)`.
pub const PIVOT_OLD_ROOT_DIR: &str = ".pivot_root";

/// Default token service for anonymous registry pulls.
pub const DEFAULT_AUTH_URL: &str = "https://auth.docker.io/token";

/// Service name presented to the token service.
pub const DEFAULT_AUTH_SERVICE: &str = "registry.docker.io";

/// Default registry API base URL.
pub const DEFAULT_REGISTRY_URL: &str = "https://index.docker.io";

/// Namespace used for single-component image names such as `debian`.
pub const DEFAULT_IMAGE_NAMESPACE: &str = "library";

/// Tag used when an image reference carries none.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Manifest media type requested from the registry.
pub const MANIFEST_V2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Maximum number of layers accepted in a manifest.
pub const MAX_IMAGE_LAYERS: usize = 128;

/// Application name used in CLI output.
pub const APP_NAME: &str = "burrow";
