//! Linux namespace configuration for container isolation.
//!
//! A [`NamespaceSpec`] describes everything the launcher hands to
//! `clone(2)`: which namespaces to unshare and how identities inside the
//! new user namespace map onto the host.

pub mod user;
pub mod uts;

use self::user::IdMapping;

/// Which namespaces to create for a new container.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceSet {
    /// Isolate mount namespace.
    pub mount: bool,
    /// Isolate UTS (hostname) namespace.
    pub uts: bool,
    /// Isolate IPC namespace.
    pub ipc: bool,
    /// Isolate PID namespace.
    pub pid: bool,
    /// Isolate network namespace.
    pub network: bool,
    /// Isolate user namespace.
    pub user: bool,
}

impl Default for NamespaceSet {
    fn default() -> Self {
        Self {
            mount: true,
            uts: true,
            ipc: true,
            pid: true,
            network: true,
            user: true,
        }
    }
}

impl NamespaceSet {
    /// Converts the set to the flags passed to `clone(2)`.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn to_clone_flags(&self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;

        let mut flags = CloneFlags::empty();
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.ipc {
            flags |= CloneFlags::CLONE_NEWIPC;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.network {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.user {
            flags |= CloneFlags::CLONE_NEWUSER;
        }
        flags
    }
}

/// Namespaces plus UID/GID maps for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    /// Namespaces to unshare at spawn.
    pub namespaces: NamespaceSet,
    /// UID mapping entries, in the order they are written.
    pub uid_mappings: Vec<IdMapping>,
    /// GID mapping entries, in the order they are written.
    pub gid_mappings: Vec<IdMapping>,
}

impl NamespaceSpec {
    /// Builds the spec for a single-user container: all namespaces, with
    /// namespace root mapped onto `host_uid`/`host_gid`.
    #[must_use]
    pub fn single_user(host_uid: u32, host_gid: u32) -> Self {
        Self {
            namespaces: NamespaceSet::default(),
            uid_mappings: vec![IdMapping::root_to(host_uid)],
            gid_mappings: vec![IdMapping::root_to(host_gid)],
        }
    }

    /// Builds the single-user spec for the invoking user.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn for_current_user() -> Self {
        let uid = nix::unistd::Uid::current().as_raw();
        let gid = nix::unistd::Gid::current().as_raw();
        Self::single_user(uid, gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_isolates_everything() {
        let set = NamespaceSet::default();
        assert!(set.mount && set.uts && set.ipc && set.pid && set.network && set.user);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn clone_flags_cover_all_six_namespaces() {
        use nix::sched::CloneFlags;

        let flags = NamespaceSet::default().to_clone_flags();
        let expected = CloneFlags::CLONE_NEWNS
            | CloneFlags::CLONE_NEWUTS
            | CloneFlags::CLONE_NEWIPC
            | CloneFlags::CLONE_NEWPID
            | CloneFlags::CLONE_NEWNET
            | CloneFlags::CLONE_NEWUSER;
        assert_eq!(flags, expected);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn clone_flags_omit_disabled_namespaces() {
        use nix::sched::CloneFlags;

        let set = NamespaceSet {
            network: false,
            ..NamespaceSet::default()
        };
        assert!(!set.to_clone_flags().contains(CloneFlags::CLONE_NEWNET));
        assert!(set.to_clone_flags().contains(CloneFlags::CLONE_NEWPID));
    }

    #[test]
    fn single_user_maps_root_to_host_ids() {
        let spec = NamespaceSpec::single_user(1000, 100);
        assert_eq!(spec.uid_mappings, vec![IdMapping::root_to(1000)]);
        assert_eq!(spec.gid_mappings, vec![IdMapping::root_to(100)]);
        assert_eq!(spec.uid_mappings[0].count, 1);
        assert_eq!(spec.uid_mappings[0].inside, 0);
    }
}
