//! Effective user id probe.

pub trait PrivilegeProbe: Send + Sync {
    fn effective_uid(&self) -> u32;

    fn is_superuser(&self) -> bool {
        self.effective_uid() == 0
    }
}

/// Reads the calling process's effective uid.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPrivileges;

impl PrivilegeProbe for SystemPrivileges {
    #[cfg(unix)]
    fn effective_uid(&self) -> u32 {
        unsafe { libc::geteuid() }
    }

    #[cfg(not(unix))]
    fn effective_uid(&self) -> u32 {
        u32::MAX
    }
}

/// Reports a fixed uid. Used to exercise the root guard.
#[derive(Debug, Clone, Copy)]
pub struct FixedUid(pub u32);

impl PrivilegeProbe for FixedUid {
    fn effective_uid(&self) -> u32 {
        self.0
    }
}
