//! Best-effort thread pinning for benchmark workers.
//!
//! Linux: `pthread_setaffinity_np` on the calling thread. Elsewhere a no-op.

/// Where to pin a thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PinConfig {
    /// Logical core to pin to; `None` leaves the thread unpinned.
    pub core_id: Option<usize>,
}

impl PinConfig {
    /// Pin to `core`.
    pub const fn core(core: usize) -> Self {
        Self {
            core_id: Some(core),
        }
    }
}

/// Pin the calling thread according to `cfg`. Returns whether pinning took
/// effect.
pub fn pin_current_thread(cfg: &PinConfig) -> bool {
    let Some(core) = cfg.core_id else {
        return false;
    };

    #[cfg(target_os = "linux")]
    {
        use core::mem::{size_of, zeroed};
        // Safety: cpu_set_t is plain data; the CPU_* helpers bound-check `core`.
        unsafe {
            let mut set: libc::cpu_set_t = zeroed();
            if core >= libc::CPU_SETSIZE as usize {
                return false;
            }
            libc::CPU_SET(core, &mut set);
            let rc = libc::pthread_setaffinity_np(
                libc::pthread_self(),
                size_of::<libc::cpu_set_t>(),
                &set,
            );
            rc == 0
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = core;
        false
    }
}
