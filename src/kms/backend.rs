use crate::drm::ioctl::{
    NOUVEAU_GEM_DOMAIN_COHERENT, NOUVEAU_GEM_DOMAIN_CPU, NOUVEAU_GEM_DOMAIN_GART,
    NOUVEAU_GEM_DOMAIN_MAPPABLE, NOUVEAU_GEM_DOMAIN_VRAM,
};
use bitflags::bitflags;
use std::fmt;
use std::io;
use std::os::fd::RawFd;
use std::ptr::NonNull;

// ===============================================================================================
// Opaque Identifiers
// ===============================================================================================

/// Identifies the open connection to the allocation backend (a DRM file descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(RawFd);

impl ConnectionId {
    #[must_use]
    pub const fn new(fd: RawFd) -> Self {
        Self(fd)
    }

    #[must_use]
    pub const fn as_raw_fd(self) -> RawFd {
        self.0
    }
}

/// Kernel-assigned GEM handle. Required to release the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle(u32);

impl KernelHandle {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Offset token handed to `mmap` to reach a buffer's pages. Not an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapToken(u64);

impl MapToken {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// ===============================================================================================
// Allocation Requests
// ===============================================================================================

bitflags! {
    /// Memory domain hints for a GEM allocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GemDomain: u32 {
        const CPU = NOUVEAU_GEM_DOMAIN_CPU;
        const VRAM = NOUVEAU_GEM_DOMAIN_VRAM;
        const GART = NOUVEAU_GEM_DOMAIN_GART;
        const MAPPABLE = NOUVEAU_GEM_DOMAIN_MAPPABLE;
        const COHERENT = NOUVEAU_GEM_DOMAIN_COHERENT;
    }
}

/// Everything the memory manager needs to carve out one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocRequest {
    pub size: u64,
    pub domain: GemDomain,
    pub tile_mode: u32,
    pub tile_flags: u32,
    pub align: u32,
}

/// Backend response to a successful [`AllocRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub handle: KernelHandle,
    pub map_token: MapToken,
}

// ===============================================================================================
// Backend Interface
// ===============================================================================================

/// The kernel memory manager and mapping primitive a [`Driver`](super::Driver) sits on.
///
/// Each GPU family provides one implementation. Errors are returned as raw OS errors
/// and are passed to callers untranslated.
pub trait MemoryBackend: fmt::Debug {
    /// The connection this backend issues requests on.
    fn connection(&self) -> ConnectionId;

    /// Allocate a buffer object.
    fn allocate(&self, req: &AllocRequest) -> io::Result<Allocation>;

    /// Drop the kernel's reference to a buffer object.
    fn release_handle(&self, handle: KernelHandle) -> io::Result<()>;

    /// Map `size` bytes of the buffer identified by `token` into this process.
    fn establish_mapping(
        &self,
        conn: ConnectionId,
        token: MapToken,
        size: usize,
    ) -> io::Result<NonNull<u8>>;

    /// Remove a mapping created by [`establish_mapping`](Self::establish_mapping).
    ///
    /// # Safety
    /// `addr` and `size` must describe a live mapping returned by this backend, and no
    /// reference into that memory may be used afterwards.
    unsafe fn teardown_mapping(&self, addr: NonNull<u8>, size: usize);
}
