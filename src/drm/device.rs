use crate::drm::ioctl::{
    DRM_IOCTL_GEM_CLOSE, DRM_IOCTL_NOUVEAU_GEM_NEW, GemCloseArgs, NouveauGemInfo,
    NouveauGemNewArgs,
};
use crate::kms::backend::{
    AllocRequest, Allocation, ConnectionId, KernelHandle, MapToken, MemoryBackend,
};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::RawFd;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;

pub const DEFAULT_CARD_PATH: &str = "/dev/dri/card0";

/// A handle to a nouveau DRM character device.
///
/// The file descriptor is wrapped in an `Arc`, so clones share one connection.
#[derive(Clone, Debug)]
pub struct NouveauDevice {
    pub file: Arc<File>,
}

impl NouveauDevice {
    /// Opens the primary DRM node at [`DEFAULT_CARD_PATH`].
    ///
    /// # Errors
    /// Returns an error if the node cannot be opened (no driver, permissions).
    pub fn open() -> io::Result<Self> {
        Self::open_path(DEFAULT_CARD_PATH)
    }

    /// Opens a specific DRM node.
    ///
    /// # Errors
    /// Returns an error if `path` cannot be opened read/write.
    pub fn open_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::from(file))
    }

    /// Issue an IOCTL, restarting it when interrupted.
    ///
    /// # Safety
    /// The caller must ensure that `arg` has the layout the kernel expects for `cmd`.
    unsafe fn ioctl<T>(&self, cmd: u32, arg: &mut T) -> io::Result<()> {
        loop {
            let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), cmd as _, arg as *mut T) };
            if ret >= 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR | libc::EAGAIN) => {}
                _ => return Err(err),
            }
        }
    }

    // ===========================================================================================
    // GEM
    // ===========================================================================================

    /// Create a GEM object. On success the kernel fills `args.info.handle` and
    /// `args.info.map_handle`.
    pub fn gem_new(&self, args: &mut NouveauGemNewArgs) -> io::Result<()> {
        unsafe { self.ioctl(DRM_IOCTL_NOUVEAU_GEM_NEW, args) }
    }

    /// Release a GEM handle.
    pub fn gem_close(&self, handle: u32) -> io::Result<()> {
        let mut args = GemCloseArgs { handle, pad: 0 };
        unsafe { self.ioctl(DRM_IOCTL_GEM_CLOSE, &mut args) }
    }
}

impl From<File> for NouveauDevice {
    fn from(file: File) -> Self {
        Self {
            file: Arc::new(file),
        }
    }
}

impl AsRawFd for NouveauDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl MemoryBackend for NouveauDevice {
    fn connection(&self) -> ConnectionId {
        ConnectionId::new(self.as_raw_fd())
    }

    fn allocate(&self, req: &AllocRequest) -> io::Result<Allocation> {
        let mut args = NouveauGemNewArgs {
            info: NouveauGemInfo {
                size: req.size,
                domain: req.domain.bits(),
                tile_mode: req.tile_mode,
                tile_flags: req.tile_flags,
                ..NouveauGemInfo::default()
            },
            channel_hint: 0,
            align: req.align,
        };
        self.gem_new(&mut args)?;

        Ok(Allocation {
            handle: KernelHandle::new(args.info.handle),
            map_token: MapToken::new(args.info.map_handle),
        })
    }

    fn release_handle(&self, handle: KernelHandle) -> io::Result<()> {
        self.gem_close(handle.get())
    }

    fn establish_mapping(
        &self,
        conn: ConnectionId,
        token: MapToken,
        size: usize,
    ) -> io::Result<NonNull<u8>> {
        let offset = libc::off_t::try_from(token.get())
            .map_err(|_| io::Error::from_raw_os_error(libc::EOVERFLOW))?;

        let ret = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                conn.as_raw_fd(),
                offset,
            )
        };
        if ret == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        NonNull::new(ret.cast::<u8>()).ok_or_else(|| io::Error::from_raw_os_error(libc::EFAULT))
    }

    unsafe fn teardown_mapping(&self, addr: NonNull<u8>, size: usize) {
        let ret = unsafe { libc::munmap(addr.as_ptr().cast(), size) };
        if ret != 0 {
            log::warn!(
                "munmap of {addr:p} ({size} bytes) failed: {}",
                io::Error::last_os_error()
            );
        }
    }
}
