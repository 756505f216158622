use crate::error::{KmsError, KmsResult};
use crate::kms::attr::{AttrKey, validate_attrs};
use crate::kms::backend::{AllocRequest, GemDomain, KernelHandle, MapToken, MemoryBackend};
use crate::kms::driver::Driver;
use crate::utils::checked_align_up;
use bitflags::bitflags;
use std::ptr::NonNull;
use thiserror::Error;

/// Scanout rows are padded to this many bytes.
pub const SCANOUT_PITCH_ALIGN: u32 = 512;
/// Alignment requested from the memory manager for every buffer.
pub const BO_ALIGNMENT: u32 = 512;

const BYTES_PER_PIXEL: u32 = 4;
const CURSOR_DIM: u32 = 64;

// ===============================================================================================
// Buffer Types
// ===============================================================================================

bitflags! {
    /// Set of buffer types a driver can create.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BoTypeFlags: u32 {
        const SCANOUT_X8R8G8B8 = 1 << 0;
        const CURSOR_64X64_A8R8G8B8 = 1 << 1;
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoType {
    /// Scanout surface, 32-bit XRGB.
    ScanoutX8R8G8B8 = 1 << 0,
    /// 64x64 hardware cursor, 32-bit ARGB.
    Cursor64x64A8R8G8B8 = 1 << 1,
}

/// Row pitch and total byte size of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub pitch: u32,
    pub size: u64,
}

impl BoType {
    /// Converts a raw type tag.
    ///
    /// # Errors
    /// `InvalidArgument` for anything other than a single supported type.
    pub fn from_raw(raw: u32) -> KmsResult<Self> {
        match raw {
            r if r == Self::ScanoutX8R8G8B8 as u32 => Ok(Self::ScanoutX8R8G8B8),
            r if r == Self::Cursor64x64A8R8G8B8 as u32 => Ok(Self::Cursor64x64A8R8G8B8),
            _ => Err(KmsError::invalid(format!("unsupported buffer type {raw:#x}"))),
        }
    }

    #[must_use]
    pub const fn flag(self) -> BoTypeFlags {
        BoTypeFlags::from_bits_retain(self as u32)
    }

    /// Computes pitch and size for a buffer of this type.
    ///
    /// Cursor buffers are always 64x64 regardless of `width` and `height`.
    ///
    /// # Errors
    /// `InvalidArgument` if a scanout buffer would be empty or its size overflows.
    pub fn layout(self, width: u32, height: u32) -> KmsResult<Layout> {
        match self {
            Self::Cursor64x64A8R8G8B8 => Ok(Layout {
                pitch: CURSOR_DIM * BYTES_PER_PIXEL,
                size: u64::from(CURSOR_DIM * CURSOR_DIM * BYTES_PER_PIXEL),
            }),
            Self::ScanoutX8R8G8B8 => {
                if width == 0 || height == 0 {
                    return Err(KmsError::invalid(format!(
                        "empty scanout buffer {width}x{height}"
                    )));
                }
                let pitch = width
                    .checked_mul(BYTES_PER_PIXEL)
                    .and_then(|p| checked_align_up(p, SCANOUT_PITCH_ALIGN))
                    .ok_or_else(|| KmsError::invalid(format!("scanout width {width} too large")))?;
                Ok(Layout {
                    pitch,
                    size: u64::from(pitch) * u64::from(height),
                })
            }
        }
    }
}

// ===============================================================================================
// Buffer Object
// ===============================================================================================

/// One allocated buffer plus its CPU mapping state.
///
/// The object borrows the [`Driver`] it was created from, so the driver cannot be
/// closed while it exists. Mapping state is unsynchronized; `&mut self` on
/// [`map`](Self::map)/[`unmap`](Self::unmap) keeps it single-threaded.
#[derive(Debug)]
pub struct BufferObject<'d, B: MemoryBackend> {
    driver: &'d Driver<B>,
    handle: KernelHandle,
    size: usize,
    pitch: u32,
    map_token: MapToken,
    ptr: Option<NonNull<u8>>,
    map_count: i32,
    released: bool,
    release_failed: bool,
}

impl<'d, B: MemoryBackend> BufferObject<'d, B> {
    pub(crate) fn create(
        driver: &'d Driver<B>,
        width: u32,
        height: u32,
        bo_type: BoType,
        attrs: &[u32],
    ) -> KmsResult<Self> {
        validate_attrs(attrs)?;

        let layout = bo_type.layout(width, height)?;
        let size = usize::try_from(layout.size)
            .map_err(|_| KmsError::invalid(format!("buffer size {} unmappable", layout.size)))?;

        let req = AllocRequest {
            size: layout.size,
            domain: GemDomain::MAPPABLE | GemDomain::VRAM,
            tile_mode: 0,
            tile_flags: 0,
            align: BO_ALIGNMENT,
        };
        let alloc = driver.backend().allocate(&req)?;

        log::debug!(
            "created {bo_type:?} bo: handle {}, {size} bytes, pitch {}",
            alloc.handle,
            layout.pitch
        );

        Ok(Self {
            driver,
            handle: alloc.handle,
            size,
            pitch: layout.pitch,
            map_token: alloc.map_token,
            ptr: None,
            map_count: 0,
            released: false,
            release_failed: false,
        })
    }

    #[must_use]
    pub fn handle(&self) -> KernelHandle {
        self.handle
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    /// Outstanding map references. Negative after unbalanced unmaps.
    #[must_use]
    pub fn map_count(&self) -> i32 {
        self.map_count
    }

    /// Whether a CPU mapping is established. Stays true after the last unmap.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.ptr.is_some()
    }

    /// Per-object property lookup. This backend defines no per-object properties.
    ///
    /// # Errors
    /// Always `InvalidArgument`.
    pub fn get_property(&self, key: AttrKey) -> KmsResult<u32> {
        Err(KmsError::invalid(format!("no per-object property {key:?}")))
    }

    /// Returns a CPU address for the whole buffer, mapping it on first use.
    ///
    /// Repeated calls hand back the same address and bump the reference count.
    ///
    /// # Errors
    /// The mapping primitive's OS error; the object is left unmapped.
    pub fn map(&mut self) -> KmsResult<NonNull<u8>> {
        if let Some(ptr) = self.ptr {
            self.map_count += 1;
            return Ok(ptr);
        }

        let ptr = self.driver.backend().establish_mapping(
            self.driver.connection(),
            self.map_token,
            self.size,
        )?;
        log::trace!("mapped bo {} at {ptr:p}", self.handle);

        self.ptr = Some(ptr);
        self.map_count = 1;
        Ok(ptr)
    }

    /// Drops one map reference.
    ///
    /// The mapping itself stays in place until the object is destroyed, so the
    /// address from [`map`](Self::map) remains valid.
    pub fn unmap(&mut self) {
        self.map_count = self.map_count.saturating_sub(1);
        if self.map_count < 0 {
            log::trace!(
                "bo {}: unmap without matching map (count {})",
                self.handle,
                self.map_count
            );
        }
    }

    /// Releases the mapping (if any), then the kernel handle.
    ///
    /// # Errors
    /// If the handle release fails the object is handed back inside the error so
    /// the caller can retry. The CPU mapping is already gone at that point. Only
    /// another explicit `destroy` reissues the release; dropping the error leaks
    /// the handle.
    pub fn destroy(mut self) -> Result<(), DestroyError<'d, B>> {
        match self.release() {
            Ok(()) => Ok(()),
            Err(error) => Err(DestroyError { bo: self, error }),
        }
    }

    fn release(&mut self) -> KmsResult<()> {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: `ptr` came from `establish_mapping` with `self.size` and has
            // just been cleared, so nothing here can reach it again.
            unsafe { self.driver.backend().teardown_mapping(ptr, self.size) };
        }

        if let Err(e) = self.driver.backend().release_handle(self.handle) {
            self.release_failed = true;
            return Err(e.into());
        }
        self.released = true;
        log::debug!("destroyed bo {}", self.handle);
        Ok(())
    }
}

impl<B: MemoryBackend> Drop for BufferObject<'_, B> {
    fn drop(&mut self) {
        // A failed release is retried only through an explicit destroy.
        if self.released || self.release_failed {
            return;
        }
        if let Err(e) = self.release() {
            log::debug!("bo {} leaked, handle release failed: {e}", self.handle);
        }
    }
}

/// A failed [`BufferObject::destroy`]. The kernel handle may still be live.
///
/// Dropping this (or the `bo` inside it) does not touch the handle again.
#[derive(Error, Debug)]
#[error("failed to release buffer handle: {error}")]
pub struct DestroyError<'d, B: MemoryBackend> {
    pub bo: BufferObject<'d, B>,
    #[source]
    pub error: KmsError,
}

impl<'d, B: MemoryBackend> DestroyError<'d, B> {
    #[must_use]
    pub fn into_parts(self) -> (BufferObject<'d, B>, KmsError) {
        (self.bo, self.error)
    }
}
