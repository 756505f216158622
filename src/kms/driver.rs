use crate::drm::device::NouveauDevice;
use crate::error::{KmsError, KmsResult};
use crate::kms::attr::AttrKey;
use crate::kms::backend::{ConnectionId, MemoryBackend};
use crate::kms::bo::{BoType, BoTypeFlags, BufferObject};
use std::path::Path;

/// An open connection to a buffer allocation backend.
///
/// Buffer objects borrow the driver they came from, so [`close`](Self::close) can only
/// be called once all of them are gone.
#[derive(Debug)]
pub struct Driver<B: MemoryBackend> {
    connection: ConnectionId,
    backend: B,
}

impl<B: MemoryBackend> Driver<B> {
    /// Wraps an already established backend connection. No I/O is performed.
    ///
    /// Besides storing the connection, this rejects a negative descriptor up front
    /// so later backend calls never see one.
    ///
    /// # Errors
    /// `InvalidArgument` if the backend reports a negative connection descriptor.
    pub fn open(backend: B) -> KmsResult<Self> {
        let connection = backend.connection();
        if connection.as_raw_fd() < 0 {
            return Err(KmsError::invalid(format!(
                "invalid connection descriptor {}",
                connection.as_raw_fd()
            )));
        }
        log::debug!("opened kms driver on fd {}", connection.as_raw_fd());

        Ok(Self {
            connection,
            backend,
        })
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Driver-wide capability query.
    ///
    /// # Errors
    /// `InvalidArgument` for any key other than [`AttrKey::BoType`].
    pub fn query_capability(&self, key: AttrKey) -> KmsResult<BoTypeFlags> {
        match key {
            AttrKey::BoType => {
                Ok(BoTypeFlags::SCANOUT_X8R8G8B8 | BoTypeFlags::CURSOR_64X64_A8R8G8B8)
            }
            _ => Err(KmsError::invalid(format!("no driver property {key:?}"))),
        }
    }

    /// Allocates a buffer object. No CPU mapping exists until it is mapped.
    ///
    /// `attrs` is a zero-terminated `[key, value, ...]` list; see
    /// [`validate_attrs`](crate::kms::attr::validate_attrs).
    ///
    /// # Errors
    /// `InvalidArgument` before any allocation for a bad attribute list or layout;
    /// otherwise the backend's OS error unchanged.
    pub fn create_bo(
        &self,
        width: u32,
        height: u32,
        bo_type: BoType,
        attrs: &[u32],
    ) -> KmsResult<BufferObject<'_, B>> {
        BufferObject::create(self, width, height, bo_type, attrs)
    }

    /// [`create_bo`](Self::create_bo) with a raw buffer type tag.
    ///
    /// # Errors
    /// `InvalidArgument` for an unknown tag, plus everything `create_bo` reports.
    pub fn create_bo_raw(
        &self,
        width: u32,
        height: u32,
        bo_type: u32,
        attrs: &[u32],
    ) -> KmsResult<BufferObject<'_, B>> {
        self.create_bo(width, height, BoType::from_raw(bo_type)?, attrs)
    }

    /// Closes the driver and hands back the backend.
    pub fn close(self) -> B {
        log::debug!("closed kms driver on fd {}", self.connection.as_raw_fd());
        self.backend
    }
}

impl Driver<NouveauDevice> {
    /// Opens a nouveau driver on the given DRM node.
    ///
    /// # Errors
    /// Returns an error if the device node cannot be opened.
    pub fn open_nouveau(path: impl AsRef<Path>) -> KmsResult<Self> {
        Self::open(NouveauDevice::open_path(path)?)
    }
}
