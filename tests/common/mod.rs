#![allow(dead_code)]

use kms_bo::kms::{
    AllocRequest, Allocation, ConnectionId, KernelHandle, MapToken, MemoryBackend,
};
use std::cell::{Cell, RefCell};
use std::io;
use std::ptr::{self, NonNull};

pub const FAKE_FD: i32 = 7;

/// One call into the backend, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Allocate(AllocRequest),
    Release(KernelHandle),
    Map {
        conn: ConnectionId,
        token: MapToken,
        size: usize,
    },
    Unmap {
        addr: usize,
        size: usize,
    },
}

/// In-process backend: heap memory stands in for buffer pages.
#[derive(Debug)]
pub struct RecordingBackend {
    pub fd: i32,
    pub calls: RefCell<Vec<Call>>,
    next_handle: Cell<u32>,
    pub fail_allocate: Cell<Option<i32>>,
    pub fail_map: Cell<Option<i32>>,
    /// Number of upcoming `release_handle` calls that fail with `EBUSY`.
    pub fail_release: Cell<u32>,
    live_mappings: Cell<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_fd(FAKE_FD)
    }

    pub fn with_fd(fd: i32) -> Self {
        Self {
            fd,
            calls: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
            fail_allocate: Cell::new(None),
            fail_map: Cell::new(None),
            fail_release: Cell::new(0),
            live_mappings: Cell::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn live_mappings(&self) -> usize {
        self.live_mappings.get()
    }

    pub fn token_for(handle: KernelHandle) -> MapToken {
        MapToken::new(0x1_0000_0000 + u64::from(handle.get()) * 0x1000)
    }
}

impl MemoryBackend for RecordingBackend {
    fn connection(&self) -> ConnectionId {
        ConnectionId::new(self.fd)
    }

    fn allocate(&self, req: &AllocRequest) -> io::Result<Allocation> {
        self.calls.borrow_mut().push(Call::Allocate(*req));
        if let Some(errno) = self.fail_allocate.get() {
            return Err(io::Error::from_raw_os_error(errno));
        }
        let handle = KernelHandle::new(self.next_handle.get());
        self.next_handle.set(self.next_handle.get() + 1);
        Ok(Allocation {
            handle,
            map_token: Self::token_for(handle),
        })
    }

    fn release_handle(&self, handle: KernelHandle) -> io::Result<()> {
        self.calls.borrow_mut().push(Call::Release(handle));
        let pending = self.fail_release.get();
        if pending > 0 {
            self.fail_release.set(pending - 1);
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        Ok(())
    }

    fn establish_mapping(
        &self,
        conn: ConnectionId,
        token: MapToken,
        size: usize,
    ) -> io::Result<NonNull<u8>> {
        self.calls.borrow_mut().push(Call::Map { conn, token, size });
        if let Some(errno) = self.fail_map.get() {
            return Err(io::Error::from_raw_os_error(errno));
        }
        let pages = Box::into_raw(vec![0u8; size].into_boxed_slice());
        self.live_mappings.set(self.live_mappings.get() + 1);
        NonNull::new(pages.cast::<u8>()).ok_or_else(|| io::Error::from_raw_os_error(libc::EFAULT))
    }

    unsafe fn teardown_mapping(&self, addr: NonNull<u8>, size: usize) {
        self.calls.borrow_mut().push(Call::Unmap {
            addr: addr.as_ptr() as usize,
            size,
        });
        self.live_mappings.set(self.live_mappings.get() - 1);
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(addr.as_ptr(), size)) });
    }
}
