pub mod attr;
pub mod backend;
pub mod bo;
pub mod driver;

pub use attr::{AttrKey, AttrList};
pub use backend::{
    AllocRequest, Allocation, ConnectionId, GemDomain, KernelHandle, MapToken, MemoryBackend,
};
pub use bo::{BoType, BoTypeFlags, BufferObject, DestroyError, Layout};
pub use driver::Driver;
