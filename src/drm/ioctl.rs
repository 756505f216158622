use crate::utils::{iow, iowr};

// ===============================================================================================
// Constants
// ===============================================================================================

pub const DRM_IOCTL_BASE: u32 = 0x64; // 'd'
pub const DRM_COMMAND_BASE: u32 = 0x40;

// ===============================================================================================
// Core GEM
// ===============================================================================================

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct GemCloseArgs {
    pub handle: u32,
    pub pad: u32,
}

pub const DRM_IOCTL_GEM_CLOSE: u32 = iow::<GemCloseArgs>(DRM_IOCTL_BASE, 0x09);

// ===============================================================================================
// Nouveau GEM
// ===============================================================================================

pub const NOUVEAU_GEM_DOMAIN_CPU: u32 = 1 << 0;
pub const NOUVEAU_GEM_DOMAIN_VRAM: u32 = 1 << 1;
pub const NOUVEAU_GEM_DOMAIN_GART: u32 = 1 << 2;
pub const NOUVEAU_GEM_DOMAIN_MAPPABLE: u32 = 1 << 3;
pub const NOUVEAU_GEM_DOMAIN_COHERENT: u32 = 1 << 4;

pub const DRM_NOUVEAU_GEM_NEW: u32 = 0x00;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct NouveauGemInfo {
    pub handle: u32,
    pub domain: u32,
    pub size: u64,
    pub offset: u64,
    pub map_handle: u64,
    pub tile_mode: u32,
    pub tile_flags: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct NouveauGemNewArgs {
    pub info: NouveauGemInfo,
    pub channel_hint: u32,
    pub align: u32,
}

pub const DRM_IOCTL_NOUVEAU_GEM_NEW: u32 =
    iowr::<NouveauGemNewArgs>(DRM_IOCTL_BASE, DRM_COMMAND_BASE + DRM_NOUVEAU_GEM_NEW);
