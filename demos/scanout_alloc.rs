use kms_bo::drm::device::DEFAULT_CARD_PATH;
use kms_bo::kms::{AttrKey, AttrList};
use kms_bo::{BoType, Driver};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("============================================================");
    println!("              KMS Buffer Objects - Scanout Test             ");
    println!("============================================================");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CARD_PATH.to_string());

    // 1. Open the DRM node
    println!("[+] Opening {path}...");
    let driver = Driver::open_nouveau(&path)?;

    // 2. Capabilities
    let caps = driver.query_capability(AttrKey::BoType)?;
    println!("    Supported BO types: {caps:?} (0x{:x})", caps.bits());

    // 3. Allocate a scanout buffer
    let (width, height) = (1920, 1080);
    let attrs = AttrList::new()
        .width(width)
        .height(height)
        .bo_type(BoType::ScanoutX8R8G8B8 as u32)
        .to_raw();

    println!("[+] Creating {width}x{height} scanout buffer...");
    let mut bo = driver.create_bo(width, height, BoType::ScanoutX8R8G8B8, &attrs)?;
    println!("    Handle: {}", bo.handle());
    println!("    Pitch:  {} bytes", bo.pitch());
    println!("    Size:   {} bytes", bo.size());

    // 4. Map and fill with a gradient
    println!("[+] Mapping and filling...");
    let ptr = bo.map()?;
    let pitch = bo.pitch() as usize;
    for y in 0..height as usize {
        let row = unsafe { ptr.as_ptr().add(y * pitch).cast::<u32>() };
        for x in 0..width as usize {
            let r = (x * 255 / width as usize) as u32;
            let g = (y * 255 / height as usize) as u32;
            unsafe { row.add(x).write((r << 16) | (g << 8)) };
        }
    }
    bo.unmap();
    println!("    Map count after unmap: {}", bo.map_count());

    // 5. Cleanup
    println!("[+] Destroying buffer...");
    bo.destroy().map_err(|e| e.error)?;
    driver.close();

    println!("============================================================");
    println!(" [SUCCESS] Scanout buffer allocated, mapped and released");
    println!("============================================================");
    Ok(())
}
