use kms_bo::drm::device::DEFAULT_CARD_PATH;
use kms_bo::{BoType, Driver};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CARD_PATH.to_string());

    println!("[+] Opening {path}...");
    let driver = Driver::open_nouveau(&path)?;

    println!("[+] Creating cursor buffer...");
    let mut bo = driver.create_bo(64, 64, BoType::Cursor64x64A8R8G8B8, &[0])?;
    println!("    Pitch {} / Size {}", bo.pitch(), bo.size());

    // Draw a white square with a transparent border.
    let first = bo.map()?;
    let second = bo.map()?;
    assert_eq!(first, second);
    println!("    Mapped at {first:p}, map count {}", bo.map_count());

    let pixels = first.as_ptr().cast::<u32>();
    for y in 0..64 {
        for x in 0..64 {
            let inside = (8..56).contains(&x) && (8..56).contains(&y);
            let argb = if inside { 0xffff_ffff } else { 0 };
            unsafe { pixels.add(y * 64 + x).write(argb) };
        }
    }
    bo.unmap();
    bo.unmap();

    bo.destroy().map_err(|e| e.error)?;
    driver.close();
    println!("[+] Done");
    Ok(())
}
