#![no_main]
use dictpack::{MemorySource, Pack, HEADER_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the claimed output size, the rest is the container
    // image. Decoding must error out or fill the buffer exactly; it must
    // never read past a window or panic.
    if let Some((&size, image)) = data.split_first() {
        if let Ok(source) = MemorySource::from_bytes(image.to_vec()) {
            let pack = Pack::new(source);
            let _ = pack.decode_tree(HEADER_SIZE, size as usize * 16);
        }
    }
});
