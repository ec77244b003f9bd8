#![no_main]
use dictpack::{MemorySource, Pack, HEADER_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some((&size, image)) = data.split_first() {
        if let Ok(source) = MemorySource::from_bytes(image.to_vec()) {
            let pack = Pack::new(source);
            let _ = pack.decode_commit(HEADER_SIZE, size as usize * 16);
        }
    }
});
