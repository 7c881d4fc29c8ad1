#![no_main]

use bp6_core::error::ErrorFlags;
use bp6_core::sdnv::{self, Field};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut field = Field::new(0, 0);
    let mut flags = ErrorFlags::empty();
    if sdnv::read(data, &mut field, &mut flags).is_ok() {
        let mut out = [0u8; 16];
        let mut w = Field::new(field.value, 0);
        let mut wflags = ErrorFlags::empty();
        if sdnv::write(&mut out, &mut w, &mut wflags).is_ok() {
            let mut rb = Field::new(0, 0);
            let mut rflags = ErrorFlags::empty();
            let end = sdnv::read(&out[..w.index], &mut rb, &mut rflags).unwrap();
            assert_eq!(end, w.index);
            assert_eq!(rb.value, field.value);
        }
    }
});
