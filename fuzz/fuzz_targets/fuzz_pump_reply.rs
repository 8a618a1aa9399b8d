#![no_main]
use libfuzzer_sys::fuzz_target;
use spin_hardware::runze::{FRAME_LEN, decode};

fuzz_target!(|data: &[u8]| {
    let Some((&address, rest)) = data.split_first() else {
        return;
    };
    let Ok(frame) = <[u8; FRAME_LEN]>::try_from(rest) else {
        return;
    };
    // Arbitrary reply bytes must decode or be rejected, never panic.
    let _ = decode(&frame, address);
});
