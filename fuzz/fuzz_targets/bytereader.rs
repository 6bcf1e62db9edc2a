#![no_main]

use bytestream::ByteReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = ByteReader::new(data);
    let mut idx = 0usize;

    // Use input bytes to drive a bounded sequence of operations.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 8;
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_u8();
            }
            1 => {
                let _ = reader.read_i16();
            }
            2 => {
                let _ = reader.read_u64();
            }
            3 => {
                let _ = reader.read_f64();
            }
            4 => {
                let _ = reader.read_varu32();
            }
            5 => {
                let _ = reader.read_count();
            }
            6 => {
                let _ = reader.read_str();
            }
            _ => {
                let _ = reader.read_uuid();
            }
        }
    }
});
