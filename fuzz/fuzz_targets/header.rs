#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = mdf4_fixtures::bytestream::ByteReader::new(data);
    let _ = mdf4_fixtures::header::decode(&mut reader);
});
