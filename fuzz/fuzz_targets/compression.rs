#![no_main]
use libfuzzer_sys::fuzz_target;
use mdf4_fixtures::compression;

fuzz_target!(|data: &[u8]| {
    // Erste zwei Bytes: Transpositionsbreite, Rest: Records
    if data.len() < 2 {
        return;
    }
    let columns = usize::from(u16::from_le_bytes([data[0], data[1]]));
    let records = &data[2..];

    let transposed = compression::transpose(records, columns);
    assert_eq!(compression::untranspose(&transposed, columns), records);

    let packed = compression::zlib_compress(&transposed).unwrap();
    let inflated = compression::zlib_decompress(&packed, transposed.len() as u64).unwrap();
    assert_eq!(inflated, transposed);

    let _ = compression::zlib_decompress(records, 4096);
});
