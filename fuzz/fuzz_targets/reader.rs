#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(file) = mdf4_fixtures::MdfFile::from_bytes(data, None) {
        // Alles was gelesen wird, muss sich auch exportieren lassen
        let mut out = Vec::new();
        let _ = mdf4_fixtures::write_csv(&file, &mut out);
    }
});
