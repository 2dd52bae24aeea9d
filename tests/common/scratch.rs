// Temp-Verzeichnisse und CSV-Hilfen fuer die Integrationstests.
//
// Wird per `include!` eingebunden. Benötigte Imports:
//   use std::path::PathBuf;

/// Frisches, eindeutiges Verzeichnis unter `temp_dir`.
fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("mdf4fix-{tag}-{}-{ts}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[allow(dead_code)]
/// Zerlegt CSV ohne Quoting in Zeilen und Felder.
fn csv_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

#[allow(dead_code)]
/// Sortierte Dateinamen eines Verzeichnisses.
fn dir_listing(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
