//! Ausgabedateien atomar schreiben (tmp-Datei + rename).
//!
//! Bei Erfolg wird die `.tmp`-Datei auf das Ziel umbenannt, bei Fehler
//! geloescht. Ein Abbruch hinterlaesst so nie eine halb geschriebene
//! Zieldatei.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// `path` mit angehaengtem `.tmp`.
fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Fails with [`Error::OutputExists`] if `path` exists and `overwrite` is off.
pub(crate) fn check_target(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(Error::OutputExists(path.display().to_string()));
    }
    Ok(())
}

/// Schreibt ueber `write` in eine tmp-Datei und benennt sie auf `path` um.
pub(crate) fn write_atomic<F>(path: &Path, overwrite: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    check_target(path, overwrite)?;
    let tmp = tmp_path(path);
    let file = File::create(&tmp)
        .map_err(|e| Error::IoError(format!("create '{}': {e}", tmp.display())))?;
    let mut writer = BufWriter::new(file);

    let result = write(&mut writer).and_then(|()| {
        writer
            .flush()
            .map_err(|e| Error::IoError(format!("write '{}': {e}", tmp.display())))
    });
    drop(writer);

    match result {
        Ok(()) => std::fs::rename(&tmp, path)
            .map_err(|e| Error::IoError(format!("rename to '{}': {e}", path.display()))),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mdf4fix_output_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn writes_and_replaces() {
        let dir = scratch("replace");
        let target = dir.join("out.bin");
        write_atomic(&target, true, |w| Ok(w.write_all(b"one")?)).unwrap();
        write_atomic(&target, true, |w| Ok(w.write_all(b"two")?)).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"two");
        assert!(!tmp_path(&target).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn refuses_existing_without_overwrite() {
        let dir = scratch("refuse");
        let target = dir.join("out.bin");
        std::fs::write(&target, b"keep").unwrap();
        let err = write_atomic(&target, false, |w| Ok(w.write_all(b"new")?)).unwrap_err();
        assert!(matches!(err, Error::OutputExists(_)));
        assert_eq!(std::fs::read(&target).unwrap(), b"keep");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_write_leaves_no_files() {
        let dir = scratch("fail");
        let target = dir.join("out.bin");
        let err = write_atomic(&target, true, |_| Err(Error::EmptyFixture)).unwrap_err();
        assert_eq!(err, Error::EmptyFixture);
        assert!(!target.exists());
        assert!(!tmp_path(&target).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
