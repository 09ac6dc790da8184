use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::domain::export::DEFAULT_EXPORT_FILENAME;
use crate::domain::models::ExportFile;
use crate::log;

/// Writes a downloaded export into `dir` and returns the final path.
/// Existing files are left alone; a numbered name is picked instead.
pub fn save_export(dir: &Path, file: &ExportFile) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = sanitize_filename(&file.filename);

    for attempt in 0..1000 {
        let candidate = dir.join(numbered_name(&name, attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut handle) => {
                handle.write_all(&file.bytes)?;
                log!("Export saved to {} ({} bytes)", candidate.display(), file.bytes.len());
                return Ok(candidate);
            }
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(error) => return Err(error),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("demasiados archivos llamados {name}"),
    ))
}

/// Keeps only the last path component of a server-supplied name.
fn sanitize_filename(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .trim_start_matches('.');
    if name.is_empty() {
        DEFAULT_EXPORT_FILENAME.to_string()
    } else {
        name.to_string()
    }
}

fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({attempt}).{ext}"),
        _ => format!("{name} ({attempt})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(name: &str, bytes: &[u8]) -> ExportFile {
        ExportFile {
            filename: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn writes_payload_under_the_given_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_export(dir.path(), &export("ana.xlsx", b"PK\x03\x04")).unwrap();
        assert_eq!(path, dir.path().join("ana.xlsx"));
        assert_eq!(fs::read(path).unwrap(), b"PK\x03\x04");
    }

    #[test]
    fn never_overwrites_previous_downloads() {
        let dir = tempfile::tempdir().unwrap();
        save_export(dir.path(), &export("ana.xlsx", b"one")).unwrap();
        let second = save_export(dir.path(), &export("ana.xlsx", b"two")).unwrap();
        assert_eq!(second, dir.path().join("ana (1).xlsx"));
        assert_eq!(fs::read(dir.path().join("ana.xlsx")).unwrap(), b"one");
    }

    #[test]
    fn strips_directories_from_server_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_export(dir.path(), &export("../../etc/passwd", b"x")).unwrap();
        assert_eq!(path, dir.path().join("passwd"));

        let path = save_export(dir.path(), &export("reports/", b"x")).unwrap();
        assert_eq!(path, dir.path().join(DEFAULT_EXPORT_FILENAME));
    }
}
