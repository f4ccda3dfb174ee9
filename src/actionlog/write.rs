//! Durable writes to action log files.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::LogError;

/// Append `lines` to `path`, one per line, and sync before returning.
///
/// The file is created if missing; `header` is written first in that case.
/// A torn final line left by an earlier interrupted append is cut off first.
pub fn append_lines<'a, I>(path: &Path, header: &str, lines: I) -> Result<usize, LogError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut buf = String::new();
    let mut count = 0;
    for line in lines {
        buf.push_str(line);
        buf.push('\n');
        count += 1;
    }
    if count == 0 {
        return Ok(0);
    }

    let io = |e| LogError::io(path, e);
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(io)?;
    let mut existing = Vec::new();
    file.read_to_end(&mut existing).map_err(io)?;
    let keep = existing
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    if keep < existing.len() {
        tracing::warn!(path = %path.display(), torn = existing.len() - keep, "dropping torn log line");
        file.set_len(keep as u64).map_err(io)?;
    }
    if keep == 0 {
        buf.insert_str(0, &format!("{header}\n"));
    }
    file.seek(SeekFrom::Start(keep as u64)).map_err(io)?;
    file.write_all(buf.as_bytes()).map_err(io)?;
    file.sync_all().map_err(io)?;
    Ok(count)
}

/// Replace the contents of `path` with `text` atomically: write a temporary
/// file next to it, sync it, and rename it into place.
pub fn replace_file(path: &Path, text: &str) -> Result<(), LogError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| LogError::io(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| LogError::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| LogError::io(path, e))?;
    tmp.persist(path).map_err(|e| LogError::io(path, e.error))?;
    Ok(())
}
