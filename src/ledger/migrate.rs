use crate::ledger::store::LedgerError;
use crate::shared::fs_atomic::atomic_write_file;
use chrono::Local;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Upgrades a legacy space-delimited ledger to the tab-delimited schema.
/// The original file is copied to `<path>.<YYYYMMDD>.bak` first. Detection is
/// by the first line only: a line without a tab is legacy. Idempotent; the
/// second run sees tabs and returns `false`.
pub fn migrate_if_needed(path: &Path) -> Result<bool, LedgerError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(false),
        Err(source) => return Err(io_error(path, source)),
    };
    let first_line = match raw.lines().next() {
        Some(line) if !line.is_empty() => line,
        _ => return Ok(false),
    };
    if first_line.contains('\t') {
        return Ok(false);
    }

    let backup = path.with_file_name(format!(
        "{}.{}.bak",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("ledger"),
        Local::now().format("%Y%m%d"),
    ));
    fs::copy(path, &backup).map_err(|source| io_error(&backup, source))?;

    let migrated = raw.replace(' ', "\t");
    atomic_write_file(path, migrated.as_bytes()).map_err(|source| io_error(path, source))?;
    Ok(true)
}

fn io_error(path: &Path, source: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.display().to_string(),
        source,
    }
}
