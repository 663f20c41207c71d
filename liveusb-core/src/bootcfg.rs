//! Rewrites the disc's isolinux configuration into a syslinux one.
//!
//! On the disc the kernel finds its root filesystem through `CDLABEL=`, which
//! means nothing on a FAT volume. Every line that mentions it is pointed at
//! the volume label instead and its `rootfstype=` is switched to `vfat`.
//! All other lines are copied byte for byte.
use crate::error::{InstallError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const CONTENT_LABEL: &str = "CDLABEL";
const FSTYPE_KEY: &str = "rootfstype=";
const FAT_FSTYPE: &str = "vfat";

/// Replaces every space-delimited run that starts at `key` with `replacement`.
///
/// `key` may start mid-token: `root=live:CDLABEL=X` becomes
/// `root=live:LABEL=Y`. The run ends at the next space, like `key[^ ]*`.
fn substitute(line: &str, key: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for (i, token) in line.split(' ').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match token.find(key) {
            Some(at) => {
                out.push_str(&token[..at]);
                out.push_str(replacement);
            }
            None => out.push_str(token),
        }
    }
    out
}

/// Rewrites a single line, without its terminator.
pub fn rewrite_line(line: &str, label: &str) -> String {
    if !line.contains(CONTENT_LABEL) {
        return line.to_string();
    }
    let line = substitute(line, "CDLABEL=", &format!("LABEL={label}"));
    substitute(&line, FSTYPE_KEY, &format!("{FSTYPE_KEY}{FAT_FSTYPE}"))
}

/// Rewrites a whole configuration file.
///
/// Line order, line count and each line's terminator (`\n`, `\r\n`, or none
/// on the last line) are preserved.
pub fn rewrite_config(text: &str, label: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    for line in text.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix("\r\n") {
            Some(body) => (body, "\r\n"),
            None => match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            },
        };
        out.push_str(&rewrite_line(body, label));
        out.push_str(ending);
    }
    out
}

/// Reads `boot_dir/source`, rewrites it for `label` and writes it to
/// `boot_dir/target`.
///
/// The output goes to a temporary file in `boot_dir` that is renamed over
/// `target` only once fully written, so a failure never leaves a partial
/// configuration behind. The source file is left in place.
///
/// # Errors
///
/// Returns [`InstallError::ConfigRead`] if the source cannot be read and
/// [`InstallError::ConfigWrite`] if the target cannot be written.
pub fn rewrite_boot_config(boot_dir: &Path, source: &str, target: &str, label: &str) -> Result<()> {
    let source_path = boot_dir.join(source);
    let target_path = boot_dir.join(target);

    let text = fs::read_to_string(&source_path).map_err(|e| InstallError::ConfigRead {
        path: source_path.clone(),
        source: e,
    })?;
    let rewritten = rewrite_config(&text, label);
    debug!(lines = text.lines().count(), "rewrote boot configuration");

    let write_error = |e: io::Error| InstallError::ConfigWrite {
        path: target_path.clone(),
        source: e,
    };
    let mut tmp = NamedTempFile::new_in(boot_dir).map_err(write_error)?;
    tmp.write_all(rewritten.as_bytes()).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    tmp.persist(&target_path).map_err(|e| write_error(e.error))?;

    info!(config = %target_path.display(), label, "wrote boot configuration");
    Ok(())
}
