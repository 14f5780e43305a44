//! Writing archive members out to the host filesystem.

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{fchown, symlink, DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use crate::defs::{S_IFDIR, S_IFLNK, S_IFMT, S_IFREG};
use crate::{Entry, Error};

/// Build a filesystem path from raw archive name bytes.
pub(crate) fn path_from_name(name: &[u8]) -> &Path {
    Path::new(OsStr::from_bytes(name))
}

/// Write one entry to `dest`. Anything already at the destination is
/// unlinked first (an existing directory only if empty). Entry types other
/// than directory, regular file and symlink are ignored. Parent directories
/// are not created.
pub(crate) fn extract_entry(name: &[u8], dest: &Path, entry: &dyn Entry) -> Result<(), Error> {
    eprintln!(
        "Extract [{}] to [{}]",
        String::from_utf8_lossy(name),
        dest.display()
    );
    let _ = fs::remove_file(dest);
    let _ = fs::remove_dir(dest);

    let perm = entry.mode() & 0o777;
    match entry.mode() & S_IFMT {
        S_IFDIR => {
            fs::DirBuilder::new().mode(perm).create(dest)?;
            // the creation mode is subject to the umask
            fs::set_permissions(dest, fs::Permissions::from_mode(perm))?;
        }
        S_IFREG => {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(perm)
                .open(dest)?;
            file.write_all(entry.payload())?;
            file.set_permissions(fs::Permissions::from_mode(perm))?;
            // chown needs privilege; best effort
            let _ = fchown(&file, Some(entry.uid()), Some(entry.gid()));
        }
        S_IFLNK => {
            symlink(path_from_name(entry.payload()), dest)?;
        }
        _ => {}
    }
    Ok(())
}
