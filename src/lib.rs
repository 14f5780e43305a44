mod defs;
mod extract;
mod header;
mod record;
mod rw;
mod view;

pub use defs::{S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK};
pub use rw::{CpioArchive, CpioEntry};
pub use view::{CpioMapped, CpioView, ViewEntry};

/// Error type for reading and writing cpio archives
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid archive format: {0}")]
    InvalidArchive(String),

    #[error("Unexpected end of archive")]
    UnexpectedEof,

    #[error("Invalid or unsupported posix file mode: {0}")]
    FileMode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Common surface of owned and borrowed archive entries.
pub trait Entry {
    fn mode(&self) -> u32;
    fn uid(&self) -> u32;
    fn gid(&self) -> u32;

    /// Payload bytes: file contents for regular files, the link target for
    /// symlinks, empty for directories.
    fn payload(&self) -> &[u8];

    fn is_dir(&self) -> bool {
        self.mode() & S_IFMT == S_IFDIR
    }

    fn is_file(&self) -> bool {
        self.mode() & S_IFMT == S_IFREG
    }

    fn is_link(&self) -> bool {
        self.mode() & S_IFMT == S_IFLNK
    }
}

/// Convert the file permissions portion of a file mode to a representative string
fn mode_perm_to_str(mode: u32, shift: u32) -> String {
    let mode = (mode >> shift) & 0o7;
    let mut perm_string = String::new();

    if mode & defs::MODE_R != 0 {
        perm_string.push('r');
    } else {
        perm_string.push('-');
    }

    if mode & defs::MODE_W != 0 {
        perm_string.push('w');
    } else {
        perm_string.push('-');
    }

    if mode & defs::MODE_X != 0 {
        perm_string.push('x');
    } else {
        perm_string.push('-');
    }

    perm_string
}

/// Convert the octal representation of a file mode to a representative string
pub fn mode_str(mode: u32) -> Result<String, Error> {
    let mut mode_str = String::new();

    match mode & S_IFMT {
        S_IFSOCK => mode_str.push('s'),
        S_IFLNK => mode_str.push('l'),
        S_IFREG => mode_str.push('-'),
        S_IFBLK => mode_str.push('b'),
        S_IFDIR => mode_str.push('d'),
        S_IFCHR => mode_str.push('c'),
        S_IFIFO => mode_str.push('p'),
        _ => return Err(Error::FileMode(format!("{mode:o}"))),
    }

    mode_str.push_str(&mode_perm_to_str(mode, 6));
    mode_str.push_str(&mode_perm_to_str(mode, 3));
    mode_str.push_str(&mode_perm_to_str(mode, 0));

    Ok(mode_str)
}
