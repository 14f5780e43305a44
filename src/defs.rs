pub(crate) const NEWC_MAGIC: &[u8] = b"070701";
pub(crate) const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Name of the sentinel record terminating an archive
pub(crate) const TRAILER_NAME: &[u8] = b"TRAILER!!!";

pub(crate) const CPIO_MAGIC_LEN: usize = 6;
pub(crate) const CPIO_FIELD_LEN: usize = 8;

/// Total size of a newc cpio entry header
pub(crate) const CPIO_HEADER_LEN: usize = 110;

/// Inode numbers are synthesized on write, counting up from here
pub(crate) const DUMP_INO_BASE: u32 = 300000;

/// POSIX file mode constants
pub const S_IFMT  : u32 = 0o170000; // bit mask for the file type bit field
pub const S_IFSOCK: u32 = 0o140000; // socket
pub const S_IFLNK : u32 = 0o120000; // symbolic link
pub const S_IFREG : u32 = 0o100000; // regular file
pub const S_IFBLK : u32 = 0o060000; // block device
pub const S_IFDIR : u32 = 0o040000; // directory
pub const S_IFCHR : u32 = 0o020000; // character device
pub const S_IFIFO : u32 = 0o010000; // FIFO
pub(crate) const MODE_R: u32 = 0o04;
pub(crate) const MODE_W: u32 = 0o02;
pub(crate) const MODE_X: u32 = 0o01;
