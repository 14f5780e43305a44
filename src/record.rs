//! Walking the records of a newc stream in place.

use fallible_iterator::FallibleIterator;

use crate::defs::{CPIO_HEADER_LEN, GZIP_MAGIC, NEWC_MAGIC, TRAILER_NAME};
use crate::header::{do_align, NewcHeader};
use crate::rw::CpioEntry;
use crate::Error;

/// Check the leading archive magic before any record is parsed.
pub(crate) fn check_magic(buf: &[u8]) -> Result<(), Error> {
    if buf.len() < NEWC_MAGIC.len() {
        return Err(Error::UnexpectedEof);
    }
    if buf.starts_with(GZIP_MAGIC) {
        return Err(Error::InvalidArchive(String::from(
            "gzip-compressed archive",
        )));
    }
    if !buf.starts_with(NEWC_MAGIC) {
        return Err(Error::InvalidArchive(String::from("unrecognized format")));
    }
    Ok(())
}

/// One archive member, borrowed from the underlying buffer.
pub(crate) struct Record<'a> {
    pub(crate) header: NewcHeader,
    /// Filename without the terminating NUL
    pub(crate) name: &'a [u8],
    /// Payload; truncated if the archive ends early
    pub(crate) data: &'a [u8],
}

impl Record<'_> {
    /// Copy into an owned entry keyed by this record's name.
    pub(crate) fn into_entry(self) -> CpioEntry {
        CpioEntry {
            filename: self.name.to_vec(),
            mode: self.header.mode,
            uid: self.header.uid,
            gid: self.header.gid,
            data: self.data.to_vec(),
        }
    }
}

/// Iterator over the content records of a newc stream. `.` and `..` records
/// are consumed and skipped; the `TRAILER!!!` record, or running out of
/// input, ends the walk.
pub(crate) struct Records<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Records<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Records { buf, pos: 0 }
    }
}

impl<'a> FallibleIterator for Records<'a> {
    type Item = Record<'a>;
    type Error = Error;

    fn next(&mut self) -> Result<Option<Record<'a>>, Error> {
        loop {
            if self.pos + CPIO_HEADER_LEN > self.buf.len() {
                return Ok(None);
            }
            let header = NewcHeader::parse(&self.buf[self.pos..self.pos + CPIO_HEADER_LEN]);
            self.pos += CPIO_HEADER_LEN;

            // namesize counts the terminating NUL
            let namesize = header.namesize as usize;
            let name_len = namesize.saturating_sub(1).min(self.buf.len() - self.pos);
            let name = &self.buf[self.pos..self.pos + name_len];
            self.pos = do_align(self.pos + namesize).min(self.buf.len());

            let filesize = header.filesize as usize;
            let data_len = filesize.min(self.buf.len() - self.pos);
            let data = &self.buf[self.pos..self.pos + data_len];
            self.pos = do_align(self.pos + filesize).min(self.buf.len());

            if name == b"." || name == b".." {
                continue;
            }
            if name == TRAILER_NAME {
                return Ok(None);
            }
            return Ok(Some(Record { header, name, data }));
        }
    }
}
