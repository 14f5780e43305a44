//! Mutable in-memory archive: load, edit, dump.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use fallible_iterator::FallibleIterator;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use memmap2::Mmap;

use crate::defs::{
    CPIO_HEADER_LEN, DUMP_INO_BASE, GZIP_MAGIC, S_IFDIR, S_IFLNK, S_IFREG, TRAILER_NAME,
};
use crate::extract::{extract_entry, path_from_name};
use crate::header::{align_off, NewcHeader};
use crate::record::{check_magic, Records};
use crate::{Entry, Error};

/// A single archive member owning its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpioEntry {
    /// Authoritative name; the store key always matches it
    pub(crate) filename: Vec<u8>,
    pub(crate) mode: u32,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) data: Vec<u8>,
}

impl CpioEntry {
    pub fn name(&self) -> &[u8] {
        &self.filename
    }

    pub fn filesize(&self) -> usize {
        self.data.len()
    }
}

impl Entry for CpioEntry {
    fn mode(&self) -> u32 {
        self.mode
    }

    fn uid(&self) -> u32 {
        self.uid
    }

    fn gid(&self) -> u32 {
        self.gid
    }

    fn payload(&self) -> &[u8] {
        &self.data
    }
}

/// Mutable newc archive keyed by filename. Iteration, and therefore dump
/// order, is ascending byte-wise on the name.
#[derive(Debug, Default)]
pub struct CpioArchive {
    entries: BTreeMap<Vec<u8>, CpioEntry>,
}

impl CpioArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an archive file into owned entries. Gzip-compressed input is
    /// inflated transparently.
    pub fn load(path: &Path) -> Result<Self, Error> {
        eprintln!("Loading cpio: [{}]", path.display());
        let mut buf = std::fs::read(path)?;
        if buf.starts_with(GZIP_MAGIC) {
            let mut inflated = Vec::new();
            GzDecoder::new(&buf[..]).read_to_end(&mut inflated)?;
            buf = inflated;
        }
        Self::parse(&buf)
    }

    /// Parse an uncompressed newc stream into owned entries.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        check_magic(buf)?;
        let mut archive = CpioArchive::new();
        let mut records = Records::new(buf);
        while let Some(record) = records.next()? {
            archive.insert(record.into_entry());
        }
        Ok(archive)
    }

    /// Insert `entry` under its own name, replacing any existing entry with
    /// that name.
    pub fn insert(&mut self, entry: CpioEntry) {
        self.entries.insert(entry.filename.clone(), entry);
    }

    /// Insert a regular file whose payload is read from `file`.
    pub fn add(&mut self, mode: u32, name: &str, file: &Path) -> Result<(), Error> {
        let fp = File::open(file)?;
        // an empty file cannot be mapped
        let data = if fp.metadata()?.len() == 0 {
            Vec::new()
        } else {
            let map = unsafe { Mmap::map(&fp) }?;
            map.to_vec()
        };
        self.insert(CpioEntry {
            filename: name.as_bytes().to_vec(),
            mode: S_IFREG | mode,
            uid: 0,
            gid: 0,
            data,
        });
        eprintln!("Add entry [{name}] ({mode:04o})");
        Ok(())
    }

    /// Insert a directory entry.
    pub fn mkdir(&mut self, mode: u32, name: &str) {
        self.insert(CpioEntry {
            filename: name.as_bytes().to_vec(),
            mode: S_IFDIR | mode,
            uid: 0,
            gid: 0,
            data: Vec::new(),
        });
        eprintln!("Create directory [{name}] ({mode:04o})");
    }

    /// Insert a symlink entry pointing at `target`.
    pub fn ln(&mut self, target: &str, name: &str) {
        self.insert(CpioEntry {
            filename: name.as_bytes().to_vec(),
            mode: S_IFLNK,
            uid: 0,
            gid: 0,
            data: target.as_bytes().to_vec(),
        });
        eprintln!("Create symlink [{name}] -> [{target}]");
    }

    /// Rename `from` to `to`, keeping the payload. An existing entry named
    /// `to` is displaced. Returns false if `from` is absent.
    pub fn mv(&mut self, from: &str, to: &str) -> bool {
        match self.entries.remove(from.as_bytes()) {
            Some(mut entry) => {
                eprintln!("Move [{from}] -> [{to}]");
                entry.filename = to.as_bytes().to_vec();
                self.insert(entry);
                true
            }
            None => {
                eprintln!("Cannot find entry {from}");
                false
            }
        }
    }

    /// Remove the entry named exactly `name`. With `recursive`, also remove
    /// every entry under `name/`.
    pub fn rm(&mut self, name: &str, recursive: bool) {
        let prefix = name.as_bytes();
        let victims: Vec<Vec<u8>> = self
            .entries
            .keys()
            .filter(|key| {
                key.as_slice() == prefix
                    || (recursive
                        && key.starts_with(prefix)
                        && key.get(prefix.len()) == Some(&b'/'))
            })
            .cloned()
            .collect();
        for key in victims {
            eprintln!("Remove [{}]", String::from_utf8_lossy(&key));
            self.entries.remove(&key);
            if !recursive {
                return;
            }
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name.as_bytes())
    }

    pub fn get(&self, name: &str) -> Option<&CpioEntry> {
        self.entries.get(name.as_bytes())
    }

    /// Entries in dump order.
    pub fn entries(&self) -> impl Iterator<Item = &CpioEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extract every entry below `root`, using the entry name as the
    /// relative destination. Missing parents are not created; dump order
    /// yields a directory before anything inside it.
    pub fn extract_all(&self, root: &Path) -> Result<(), Error> {
        for (key, entry) in &self.entries {
            extract_entry(key, &root.join(path_from_name(key)), entry)?;
        }
        Ok(())
    }

    /// Extract the entry named `name` to `dest`. Returns false if absent.
    pub fn extract(&self, name: &str, dest: &Path) -> Result<bool, Error> {
        match self.entries.get_key_value(name.as_bytes()) {
            Some((key, entry)) => {
                extract_entry(key, dest, entry)?;
                Ok(true)
            }
            None => {
                eprintln!("Cannot find entry {name}");
                Ok(false)
            }
        }
    }

    /// Serialize to `path` (created 0644). Inode numbers are synthesized
    /// from a counter, nlink is forced to 1 so hard links are split, and
    /// mtime, device numbers and the checksum are zeroed.
    pub fn dump(&self, path: &Path) -> Result<(), Error> {
        eprintln!("Dump cpio: [{}]", path.display());
        self.dump_to(create_out(path)?)
    }

    /// Serialize gzip-compressed.
    pub fn dump_gzip(&self, path: &Path) -> Result<(), Error> {
        eprintln!("Dump cpio: [{}]", path.display());
        let mut encoder = GzEncoder::new(create_out(path)?, Compression::default());
        self.dump_to(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    fn dump_to<W: Write>(&self, mut out: W) -> Result<(), Error> {
        let mut ino = DUMP_INO_BASE;
        let mut written = 0usize;
        for (key, entry) in &self.entries {
            let header = NewcHeader {
                ino,
                mode: entry.mode,
                uid: entry.uid,
                gid: entry.gid,
                nlink: 1,
                mtime: 0,
                filesize: entry.data.len() as u32,
                devmajor: 0,
                devminor: 0,
                rdevmajor: 0,
                rdevminor: 0,
                namesize: key.len() as u32 + 1,
                check: 0,
            };
            ino += 1;
            out.write_all(&header.encode())?;
            out.write_all(key)?;
            out.write_all(&[0])?;
            written += CPIO_HEADER_LEN + key.len() + 1;
            written += write_pad(&mut out, written)?;
            if !entry.data.is_empty() {
                out.write_all(&entry.data)?;
                written += entry.data.len();
                written += write_pad(&mut out, written)?;
            }
        }

        let trailer = NewcHeader {
            ino,
            nlink: 1,
            namesize: TRAILER_NAME.len() as u32 + 1,
            ..Default::default()
        };
        out.write_all(&trailer.encode())?;
        out.write_all(TRAILER_NAME)?;
        out.write_all(&[0])?;
        written += CPIO_HEADER_LEN + TRAILER_NAME.len() + 1;
        write_pad(&mut out, written)?;
        Ok(())
    }
}

fn create_out(path: &Path) -> Result<File, Error> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)?;
    Ok(file)
}

fn write_pad<W: Write>(out: &mut W, pos: usize) -> Result<usize, Error> {
    let pad = align_off(pos);
    out.write_all(&[0u8; 3][..pad])?;
    Ok(pad)
}
