//! Read-only archive over a memory mapping. Entries borrow the mapping, so
//! the borrow checker keeps them from outliving it.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use fallible_iterator::FallibleIterator;
use memmap2::Mmap;

use crate::extract::{extract_entry, path_from_name};
use crate::record::{check_magic, Records};
use crate::rw::CpioEntry;
use crate::{Entry, Error};

/// Borrowed archive member; the payload points into the mapping.
#[derive(Debug, Clone, Copy)]
pub struct ViewEntry<'a> {
    pub(crate) mode: u32,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) data: &'a [u8],
}

impl ViewEntry<'_> {
    /// Copy into an owned entry named `name`.
    pub fn into_owned(self, name: &[u8]) -> CpioEntry {
        CpioEntry {
            filename: name.to_vec(),
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            data: self.data.to_vec(),
        }
    }
}

impl Entry for ViewEntry<'_> {
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
        self.data
    }
}

/// Parsed read-only archive borrowing `buf`. Supports lookup and extraction
/// only; mutation and serialization need `CpioArchive`.
pub struct CpioView<'a> {
    entries: BTreeMap<&'a [u8], ViewEntry<'a>>,
}

impl<'a> CpioView<'a> {
    /// Parse a newc stream in place. Compressed input is rejected here;
    /// inflate first or go through `CpioArchive::load`.
    pub fn parse(buf: &'a [u8]) -> Result<Self, Error> {
        check_magic(buf)?;
        let mut entries = BTreeMap::new();
        let mut records = Records::new(buf);
        while let Some(record) = records.next()? {
            entries.insert(
                record.name,
                ViewEntry {
                    mode: record.header.mode,
                    uid: record.header.uid,
                    gid: record.header.gid,
                    data: record.data,
                },
            );
        }
        Ok(CpioView { entries })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name.as_bytes())
    }

    pub fn get(&self, name: &str) -> Option<ViewEntry<'a>> {
        self.entries.get(name.as_bytes()).copied()
    }

    /// Entries and their names in ascending byte-wise name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], ViewEntry<'a>)> + '_ {
        self.entries.iter().map(|(name, entry)| (*name, *entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extract every entry below `root`; see `CpioArchive::extract_all`.
    pub fn extract_all(&self, root: &Path) -> Result<(), Error> {
        for (name, entry) in &self.entries {
            extract_entry(name, &root.join(path_from_name(name)), entry)?;
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
}

/// Owning handle for a file mapped read-only.
pub struct CpioMapped {
    mmap: Mmap,
}

impl CpioMapped {
    /// Map `path` read-only. The mapping is released when the value drops.
    pub fn load(path: &Path) -> Result<Self, Error> {
        eprintln!("Loading cpio: [{}]", path.display());
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(CpioMapped { mmap })
    }

    /// Parse the mapping. The view and every entry in it borrow `self`.
    pub fn view(&self) -> Result<CpioView<'_>, Error> {
        CpioView::parse(&self.mmap)
    }
}
