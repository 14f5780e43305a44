use ecpio::{CpioArchive, CpioMapped, Entry, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG};
use hexdump::hexdump;
use tempdir::TempDir;

use std::fs::{read, read_link, symlink_metadata, write};
use std::os::unix::fs::PermissionsExt;

#[test]
fn empty_archive_round_trip() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let path = tmpdir.path().join("empty.cpio");

    CpioArchive::new().dump(&path)?;

    let data = read(&path)?;
    hexdump(&data);
    // one trailer record: header, name, padding to the next boundary
    assert_eq!(data.len(), 124);
    assert_eq!(&data[..6], b"070701");
    assert_eq!(&data[6..14], b"000493e0"); // ino counter start
    assert_eq!(&data[38..46], b"00000001"); // nlink
    assert_eq!(&data[94..102], b"0000000b"); // namesize
    assert_eq!(&data[110..121], b"TRAILER!!!\0");
    assert!(data[121..].iter().all(|b| *b == 0));

    let archive = CpioArchive::load(&path)?;
    assert!(archive.is_empty());
    Ok(())
}

#[test]
fn trailer_only_archive_parses_empty() -> Result<(), ecpio::Error> {
    let mut data = format!(
        "070701{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}{:08x}",
        0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 11, 0
    )
    .into_bytes();
    data.extend_from_slice(b"TRAILER!!!\0");
    data.resize(124, 0);

    let archive = CpioArchive::parse(&data)?;
    assert!(archive.is_empty());
    Ok(())
}

#[test]
fn single_file_dump_layout() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let payload = tmpdir.path().join("payload");
    write(&payload, b"hi\n")?;

    let mut archive = CpioArchive::new();
    archive.add(0o644, "hello", &payload)?;
    let path = tmpdir.path().join("single.cpio");
    archive.dump(&path)?;

    let data = read(&path)?;
    hexdump(&data);

    assert_eq!(&data[..6], b"070701");
    assert_eq!(&data[14..22], b"000081a4"); // S_IFREG | 0644
    assert_eq!(&data[54..62], b"00000003"); // filesize
    assert_eq!(&data[94..102], b"00000006"); // namesize
    assert_eq!(&data[110..116], b"hello\0");
    // header plus name already sit on a 4-byte boundary
    assert_eq!(&data[116..119], b"hi\n");
    assert_eq!(data[119], 0);
    // trailer record follows the padded payload
    assert_eq!(&data[120..126], b"070701");
    assert_eq!(&data[126..134], b"000493e1"); // ino counter advanced once
    assert_eq!(&data[214..222], b"0000000b");
    assert_eq!(&data[230..241], b"TRAILER!!!\0");
    assert_eq!(data.len(), 244);

    let reloaded = CpioArchive::load(&path)?;
    assert_eq!(reloaded.len(), 1);
    let entry = reloaded.get("hello").unwrap();
    assert_eq!(entry.mode(), S_IFREG | 0o644);
    assert_eq!(entry.payload(), b"hi\n");
    Ok(())
}

#[test]
fn dir_and_symlink_round_trip() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let path = tmpdir.path().join("etc.cpio");

    let mut archive = CpioArchive::new();
    archive.mkdir(0o755, "etc");
    archive.ln("../run", "etc/mtab");
    archive.dump(&path)?;

    let reloaded = CpioArchive::load(&path)?;
    assert_eq!(reloaded.len(), 2);

    let etc = reloaded.get("etc").unwrap();
    assert_eq!(etc.mode() & S_IFMT, S_IFDIR);
    assert_eq!(etc.mode() & 0o777, 0o755);
    assert_eq!(etc.filesize(), 0);

    let mtab = reloaded.get("etc/mtab").unwrap();
    assert_eq!(mtab.mode() & S_IFMT, S_IFLNK);
    assert_eq!(mtab.payload(), b"../run");
    assert_eq!(mtab.filesize(), 6);
    Ok(())
}

#[test]
fn malformed_mode_field_recovers() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let payload = tmpdir.path().join("payload");
    write(&payload, b"A")?;

    let mut archive = CpioArchive::new();
    archive.add(0o644, "aaa", &payload)?;
    archive.add(0o600, "zzz", &payload)?;
    let path = tmpdir.path().join("broken.cpio");
    archive.dump(&path)?;

    let mut data = read(&path)?;
    // clobber the last digit of the first record's mode field
    assert_eq!(&data[14..22], b"000081a4");
    data[21] = b'g';

    let reloaded = CpioArchive::parse(&data)?;
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("aaa").unwrap().mode(), 0);
    assert_eq!(reloaded.get("zzz").unwrap().mode(), S_IFREG | 0o600);
    assert_eq!(reloaded.get("zzz").unwrap().payload(), b"A");
    Ok(())
}

#[test]
fn mapped_view_matches_owned_load() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let payload = tmpdir.path().join("payload");
    write(&payload, b"contents")?;

    let mut archive = CpioArchive::new();
    archive.mkdir(0o755, "dir");
    archive.add(0o640, "dir/file", &payload)?;
    archive.ln("file", "dir/link");
    let path = tmpdir.path().join("both.cpio");
    archive.dump(&path)?;

    let mapped = CpioMapped::load(&path)?;
    let view = mapped.view()?;
    let loaded = CpioArchive::load(&path)?;

    assert_eq!(view.len(), loaded.len());
    for (name, entry) in view.iter() {
        let name = std::str::from_utf8(name).unwrap();
        let owned = loaded.get(name).unwrap();
        assert_eq!(entry.mode(), owned.mode());
        assert_eq!(entry.uid(), owned.uid());
        assert_eq!(entry.gid(), owned.gid());
        assert_eq!(entry.payload(), owned.payload());
    }
    assert!(view.exists("dir/file"));
    assert!(!view.exists("dir/none"));
    Ok(())
}

#[test]
fn extract_all_materializes_entries() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let payload = tmpdir.path().join("payload");
    write(&payload, b"meow")?;

    let mut archive = CpioArchive::new();
    archive.mkdir(0o755, "d");
    archive.add(0o640, "d/f", &payload)?;
    archive.ln("f", "d/l");
    let path = tmpdir.path().join("tree.cpio");
    archive.dump(&path)?;

    let out = tmpdir.path().join("out");
    std::fs::create_dir(&out)?;

    let mapped = CpioMapped::load(&path)?;
    mapped.view()?.extract_all(&out)?;

    let dir_meta = symlink_metadata(out.join("d"))?;
    assert!(dir_meta.is_dir());
    assert_eq!(dir_meta.permissions().mode() & 0o777, 0o755);

    let file_meta = symlink_metadata(out.join("d/f"))?;
    assert!(file_meta.is_file());
    assert_eq!(file_meta.permissions().mode() & 0o777, 0o640);
    assert_eq!(read(out.join("d/f"))?, b"meow");

    let link_meta = symlink_metadata(out.join("d/l"))?;
    assert!(link_meta.is_symlink());
    assert_eq!(read_link(out.join("d/l"))?.as_os_str(), "f");
    Ok(())
}

#[test]
fn extract_single_entry() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let payload = tmpdir.path().join("payload");
    write(&payload, b"one")?;

    let mut archive = CpioArchive::new();
    archive.add(0o644, "member", &payload)?;
    let path = tmpdir.path().join("one.cpio");
    archive.dump(&path)?;

    let dest = tmpdir.path().join("extracted");
    let mapped = CpioMapped::load(&path)?;
    let view = mapped.view()?;
    assert!(view.extract("member", &dest)?);
    assert_eq!(read(&dest)?, b"one");
    assert!(!view.extract("missing", &tmpdir.path().join("nope"))?);
    Ok(())
}

#[test]
fn gzip_round_trip() -> Result<(), ecpio::Error> {
    let tmpdir = TempDir::new("ecpio-test")?;
    let path = tmpdir.path().join("packed.cpio.gz");

    let mut archive = CpioArchive::new();
    archive.mkdir(0o755, "dir");
    archive.ln("dir", "alias");
    archive.dump_gzip(&path)?;

    let data = read(&path)?;
    assert_eq!(&data[..2], [0x1f, 0x8b]);

    let reloaded = CpioArchive::load(&path)?;
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("alias").unwrap().payload(), b"dir");

    // the in-place facade cannot inflate
    let mapped = CpioMapped::load(&path)?;
    assert!(matches!(mapped.view(), Err(ecpio::Error::InvalidArchive(_))));
    Ok(())
}
