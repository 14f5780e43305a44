use clap::{Parser, Subcommand};

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::exit;

use ecpio::{mode_str, CpioArchive, CpioMapped, Entry};

type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
struct CmdArgs {
    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a cpio archive from a directory
    Ar {
        /// Path to the directory to archive
        directory_path: PathBuf,

        /// Output path for the created archive
        output_path: PathBuf,

        /// Compress the archive in gzip format
        #[clap(short = 'g', long, action)]
        gzip: bool,
    },
    /// List the files in a cpio archive
    Ls {
        /// Path to the cpio archive to inspect
        archive_path: PathBuf,
    },
    /// Print a single file from a cpio archive to stdout
    Cat {
        archive_path: PathBuf,

        /// Path of the file inside the archive
        internal_path: String,
    },
    /// Extract the archive, or a single entry, to disk
    Extract {
        archive_path: PathBuf,

        /// Entry to extract (everything when omitted)
        internal_path: Option<String>,

        /// Destination for a single extracted entry (defaults to the
        /// entry's own path)
        dest: Option<PathBuf>,
    },
    /// Check whether an entry exists; exits 0 when it does
    Exists {
        archive_path: PathBuf,
        internal_path: String,
    },
    /// Insert a regular file into an archive
    Add {
        archive_path: PathBuf,

        /// Permission bits, octal
        mode: String,

        internal_path: String,

        /// File providing the payload
        file_path: PathBuf,
    },
    /// Insert a directory entry into an archive
    Mkdir {
        archive_path: PathBuf,

        /// Permission bits, octal
        mode: String,

        internal_path: String,
    },
    /// Insert a symlink entry into an archive
    Ln {
        archive_path: PathBuf,

        /// Link target
        target: String,

        internal_path: String,
    },
    /// Rename an entry, displacing any entry already using the new name
    Mv {
        archive_path: PathBuf,
        from: String,
        to: String,
    },
    /// Remove an entry
    Rm {
        archive_path: PathBuf,
        internal_path: String,

        /// Also remove everything under the named path
        #[clap(short = 'r', long, action)]
        recursive: bool,
    },
}

fn parse_mode(mode: &str) -> Result<u32> {
    Ok(u32::from_str_radix(mode, 8)?)
}

/// Walk `dir` and stage every file, directory and symlink under it.
fn archive_dir(dir: &Path) -> Result<CpioArchive> {
    let mut archive = CpioArchive::new();
    for walked in walkdir::WalkDir::new(dir) {
        let walked = walked?;
        let rel = walked.path().strip_prefix(dir)?;
        let Some(name) = rel.to_str() else { continue };
        if name.is_empty() {
            continue;
        }
        let meta = walked.path().symlink_metadata()?;
        let perm = meta.permissions().mode() & 0o777;
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(walked.path())?;
            archive.ln(&target.to_string_lossy(), name);
        } else if meta.is_dir() {
            archive.mkdir(perm, name);
        } else if meta.is_file() {
            archive.add(perm, name, walked.path())?;
        }
    }
    Ok(archive)
}

fn main() -> Result<()> {
    let args = CmdArgs::parse();
    match args.commands {
        Commands::Ar {
            directory_path,
            output_path,
            gzip,
        } => {
            let archive = archive_dir(&directory_path)?;
            if gzip {
                archive.dump_gzip(&output_path)?;
            } else {
                archive.dump(&output_path)?;
            }
        }
        Commands::Ls { archive_path } => {
            let mapped = CpioMapped::load(&archive_path)?;
            let cpio = mapped.view()?;
            for (name, entry) in cpio.iter() {
                if entry.is_link() {
                    println!(
                        "{} {:>4} {:>4} {:>8} {} -> {}",
                        mode_str(entry.mode())?,
                        entry.uid(),
                        entry.gid(),
                        entry.payload().len(),
                        String::from_utf8_lossy(name),
                        String::from_utf8_lossy(entry.payload()),
                    );
                } else {
                    println!(
                        "{} {:>4} {:>4} {:>8} {}",
                        mode_str(entry.mode())?,
                        entry.uid(),
                        entry.gid(),
                        entry.payload().len(),
                        String::from_utf8_lossy(name),
                    );
                }
            }
        }
        Commands::Cat {
            archive_path,
            internal_path,
        } => {
            let mapped = CpioMapped::load(&archive_path)?;
            let cpio = mapped.view()?;
            match cpio.get(&internal_path) {
                Some(entry) if entry.is_file() => {
                    std::io::stdout().write_all(entry.payload())?;
                }
                Some(_) => {
                    eprintln!("Cat is only supported for regular files!");
                    exit(1);
                }
                None => {
                    eprintln!("No file found in archive for path: '{internal_path}'");
                    exit(1);
                }
            }
        }
        Commands::Extract {
            archive_path,
            internal_path,
            dest,
        } => {
            let mapped = CpioMapped::load(&archive_path)?;
            let cpio = mapped.view()?;
            match internal_path {
                Some(name) => {
                    let dest = dest.unwrap_or_else(|| PathBuf::from(&name));
                    if !cpio.extract(&name, &dest)? {
                        exit(1);
                    }
                }
                None => cpio.extract_all(Path::new("."))?,
            }
        }
        Commands::Exists {
            archive_path,
            internal_path,
        } => {
            let mapped = CpioMapped::load(&archive_path)?;
            if !mapped.view()?.exists(&internal_path) {
                exit(1);
            }
        }
        Commands::Add {
            archive_path,
            mode,
            internal_path,
            file_path,
        } => {
            let mut archive = CpioArchive::load(&archive_path)?;
            archive.add(parse_mode(&mode)?, &internal_path, &file_path)?;
            archive.dump(&archive_path)?;
        }
        Commands::Mkdir {
            archive_path,
            mode,
            internal_path,
        } => {
            let mut archive = CpioArchive::load(&archive_path)?;
            archive.mkdir(parse_mode(&mode)?, &internal_path);
            archive.dump(&archive_path)?;
        }
        Commands::Ln {
            archive_path,
            target,
            internal_path,
        } => {
            let mut archive = CpioArchive::load(&archive_path)?;
            archive.ln(&target, &internal_path);
            archive.dump(&archive_path)?;
        }
        Commands::Mv {
            archive_path,
            from,
            to,
        } => {
            let mut archive = CpioArchive::load(&archive_path)?;
            if !archive.mv(&from, &to) {
                exit(1);
            }
            archive.dump(&archive_path)?;
        }
        Commands::Rm {
            archive_path,
            internal_path,
            recursive,
        } => {
            let mut archive = CpioArchive::load(&archive_path)?;
            archive.rm(&internal_path, recursive);
            archive.dump(&archive_path)?;
        }
    }

    Ok(())
}
