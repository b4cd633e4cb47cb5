//! # Module sources
//!
//! Where module bytes come from. Files are streamed in fixed-size chunks so the
//! checksum is computed on the way in, without a second pass over the buffer.

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use adler::Adler32;

const CHUNK: usize = 64 * 1024;

/// Identifies the bytes to instantiate. Immutable once supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Module bytes together with their Adler-32.
#[derive(Clone, Debug)]
pub struct LoadedModule {
    pub bytes: Vec<u8>,
    pub checksum: u32,
}

impl ModuleSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Reads the source and checksums it.
    pub fn load(&self) -> std::io::Result<LoadedModule> {
        match self {
            Self::File(path) => load_file(path),
            Self::Bytes(bytes) => {
                let mut sum = Adler32::new();
                sum.update(bytes);
                Ok(LoadedModule {
                    bytes: bytes.clone(),
                    checksum: sum.finish(),
                })
            }
        }
    }
}

impl std::fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<PathBuf> for ModuleSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ModuleSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ModuleSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

fn load_file(path: &Path) -> std::io::Result<LoadedModule> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::with_capacity(file.metadata().map(|m| m.len() as usize).unwrap_or(0));
    let mut sum = Adler32::new();
    let mut chunk = vec![0u8; CHUNK];

    loop {
        let n = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sum.update(&chunk[..n]);
        bytes.extend_from_slice(&chunk[..n]);
    }

    Ok(LoadedModule {
        bytes,
        checksum: sum.finish(),
    })
}
