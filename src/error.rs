// Host-visible error taxonomy. The guest ISA has no fault mechanism of its
// own (see machine::Machine::step) -- everything here is raised either while
// parsing the command line or while a disk controller touches its backing
// file.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BedrockError {
    /// Wrong number of command-line arguments.
    ArgCount,
    /// A disk path argument was neither `--` nor an existing file.
    DiskPath { slot: u8, path: PathBuf },
    /// A host I/O operation (disk seek/read/write, stdin read) failed.
    Io(io::Error),
}

impl fmt::Display for BedrockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgCount => write!(f, "usage: bedrock <disk0-path> <disk1-path>"),
            Self::DiskPath { slot, path } => {
                write!(f, "disk{}: cannot open {}", slot, path.display())
            }
            Self::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for BedrockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BedrockError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
