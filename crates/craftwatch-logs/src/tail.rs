use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::TailError;

/// What to do when the file is found shorter than the read offset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Start again from the top of the (rotated or truncated) file
    #[default]
    Rewind,
    /// Wait until the file grows past the old offset
    Ignore,
}

/// Reader state between and during cycles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailState {
    Idle,
    Reading,
    /// The last cycle failed; offset and partial line were kept for a retry
    Error,
}

/// Incremental reader for an append-only log file.
///
/// Each call to [`TailReader::read_new_lines`] reads the bytes appended since
/// the previous successful call and returns the complete lines among them in
/// file order. An unterminated trailing line is held back until a later read
/// completes it.
#[derive(Debug)]
pub struct TailReader {
    path: PathBuf,

    /// Bytes of the file already consumed
    offset: u64,

    /// Unterminated tail of the last read, kept as raw bytes so a UTF-8
    /// sequence split across reads decodes correctly
    partial: Vec<u8>,

    state: TailState,
    policy: TruncationPolicy,
}

impl TailReader {
    /// Start tailing at the current end of `path`; earlier lines are not
    /// replayed.
    pub fn open(path: impl Into<PathBuf>, policy: TruncationPolicy) -> Result<Self, TailError> {
        let path = path.into();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(TailError::Missing(path)),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(TailError::Missing(path));
        }
        // Fail now rather than on the first change if we cannot read it
        File::open(&path)?;

        info!(path = %path.display(), offset = metadata.len(), "tailing log file");
        Ok(Self::from_offset(path, metadata.len(), policy))
    }

    /// Reader that resumes at an explicit byte offset
    pub fn from_offset(path: impl Into<PathBuf>, offset: u64, policy: TruncationPolicy) -> Self {
        Self {
            path: path.into(),
            offset,
            partial: Vec::new(),
            state: TailState::Idle,
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    /// Carried-over unterminated line
    pub fn partial_line(&self) -> String {
        String::from_utf8_lossy(&self.partial).into_owned()
    }

    /// Read everything appended since the last cycle and return the complete
    /// lines.
    ///
    /// On error the offset and partial line are left untouched so the next
    /// call retries the same range.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>, TailError> {
        self.state = TailState::Reading;
        match self.read_cycle() {
            Ok(lines) => {
                self.state = TailState::Idle;
                Ok(lines)
            }
            Err(e) => {
                self.state = TailState::Error;
                Err(e)
            }
        }
    }

    fn read_cycle(&mut self) -> Result<Vec<String>, TailError> {
        let mut file = File::open(&self.path)?;
        let size = file.metadata()?.len();

        if size < self.offset {
            match self.policy {
                TruncationPolicy::Ignore => {
                    debug!(size, offset = self.offset, "log shrank, waiting for it to grow");
                    return Ok(Vec::new());
                }
                TruncationPolicy::Rewind => {
                    info!(size, offset = self.offset, "log truncated or rotated, rewinding");
                    self.offset = 0;
                    self.partial.clear();
                }
            }
        }

        if size == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = Vec::new();
        file.take(size - self.offset).read_to_end(&mut chunk)?;

        self.partial.extend_from_slice(&chunk);
        let lines = drain_complete_lines(&mut self.partial);
        self.offset = size;

        debug!(bytes = chunk.len(), lines = lines.len(), offset = size, "read log growth");
        Ok(lines)
    }
}

/// Remove every `\n`-terminated line from the front of `buf`, leaving the
/// unterminated remainder in place. A `\r` before the newline is dropped.
fn drain_complete_lines(buf: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };

    let rest = buf.split_off(last_newline + 1);
    let complete = std::mem::replace(buf, rest);

    complete[..last_newline]
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect()
}
