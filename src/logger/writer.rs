//! File writer for the logger, rotating by size

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::logger::config::FileConfig;
use crate::logger::error::LoggerError;
use crate::logger::rotation::RotationManager;

/// Shared log file handle.
///
/// A failed write switches the writer to stderr for the rest of the
/// process so log lines are never lost silently. Once the bytes written
/// reach `rotation.max_size` the file is rotated and reopened.
#[derive(Clone)]
pub struct LogFileWriter {
    state: Arc<Mutex<WriterState>>,
}

struct WriterState {
    file: File,
    path: PathBuf,
    size: u64,
    rotation: RotationManager,
    fallback: bool,
}

impl WriterState {
    fn rotate(&mut self) {
        if let Err(e) = self.file.flush() {
            eprintln!("[Logger] Flush before rotation failed: {}", e);
        }
        // a failed rename keeps the current file; the size resets so the
        // next attempt waits for another max_size worth of output
        self.size = 0;
        if let Err(e) = self.rotation.rotate(&self.path) {
            eprintln!("[Logger] Log rotation failed: {}", e);
            return;
        }
        match open_log_file(&self.path, true) {
            Ok(file) => self.file = file,
            Err(e) => {
                self.fallback = true;
                eprintln!("[Logger] Reopening log file failed, falling back to stderr: {}", e);
            }
        }
    }
}

impl LogFileWriter {
    pub fn new(config: &FileConfig) -> Result<Self, LoggerError> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = open_log_file(&config.path, config.append)?;
        let size = file.metadata()?.len();
        Ok(Self {
            state: Arc::new(Mutex::new(WriterState {
                file,
                path: config.path.clone(),
                size,
                rotation: RotationManager::new(config.rotation),
                fallback: false,
            })),
        })
    }

    pub fn is_in_fallback_mode(&self) -> bool {
        self.state.lock().map(|s| s.fallback).unwrap_or(false)
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileGuard {
            state: self.state.clone(),
        }
    }
}

pub struct LogFileGuard {
    state: Arc<Mutex<WriterState>>,
}

impl Write for LogFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("Failed to acquire writer lock"))?;

        if state.fallback {
            return io::stderr().write(buf);
        }

        match state.file.write(buf) {
            Ok(written) => {
                state.size += written as u64;
                if state.rotation.should_rotate(state.size) {
                    state.rotate();
                }
                Ok(written)
            }
            Err(e) => {
                state.fallback = true;
                eprintln!("[Logger] File write failed, falling back to stderr: {}", e);
                io::stderr().write(buf)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("Failed to acquire writer lock"))?;

        if state.fallback {
            return io::stderr().flush();
        }
        state.file.flush()
    }
}

fn open_log_file(path: &Path, append: bool) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
}
