//! Persistence collaborator: an append-only record sink.
//!
//! The session root opens its sink when it enters `Start` and closes it when
//! it stops. One row is appended per finished trial.

use chrono::Utc;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub trait RecordSink {
    /// Open the sink inside `dir`. Opening an open sink is a no-op.
    fn open(&mut self, dir: &Path) -> io::Result<()>;

    /// Append one row.
    fn append(&mut self, row: &[String]) -> io::Result<()>;

    /// Flush and close. Closing a closed sink is a no-op.
    fn close(&mut self) -> io::Result<()>;

    fn is_open(&self) -> bool;
}

/// UTC minute stamp plus participant, e.g. `2024-03-01 14.05 P01.csv`.
pub fn stamped_file_name(participant: &str, extension: &str) -> String {
    format!(
        "{} {}.{}",
        Utc::now().format("%Y-%m-%d %H.%M"),
        participant,
        extension
    )
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Comma separated rows appended to a file.
#[derive(Debug)]
pub struct CsvSink {
    file_name: String,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl CsvSink {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            path: None,
            writer: None,
        }
    }

    /// Sink whose file name is stamped with the current UTC time.
    pub fn stamped(participant: &str) -> Self {
        Self::new(stamped_file_name(participant, "csv"))
    }

    /// Where rows go, once opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl RecordSink for CsvSink {
    fn open(&mut self, dir: &Path) -> io::Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        let path = dir.join(&self.file_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn append(&mut self, row: &[String]) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "record sink is not open")
        })?;
        let line = row.iter().map(|f| escape(f)).collect::<Vec<_>>().join(", ");
        writeln!(writer, "{line}")?;
        writer.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

/// In-memory sink; clone the `rows()` handle before handing it over.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Rc<RefCell<Vec<Vec<String>>>>,
    open: bool,
    opened_in: Option<PathBuf>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Rc<RefCell<Vec<Vec<String>>>> {
        Rc::clone(&self.rows)
    }

    pub fn opened_in(&self) -> Option<&Path> {
        self.opened_in.as_deref()
    }
}

impl RecordSink for MemorySink {
    fn open(&mut self, dir: &Path) -> io::Result<()> {
        self.open = true;
        self.opened_in = Some(dir.to_path_buf());
        Ok(())
    }

    fn append(&mut self, row: &[String]) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "record sink is not open",
            ));
        }
        self.rows.borrow_mut().push(row.to_vec());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
