//! JSON file helpers
//!
//! Every store persists pretty-printed JSON with a 4-space indent so
//! the on-disk files can be inspected and diffed by hand. Writes are
//! not atomic; readers therefore treat any unreadable or unparseable
//! file as absent and skip it.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Read and parse a JSON file.
///
/// Returns `None` on any failure (missing file, I/O error, parse
/// error); the per-file skip policy means callers never distinguish
/// these.
pub fn read_file(path: &Path) -> Option<Value> {
    let file = File::open(path).ok()?;
    serde_json::from_reader(BufReader::new(file)).ok()
}

/// Serialize a value to a file, pretty-printed with a 4-space indent.
pub fn write_file<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut ser)?;
    writer.flush()
}
