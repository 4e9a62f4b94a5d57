//! Append-only journal of store operations.
//!
//! Record layout: `[len: u32 LE][crc32: u32 LE][bson document bytes]`. The BSON payload
//! is `{op, collection, id?, doc?}`. On open the journal is replayed front to back. A
//! short final record, or a corrupt one that ends exactly at end of file, is a torn write
//! and is cut off so later appends start on a clean record boundary. Corruption anywhere
//! else, and any other I/O failure, fails the open and leaves the file untouched.

use crate::errors::DbError;
use crate::types::Operation;
use bson::{Bson, Document as BsonDocument, doc};
use crc32fast::Hasher as Crc32Hasher;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Upper bound for a single record; anything larger is treated as corruption.
const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// Durable sink for store operations.
pub trait StorageEngine: Send + Sync {
    fn append(&self, operation: &Operation) -> Result<(), DbError>;
    fn flush(&self) -> Result<(), DbError> {
        Ok(())
    }
}

/// Storage that keeps nothing; used by in-memory engines.
#[derive(Debug, Default)]
pub struct MemoryStorage;

impl StorageEngine for MemoryStorage {
    fn append(&self, _operation: &Operation) -> Result<(), DbError> {
        Ok(())
    }
}

pub struct Journal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").field("path", &self.path).finish()
    }
}

impl Journal {
    /// Opens (or creates) the journal at `path` and returns it together with the
    /// operations recorded so far.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, read or truncated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, Vec<Operation>), DbError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().read(true).append(true).create(true).open(&path)?;
        let file_len = file.metadata()?.len();

        let mut ops = Vec::new();
        let mut valid_len: u64 = 0;
        {
            let mut reader = BufReader::new(File::open(&path)?);
            loop {
                match read_record(&mut reader) {
                    Ok(Some((op, consumed))) => {
                        ops.push(op);
                        valid_len += consumed;
                    }
                    Ok(None) => break,
                    Err(RecordError::Short(e)) => {
                        log::warn!(
                            "journal {}: dropping torn tail at byte {valid_len}: {e}",
                            path.display()
                        );
                        break;
                    }
                    Err(RecordError::Corrupt { len, reason }) if valid_len + len == file_len => {
                        log::warn!(
                            "journal {}: dropping corrupt final record at byte {valid_len}: {reason}",
                            path.display()
                        );
                        break;
                    }
                    Err(RecordError::Corrupt { reason, .. }) => {
                        log::error!(
                            "journal {}: corrupt record at byte {valid_len} of {file_len}: {reason}",
                            path.display()
                        );
                        return Err(DbError::JournalError(format!(
                            "corrupt record at byte {valid_len} of {}: {reason}",
                            path.display()
                        )));
                    }
                    Err(RecordError::Io(e)) => return Err(DbError::Io(e)),
                }
            }
        }
        if file_len > valid_len {
            file.set_len(valid_len)?;
        }
        log::info!("journal {} replayed {} operations", path.display(), ops.len());

        Ok((Self { path, writer: Mutex::new(BufWriter::new(file)) }, ops))
    }

}

impl StorageEngine for Journal {
    fn append(&self, operation: &Operation) -> Result<(), DbError> {
        let mut writer = self.writer.lock();
        write_record(&mut *writer, operation)?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), DbError> {
        let mut writer = self.writer.lock();
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }
}

fn encode(op: &Operation) -> BsonDocument {
    match op {
        Operation::Insert { collection, document } => {
            doc! { "op": "insert", "collection": collection.as_str(), "doc": document.clone() }
        }
        Operation::Update { collection, document_id, new_document } => doc! {
            "op": "update",
            "collection": collection.as_str(),
            "id": *document_id,
            "doc": new_document.clone(),
        },
        Operation::Delete { collection, document_id } => {
            doc! { "op": "delete", "collection": collection.as_str(), "id": *document_id }
        }
        Operation::Clear { collection } => doc! { "op": "clear", "collection": collection.as_str() },
    }
}

fn decode(record: &BsonDocument) -> Result<Operation, DbError> {
    let field_str = |key: &str| match record.get(key) {
        Some(Bson::String(s)) => Ok(s.clone()),
        _ => Err(DbError::JournalError(format!("record missing '{key}'"))),
    };
    let field_doc = || match record.get("doc") {
        Some(Bson::Document(d)) => Ok(d.clone()),
        _ => Err(DbError::JournalError("record missing 'doc'".into())),
    };
    let field_id = || match record.get("id") {
        Some(Bson::ObjectId(id)) => Ok(*id),
        _ => Err(DbError::JournalError("record missing 'id'".into())),
    };
    let collection = field_str("collection")?;
    match field_str("op")?.as_str() {
        "insert" => Ok(Operation::Insert { collection, document: field_doc()? }),
        "update" => Ok(Operation::Update {
            collection,
            document_id: field_id()?,
            new_document: field_doc()?,
        }),
        "delete" => Ok(Operation::Delete { collection, document_id: field_id()? }),
        "clear" => Ok(Operation::Clear { collection }),
        other => Err(DbError::JournalError(format!("unknown op '{other}'"))),
    }
}

pub fn write_record<W: Write>(writer: &mut W, op: &Operation) -> Result<(), DbError> {
    let mut bytes = Vec::new();
    encode(op).to_writer(&mut bytes)?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| DbError::JournalError("record too large".into()))?;
    let mut hasher = Crc32Hasher::new();
    hasher.update(&bytes);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&hasher.finalize().to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

#[derive(Debug)]
pub enum RecordError {
    /// The file ended inside a record.
    Short(std::io::Error),
    /// A complete record of `len` bytes failed its checksum or did not decode.
    Corrupt { len: u64, reason: String },
    Io(std::io::Error),
}

fn read_exact_or_short<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), RecordError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof { RecordError::Short(e) } else { RecordError::Io(e) }
    })
}

/// Reads one record; `Ok(None)` on a clean end of file. Also returns the number of
/// bytes the record occupied.
///
/// # Errors
/// See [`RecordError`].
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<(Operation, u64)>, RecordError> {
    let mut header = [0u8; 8];
    match reader.read_exact(&mut header[..4]) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(RecordError::Io(e)),
    }
    read_exact_or_short(reader, &mut header[4..])?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    let consumed = 8 + len as u64;
    if len > MAX_RECORD_LEN {
        return Err(RecordError::Corrupt {
            len: consumed,
            reason: format!("record length {len} exceeds limit"),
        });
    }
    let mut buf = vec![0u8; len];
    read_exact_or_short(reader, &mut buf)?;
    let mut hasher = Crc32Hasher::new();
    hasher.update(&buf);
    if hasher.finalize() != crc {
        return Err(RecordError::Corrupt { len: consumed, reason: "checksum mismatch".into() });
    }
    let corrupt = |reason: String| RecordError::Corrupt { len: consumed, reason };
    let record = BsonDocument::from_reader(&mut buf.as_slice()).map_err(|e| corrupt(e.to_string()))?;
    let op = decode(&record).map_err(|e| corrupt(e.to_string()))?;
    Ok(Some((op, consumed)))
}
