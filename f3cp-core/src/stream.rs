//! Array-at-a-time JSON streaming of objects.
//!
//! `dump` writes one well-formed JSON array with an element per object that
//! could be fetched, in input order; objects that fail are logged and
//! skipped. `load` decodes the array one element at a time and uploads each
//! object before reading the next; the first failure aborts the load.
//!
//! Only one object (with all its datastream content) is held in memory at a
//! time, so both directions handle arbitrarily long object lists.

use serde::de::DeserializeOwned;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

use crate::contract::Repository;
use crate::transcode::{fetch_object, upload_object, TranscodeError};

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed JSON array: {0}")]
    Syntax(String),
    #[error("array element {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("encoding object {pid}: {source}")]
    Encode {
        pid: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

/// Outcome of a dump run.
#[derive(Debug, Default)]
pub struct DumpReport {
    /// Number of objects written to the array.
    pub written: usize,
    /// Identifiers that could not be fetched, with the reason.
    pub failures: Vec<DumpFailure>,
}

#[derive(Debug)]
pub struct DumpFailure {
    pub pid: String,
    pub error: TranscodeError,
}

/// Outcome of a successful load run.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
}

/// Dumps `ids` from `repo` to `out` as a JSON array, in the given order.
///
/// Fetch failures are reported and skipped; the array stays well formed.
/// Only errors writing to `out` abort the dump.
pub async fn dump_list<R, W, I>(repo: &R, out: &mut W, ids: I) -> Result<DumpReport, StreamError>
where
    R: Repository + ?Sized,
    W: AsyncWrite + Unpin,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut report = DumpReport::default();
    out.write_all(b"[").await?;

    for id in ids {
        let pid = id.as_ref();
        info!(pid, "dumping");
        let object = match fetch_object(repo, pid).await {
            Ok(object) => object,
            Err(e) => {
                error!(pid, error = %e, "dump failed, skipping object");
                report.failures.push(DumpFailure {
                    pid: pid.to_string(),
                    error: e,
                });
                continue;
            }
        };

        let encoded = serde_json::to_vec(&object).map_err(|source| StreamError::Encode {
            pid: pid.to_string(),
            source,
        })?;
        drop(object);

        if report.written > 0 {
            out.write_all(b",").await?;
        }
        out.write_all(&encoded).await?;
        out.write_all(b"\n").await?;
        report.written += 1;
    }

    out.write_all(b"]").await?;
    out.flush().await?;
    info!(
        written = report.written,
        failed = report.failures.len(),
        "dump complete"
    );
    Ok(report)
}

/// Reads a JSON array of objects from `input` and uploads each into `repo`.
///
/// Elements are decoded and uploaded one at a time. A decode or upload
/// error stops the load immediately and is returned.
pub async fn load_list<R, S>(repo: &R, input: S) -> Result<LoadReport, StreamError>
where
    R: Repository + ?Sized,
    S: AsyncBufRead + Unpin,
{
    let mut report = LoadReport::default();
    let mut array = JsonArrayReader::new(input);
    array.begin().await?;

    while array.more().await? {
        let object: crate::model::SerializedObject = array.next_element().await?;
        info!(pid = object.pid(), "loading");
        if let Err(e) = upload_object(repo, &object).await {
            error!(pid = object.pid(), error = %e, "load failed");
            return Err(e.into());
        }
        report.loaded.push(object.record.pid);
    }

    array.end().await?;
    info!(loaded = report.loaded.len(), "load complete");
    Ok(report)
}

/// Incremental reader over a JSON array, yielding one element at a time.
///
/// Only the bytes of the element being decoded are buffered.
pub struct JsonArrayReader<S> {
    input: S,
    read: usize,
}

impl<S> JsonArrayReader<S>
where
    S: AsyncBufRead + Unpin,
{
    pub fn new(input: S) -> Self {
        JsonArrayReader { input, read: 0 }
    }

    /// Consumes the opening bracket.
    pub async fn begin(&mut self) -> Result<(), StreamError> {
        match self.skip_whitespace().await? {
            Some(b'[') => {
                self.input.consume(1);
                Ok(())
            }
            Some(other) => Err(StreamError::Syntax(format!(
                "expected '[' at start of input, found {:?}",
                other as char
            ))),
            None => Err(StreamError::Syntax("empty input".to_string())),
        }
    }

    /// Whether another element follows before the closing bracket.
    pub async fn more(&mut self) -> Result<bool, StreamError> {
        match self.skip_whitespace().await? {
            Some(b']') => Ok(false),
            Some(_) => Ok(true),
            None => Err(StreamError::Syntax(
                "input ended before closing ']'".to_string(),
            )),
        }
    }

    /// Decodes the next element.
    pub async fn next_element<T: DeserializeOwned>(&mut self) -> Result<T, StreamError> {
        let index = self.read;
        if index > 0 {
            match self.skip_whitespace().await? {
                Some(b',') => self.input.consume(1),
                Some(other) => {
                    return Err(StreamError::Syntax(format!(
                        "expected ',' before element {index}, found {:?}",
                        other as char
                    )))
                }
                None => return Err(StreamError::Syntax("unexpected end of input".to_string())),
            }
        }
        if self.skip_whitespace().await?.is_none() {
            return Err(StreamError::Syntax("unexpected end of input".to_string()));
        }

        let raw = self.read_raw_value().await?;
        self.read += 1;
        serde_json::from_slice(&raw).map_err(|source| StreamError::Decode { index, source })
    }

    /// Consumes the closing bracket; only whitespace may follow it.
    pub async fn end(&mut self) -> Result<(), StreamError> {
        match self.skip_whitespace().await? {
            Some(b']') => self.input.consume(1),
            Some(other) => {
                return Err(StreamError::Syntax(format!(
                    "expected ']', found {:?}",
                    other as char
                )))
            }
            None => return Err(StreamError::Syntax("missing closing ']'".to_string())),
        }
        match self.skip_whitespace().await? {
            None => Ok(()),
            Some(other) => Err(StreamError::Syntax(format!(
                "unexpected {:?} after closing ']'",
                other as char
            ))),
        }
    }

    /// Skips whitespace and returns the next byte without consuming it.
    async fn skip_whitespace(&mut self) -> io::Result<Option<u8>> {
        loop {
            let buf = self.input.fill_buf().await?;
            if buf.is_empty() {
                return Ok(None);
            }
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(pos) => {
                    let next = buf[pos];
                    self.input.consume(pos);
                    return Ok(Some(next));
                }
                None => {
                    let len = buf.len();
                    self.input.consume(len);
                }
            }
        }
    }

    /// Copies the bytes of exactly one JSON value out of the input.
    async fn read_raw_value(&mut self) -> Result<Vec<u8>, StreamError> {
        let mut scanner = ValueScanner::default();
        let mut raw = Vec::new();
        loop {
            let buf = self.input.fill_buf().await?;
            if buf.is_empty() {
                if scanner.is_complete_at_eof() {
                    return Ok(raw);
                }
                return Err(StreamError::Syntax(
                    "input ended inside an array element".to_string(),
                ));
            }
            match scanner.scan(buf) {
                Scan::Complete(taken) => {
                    raw.extend_from_slice(&buf[..taken]);
                    self.input.consume(taken);
                    return Ok(raw);
                }
                Scan::NeedMore => {
                    let len = buf.len();
                    raw.extend_from_slice(buf);
                    self.input.consume(len);
                }
            }
        }
    }
}

enum Scan {
    /// The value ends after this many bytes of the chunk.
    Complete(usize),
    NeedMore,
}

/// Finds where a JSON value ends without parsing it.
#[derive(Default)]
struct ValueScanner {
    started: bool,
    scalar: bool,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ValueScanner {
    fn scan(&mut self, chunk: &[u8]) -> Scan {
        for (i, &b) in chunk.iter().enumerate() {
            if !self.started {
                self.started = true;
                match b {
                    b'{' | b'[' => self.depth = 1,
                    b'"' => self.in_string = true,
                    _ => self.scalar = true,
                }
                continue;
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if self.depth == 0 {
                        return Scan::Complete(i + 1);
                    }
                }
                continue;
            }

            if self.scalar {
                if b == b',' || b == b']' || b == b'}' || b.is_ascii_whitespace() {
                    return Scan::Complete(i);
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Scan::Complete(i + 1);
                    }
                }
                _ => {}
            }
        }
        Scan::NeedMore
    }

    fn is_complete_at_eof(&self) -> bool {
        self.started && self.scalar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Item {
        id: String,
    }

    #[tokio::test]
    async fn reads_elements_across_small_buffers() {
        let input = br#" [ {"id":"a, ]}"} ,
            {"id":"b\"}"} ] "#;
        let reader = BufReader::with_capacity(3, &input[..]);
        let mut array = JsonArrayReader::new(reader);
        array.begin().await.unwrap();

        let mut ids = Vec::new();
        while array.more().await.unwrap() {
            let item: Item = array.next_element().await.unwrap();
            ids.push(item.id);
        }
        array.end().await.unwrap();
        assert_eq!(ids, vec!["a, ]}".to_string(), "b\"}".to_string()]);
    }

    #[tokio::test]
    async fn empty_array_has_no_elements() {
        let mut array = JsonArrayReader::new(&b"[]"[..]);
        array.begin().await.unwrap();
        assert!(!array.more().await.unwrap());
        array.end().await.unwrap();
    }

    #[tokio::test]
    async fn missing_comma_is_a_syntax_error() {
        let mut array = JsonArrayReader::new(&br#"[{"id":"a"} {"id":"b"}]"#[..]);
        array.begin().await.unwrap();
        let _: Item = array.next_element().await.unwrap();
        assert!(array.more().await.unwrap());
        let err = array.next_element::<Item>().await.unwrap_err();
        assert!(matches!(err, StreamError::Syntax(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn trailing_garbage_after_array_is_rejected() {
        let mut array = JsonArrayReader::new(&b"[] x"[..]);
        array.begin().await.unwrap();
        assert!(!array.more().await.unwrap());
        assert!(matches!(array.end().await, Err(StreamError::Syntax(_))));
    }

    #[tokio::test]
    async fn truncated_input_is_rejected() {
        let mut array = JsonArrayReader::new(&br#"[{"id":"a""#[..]);
        array.begin().await.unwrap();
        assert!(array.more().await.unwrap());
        assert!(matches!(
            array.next_element::<Item>().await,
            Err(StreamError::Syntax(_))
        ));
    }

    #[tokio::test]
    async fn non_array_input_is_rejected() {
        let mut array = JsonArrayReader::new(&br#"{"id":"a"}"#[..]);
        assert!(matches!(array.begin().await, Err(StreamError::Syntax(_))));
    }
}
