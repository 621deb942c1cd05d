#![allow(unused)]

//! # contract: the remote repository capability
//!
//! This module defines a single trait ([`Repository`]) and the supporting
//! types the core needs from a remote object store: fetching object and
//! datastream records, streaming datastream content, creating and updating
//! records, and paging through search results.
//!
//! ## Interface & Extensibility
//! - Implement [`Repository`] for a concrete store (the CLI crate ships a
//!   Fedora 3 REST client).
//! - All methods are async and return [`StoreError`]; absence is the
//!   distinct [`StoreError::NotFound`] variant, so callers branch on kind.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate
//!   deterministic mocks (`MockRepository`) for unit/integration tests.

use async_trait::async_trait;
use futures::stream::BoxStream;

use mockall::{automock, predicate::*};

use crate::model::{DatastreamRecord, ObjectRecord};

/// Boxed error type used for transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Streamed datastream content, one chunk at a time.
///
/// Dropping the stream releases its transport resources.
pub type ContentStream = BoxStream<'static, Result<Vec<u8>, StoreError>>;

/// Failure kinds reported by a [`Repository`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object or datastream does not exist. A routine branch condition.
    #[error("not found: {0}")]
    NotFound(String),
    /// Network or HTTP level failure talking to the store.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// The store answered, but with something we could not interpret.
    #[error("unexpected response: {0}")]
    Protocol(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        StoreError::Transport(err.into())
    }
}

/// Payload handed to the store when creating or updating a datastream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource<'a> {
    Text(&'a str),
    Raw(&'a [u8]),
    /// Uploaded as a zero-length body.
    Empty,
}

impl<'a> ContentSource<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            ContentSource::Text(text) => text.as_bytes(),
            ContentSource::Raw(raw) => raw,
            ContentSource::Empty => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub pids: Vec<String>,
    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

/// Trait for reading and writing objects in a remote repository.
/// The implementor is responsible for transport, authentication and
/// mapping "absent" responses onto [`StoreError::NotFound`].
///
/// The trait is implemented by real clients and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetch the record of a single object.
    async fn get_object(&self, pid: &str) -> Result<ObjectRecord, StoreError>;

    /// Names of every datastream attached to an object, in store order.
    async fn list_datastreams(&self, pid: &str) -> Result<Vec<String>, StoreError>;

    /// Fetch the record of one datastream.
    async fn get_datastream(&self, pid: &str, name: &str) -> Result<DatastreamRecord, StoreError>;

    /// Open the content of one datastream as a byte stream.
    async fn get_datastream_content(
        &self,
        pid: &str,
        name: &str,
    ) -> Result<ContentStream, StoreError>;

    /// Create a new object from the given record.
    async fn create_object(&self, record: &ObjectRecord) -> Result<(), StoreError>;

    /// Create a datastream on an existing object.
    async fn create_datastream<'a>(
        &self,
        pid: &str,
        record: &DatastreamRecord,
        content: ContentSource<'a>,
    ) -> Result<(), StoreError>;

    /// Replace an existing datastream's record and content.
    async fn update_datastream<'a>(
        &self,
        pid: &str,
        record: &DatastreamRecord,
        content: ContentSource<'a>,
    ) -> Result<(), StoreError>;

    /// Find object identifiers matching a pattern, one page at a time.
    async fn search(
        &self,
        pattern: &str,
        page_token: Option<String>,
    ) -> Result<SearchPage, StoreError>;
}
