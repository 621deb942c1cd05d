//! Metadata normalisation: flatten an object's metadata streams into triples.
//!
//! A [`Normalizer`] runs a fixed sequence of [`Extractor`]s against one
//! object. Each extractor reads a single named stream and appends
//! subject/predicate/object [`Triple`]s to a shared [`ItemMetadata`].
//! Extractors never abort each other: failures become [`Diagnostic`]s and
//! whatever triples were gathered are still returned.
//!
//! # Extractors, in run order
//! - [`rels_ext::RelsExt`]: `RELS-EXT` relationships
//! - [`properties::Properties`]: depositor/owner/representative
//! - [`rights::RightsMetadata`]: read/edit access and embargo date
//! - [`desc_metadata::DescMetadata`]: N-Triples descriptive metadata
//! - [`technical::Content`], [`technical::Thumbnail`],
//!   [`technical::BendoItem`]: only present on some object kinds

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::{Repository, StoreError};
use crate::prefix::PrefixTable;
use crate::xml::XmlError;

pub mod desc_metadata;
pub mod ntriples;
pub mod properties;
pub mod rels_ext;
pub mod rights;
pub mod technical;

use ntriples::TripleParseError;

/// One normalised metadata fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    /// Tab-separated row with tabs, carriage returns and newlines inside
    /// fields written as two-character escapes.
    pub fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}",
            escape_field(&self.subject),
            escape_field(&self.predicate),
            escape_field(&self.object)
        )
    }
}

fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for ch in field.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Triples gathered for one object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemMetadata {
    pub pid: String,
    pub triples: Vec<Triple>,
}

impl ItemMetadata {
    pub fn new(pid: impl Into<String>) -> Self {
        ItemMetadata {
            pid: pid.into(),
            triples: Vec::new(),
        }
    }

    /// Adds a fact about the object itself. Empty values are dropped.
    pub fn add(&mut self, predicate: impl Into<String>, object: impl Into<String>) {
        let subject = self.pid.clone();
        self.add_with_subject(subject, predicate, object);
    }

    /// Adds a fact with an explicit subject. Empty values are dropped.
    pub fn add_with_subject(
        &mut self,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) {
        let object = object.into();
        if object.is_empty() {
            return;
        }
        self.triples.push(Triple {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        });
    }

    /// Scopes a local subject to this object: `pid/local`, unless the local
    /// subject already is the pid.
    pub fn scoped_subject(&self, local: &str) -> String {
        if local == self.pid {
            local.to_string()
        } else {
            format!("{}/{}", self.pid, local)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error(transparent)]
    Triples(#[from] TripleParseError),
    #[error("stream is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl ExtractError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExtractError::Store(e) if e.is_not_found())
    }
}

/// A failed extractor, reported instead of aborting the object.
#[derive(Debug)]
pub struct Diagnostic {
    pub pid: String,
    pub stream: &'static str,
    pub error: ExtractError,
}

/// What each extractor sees besides the repository.
pub struct ExtractContext<'a> {
    pub prefixes: &'a PrefixTable,
}

/// Reads one named stream of an object and appends triples for it.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name of the datastream this extractor reads.
    fn stream(&self) -> &'static str;

    /// Optional streams exist only on some object kinds; their absence is
    /// not worth a diagnostic.
    fn optional(&self) -> bool {
        false
    }

    async fn extract(
        &self,
        repo: &dyn Repository,
        ctx: &ExtractContext<'_>,
        item: &mut ItemMetadata,
    ) -> Result<(), ExtractError>;
}

/// Result of normalising one object.
#[derive(Debug, Default)]
pub struct Normalized {
    pub item: ItemMetadata,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the extractor sequence for one object at a time.
pub struct Normalizer {
    prefixes: PrefixTable,
    extractors: Vec<Box<dyn Extractor>>,
}

impl Normalizer {
    /// Normalizer with the standard extractor sequence.
    pub fn new(prefixes: PrefixTable) -> Self {
        Self::with_extractors(
            prefixes,
            vec![
                Box::new(rels_ext::RelsExt),
                Box::new(properties::Properties),
                Box::new(rights::RightsMetadata),
                Box::new(desc_metadata::DescMetadata),
                Box::new(technical::Content),
                Box::new(technical::Thumbnail),
                Box::new(technical::BendoItem),
            ],
        )
    }

    pub fn with_extractors(prefixes: PrefixTable, extractors: Vec<Box<dyn Extractor>>) -> Self {
        Normalizer {
            prefixes,
            extractors,
        }
    }

    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    /// Gathers every triple the extractors can find for `pid`. Never fails;
    /// problems are returned as diagnostics next to the triples.
    pub async fn normalize(&self, repo: &dyn Repository, pid: &str) -> Normalized {
        info!(pid, "fetching metadata");
        let ctx = ExtractContext {
            prefixes: &self.prefixes,
        };
        let mut result = Normalized {
            item: ItemMetadata::new(pid),
            diagnostics: Vec::new(),
        };

        for extractor in &self.extractors {
            let stream = extractor.stream();
            let before = result.item.triples.len();
            match extractor.extract(repo, &ctx, &mut result.item).await {
                Ok(()) => {
                    debug!(
                        pid,
                        stream,
                        triples = result.item.triples.len() - before,
                        "extracted"
                    );
                }
                Err(e) if e.is_not_found() && extractor.optional() => {
                    debug!(pid, stream, "optional stream absent");
                }
                Err(error) => {
                    warn!(pid, stream, error = %error, "extractor failed");
                    result.diagnostics.push(Diagnostic {
                        pid: pid.to_string(),
                        stream,
                        error,
                    });
                }
            }
        }
        result
    }
}

/// Reads a whole datastream as UTF-8 text.
pub(crate) async fn read_text(
    repo: &dyn Repository,
    pid: &str,
    stream: &str,
) -> Result<String, ExtractError> {
    let bytes = crate::transcode::read_content(repo, pid, stream).await?;
    Ok(String::from_utf8(bytes)?)
}
