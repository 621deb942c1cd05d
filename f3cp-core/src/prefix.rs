//! Namespace prefix compaction.
//!
//! A [`PrefixTable`] rewrites long namespace URIs to short aliases, e.g.
//! `http://purl.org/dc/terms/title` becomes `dc:title`. Keys are tried
//! longest first, so overlapping entries resolve the same way every run.

use serde::{Deserialize, Serialize};

/// One namespace URI and the alias that replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixEntry {
    pub uri: String,
    pub prefix: String,
}

/// Immutable table of namespace URIs to short aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTable {
    // sorted by descending uri length, ties by uri
    entries: Vec<PrefixEntry>,
}

const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("info:fedora/und:", "und:"),
    ("info:fedora/afmodel:", ""),
    ("http://purl.org/dc/terms/", "dc:"),
    ("https://library.nd.edu/ns/terms/", "nd:"),
    ("http://purl.org/ontology/bibo/", "bibo:"),
    ("http://www.ndltd.org/standards/metadata/etdms/1.1/", "ms:"),
    ("http://purl.org/vra/", "vracore:"),
    ("http://id.loc.gov/vocabulary/relators/", "mrel:"),
    ("http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#", "ebucore:"),
    ("http://xmlns.com/foaf/0.1/", "foaf:"),
    ("http://projecthydra.org/ns/relations#", "hydra:"),
    ("http://www.w3.org/2000/01/rdf-schema#", "rdfs:"),
    ("http://purl.org/pav/", "pav:"),
];

impl PrefixTable {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = PrefixEntry>,
    {
        let mut entries: Vec<PrefixEntry> = entries
            .into_iter()
            .filter(|e| !e.uri.is_empty())
            .collect();
        entries.sort_by(|a, b| b.uri.len().cmp(&a.uri.len()).then_with(|| a.uri.cmp(&b.uri)));
        entries.dedup_by(|a, b| a.uri == b.uri);
        PrefixTable { entries }
    }

    pub fn empty() -> Self {
        PrefixTable {
            entries: Vec::new(),
        }
    }

    /// Rewrites the longest matching namespace at the start of `value`.
    /// Values matching no namespace are returned unchanged.
    pub fn compact(&self, value: &str) -> String {
        for entry in &self.entries {
            if let Some(rest) = value.strip_prefix(entry.uri.as_str()) {
                return format!("{}{}", entry.prefix, rest);
            }
        }
        value.to_string()
    }

    pub fn entries(&self) -> &[PrefixEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PrefixTable {
    fn default() -> Self {
        PrefixTable::new(DEFAULT_PREFIXES.iter().map(|(uri, prefix)| PrefixEntry {
            uri: uri.to_string(),
            prefix: prefix.to_string(),
        }))
    }
}
