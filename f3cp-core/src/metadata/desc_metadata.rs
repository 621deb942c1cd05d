//! `descMetadata`: descriptive metadata stored as N-Triples.

use async_trait::async_trait;

use super::ntriples::TripleReader;
use super::{read_text, ExtractContext, ExtractError, Extractor, ItemMetadata};
use crate::contract::Repository;
use crate::prefix::PrefixTable;

pub const STREAM: &str = "descMetadata";

pub struct DescMetadata;

#[async_trait]
impl Extractor for DescMetadata {
    fn stream(&self) -> &'static str {
        STREAM
    }

    async fn extract(
        &self,
        repo: &dyn Repository,
        ctx: &ExtractContext<'_>,
        item: &mut ItemMetadata,
    ) -> Result<(), ExtractError> {
        let pid = item.pid.clone();
        let text = read_text(repo, &pid, STREAM).await?;
        add_statements(&text, ctx.prefixes, item)
    }
}

/// Adds every statement of `ntriples` to `item`, compacting all three terms
/// and scoping subjects to the object. Statements decoded before a syntax
/// error are kept.
pub fn add_statements(
    ntriples: &str,
    prefixes: &PrefixTable,
    item: &mut ItemMetadata,
) -> Result<(), ExtractError> {
    for statement in TripleReader::new(ntriples) {
        let statement = statement?;
        let subject = prefixes.compact(&statement.subject.value());
        let subject = item.scoped_subject(&subject);
        item.add_with_subject(
            subject,
            prefixes.compact(&statement.predicate.value()),
            prefixes.compact(&statement.object.value()),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compacts_and_scopes_statements() {
        let nt = r#"<info:fedora/und:abc> <http://purl.org/dc/terms/title> "Ships" .
_:b1 <http://xmlns.com/foaf/0.1/name> "Jane Doe" .
<info:fedora/und:abc> <http://purl.org/dc/terms/creator> _:b1 .
"#;
        let mut item = ItemMetadata::new("und:abc");
        add_statements(nt, &PrefixTable::default(), &mut item).unwrap();

        let rows: Vec<(&str, &str, &str)> = item
            .triples
            .iter()
            .map(|t| (t.subject.as_str(), t.predicate.as_str(), t.object.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("und:abc", "dc:title", "Ships"),
                ("und:abc/_:b1", "foaf:name", "Jane Doe"),
                ("und:abc", "dc:creator", "_:b1"),
            ]
        );
    }

    #[test]
    fn keeps_statements_before_a_syntax_error() {
        let nt = "<info:fedora/und:abc> <http://purl.org/dc/terms/title> \"Ships\" .\nnot a triple\n";
        let mut item = ItemMetadata::new("und:abc");
        let err = add_statements(nt, &PrefixTable::default(), &mut item).unwrap_err();
        assert!(matches!(err, ExtractError::Triples(_)));
        assert_eq!(item.triples.len(), 1);
    }
}
