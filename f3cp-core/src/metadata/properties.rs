//! `properties`: depositor, owner and representative fields.

use async_trait::async_trait;

use super::{read_text, ExtractContext, ExtractError, Extractor, ItemMetadata};
use crate::contract::Repository;
use crate::xml::{first_text, leaf_texts, XmlError};

pub const STREAM: &str = "properties";

const FIELDS: [&str; 3] = ["depositor", "owner", "representative"];

pub struct Properties;

#[async_trait]
impl Extractor for Properties {
    fn stream(&self) -> &'static str {
        STREAM
    }

    async fn extract(
        &self,
        repo: &dyn Repository,
        _ctx: &ExtractContext<'_>,
        item: &mut ItemMetadata,
    ) -> Result<(), ExtractError> {
        let pid = item.pid.clone();
        let xml = read_text(repo, &pid, STREAM).await?;
        add_properties(&xml, item)?;
        Ok(())
    }
}

/// At most one triple per field; blank fields are skipped.
pub fn add_properties(xml: &str, item: &mut ItemMetadata) -> Result<(), XmlError> {
    let leaves = leaf_texts(xml)?;
    for field in FIELDS {
        if let Some(value) = first_text(&leaves, field) {
            item.add(field, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_present_fields_only() {
        let xml = "<fields><depositor>jdoe</depositor><owner></owner><representative>und:rep</representative></fields>";
        let mut item = ItemMetadata::new("und:1");
        add_properties(xml, &mut item).unwrap();
        let rows: Vec<(&str, &str)> = item
            .triples
            .iter()
            .map(|t| (t.predicate.as_str(), t.object.as_str()))
            .collect();
        assert_eq!(rows, vec![("depositor", "jdoe"), ("representative", "und:rep")]);
    }
}
