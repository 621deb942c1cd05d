//! `RELS-EXT`: the object's relationships, stored as RDF/XML.
//!
//! Fedora writes a single `rdf:Description` whose subject is the object
//! itself, so the subject is not read. Each property element becomes one
//! triple; its value is the `rdf:resource` attribute, or the element text
//! for literal-valued properties.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::{read_text, ExtractContext, ExtractError, Extractor, ItemMetadata};
use crate::contract::Repository;
use crate::prefix::PrefixTable;
use crate::xml::{attribute, local_name, XmlError};

pub const STREAM: &str = "RELS-EXT";

/// One property of the description block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub namespace: String,
    pub name: String,
    pub value: String,
}

pub struct RelsExt;

#[async_trait]
impl Extractor for RelsExt {
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
        let xml = read_text(repo, &pid, STREAM).await?;
        add_relationships(&xml, ctx.prefixes, item)?;
        Ok(())
    }
}

pub fn add_relationships(
    xml: &str,
    prefixes: &PrefixTable,
    item: &mut ItemMetadata,
) -> Result<(), XmlError> {
    for rel in parse_relationships(xml)? {
        let label = predicate_label(&rel, prefixes);
        item.add(label, prefixes.compact(&rel.value));
    }
    Ok(())
}

/// Maps well-known predicates to the labels used across the metadata
/// output. Edit permissions share their labels with `rightsMetadata`.
pub fn predicate_label(rel: &Relationship, prefixes: &PrefixTable) -> String {
    match rel.name.as_str() {
        "hasModel" => "af-model".to_string(),
        "isMemberOfCollection" => "isMemberOfCollection".to_string(),
        "isPartOf" => "isPartOf".to_string(),
        "hasEditor" => "edit-person".to_string(),
        "hasEditorGroup" => "edit-group".to_string(),
        _ => prefixes.compact(&format!("{}{}", rel.namespace, rel.name)),
    }
}

struct Pending {
    namespace: String,
    name: String,
    resource: Option<String>,
    text: String,
}

impl Pending {
    fn finish(self) -> Relationship {
        Relationship {
            namespace: self.namespace,
            name: self.name,
            value: self
                .resource
                .unwrap_or_else(|| self.text.trim().to_string()),
        }
    }
}

/// Property elements of every `Description` block, in document order.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, XmlError> {
    let mut reader = NsReader::from_str(xml);
    let mut relationships = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut description_depth: Option<usize> = None;
    let mut pending: Option<Pending> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let namespace = match resolved {
            ResolveResult::Bound(ns) => String::from_utf8_lossy(ns.as_ref()).into_owned(),
            _ => String::new(),
        };
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                open.push(name.clone());
                let depth = open.len();
                match description_depth {
                    None if name == "Description" => description_depth = Some(depth),
                    Some(d) if depth == d + 1 => {
                        pending = Some(Pending {
                            namespace,
                            name,
                            resource: attribute(&e, "resource")?,
                            text: String::new(),
                        });
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if let Some(d) = description_depth {
                    if open.len() == d {
                        let resource = attribute(&e, "resource")?;
                        relationships.push(
                            Pending {
                                namespace,
                                name: local_name(&e),
                                resource,
                                text: String::new(),
                            }
                            .finish(),
                        );
                    }
                }
            }
            Event::Text(t) => {
                if let Some(p) = pending.as_mut() {
                    p.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(p) = pending.as_mut() {
                    p.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                let depth = open.len();
                match description_depth {
                    Some(d) if depth == d + 1 => {
                        if let Some(p) = pending.take() {
                            relationships.push(p.finish());
                        }
                    }
                    Some(d) if depth == d => description_depth = None,
                    _ => {}
                }
                open.pop();
            }
            Event::Eof => {
                if let Some(name) = open.pop() {
                    return Err(XmlError::Unclosed(name));
                }
                break;
            }
            _ => {}
        }
    }
    Ok(relationships)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS_EXT: &str = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="info:fedora/und:abc">
    <ns0:hasModel xmlns:ns0="info:fedora/fedora-system:def/model#" rdf:resource="info:fedora/afmodel:GenericFile"/>
    <ns1:isPartOf xmlns:ns1="info:fedora/fedora-system:def/relations-external#" rdf:resource="info:fedora/und:parent"/>
    <ns2:hasEditor xmlns:ns2="http://projecthydra.org/ns/relations#" rdf:resource="info:fedora/und:editor1"/>
    <ns2:hasEditorGroup xmlns:ns2="http://projecthydra.org/ns/relations#" rdf:resource="info:fedora/und:group1"/>
    <ns3:hasViewer xmlns:ns3="http://projecthydra.org/ns/relations#" rdf:resource="info:fedora/und:viewer"/>
    <ns4:note xmlns:ns4="http://purl.org/dc/terms/">free text</ns4:note>
  </rdf:Description>
</rdf:RDF>"#;

    #[test]
    fn parses_property_elements_with_namespaces() {
        let rels = parse_relationships(RELS_EXT).unwrap();
        assert_eq!(rels.len(), 6);
        assert_eq!(rels[0].namespace, "info:fedora/fedora-system:def/model#");
        assert_eq!(rels[0].name, "hasModel");
        assert_eq!(rels[0].value, "info:fedora/afmodel:GenericFile");
        assert_eq!(rels[5].value, "free text");
    }

    #[test]
    fn relabels_known_predicates_and_compacts_the_rest() {
        let mut item = ItemMetadata::new("und:abc");
        add_relationships(RELS_EXT, &PrefixTable::default(), &mut item).unwrap();
        let rows: Vec<(&str, &str)> = item
            .triples
            .iter()
            .map(|t| (t.predicate.as_str(), t.object.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("af-model", "GenericFile"),
                ("isPartOf", "und:parent"),
                ("edit-person", "und:editor1"),
                ("edit-group", "und:group1"),
                ("hydra:hasViewer", "und:viewer"),
                ("dc:note", "free text"),
            ]
        );
        assert!(item.triples.iter().all(|t| t.subject == "und:abc"));
    }
}
