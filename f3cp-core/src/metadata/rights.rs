//! `rightsMetadata`: access lists and embargo date.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{read_text, ExtractContext, ExtractError, Extractor, ItemMetadata};
use crate::contract::Repository;
use crate::xml::{attribute, local_name, XmlError};

pub const STREAM: &str = "rightsMetadata";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Access {
    /// The access level, e.g. `read`, `edit`, `discover`.
    pub kind: String,
    pub persons: Vec<String>,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rights {
    pub access: Vec<Access>,
    pub embargo: Option<String>,
}

pub struct RightsMetadata;

#[async_trait]
impl Extractor for RightsMetadata {
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
        let rights = parse_rights(&xml)?;
        add_rights(&rights, item);
        Ok(())
    }
}

/// Emits the embargo date, then one triple per group and person of every
/// `read` or `edit` access block. Other access levels are ignored.
pub fn add_rights(rights: &Rights, item: &mut ItemMetadata) {
    if let Some(date) = &rights.embargo {
        item.add("embargo-date", date.as_str());
    }
    for access in &rights.access {
        let (group_label, person_label) = match access.kind.as_str() {
            "read" => ("read-group", "read-person"),
            "edit" => ("edit-group", "edit-person"),
            _ => continue,
        };
        for group in &access.groups {
            item.add(group_label, group.as_str());
        }
        for person in &access.persons {
            item.add(person_label, person.as_str());
        }
    }
}

pub fn parse_rights(xml: &str) -> Result<Rights, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut rights = Rights::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut current: Option<Access> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "access" {
                    current = Some(Access {
                        kind: attribute(&e, "type")?.unwrap_or_default(),
                        ..Default::default()
                    });
                }
                path.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                if local_name(&e) == "access" {
                    rights.access.push(Access {
                        kind: attribute(&e, "type")?.unwrap_or_default(),
                        ..Default::default()
                    });
                }
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                let value = text.trim().to_string();
                text.clear();
                let name = path.pop().unwrap_or_default();
                let parent = path.last().map(String::as_str);
                let grandparent = path.len().checked_sub(2).map(|i| path[i].as_str());

                match (name.as_str(), parent, grandparent) {
                    ("person", Some("machine"), Some("access")) => {
                        if let Some(access) = current.as_mut() {
                            access.persons.push(value);
                        }
                    }
                    ("group", Some("machine"), Some("access")) => {
                        if let Some(access) = current.as_mut() {
                            access.groups.push(value);
                        }
                    }
                    ("machine", Some("embargo"), _) | ("date", Some("machine"), Some("embargo")) => {
                        if !value.is_empty() {
                            rights.embargo = Some(value);
                        }
                    }
                    ("access", _, _) => {
                        if let Some(access) = current.take() {
                            rights.access.push(access);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rights)
}
