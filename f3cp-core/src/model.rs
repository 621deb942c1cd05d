//! Portable representation of repository objects.
//!
//! The JSON shape is the one written by `dump` and read back by `load`: an
//! object's record fields sit at the top level next to a `DSitems` list, and
//! every datastream entry carries its record fields next to either a
//! `Content` (UTF-8 text) or a `ContentBase64` (raw bytes) payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::contract::ContentSource;

/// Lifecycle state of an object or datastream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum State {
    #[default]
    #[serde(rename = "A")]
    Active,
    #[serde(rename = "I")]
    Inactive,
    #[serde(rename = "D")]
    Deleted,
}

impl State {
    pub fn code(&self) -> &'static str {
        match self {
            State::Active => "A",
            State::Inactive => "I",
            State::Deleted => "D",
        }
    }

    /// Parses a repository state code, accepting both the short and long forms.
    pub fn from_code(code: &str) -> Option<State> {
        match code.trim() {
            "A" | "Active" => Some(State::Active),
            "I" | "Inactive" => Some(State::Inactive),
            "D" | "Deleted" => Some(State::Deleted),
            _ => None,
        }
    }
}

// A blank state reads as the default; other unknown codes are rejected.
impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        if code.trim().is_empty() {
            return Ok(State::default());
        }
        State::from_code(&code).ok_or_else(|| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(&code), &"A, I or D")
        })
    }
}

/// Identity and bibliographic metadata for one repository object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "PID")]
    pub pid: String,
    #[serde(rename = "Label", default)]
    pub label: String,
    #[serde(rename = "Owner", default)]
    pub owner: String,
    #[serde(rename = "Created", default)]
    pub created: String,
    #[serde(rename = "Modified", default)]
    pub modified: String,
    #[serde(rename = "State", default)]
    pub state: State,
}

/// How the repository stores a datastream's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlGroup {
    /// Inline XML kept inside the object record.
    #[serde(rename = "X")]
    InlineXml,
    /// Managed content stored by the repository.
    #[default]
    #[serde(rename = "M")]
    Managed,
    /// External content referenced by URL, fetched on access.
    #[serde(rename = "E")]
    External,
    /// Redirected content, clients are sent to the location.
    #[serde(rename = "R")]
    Redirect,
}

impl ControlGroup {
    pub fn code(&self) -> &'static str {
        match self {
            ControlGroup::InlineXml => "X",
            ControlGroup::Managed => "M",
            ControlGroup::External => "E",
            ControlGroup::Redirect => "R",
        }
    }

    pub fn from_code(code: &str) -> Option<ControlGroup> {
        match code.trim() {
            "X" => Some(ControlGroup::InlineXml),
            "M" => Some(ControlGroup::Managed),
            "E" => Some(ControlGroup::External),
            "R" => Some(ControlGroup::Redirect),
            _ => None,
        }
    }

    /// External and redirect datastreams keep their bytes outside the repository.
    pub fn is_by_reference(&self) -> bool {
        matches!(self, ControlGroup::External | ControlGroup::Redirect)
    }
}

/// Interpretation of a datastream's location reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocationType {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "INTERNAL_ID")]
    Internal,
    #[serde(rename = "URL")]
    Url,
}

impl LocationType {
    pub fn from_code(code: &str) -> LocationType {
        match code.trim() {
            "INTERNAL_ID" => LocationType::Internal,
            "URL" => LocationType::Url,
            _ => LocationType::Unspecified,
        }
    }
}

/// Identity and technical metadata for one named datastream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatastreamRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Label", default)]
    pub label: String,
    #[serde(rename = "VersionID", default)]
    pub version_id: String,
    #[serde(rename = "State", default)]
    pub state: State,
    #[serde(rename = "Checksum", default)]
    pub checksum: String,
    #[serde(rename = "ChecksumType", default)]
    pub checksum_type: String,
    #[serde(rename = "MIMEType", default)]
    pub mime_type: String,
    #[serde(rename = "Location", default)]
    pub location: String,
    #[serde(rename = "LocationType", default)]
    pub location_type: LocationType,
    #[serde(rename = "ControlGroup", default)]
    pub control_group: ControlGroup,
    #[serde(rename = "Versionable", default)]
    pub versionable: bool,
    #[serde(rename = "Size", default)]
    pub size: i64,
}

/// Byte payload of a datastream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatastreamContent {
    /// No payload was fetched (size was zero or negative).
    #[default]
    Absent,
    Text(String),
    Raw(Vec<u8>),
}

impl DatastreamContent {
    /// Chooses the text representation when the bytes are valid UTF-8 and
    /// the raw one otherwise.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return DatastreamContent::Absent;
        }
        match String::from_utf8(bytes) {
            Ok(text) => DatastreamContent::Text(text),
            Err(e) => DatastreamContent::Raw(e.into_bytes()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, DatastreamContent::Absent)
    }

    /// Upload source for this payload. Absent content uploads as zero length.
    pub fn as_source(&self) -> ContentSource<'_> {
        match self {
            DatastreamContent::Text(text) if !text.is_empty() => ContentSource::Text(text),
            DatastreamContent::Raw(raw) if !raw.is_empty() => ContentSource::Raw(raw),
            _ => ContentSource::Empty,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DatastreamContent::Absent => 0,
            DatastreamContent::Text(text) => text.len(),
            DatastreamContent::Raw(raw) => raw.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One datastream of a serialized object: its record plus its payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatastreamEntry {
    pub record: DatastreamRecord,
    pub content: DatastreamContent,
}

impl DatastreamEntry {
    pub fn name(&self) -> &str {
        &self.record.name
    }
}

#[derive(Serialize)]
struct WireEntryRef<'a> {
    #[serde(flatten)]
    record: &'a DatastreamRecord,
    #[serde(rename = "Content", skip_serializing_if = "str::is_empty")]
    content: &'a str,
    #[serde(
        rename = "ContentBase64",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_base64"
    )]
    content_base64: Option<&'a [u8]>,
}

#[derive(Deserialize)]
struct WireEntry {
    #[serde(flatten)]
    record: DatastreamRecord,
    #[serde(rename = "Content", default)]
    content: Option<String>,
    #[serde(rename = "ContentBase64", default)]
    content_base64: Option<String>,
}

impl Serialize for DatastreamEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (content, content_base64) = match &self.content {
            DatastreamContent::Absent => ("", None),
            DatastreamContent::Text(text) => (text.as_str(), None),
            DatastreamContent::Raw(raw) => ("", Some(raw.as_slice())),
        };
        WireEntryRef {
            record: &self.record,
            content,
            content_base64,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DatastreamEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireEntry::deserialize(deserializer)?;
        // text wins when both are present; the raw value is then not decoded
        let content = match (wire.content, wire.content_base64) {
            (Some(text), _) if !text.is_empty() => DatastreamContent::Text(text),
            (_, Some(encoded)) if !encoded.is_empty() => match STANDARD.decode(encoded.as_bytes()) {
                Ok(raw) if !raw.is_empty() => DatastreamContent::Raw(raw),
                Ok(_) => DatastreamContent::Absent,
                Err(e) => {
                    warn!(
                        datastream = %wire.record.name,
                        error = %e,
                        "ContentBase64 is not valid base64, treating as no content"
                    );
                    DatastreamContent::Absent
                }
            },
            _ => DatastreamContent::Absent,
        };
        Ok(DatastreamEntry {
            record: wire.record,
            content,
        })
    }
}

fn serialize_base64<S: Serializer>(raw: &Option<&[u8]>, serializer: S) -> Result<S::Ok, S::Error> {
    match raw {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// Wire/file representation of one object and all of its datastreams.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializedObject {
    #[serde(flatten)]
    pub record: ObjectRecord,
    #[serde(rename = "DSitems", default)]
    pub datastreams: Vec<DatastreamEntry>,
}

impl SerializedObject {
    pub fn pid(&self) -> &str {
        &self.record.pid
    }

    pub fn datastream(&self, name: &str) -> Option<&DatastreamEntry> {
        self.datastreams.iter().find(|ds| ds.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> DatastreamRecord {
        DatastreamRecord {
            name: name.to_string(),
            label: "label".to_string(),
            mime_type: "text/plain".to_string(),
            size: 5,
            ..Default::default()
        }
    }

    #[test]
    fn invalid_utf8_is_kept_raw() {
        let content = DatastreamContent::from_bytes(vec![0xff, 0xfe, 0x00]);
        assert_eq!(content, DatastreamContent::Raw(vec![0xff, 0xfe, 0x00]));
        assert_eq!(
            DatastreamContent::from_bytes(b"hello".to_vec()),
            DatastreamContent::Text("hello".to_string())
        );
    }

    #[test]
    fn raw_content_is_written_as_base64_only() {
        let entry = DatastreamEntry {
            record: record("content"),
            content: DatastreamContent::Raw(vec![0xff, 0x00, 0x10]),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["Name"], "content");
        assert_eq!(json["ContentBase64"], "/wAQ");
        assert!(json.get("Content").is_none());
    }

    #[test]
    fn text_takes_priority_over_base64_on_decode() {
        let json = r#"{"Name":"descMetadata","Size":3,"Content":"abc","ContentBase64":"/wAQ"}"#;
        let entry: DatastreamEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.content, DatastreamContent::Text("abc".to_string()));
        assert_eq!(entry.record.size, 3);
    }

    #[test]
    fn invalid_base64_is_ignored_when_text_is_present() {
        let json = r#"{"Name":"descMetadata","Content":"abc","ContentBase64":"!!not base64!!"}"#;
        let entry: DatastreamEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.content, DatastreamContent::Text("abc".to_string()));
    }

    #[test]
    fn invalid_base64_alone_decodes_as_absent() {
        let json = r#"{"Name":"content","ContentBase64":"!!not base64!!"}"#;
        let entry: DatastreamEntry = serde_json::from_str(json).unwrap();
        assert!(entry.content.is_absent());
    }

    #[test]
    fn blank_state_reads_as_active() {
        let object: SerializedObject =
            serde_json::from_str(r#"{"PID":"x","State":"","DSitems":[]}"#).unwrap();
        assert_eq!(object.record.state, State::Active);
        assert!(serde_json::from_str::<SerializedObject>(r#"{"PID":"x","State":"Q"}"#).is_err());
    }

    #[test]
    fn null_and_empty_payloads_decode_as_absent() {
        let json = r#"{"Name":"DC","Content":"","ContentBase64":null}"#;
        let entry: DatastreamEntry = serde_json::from_str(json).unwrap();
        assert!(entry.content.is_absent());
        assert_eq!(entry.record.control_group, ControlGroup::Managed);
    }

    #[test]
    fn object_fields_sit_next_to_datastream_list() {
        let object = SerializedObject {
            record: ObjectRecord {
                pid: "und:abc".to_string(),
                label: "A thing".to_string(),
                state: State::Inactive,
                ..Default::default()
            },
            datastreams: vec![DatastreamEntry {
                record: record("RELS-EXT"),
                content: DatastreamContent::Text("<rdf/>".to_string()),
            }],
        };
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["PID"], "und:abc");
        assert_eq!(json["State"], "I");
        assert_eq!(json["DSitems"][0]["Content"], "<rdf/>");

        let back: SerializedObject = serde_json::from_value(json).unwrap();
        assert_eq!(back, object);
    }
}
