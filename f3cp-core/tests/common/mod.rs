#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use f3cp_core::contract::{ContentSource, ContentStream, Repository, SearchPage, StoreError};
use f3cp_core::model::{DatastreamRecord, ObjectRecord};

/// A datastream held by [`MemoryRepository`].
#[derive(Debug, Clone)]
pub struct StoredDatastream {
    pub record: DatastreamRecord,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub record: ObjectRecord,
    pub datastreams: BTreeMap<String, StoredDatastream>,
}

/// In-memory repository recording every write it receives.
#[derive(Default)]
pub struct MemoryRepository {
    pub objects: Mutex<BTreeMap<String, StoredObject>>,
    pub calls: Mutex<Vec<String>>,
    /// Objects whose fetch fails with a transport error.
    pub broken: HashSet<String>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_object(&self, record: ObjectRecord) {
        self.objects.lock().unwrap().insert(
            record.pid.clone(),
            StoredObject {
                record,
                datastreams: BTreeMap::new(),
            },
        );
    }

    pub fn insert_datastream(&self, pid: &str, mut record: DatastreamRecord, bytes: &[u8]) {
        record.size = bytes.len() as i64;
        self.objects
            .lock()
            .unwrap()
            .get_mut(pid)
            .expect("object must exist")
            .datastreams
            .insert(
                record.name.clone(),
                StoredDatastream {
                    record,
                    bytes: bytes.to_vec(),
                },
            );
    }

    pub fn object(&self, pid: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(pid).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_datastream(
        &self,
        pid: &str,
        record: &DatastreamRecord,
        content: ContentSource<'_>,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get_mut(pid)
            .ok_or_else(|| StoreError::NotFound(pid.to_string()))?;
        let mut record = record.clone();
        record.size = content.as_bytes().len() as i64;
        object.datastreams.insert(
            record.name.clone(),
            StoredDatastream {
                record,
                bytes: content.as_bytes().to_vec(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_object(&self, pid: &str) -> Result<ObjectRecord, StoreError> {
        if self.broken.contains(pid) {
            return Err(StoreError::transport(format!("connection reset fetching {pid}")));
        }
        self.objects
            .lock()
            .unwrap()
            .get(pid)
            .map(|o| o.record.clone())
            .ok_or_else(|| StoreError::NotFound(pid.to_string()))
    }

    async fn list_datastreams(&self, pid: &str) -> Result<Vec<String>, StoreError> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(pid)
            .ok_or_else(|| StoreError::NotFound(pid.to_string()))?;
        // reverse order so callers must sort
        Ok(object.datastreams.keys().rev().cloned().collect())
    }

    async fn get_datastream(&self, pid: &str, name: &str) -> Result<DatastreamRecord, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(pid)
            .and_then(|o| o.datastreams.get(name))
            .map(|ds| ds.record.clone())
            .ok_or_else(|| StoreError::NotFound(format!("{pid}/{name}")))
    }

    async fn get_datastream_content(
        &self,
        pid: &str,
        name: &str,
    ) -> Result<ContentStream, StoreError> {
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(pid)
            .and_then(|o| o.datastreams.get(name))
            .map(|ds| ds.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(format!("{pid}/{name}")))?;
        let chunks: Vec<Result<Vec<u8>, StoreError>> =
            bytes.chunks(4).map(|c| Ok(c.to_vec())).collect();
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn create_object(&self, record: &ObjectRecord) -> Result<(), StoreError> {
        self.log(format!("create_object {}", record.pid));
        self.insert_object(record.clone());
        Ok(())
    }

    async fn create_datastream<'a>(
        &self,
        pid: &str,
        record: &DatastreamRecord,
        content: ContentSource<'a>,
    ) -> Result<(), StoreError> {
        self.log(format!("create_datastream {pid} {}", record.name));
        self.write_datastream(pid, record, content)
    }

    async fn update_datastream<'a>(
        &self,
        pid: &str,
        record: &DatastreamRecord,
        content: ContentSource<'a>,
    ) -> Result<(), StoreError> {
        self.log(format!("update_datastream {pid} {}", record.name));
        self.write_datastream(pid, record, content)
    }

    async fn search(
        &self,
        pattern: &str,
        _page_token: Option<String>,
    ) -> Result<SearchPage, StoreError> {
        let prefix = pattern.trim_end_matches('*');
        Ok(SearchPage {
            pids: self
                .objects
                .lock()
                .unwrap()
                .keys()
                .filter(|pid| pid.starts_with(prefix))
                .cloned()
                .collect(),
            next_token: None,
        })
    }
}

pub fn object_record(pid: &str) -> ObjectRecord {
    ObjectRecord {
        pid: pid.to_string(),
        label: format!("Label of {pid}"),
        owner: "fedoraAdmin".to_string(),
        created: "2014-01-01T00:00:00.000Z".to_string(),
        modified: "2015-06-01T12:00:00.000Z".to_string(),
        ..Default::default()
    }
}

pub fn datastream_record(name: &str, mime_type: &str) -> DatastreamRecord {
    DatastreamRecord {
        name: name.to_string(),
        label: format!("{name} label"),
        version_id: format!("{name}.0"),
        mime_type: mime_type.to_string(),
        checksum_type: "DISABLED".to_string(),
        checksum: "none".to_string(),
        versionable: true,
        ..Default::default()
    }
}
