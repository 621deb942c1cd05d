//! Object transcoder: remote object ⇄ [`SerializedObject`].
//!
//! [`fetch_object`] pulls an object record plus every datastream (sorted by
//! name) into memory. [`upload_object`] reconciles a decoded object against
//! the store, creating what is missing and updating what already exists.

use futures::TryStreamExt;
use tracing::{debug, info};

use crate::contract::{Repository, StoreError};
use crate::model::{DatastreamContent, DatastreamEntry, SerializedObject};

/// Datastream the repository maintains itself; never pushed on upload.
pub const MANAGED_DC: &str = "DC";

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("object {pid}: {source}")]
    Object {
        pid: String,
        #[source]
        source: StoreError,
    },
    #[error("object {pid}, datastream {name}: {source}")]
    Datastream {
        pid: String,
        name: String,
        #[source]
        source: StoreError,
    },
}

impl TranscodeError {
    fn object(pid: &str, source: StoreError) -> Self {
        TranscodeError::Object {
            pid: pid.to_string(),
            source,
        }
    }

    fn datastream(pid: &str, name: &str, source: StoreError) -> Self {
        TranscodeError::Datastream {
            pid: pid.to_string(),
            name: name.to_string(),
            source,
        }
    }

    pub fn store_error(&self) -> &StoreError {
        match self {
            TranscodeError::Object { source, .. } | TranscodeError::Datastream { source, .. } => {
                source
            }
        }
    }
}

/// Loads every datastream of `pid` and returns it as a [`SerializedObject`].
///
/// All content is held in memory, so very large objects cost as much memory
/// as their total datastream size. Any failure aborts the whole object.
pub async fn fetch_object<R>(repo: &R, pid: &str) -> Result<SerializedObject, TranscodeError>
where
    R: Repository + ?Sized,
{
    let record = repo
        .get_object(pid)
        .await
        .map_err(|e| TranscodeError::object(pid, e))?;

    let mut names = repo
        .list_datastreams(pid)
        .await
        .map_err(|e| TranscodeError::object(pid, e))?;
    names.sort();

    let mut datastreams = Vec::with_capacity(names.len());
    for name in names {
        let ds_record = repo
            .get_datastream(pid, &name)
            .await
            .map_err(|e| TranscodeError::datastream(pid, &name, e))?;

        let content = if ds_record.size > 0 {
            let bytes = read_content(repo, pid, &name)
                .await
                .map_err(|e| TranscodeError::datastream(pid, &name, e))?;
            DatastreamContent::from_bytes(bytes)
        } else {
            DatastreamContent::Absent
        };
        debug!(pid, datastream = %name, size = content.len(), "fetched datastream");

        datastreams.push(DatastreamEntry {
            record: ds_record,
            content,
        });
    }

    Ok(SerializedObject {
        record,
        datastreams,
    })
}

/// Drains one datastream's content. The stream is dropped before returning,
/// whether or not the read succeeded.
pub(crate) async fn read_content<R>(repo: &R, pid: &str, name: &str) -> Result<Vec<u8>, StoreError>
where
    R: Repository + ?Sized,
{
    let mut stream = repo.get_datastream_content(pid, name).await?;
    let mut bytes = Vec::new();
    let result = loop {
        match stream.try_next().await {
            Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
            Ok(None) => break Ok(bytes),
            Err(e) => break Err(e),
        }
    };
    drop(stream);
    result
}

/// Writes `object` into the store.
///
/// The object itself is created only when the store does not know its PID;
/// an existing object record is left untouched. Each datastream except `DC`
/// is then created or updated in list order. The first failure aborts.
pub async fn upload_object<R>(repo: &R, object: &SerializedObject) -> Result<(), TranscodeError>
where
    R: Repository + ?Sized,
{
    let pid = object.pid();
    match repo.get_object(pid).await {
        Ok(_) => debug!(pid, "object exists, keeping its record"),
        Err(e) if e.is_not_found() => {
            info!(pid, "creating object");
            repo.create_object(&object.record)
                .await
                .map_err(|e| TranscodeError::object(pid, e))?;
        }
        Err(e) => return Err(TranscodeError::object(pid, e)),
    }

    for entry in &object.datastreams {
        let name = entry.name();
        if name == MANAGED_DC {
            continue;
        }
        let source = entry.content.as_source();

        let result = match repo.get_datastream(pid, name).await {
            Ok(_) => {
                debug!(pid, datastream = name, "updating datastream");
                repo.update_datastream(pid, &entry.record, source).await
            }
            Err(e) if e.is_not_found() => {
                debug!(pid, datastream = name, "creating datastream");
                repo.create_datastream(pid, &entry.record, source).await
            }
            Err(e) => Err(e),
        };
        result.map_err(|e| TranscodeError::datastream(pid, name, e))?;
    }

    Ok(())
}
