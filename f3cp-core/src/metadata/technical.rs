//! Technical metadata of file-bearing objects.
//!
//! Only some object kinds carry `content`, `thumbnail` or `bendo-item`
//! streams, so all three extractors are optional.

use async_trait::async_trait;

use super::{read_text, ExtractContext, ExtractError, Extractor, ItemMetadata};
use crate::contract::Repository;

pub struct Content;

#[async_trait]
impl Extractor for Content {
    fn stream(&self) -> &'static str {
        "content"
    }

    fn optional(&self) -> bool {
        true
    }

    async fn extract(
        &self,
        repo: &dyn Repository,
        _ctx: &ExtractContext<'_>,
        item: &mut ItemMetadata,
    ) -> Result<(), ExtractError> {
        let pid = item.pid.clone();
        let info = repo.get_datastream(&pid, self.stream()).await?;
        item.add("filename", info.label);
        item.add("checksum-md5", info.checksum);
        item.add("mime-type", info.mime_type);
        item.add("file-location", info.location);
        Ok(())
    }
}

pub struct Thumbnail;

#[async_trait]
impl Extractor for Thumbnail {
    fn stream(&self) -> &'static str {
        "thumbnail"
    }

    fn optional(&self) -> bool {
        true
    }

    async fn extract(
        &self,
        repo: &dyn Repository,
        _ctx: &ExtractContext<'_>,
        item: &mut ItemMetadata,
    ) -> Result<(), ExtractError> {
        let pid = item.pid.clone();
        let info = repo.get_datastream(&pid, self.stream()).await?;
        item.add("thumbnail", info.location);
        Ok(())
    }
}

/// Opaque reference to the item in the preservation store.
pub struct BendoItem;

#[async_trait]
impl Extractor for BendoItem {
    fn stream(&self) -> &'static str {
        "bendo-item"
    }

    fn optional(&self) -> bool {
        true
    }

    async fn extract(
        &self,
        repo: &dyn Repository,
        _ctx: &ExtractContext<'_>,
        item: &mut ItemMetadata,
    ) -> Result<(), ExtractError> {
        let pid = item.pid.clone();
        let reference = read_text(repo, &pid, self.stream()).await?;
        item.add("bendo-item", reference);
        Ok(())
    }
}
