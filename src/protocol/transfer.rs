//! The `/v2/transfers` flow: a single-use bundle of files, finalized once.

use super::*;
use crate::api::{ApiSession, PUBLIC_API_BASE};
use crate::chunk;
use serde_json::json;

pub struct Transfer<'a> {
    session: &'a ApiSession,
    base: String,
}

impl<'a> Transfer<'a> {
    pub fn new(session: &'a ApiSession) -> Self {
        Self::with_base(session, PUBLIC_API_BASE)
    }

    pub fn with_base(session: &'a ApiSession, base: impl Into<String>) -> Self {
        Transfer {
            session,
            base: base.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    multipart: Multipart,
}

#[async_trait]
impl TransferProtocol for Transfer<'_> {
    async fn create(
        &self,
        message: &str,
        files: &[FileDescriptor],
    ) -> Result<(String, Vec<UploadPlan>), Error> {
        let body = json!({
            "message": message,
            "files": files
                .iter()
                .map(|f| json!({ "name": f.name, "size": f.size }))
                .collect::<Vec<_>>(),
        });
        let resp: CreateResponse = self
            .session
            .post(&format!("{}/transfers", self.base), &body)
            .await?;

        if resp.files.len() != files.len() {
            return Err(Error::PlanCount {
                expected: files.len(),
                got: resp.files.len(),
            });
        }

        // One chunk size for the whole transfer, taken from the first plan.
        let chunk_size = resp
            .files
            .first()
            .map(|f| f.multipart.chunk_size)
            .filter(|size| *size > 0)
            .ok_or(Error::MissingChunkMeta("transfer create"))?;

        let plans = resp
            .files
            .iter()
            .zip(files)
            .map(|(entry, fd)| UploadPlan {
                file_id: entry.id.clone(),
                chunk_size,
                part_count: entry
                    .multipart
                    .part_numbers
                    .unwrap_or_else(|| chunk::part_count(fd.size, chunk_size)),
                multipart_id: None,
            })
            .collect();

        Ok((resp.id, plans))
    }

    async fn upload_url(
        &self,
        resource_id: &str,
        plan: &UploadPlan,
        part_number: u64,
        _chunk: &[u8],
    ) -> Result<String, Error> {
        let resp: UrlResponse = self
            .session
            .get(&format!(
                "{}/transfers/{}/files/{}/upload-url/{}",
                self.base, resource_id, plan.file_id, part_number
            ))
            .await?;
        Ok(resp.url)
    }

    async fn complete_file(
        &self,
        resource_id: &str,
        plan: &UploadPlan,
        parts_uploaded: u64,
    ) -> Result<(), Error> {
        let _: serde_json::Value = self
            .session
            .put(
                &format!(
                    "{}/transfers/{}/files/{}/upload-complete",
                    self.base, resource_id, plan.file_id
                ),
                &json!({ "part_numbers": parts_uploaded }),
            )
            .await?;
        Ok(())
    }

    async fn finalize(&self, resource_id: &str, _total_parts: u64) -> Result<String, Error> {
        let resp: UrlResponse = self
            .session
            .put_bare(&format!("{}/transfers/{}/finalize", self.base, resource_id))
            .await?;
        Ok(resp.url)
    }
}
