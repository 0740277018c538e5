//! The `/api/v4` transfer-by-email flow.
//!
//! This wire contract is not part of the documented public API: the create
//! call carries sender and recipients, every file needs a second negotiation
//! round before its first upload URL, part counts follow the endpoint's own
//! `size / chunk_size + 1` arithmetic, and finalization happens in two
//! stages (`finalize-mpp` per file, then an aggregate `finalize`).

use super::*;
use crate::api::ApiSession;
use crate::chunk;
use serde_json::json;

/// Base URL of the undocumented v4 API.
pub const V4_API_BASE: &str = "https://wetransfer.com/api/v4";

/// Sender and recipients for a transfer-by-email run.
#[derive(Debug, Clone)]
pub struct MailOptions {
    pub sender: String,
    pub recipients: Vec<String>,
    pub language: String,
}

pub struct Mail<'a> {
    session: &'a ApiSession,
    base: String,
    options: MailOptions,
}

impl<'a> Mail<'a> {
    pub fn new(session: &'a ApiSession, options: MailOptions) -> Self {
        Self::with_base(session, V4_API_BASE, options)
    }

    pub fn with_base(
        session: &'a ApiSession,
        base: impl Into<String>,
        options: MailOptions,
    ) -> Self {
        Mail {
            session,
            base: base.into(),
            options,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MailCreateResponse {
    id: String,
    files: Vec<MailFileEntry>,
}

#[derive(Debug, Deserialize)]
struct MailFileEntry {
    id: String,
    chunk_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FinalizeResponse {
    shortened_url: String,
}

#[async_trait]
impl TransferProtocol for Mail<'_> {
    async fn create(
        &self,
        message: &str,
        files: &[FileDescriptor],
    ) -> Result<(String, Vec<UploadPlan>), Error> {
        let body = json!({
            "recipients": self.options.recipients,
            "message": message,
            "from": self.options.sender,
            "ui_naguage": self.options.language,
            "domain_user_id": self.session.user_identifier(),
            "files": files
                .iter()
                .map(|f| json!({ "name": f.name, "size": f.size }))
                .collect::<Vec<_>>(),
        });
        let resp: MailCreateResponse = self
            .session
            .post(&format!("{}/transfers/email", self.base), &body)
            .await?;

        if resp.files.len() != files.len() {
            return Err(Error::PlanCount {
                expected: files.len(),
                got: resp.files.len(),
            });
        }

        // Provisional plans only: the ids and chunk sizes that count are the
        // ones the per-file negotiation round returns.
        let plans = resp
            .files
            .iter()
            .zip(files)
            .map(|(entry, fd)| {
                let chunk_size = entry.chunk_size.unwrap_or(0);
                UploadPlan {
                    file_id: entry.id.clone(),
                    chunk_size,
                    part_count: if chunk_size > 0 {
                        chunk::mail_part_count(fd.size, chunk_size)
                    } else {
                        0
                    },
                    multipart_id: None,
                }
            })
            .collect();

        Ok((resp.id, plans))
    }

    async fn negotiate_file(
        &self,
        resource_id: &str,
        file: &FileDescriptor,
        _plan: UploadPlan,
    ) -> Result<UploadPlan, Error> {
        let entry: MailFileEntry = self
            .session
            .post(
                &format!("{}/transfers/{}/files", self.base, resource_id),
                &json!({ "name": file.name, "size": file.size }),
            )
            .await?;
        let chunk_size = entry
            .chunk_size
            .filter(|size| *size > 0)
            .ok_or(Error::MissingChunkMeta("mail file"))?;
        Ok(UploadPlan {
            file_id: entry.id,
            chunk_size,
            part_count: chunk::mail_part_count(file.size, chunk_size),
            multipart_id: None,
        })
    }

    async fn upload_url(
        &self,
        resource_id: &str,
        plan: &UploadPlan,
        part_number: u64,
        chunk: &[u8],
    ) -> Result<String, Error> {
        let resp: UrlResponse = self
            .session
            .post(
                &format!(
                    "{}/transfers/{}/files/{}/part-put-url",
                    self.base, resource_id, plan.file_id
                ),
                &json!({
                    "chunk_number": part_number,
                    "chunk_size": plan.chunk_size,
                    "chunk_crc": crc32fast::hash(chunk),
                    "retries": 0,
                }),
            )
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
                    "{}/transfers/{}/files/{}/finalize-mpp",
                    self.base, resource_id, plan.file_id
                ),
                &json!({ "chunk_count": parts_uploaded }),
            )
            .await?;
        Ok(())
    }

    async fn finalize(&self, resource_id: &str, total_parts: u64) -> Result<String, Error> {
        let resp: FinalizeResponse = self
            .session
            .put(
                &format!("{}/transfers/{}/finalize", self.base, resource_id),
                &json!({ "chunk_count": total_parts }),
            )
            .await?;
        Ok(resp.shortened_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_session;
    use mockito::Matcher;

    fn options() -> MailOptions {
        MailOptions {
            sender: "me@example.com".to_owned(),
            recipients: vec!["you@example.com".to_owned()],
            language: "en".to_owned(),
        }
    }

    fn descriptor(name: &str, size: u64) -> FileDescriptor {
        FileDescriptor {
            path: name.into(),
            name: name.to_owned(),
            size,
            mime_type: "application/octet-stream".to_owned(),
        }
    }

    #[tokio::test]
    async fn create_carries_sender_recipients_and_files() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let create = server
            .mock("POST", "/transfers/email")
            .match_body(Matcher::Json(json!({
                "recipients": ["you@example.com"],
                "message": "for you",
                "from": "me@example.com",
                "ui_naguage": "en",
                "domain_user_id": null,
                "files": [{ "name": "a.bin", "size": 12 }],
            })))
            .with_status(200)
            .with_body(
                json!({
                    "id": "mt-1",
                    "files": [{ "id": "f-a", "chunk_size": 4 }],
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mail = Mail::with_base(&session, server.url(), options());
        let (id, plans) = mail
            .create("for you", &[descriptor("a.bin", 12)])
            .await
            .unwrap();

        create.assert_async().await;
        assert_eq!(id, "mt-1");
        // 12 is an exact multiple of 4: the mail arithmetic plans one part
        // beyond the ceiling.
        assert_eq!(plans[0].part_count, 4);
    }

    #[tokio::test]
    async fn negotiate_file_rebuilds_the_plan_from_the_per_file_response() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let negotiate = server
            .mock("POST", "/transfers/mt-1/files")
            .match_body(Matcher::Json(json!({ "name": "a.bin", "size": 9 })))
            .with_status(200)
            .with_body(r#"{"id":"f-a2","chunk_size":4}"#)
            .create_async()
            .await;

        let mail = Mail::with_base(&session, server.url(), options());
        let provisional = UploadPlan {
            file_id: "f-a".to_owned(),
            chunk_size: 0,
            part_count: 0,
            multipart_id: None,
        };
        let plan = mail
            .negotiate_file("mt-1", &descriptor("a.bin", 9), provisional)
            .await
            .unwrap();

        negotiate.assert_async().await;
        assert_eq!(plan.file_id, "f-a2");
        assert_eq!(plan.chunk_size, 4);
        assert_eq!(plan.part_count, 3);
    }

    #[tokio::test]
    async fn negotiate_without_chunk_size_is_a_protocol_mismatch() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let _mock = server
            .mock("POST", "/transfers/mt-1/files")
            .with_status(200)
            .with_body(r#"{"id":"f-a2"}"#)
            .create_async()
            .await;

        let mail = Mail::with_base(&session, server.url(), options());
        let provisional = UploadPlan {
            file_id: "f-a".to_owned(),
            chunk_size: 0,
            part_count: 0,
            multipart_id: None,
        };
        let err = mail
            .negotiate_file("mt-1", &descriptor("a.bin", 9), provisional)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingChunkMeta("mail file")));
    }

    #[tokio::test]
    async fn upload_url_carries_part_number_and_chunk_crc() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let chunk = b"exact chunk bytes";
        let mock = server
            .mock("POST", "/transfers/mt-1/files/f-a/part-put-url")
            .match_body(Matcher::Json(json!({
                "chunk_number": 2,
                "chunk_size": 4,
                "chunk_crc": crc32fast::hash(chunk),
                "retries": 0,
            })))
            .with_status(200)
            .with_body(r#"{"url":"https://storage.example/signed/2"}"#)
            .create_async()
            .await;

        let mail = Mail::with_base(&session, server.url(), options());
        let plan = UploadPlan {
            file_id: "f-a".to_owned(),
            chunk_size: 4,
            part_count: 5,
            multipart_id: None,
        };
        let url = mail.upload_url("mt-1", &plan, 2, chunk).await.unwrap();

        mock.assert_async().await;
        assert_eq!(url, "https://storage.example/signed/2");
    }

    #[tokio::test]
    async fn complete_file_finalizes_the_multipart_upload() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let mock = server
            .mock("PUT", "/transfers/mt-1/files/f-a/finalize-mpp")
            .match_body(Matcher::Json(json!({ "chunk_count": 3 })))
            .with_status(200)
            .with_body(r#"{"id":"f-a"}"#)
            .create_async()
            .await;

        let mail = Mail::with_base(&session, server.url(), options());
        let plan = UploadPlan {
            file_id: "f-a".to_owned(),
            chunk_size: 4,
            part_count: 3,
            multipart_id: None,
        };
        mail.complete_file("mt-1", &plan, 3).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn finalize_reports_the_aggregate_part_count() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let mock = server
            .mock("PUT", "/transfers/mt-1/finalize")
            .match_body(Matcher::Json(json!({ "chunk_count": 8 })))
            .with_status(200)
            .with_body(r#"{"shortened_url":"https://we.tl/t-short"}"#)
            .create_async()
            .await;

        let mail = Mail::with_base(&session, server.url(), options());
        let url = mail.finalize("mt-1", 8).await.unwrap();

        mock.assert_async().await;
        assert_eq!(url, "https://we.tl/t-short");
    }
}
