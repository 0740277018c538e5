//! The `/v2/boards` flow: a named collection of files and links, assembled
//! incrementally and shared through a long-lived page.

use super::*;
use crate::api::{ApiSession, PUBLIC_API_BASE};
use crate::chunk;
use serde::Serialize;
use serde_json::json;

pub struct Board<'a> {
    session: &'a ApiSession,
    base: String,
    board_id: String,
}

/// Board state as the control plane reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardInfo {
    pub id: String,
    pub name: Option<String>,
    pub state: Option<String>,
    pub url: String,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// A web link to pin on a board.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub url: String,
    pub title: String,
}

impl Link {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Link {
            url: url.into(),
            title: title.into(),
        }
    }
}

impl<'a> Board<'a> {
    /// Binds to an existing board.
    pub fn new(session: &'a ApiSession, board_id: impl Into<String>) -> Self {
        Self::with_base(session, PUBLIC_API_BASE, board_id)
    }

    pub fn with_base(
        session: &'a ApiSession,
        base: impl Into<String>,
        board_id: impl Into<String>,
    ) -> Self {
        Board {
            session,
            base: base.into(),
            board_id: board_id.into(),
        }
    }

    /// Creates a new named board and binds to it.
    pub async fn create_new(
        session: &'a ApiSession,
        base: impl Into<String>,
        name: &str,
    ) -> Result<(Board<'a>, BoardInfo), Error> {
        let base = base.into();
        let info: BoardInfo = session
            .post(&format!("{}/boards", base), &json!({ "name": name }))
            .await?;
        let board = Board {
            session,
            base,
            board_id: info.id.clone(),
        };
        Ok((board, info))
    }

    pub fn id(&self) -> &str {
        &self.board_id
    }

    /// Reads the board back, items included.
    pub async fn info(&self) -> Result<BoardInfo, Error> {
        let info = self
            .session
            .get(&format!("{}/boards/{}", self.base, self.board_id))
            .await?;
        Ok(info)
    }

    /// Pins links on the board and returns its refreshed state.
    pub async fn add_links(&self, links: &[Link]) -> Result<BoardInfo, Error> {
        let _: serde_json::Value = self
            .session
            .post(
                &format!("{}/boards/{}/links", self.base, self.board_id),
                &links,
            )
            .await?;
        self.info().await
    }
}

#[derive(Debug, Deserialize)]
struct BoardFileEntry {
    id: String,
    multipart: Multipart,
}

#[async_trait]
impl TransferProtocol for Board<'_> {
    /// Registers the files on the board. The board itself is the resource,
    /// so `message` has no wire counterpart here.
    async fn create(
        &self,
        _message: &str,
        files: &[FileDescriptor],
    ) -> Result<(String, Vec<UploadPlan>), Error> {
        let body = files
            .iter()
            .map(|f| json!({ "name": f.name, "size": f.size }))
            .collect::<Vec<_>>();
        let entries: Vec<BoardFileEntry> = self
            .session
            .post(
                &format!("{}/boards/{}/files", self.base, self.board_id),
                &body,
            )
            .await?;

        if entries.len() != files.len() {
            return Err(Error::PlanCount {
                expected: files.len(),
                got: entries.len(),
            });
        }

        let chunk_size = entries
            .first()
            .map(|e| e.multipart.chunk_size)
            .filter(|size| *size > 0)
            .ok_or(Error::MissingChunkMeta("board files"))?;

        let plans = entries
            .iter()
            .zip(files)
            .map(|(entry, fd)| {
                let multipart_id = entry
                    .multipart
                    .id
                    .clone()
                    .ok_or(Error::MissingChunkMeta("board files"))?;
                Ok(UploadPlan {
                    file_id: entry.id.clone(),
                    chunk_size,
                    part_count: entry
                        .multipart
                        .part_numbers
                        .unwrap_or_else(|| chunk::part_count(fd.size, chunk_size)),
                    multipart_id: Some(multipart_id),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok((self.board_id.clone(), plans))
    }

    async fn upload_url(
        &self,
        resource_id: &str,
        plan: &UploadPlan,
        part_number: u64,
        _chunk: &[u8],
    ) -> Result<String, Error> {
        let multipart_id = plan
            .multipart_id
            .as_deref()
            .ok_or(Error::MissingChunkMeta("board upload plan"))?;
        let resp: UrlResponse = self
            .session
            .get(&format!(
                "{}/boards/{}/files/{}/upload-url/{}/{}",
                self.base, resource_id, plan.file_id, part_number, multipart_id
            ))
            .await?;
        Ok(resp.url)
    }

    /// Board completion is a bare signal; the server already knows the part
    /// count from the multipart-upload id.
    async fn complete_file(
        &self,
        resource_id: &str,
        plan: &UploadPlan,
        _parts_uploaded: u64,
    ) -> Result<(), Error> {
        self.session
            .put_unit(&format!(
                "{}/boards/{}/files/{}/upload-complete",
                self.base, resource_id, plan.file_id
            ))
            .await?;
        Ok(())
    }

    /// Boards have no finalize call; the read-back carries the share URL.
    async fn finalize(&self, resource_id: &str, _total_parts: u64) -> Result<String, Error> {
        let info: BoardInfo = self
            .session
            .get(&format!("{}/boards/{}", self.base, resource_id))
            .await?;
        Ok(info.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_session;
    use mockito::Matcher;

    fn descriptor(name: &str, size: u64) -> FileDescriptor {
        FileDescriptor {
            path: name.into(),
            name: name.to_owned(),
            size,
            mime_type: "application/octet-stream".to_owned(),
        }
    }

    #[tokio::test]
    async fn create_board_posts_the_name_and_binds_the_id() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let mock = server
            .mock("POST", "/boards")
            .match_body(Matcher::Json(json!({ "name": "holiday" })))
            .with_status(201)
            .with_body(
                r#"{"id":"b-1","name":"holiday","state":"downloadable","url":"https://we.tl/b-abc"}"#,
            )
            .create_async()
            .await;

        let (board, info) = Board::create_new(&session, server.url(), "holiday")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(board.id(), "b-1");
        assert_eq!(info.url, "https://we.tl/b-abc");
        assert!(info.items.is_empty());
    }

    #[tokio::test]
    async fn registering_files_yields_plans_with_multipart_ids() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let mock = server
            .mock("POST", "/boards/b-1/files")
            .match_body(Matcher::Json(json!([
                { "name": "a.jpg", "size": 9 },
                { "name": "b.jpg", "size": 0 },
            ])))
            .with_status(200)
            .with_body(
                json!([
                    { "id": "f-a", "multipart": { "id": "mp-a", "part_numbers": 3, "chunk_size": 4 } },
                    { "id": "f-b", "multipart": { "id": "mp-b", "part_numbers": 0, "chunk_size": 4 } },
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let board = Board::with_base(&session, server.url(), "b-1");
        let (id, plans) = TransferProtocol::create(
            &board,
            "",
            &[descriptor("a.jpg", 9), descriptor("b.jpg", 0)],
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(id, "b-1");
        assert_eq!(plans[0].multipart_id.as_deref(), Some("mp-a"));
        assert_eq!(plans[0].part_count, 3);
        assert_eq!(plans[1].part_count, 0);
    }

    #[tokio::test]
    async fn missing_multipart_id_is_a_protocol_mismatch() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let _mock = server
            .mock("POST", "/boards/b-1/files")
            .with_status(200)
            .with_body(
                json!([{ "id": "f-a", "multipart": { "part_numbers": 1, "chunk_size": 4 } }])
                    .to_string(),
            )
            .create_async()
            .await;

        let board = Board::with_base(&session, server.url(), "b-1");
        let err = TransferProtocol::create(&board, "", &[descriptor("a.jpg", 3)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingChunkMeta("board files")));
    }

    #[tokio::test]
    async fn upload_url_includes_part_and_multipart_id() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let mock = server
            .mock("GET", "/boards/b-1/files/f-a/upload-url/2/mp-a")
            .with_status(200)
            .with_body(r#"{"url":"https://storage.example/signed/2"}"#)
            .create_async()
            .await;

        let board = Board::with_base(&session, server.url(), "b-1");
        let plan = UploadPlan {
            file_id: "f-a".to_owned(),
            chunk_size: 4,
            part_count: 3,
            multipart_id: Some("mp-a".to_owned()),
        };
        let url = board.upload_url("b-1", &plan, 2, b"data").await.unwrap();

        mock.assert_async().await;
        assert_eq!(url, "https://storage.example/signed/2");
    }

    #[tokio::test]
    async fn complete_file_is_a_bare_put() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let mock = server
            .mock("PUT", "/boards/b-1/files/f-a/upload-complete")
            .with_status(200)
            .create_async()
            .await;

        let board = Board::with_base(&session, server.url(), "b-1");
        let plan = UploadPlan {
            file_id: "f-a".to_owned(),
            chunk_size: 4,
            part_count: 3,
            multipart_id: Some("mp-a".to_owned()),
        };
        board.complete_file("b-1", &plan, 3).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn finalize_reads_the_board_url_back() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let _mock = server
            .mock("GET", "/boards/b-1")
            .with_status(200)
            .with_body(r#"{"id":"b-1","name":"holiday","url":"https://we.tl/b-abc","items":[{}]}"#)
            .create_async()
            .await;

        let board = Board::with_base(&session, server.url(), "b-1");
        let url = board.finalize("b-1", 3).await.unwrap();
        assert_eq!(url, "https://we.tl/b-abc");
    }

    #[tokio::test]
    async fn add_links_posts_and_returns_the_refreshed_board() {
        let mut server = mockito::Server::new_async().await;
        let session = test_session(&mut server).await;
        let post = server
            .mock("POST", "/boards/b-1/links")
            .match_body(Matcher::Json(json!([
                { "url": "https://example.com", "title": "Example" },
            ])))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/boards/b-1")
            .with_status(200)
            .with_body(r#"{"id":"b-1","url":"https://we.tl/b-abc","items":[{"type":"link"}]}"#)
            .create_async()
            .await;

        let board = Board::with_base(&session, server.url(), "b-1");
        let info = board
            .add_links(&[Link::new("https://example.com", "Example")])
            .await
            .unwrap();

        post.assert_async().await;
        assert_eq!(info.items.len(), 1);
    }
}
