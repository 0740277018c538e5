//! The upload orchestrator.
//!
//! A [`Client`] owns the authorized control-plane session, picks the protocol
//! variant once per run, and drives every file through the same lifecycle:
//! negotiate, upload parts strictly in order, signal per-file completion,
//! finalize the resource into a shareable link.

use crate::api::{self, ApiSession, PUBLIC_API_BASE};
use crate::chunk::ChunkReader;
use crate::protocol::{
    self,
    board::{Board, BoardInfo, Link},
    mail::{Mail, MailOptions, V4_API_BASE},
    transfer::Transfer,
    FileDescriptor, TransferProtocol,
};
use crate::session::UploadSession;
use crate::storage::{self, ProgressListener, StorageUploader};
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authorization failed: {0}")]
    Auth(#[source] api::Error),
    #[error("Negotiating with the control plane failed: {0}")]
    Negotiate(#[source] protocol::Error),
    #[error("Reading {name} failed: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("Requesting the upload URL for part {part} of {name} failed: {source}")]
    UploadUrl {
        name: String,
        part: u64,
        #[source]
        source: protocol::Error,
    },
    #[error("Uploading part {part} of {name} failed: {source}")]
    PartUpload {
        name: String,
        part: u64,
        #[source]
        source: storage::Error,
    },
    #[error("Completing {name} failed: {source}")]
    CompleteFile {
        name: String,
        #[source]
        source: protocol::Error,
    },
    #[error("Finalizing the resource failed: {0}")]
    Finalize(#[source] protocol::Error),
    #[error("Board operation failed: {0}")]
    Board(#[source] protocol::Error),
}

/// WeTransfer upload client.
pub struct Client {
    session: ApiSession,
    api_base: String,
    v4_base: String,
    mail: Option<MailOptions>,
    progress_listener: Option<ProgressListener>,
}

impl Client {
    /// Authorizes against the public API and builds a client.
    pub async fn new(
        x_api_key: impl AsRef<str>,
        user_identifier: Option<&str>,
    ) -> Result<Self, Error> {
        let session = ApiSession::authorize(x_api_key, user_identifier)
            .await
            .map_err(Error::Auth)?;
        Ok(Self::from_session(session))
    }

    /// Builds a client around an already-authorized session.
    pub fn from_session(session: ApiSession) -> Self {
        Client {
            session,
            api_base: PUBLIC_API_BASE.to_owned(),
            v4_base: V4_API_BASE.to_owned(),
            mail: None,
            progress_listener: None,
        }
    }

    /// Points the client at alternate API hosts.
    pub fn with_bases(
        mut self,
        api_base: impl Into<String>,
        v4_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.v4_base = v4_base.into();
        self
    }

    pub fn with_progress_listener(mut self, listener: ProgressListener) -> Self {
        self.progress_listener = Some(listener);
        self
    }

    /// Switches subsequent uploads to the transfer-by-email flow, which
    /// mails `recipients` directly instead of returning a plain link.
    pub fn transfer_by_email(
        &mut self,
        sender: impl Into<String>,
        recipients: Vec<String>,
        language: Option<&str>,
    ) {
        warn!(
            "transfer-by-email goes through the undocumented wetransfer.com v4 API, \
             which is unsupported and may change or break without notice"
        );
        self.mail = Some(MailOptions {
            sender: sender.into(),
            recipients,
            language: language.unwrap_or("en").to_owned(),
        });
    }

    /// Uploads one file and returns the shareable link.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        message: &str,
    ) -> Result<String, Error> {
        self.upload_files(&[path], message).await
    }

    /// Uploads files as one transfer and returns the shareable link.
    ///
    /// Uses the transfer flow, or the mail flow when
    /// [`Client::transfer_by_email`] was configured.
    pub async fn upload_files(
        &self,
        paths: &[impl AsRef<Path>],
        message: &str,
    ) -> Result<String, Error> {
        let files = describe(paths)?;
        let storage = StorageUploader::new(self.progress_listener.clone());
        match &self.mail {
            Some(options) => {
                let flow = Mail::with_base(&self.session, &self.v4_base, options.clone());
                drive(&storage, &flow, message, &files).await
            }
            None => {
                let flow = Transfer::with_base(&self.session, &self.api_base);
                drive(&storage, &flow, message, &files).await
            }
        }
    }

    /// Creates a new named board.
    pub async fn create_board(&self, name: &str) -> Result<BoardInfo, Error> {
        let (_, info) = Board::create_new(&self.session, &self.api_base, name)
            .await
            .map_err(Error::Board)?;
        Ok(info)
    }

    /// Reads a board back, items included.
    pub async fn get_board(&self, board_id: &str) -> Result<BoardInfo, Error> {
        Board::with_base(&self.session, &self.api_base, board_id)
            .info()
            .await
            .map_err(Error::Board)
    }

    /// Pins links on a board and returns its refreshed state.
    pub async fn add_links_to_board(
        &self,
        board_id: &str,
        links: &[Link],
    ) -> Result<BoardInfo, Error> {
        Board::with_base(&self.session, &self.api_base, board_id)
            .add_links(links)
            .await
            .map_err(Error::Board)
    }

    /// Uploads files onto an existing board and returns its refreshed state.
    pub async fn add_files_to_board(
        &self,
        board_id: &str,
        paths: &[impl AsRef<Path>],
    ) -> Result<BoardInfo, Error> {
        let files = describe(paths)?;
        let storage = StorageUploader::new(self.progress_listener.clone());
        let board = Board::with_base(&self.session, &self.api_base, board_id);
        drive(&storage, &board, "", &files).await?;
        board.info().await.map_err(Error::Board)
    }
}

fn describe(paths: &[impl AsRef<Path>]) -> Result<Vec<FileDescriptor>, Error> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            FileDescriptor::from_path(path).map_err(|e| Error::Read {
                name: path.display().to_string(),
                source: e,
            })
        })
        .collect()
}

/// Drives every file through the upload lifecycle, strictly sequentially:
/// part n+1's URL is never requested before part n's upload is confirmed,
/// completion is only signalled after every part of the file went out, and
/// finalization only happens once every file has completed.
async fn drive(
    storage: &StorageUploader,
    protocol: &dyn TransferProtocol,
    message: &str,
    files: &[FileDescriptor],
) -> Result<String, Error> {
    let (resource_id, plans) = protocol
        .create(message, files)
        .await
        .map_err(Error::Negotiate)?;
    let mut session = UploadSession::new();

    for (file, plan) in files.iter().zip(plans) {
        let plan = protocol
            .negotiate_file(&resource_id, file, plan)
            .await
            .map_err(Error::Negotiate)?;
        let entry = session.add_file(&plan.file_id, &file.name);

        let mut reader = ChunkReader::open(&file.path, plan.chunk_size).map_err(|e| {
            Error::Read {
                name: file.name.clone(),
                source: e,
            }
        })?;
        loop {
            let chunk = match reader.next_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::Read {
                        name: file.name.clone(),
                        source: e,
                    })
                }
            };
            let part = session.parts_uploaded(entry) + 1;
            let url = protocol
                .upload_url(&resource_id, &plan, part, &chunk)
                .await
                .map_err(|e| Error::UploadUrl {
                    name: file.name.clone(),
                    part,
                    source: e,
                })?;
            storage
                .put(&url, &file.name, &file.mime_type, part, chunk)
                .await
                .map_err(|e| Error::PartUpload {
                    name: file.name.clone(),
                    part,
                    source: e,
                })?;
            session.record_part(entry);
            debug!(file = %file.name, part, "part uploaded");
        }

        let uploaded = session.parts_uploaded(entry);
        if uploaded != plan.part_count {
            debug!(
                file = %file.name,
                planned = plan.part_count,
                uploaded,
                "uploaded part count differs from plan"
            );
        }
        protocol
            .complete_file(&resource_id, &plan, uploaded)
            .await
            .map_err(|e| Error::CompleteFile {
                name: file.name.clone(),
                source: e,
            })?;
        session.mark_completed(entry);
        info!(file = %file.name, parts = uploaded, "file upload complete");
    }

    debug_assert!(session.all_completed());
    let url = protocol
        .finalize(&resource_id, session.total_parts())
        .await
        .map_err(Error::Finalize)?;
    info!(resource = %resource_id, "resource finalized");
    Ok(url)
}
