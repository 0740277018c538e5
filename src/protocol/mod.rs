//! The three upload flows WeTransfer speaks.
//!
//! All variants share one lifecycle, negotiate the resource, request one
//! pre-signed URL per part, signal per-file completion, finalize into a
//! shareable link, but differ in wire shape and in the mail variant's extra
//! per-file negotiation round. [`TransferProtocol`] captures the lifecycle;
//! the submodules each bind it to one concrete wire contract.

pub mod board;
pub mod mail;
pub mod transfer;

use crate::api;
use async_trait::async_trait;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("API error: {0}")]
    Api(#[from] api::Error),
    #[error("The {0} response has no usable chunk metadata")]
    MissingChunkMeta(&'static str),
    #[error("Expected {expected} upload plans in the create response, got {got}")]
    PlanCount { expected: usize, got: usize },
}

/// A local file queued for upload. Built once per input file; immutable.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl FileDescriptor {
    /// Describes a local file, reading its size from the filesystem and
    /// guessing the MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no file name in {}", path.display()),
                )
            })?;
        let size = std::fs::metadata(path)?.len();
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_owned();
        Ok(FileDescriptor {
            path: path.to_path_buf(),
            name,
            size,
            mime_type,
        })
    }
}

/// The server's answer to "how do I upload this file": its id on the
/// resource, the chunk size to slice with, and how many parts that implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub file_id: String,
    pub chunk_size: u64,
    pub part_count: u64,
    /// Multipart-upload identifier, required by the board URL endpoint.
    pub multipart_id: Option<String>,
}

/// One upload lifecycle against one concrete wire contract.
///
/// Implementations are selected once per orchestration run and never mixed.
#[async_trait]
pub trait TransferProtocol: Send + Sync {
    /// Negotiates the resource with the control plane. Returns the resource
    /// id and one [`UploadPlan`] per descriptor, in input order.
    async fn create(
        &self,
        message: &str,
        files: &[FileDescriptor],
    ) -> Result<(String, Vec<UploadPlan>), Error>;

    /// Per-file negotiation round, required before any upload URL may be
    /// requested. The board and transfer flows have none; the mail flow
    /// replaces the plan with the per-file response.
    async fn negotiate_file(
        &self,
        resource_id: &str,
        file: &FileDescriptor,
        plan: UploadPlan,
    ) -> Result<UploadPlan, Error> {
        let _ = (resource_id, file);
        Ok(plan)
    }

    /// Requests the single-use pre-signed URL for one part. `chunk` is the
    /// exact byte block about to be uploaded; the mail flow derives its
    /// checksum from it.
    async fn upload_url(
        &self,
        resource_id: &str,
        plan: &UploadPlan,
        part_number: u64,
        chunk: &[u8],
    ) -> Result<String, Error>;

    /// Signals that every part of one file went out. `parts_uploaded` is the
    /// number of parts actually uploaded, which is the server-side
    /// reconciliation key.
    async fn complete_file(
        &self,
        resource_id: &str,
        plan: &UploadPlan,
        parts_uploaded: u64,
    ) -> Result<(), Error>;

    /// Converts the fully-uploaded resource into a shareable link.
    /// `total_parts` is the sum of uploaded parts across all files, which
    /// the mail finalize call requires.
    async fn finalize(&self, resource_id: &str, total_parts: u64) -> Result<String, Error>;
}

/// Chunking metadata attached to a file entry in create responses.
#[derive(Debug, Deserialize)]
pub(crate) struct Multipart {
    pub chunk_size: u64,
    pub part_numbers: Option<u64>,
    /// Board flows carry the multipart-upload id here.
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UrlResponse {
    pub url: String,
}
