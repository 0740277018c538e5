//! Single-chunk PUT against pre-signed storage URLs.

use core::task::Poll;
use reqwest::{Body, Client, StatusCode};
use std::{
    cmp, io,
    sync::{Arc, Mutex},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Reqwest error: {0:?}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("The storage endpoint rejected part {part} with status {status}")]
    Rejected { part: u64, status: StatusCode },
}

/// Progress callback: `(file_name, part_number, bytes_sent, bytes_total)`.
pub type ProgressListener =
    Arc<Mutex<dyn FnMut(Arc<String>, usize, usize, usize) + Send + Sync + 'static>>;

/// Uploads chunk bodies to the pre-signed URLs the control plane hands out.
///
/// One PUT per part, no retries; a failed part fails the whole file upload
/// at the orchestration layer.
pub struct StorageUploader {
    client: Client,
    progress_listener: Option<ProgressListener>,
}

impl StorageUploader {
    pub fn new(progress_listener: Option<ProgressListener>) -> Self {
        StorageUploader {
            client: Client::new(),
            progress_listener,
        }
    }

    pub async fn put(
        &self,
        url: &str,
        file_name: &str,
        mime_type: &str,
        part: u64,
        data: Vec<u8>,
    ) -> Result<(), Error> {
        let body = Body::wrap_stream(ProgressStream {
            name: Arc::new(file_name.to_owned()),
            part: part as usize,
            data: Arc::new(data),
            cursor: 0,
            progress_listener: self.progress_listener.clone(),
        });

        let resp = self
            .client
            .put(url)
            .header("File", file_name)
            .header("Content-Type", mime_type)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Rejected { part, status });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProgressStream {
    name: Arc<String>,
    part: usize,
    data: Arc<Vec<u8>>,
    cursor: usize,
    progress_listener: Option<ProgressListener>,
}

impl futures::Stream for ProgressStream {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let total_len = self.data.len();
        let remain_len = total_len - self.cursor;

        if remain_len == 0 {
            Poll::Ready(None)
        } else {
            let mut result = vec![0u8; cmp::min(remain_len, 1024 * 32)];
            let start_index = self.cursor;
            self.cursor += result.len();
            result.copy_from_slice(&self.data[start_index..self.cursor]);

            if let Some(pl) = self.progress_listener.as_ref() {
                if let Ok(mut f) = pl.lock() {
                    f(self.name.clone(), self.part, self.cursor, total_len);
                }
            }

            Poll::Ready(Some(Ok(result)))
        }
    }
}
