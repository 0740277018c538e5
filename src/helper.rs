//! One-call helpers for the common upload flows.

use crate::client::{Client, Error};
use crate::protocol::board::BoardInfo;
use crate::storage::ProgressListener;
use std::path::Path;

/// Uploads a single file as a transfer and returns the shareable link.
pub async fn upload(
    path: impl AsRef<Path>,
    x_api_key: impl AsRef<str>,
    message: &str,
    progress_listener: Option<ProgressListener>,
) -> Result<String, Error> {
    upload_files(&[path], x_api_key, message, progress_listener).await
}

/// Uploads files as one transfer and returns the shareable link.
pub async fn upload_files(
    paths: &[impl AsRef<Path>],
    x_api_key: impl AsRef<str>,
    message: &str,
    progress_listener: Option<ProgressListener>,
) -> Result<String, Error> {
    let mut client = Client::new(x_api_key, None).await?;
    if let Some(listener) = progress_listener {
        client = client.with_progress_listener(listener);
    }
    client.upload_files(paths, message).await
}

/// Uploads files and mails the transfer to `recipients` through the
/// undocumented v4 API. Returns the shortened shareable link.
pub async fn send_files(
    paths: &[impl AsRef<Path>],
    x_api_key: impl AsRef<str>,
    message: &str,
    sender: impl Into<String>,
    recipients: Vec<String>,
    progress_listener: Option<ProgressListener>,
) -> Result<String, Error> {
    let mut client = Client::new(x_api_key, None).await?;
    if let Some(listener) = progress_listener {
        client = client.with_progress_listener(listener);
    }
    client.transfer_by_email(sender, recipients, None);
    client.upload_files(paths, message).await
}

/// Creates a named board, uploads the files onto it, and returns the
/// board's state with its shareable page URL.
pub async fn upload_to_board(
    paths: &[impl AsRef<Path>],
    x_api_key: impl AsRef<str>,
    board_name: &str,
    progress_listener: Option<ProgressListener>,
) -> Result<BoardInfo, Error> {
    let mut client = Client::new(x_api_key, None).await?;
    if let Some(listener) = progress_listener {
        client = client.with_progress_listener(listener);
    }
    let board = client.create_board(board_name).await?;
    client.add_files_to_board(&board.id, paths).await
}
