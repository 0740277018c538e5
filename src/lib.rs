//! `wetransfer` is a crate to upload files to <https://wetransfer.com/> more easily.
//!
//! These features are supported:
//! * WeTransfer public API accessing (authorize, transfers, boards).
//! * Chunked multi-file uploads to pre-signed storage URLs.
//! * Boards with incremental file and link additions.
//! * Transfer-by-email through the undocumented v4 API.
//!
//! ## Example
//!
//! To upload a single file and get the shareable link:
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let url = wetransfer::helper::upload(
//!     "./video.mp4",      // the file path
//!     "your-api-key",     // the api key created on dev.wetransfer.com
//!     "here is my file",  // the transfer message
//!     None,               // the optional progress listener
//! )
//! .await?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```
//!
//! To assemble a board:
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use wetransfer::client::Client;
//! use wetransfer::protocol::board::Link;
//!
//! let client = Client::new("your-api-key", None).await?;
//! let board = client.create_board("road trip").await?;
//! client.add_files_to_board(&board.id, &["a.jpg", "b.jpg"]).await?;
//! let board = client
//!     .add_links_to_board(&board.id, &[Link::new("https://example.com", "Example")])
//!     .await?;
//! println!("{}", board.url);
//! # Ok(())
//! # }
//! ```
//!
//! To mail a transfer to recipients instead of just getting a link (this
//! goes through the undocumented v4 API and logs a warning):
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use wetransfer::client::Client;
//!
//! let mut client = Client::new("your-api-key", None).await?;
//! client.transfer_by_email("me@example.com", vec!["you@example.com".into()], None);
//! let url = client.upload_files(&["report.pdf"], "monthly report").await?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod chunk;
pub mod client;
pub mod helper;
pub mod protocol;
pub mod session;
pub mod storage;
