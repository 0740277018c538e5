use anyhow::Result;
use std::env;
use std::sync::{Arc, Mutex};
use wetransfer::helper;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = env::args().collect::<Vec<_>>();

    match args.as_slice() {
        [_, api_key, board_name, paths @ ..] if !paths.is_empty() => {
            let board = helper::upload_to_board(
                paths,
                api_key,
                board_name,
                Some(Arc::new(Mutex::new(|name, part, pos, total| {
                    println!("name: {name} part:{part} {pos}/{total}");
                }))),
            )
            .await?;

            println!("{}", board.url);
            Ok(())
        }
        _ => panic!("\n\nPlease input [api_key] [board_name] and at least one [file_path]\n\n"),
    }
}
