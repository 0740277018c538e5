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
        [_, api_key, message, sender, recipient, paths @ ..] if !paths.is_empty() => {
            let url = helper::send_files(
                paths,
                api_key,
                message,
                sender,
                vec![recipient.clone()],
                Some(Arc::new(Mutex::new(|name, part, pos, total| {
                    println!("name: {name} part:{part} {pos}/{total}");
                }))),
            )
            .await?;

            println!("{url}");
            Ok(())
        }
        _ => panic!(
            "\n\nPlease input [api_key] [message] [sender_email] [recipient_email] and at least one [file_path]\n\n"
        ),
    }
}
