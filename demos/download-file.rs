use anyhow::Result;
use dropbox_v1::{helper, Client, Config, Token};
use std::env;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();

    match args.as_slice() {
        [_, remote_path, path, token_key, token_secret] => {
            download(remote_path, path, token_key, token_secret).await
        }
        _ => panic!(
            "
        Please input the path in dropbox, the path to save the file and the access token pair
        Example:
            cargo run --example download-file /Photos/a.jpg a.jpg token_key token_secret
        "
        ),
    }
}

async fn download(remote_path: &str, path: &str, token_key: &str, token_secret: &str) -> Result<()> {
    let client = Client::with_token(Config::from_env()?, Token::new(token_key, token_secret))?;

    // an existing partial file is continued
    let written = helper::download_file(
        &client,
        remote_path,
        None,
        path,
        true,
        Some(Arc::new(Mutex::new(
            |name: Arc<String>, _: usize, pos: usize, total: usize| {
                println!("name: {name} {pos}/{total}");
            },
        ))),
    )
    .await?;

    println!("{written} bytes of {remote_path} downloaded to path:{path}");
    Ok(())
}
