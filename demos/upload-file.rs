use anyhow::Result;
use dropbox_v1::{helper, Client, Config, Token};
use std::env;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = env::args().collect::<Vec<_>>();

    match args.as_slice() {
        [_, path, remote_path, token_key, token_secret] => {
            upload(path, remote_path, token_key, token_secret).await
        }
        _ => panic!(
            "\n\nPlease input [the_path_to_the_file] [the_path_in_dropbox] [access_token_key] and [access_token_secret]\n\n"
        ),
    }
}

async fn upload(path: &str, remote_path: &str, token_key: &str, token_secret: &str) -> Result<()> {
    let client = Client::with_token(Config::from_env()?, Token::new(token_key, token_secret))?;

    let meta = helper::upload_file(
        path,
        &client,
        remote_path,
        true,
        None,
        Some(Arc::new(Mutex::new(
            |name: Arc<String>, part: usize, pos: usize, total: usize| {
                println!("name: {name} part:{part} {pos}/{total}");
            },
        ))),
    )
    .await?;

    println!("uploaded: {} rev: {:?} size: {}", meta.path, meta.rev, meta.size);
    Ok(())
}
