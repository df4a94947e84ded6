use anyhow::Result;
use dropbox_v1::{Client, Config, Token};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();

    match args.as_slice() {
        [_, token_key, token_secret] => account_info(token_key, token_secret).await,
        _ => panic!(
            "\n\nPlease input [access_token_key] and [access_token_secret]\n\n"
        ),
    }
}

async fn account_info(token_key: &str, token_secret: &str) -> Result<()> {
    let client = Client::with_token(Config::from_env()?, Token::new(token_key, token_secret))?;
    let info = client.account_info().await?;

    println!("name: {}", info.display_name);
    println!(
        "used: {} of {} bytes",
        info.quota_info.normal + info.quota_info.shared,
        info.quota_info.quota
    );
    Ok(())
}
