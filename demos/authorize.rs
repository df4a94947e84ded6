use anyhow::Result;
use dropbox_v1::{Client, Config};
use std::io;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let mut client = Client::new(config)?;

    client.request_token().await?;
    println!("Open this url and allow access:\n{}", client.authorize_url(None)?);
    println!("Press enter when done");
    io::stdin().read_line(&mut String::new())?;

    let token = client.access_token().await?;
    println!("access token: {} secret: {}", token.key, token.secret);

    Ok(())
}
