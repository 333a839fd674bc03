//! Connects to a running notification hub as one user and prints every frame.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Hub base URL
    #[clap(short, long, default_value = "ws://127.0.0.1:5000/hubs/notifications")]
    url: String,

    /// User to listen as
    #[clap(short = 'i', long)]
    user_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (socket, _) = connect_async(args.url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();

    let set_user = json!({ "type": "SetUserId", "userId": args.user_id }).to_string();
    sink.send(Message::Text(set_user.into())).await?;
    println!("Listening on {} as {}", args.url, args.user_id);

    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => println!("{}", text.as_str()),
            Message::Close(_) => break,
            _ => {}
        }
    }

    println!("Hub closed the connection");
    Ok(())
}
