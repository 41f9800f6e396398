use clap::{Parser, ValueEnum};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{Action, Envelope, Input, ServerMessage, RECT_WIDTH};
use std::time::Duration;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Headless player that chases the ball with its paddle
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server host
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Which paddle this bot expects to control (join order decides)
    #[clap(short, long, value_enum, default_value = "left")]
    side: Side,
    /// How long to play before disconnecting
    #[clap(short, long, default_value = "30")]
    duration: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let url = format!("ws://{}:{}/ws", args.host, args.port);
    let (socket, _) = connect_async(url.as_str()).await?;
    info!("Connected to {}", url);

    let (mut sink, mut stream) = socket.split();
    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut frames = 0u64;

    loop {
        let message = tokio::select! {
            message = stream.next() => message,
            _ = tokio::time::sleep_until(deadline) => {
                info!("Time is up after {} frames", frames);
                break;
            }
        };

        let text = match message {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                info!("Server closed the connection");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!("Connection error: {}", e);
                break;
            }
        };

        // The server may pack several messages into one frame.
        for line in text.lines() {
            let Ok(envelope) = serde_json::from_str::<Envelope>(line) else {
                warn!("Unreadable message: {}", line);
                continue;
            };

            match envelope.action() {
                Some(Action::GameStart) | Some(Action::UpdateFrame) => {}
                _ => continue,
            }

            let update: ServerMessage = serde_json::from_str(line)?;
            if let ServerMessage::GameStart(frame) = &update {
                info!(
                    "Game started, ball heading {}",
                    if frame.ball_state.speed_x < 0.0 { "left" } else { "right" }
                );
            }

            frames += 1;
            let frame = update.frame();
            let paddle = frame.players_state[args.side.index()];
            let paddle_center = (paddle.y + RECT_WIDTH / 2) as f64;

            let input = if frame.ball_state.y < paddle_center - 5.0 {
                Input::MoveUp
            } else if frame.ball_state.y > paddle_center + 5.0 {
                Input::MoveDown
            } else {
                continue;
            };

            debug!("Paddle at {}, sending {:?}", paddle.y, input);
            let payload = serde_json::to_string(&Envelope::from_input(input))?;
            sink.send(Message::Text(payload)).await?;
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    Ok(())
}
