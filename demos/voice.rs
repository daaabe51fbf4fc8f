use std::io::BufRead;

use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;

use voicechat::{AudioLifecycle, Hooks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv_override().ok();

    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let mut client = voicechat::connect().await?;
    client.set_hooks(
        Hooks::new()
            .with_transcript(|text, is_partial| {
                if is_partial {
                    println!("You (partial): {text}");
                } else {
                    println!("You: {text}");
                }
            })
            .with_response(|text| println!("AI: {text}"))
            .with_audio_lifecycle(|event| match event {
                AudioLifecycle::Start => println!("[AI speaking]"),
                AudioLifecycle::End => println!("[AI quiet]"),
            }),
    );

    println!("Connected. Press Enter to toggle the call, Ctrl-C to quit.");

    let (toggle_tx, mut toggle_rx) = tokio::sync::mpsc::channel::<()>(4);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() || toggle_tx.blocking_send(()).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            toggled = toggle_rx.recv() => {
                if toggled.is_none() {
                    break;
                }
                match client.toggle_call().await {
                    Ok(true) => println!("call started"),
                    Ok(false) => println!("call stopped"),
                    Err(e) => eprintln!("cannot start call: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    client.disconnect().await;
    Ok(())
}
