use std::sync::atomic::Ordering;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use shelfdb::constants;

#[tokio::main]
async fn main() -> Result<()> {
    // Cancellation token for graceful shutdown of the server.
    let cancel_token = CancellationToken::new();
    let cancel_clone = cancel_token.clone();

    // First CTRL-C: graceful shutdown via the token. Second: force exit.
    ctrlc::set_handler(move || {
        if constants::SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            eprintln!("\n⚠️  Force shutdown!");
            std::process::exit(130);
        }
        eprintln!("\n🛑 Shutting down gracefully... (press Ctrl-C again to force)");
        constants::SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        cancel_clone.cancel();
    })
    .expect("Failed to set CTRL-C handler");

    shelfdb::cli::run(cancel_token).await
}
