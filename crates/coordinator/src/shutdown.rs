use tokio::sync::mpsc;

/// Watch for Ctrl-C. The first signal asks the caller to abandon dispatch
/// and tear the fleet down; a second exits immediately.
pub fn spawn_ctrl_c_handler() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut hits = 0u8;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            hits += 1;
            if hits == 1 {
                eprintln!(
                    "Stop requested — tearing down workers (press CTRL+C again to exit immediately)."
                );
                let _ = tx.send(());
            } else {
                eprintln!("Stop requested again — exiting immediately.");
                std::process::exit(130);
            }
        }
    });
    rx
}
