//! Cancellation bridge
//!
//! Turns SIGINT/SIGTERM into a single-fire cancellation event. The media
//! server stops a transcode by signalling the transcoder process, and the
//! worker pod must still be deleted when that happens, so signals never
//! terminate the process directly.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Owning side of the cancellation event
pub struct CancellationBridge {
    tx: watch::Sender<bool>,
}

/// Observer side of the cancellation event
///
/// Cheap to clone; every clone observes the same event.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl CancellationBridge {
    /// Creates an unarmed bridge and its cancellation token
    pub fn new() -> (Self, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, Cancellation { rx })
    }

    /// Fires the cancellation event
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Registers for host termination signals and forwards them to the token
    ///
    /// Registration happens before this returns, so a signal delivered any
    /// time afterwards is observed. The first signal fires the event; later
    /// ones are logged and ignored so cleanup can finish.
    pub fn listen(self) -> std::io::Result<JoinHandle<()>> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            Ok(tokio::spawn(async move {
                loop {
                    let source = tokio::select! {
                        Some(()) = sigterm.recv() => "SIGTERM",
                        Some(()) = sigint.recv() => "SIGINT",
                        else => return,
                    };
                    self.on_signal(source);
                }
            }))
        }

        #[cfg(not(unix))]
        {
            Ok(tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    self.on_signal("Ctrl-C");
                }
            }))
        }
    }

    fn on_signal(&self, source: &str) {
        if *self.tx.borrow() {
            warn!("Received {} while shutting down, ignoring", source);
            return;
        }

        info!("Received {}, exit requested", source);
        self.cancel();
    }
}

impl Cancellation {
    /// Returns true once the event has fired
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the event has fired
    ///
    /// Never resolves if the bridge is dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }
}
