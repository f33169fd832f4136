//! Operator interrupt handling

use crate::dispatch::{CancelSignal, StopReason};
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Forward the first SIGINT/SIGTERM to `signal`.
///
/// The listener also exits once the run cancels itself, so it never outlives
/// the run.
pub fn spawn_interrupt_listener(signal: CancelSignal) -> JoinHandle<()> {
    tokio::spawn(forward_interrupt(shutdown_requested(), signal))
}

/// Trigger `signal` when `interrupt` resolves, unless the run stops first.
pub async fn forward_interrupt<F>(interrupt: F, signal: CancelSignal)
where
    F: Future<Output = std::io::Result<&'static str>>,
{
    tokio::select! {
        result = interrupt => match result {
            Ok(name) => {
                info!("Received stop signal: {}", name);
                signal.trigger(StopReason::Interrupted);
            }
            Err(e) => error!("Failed to listen for stop signals: {}", e),
        },
        _ = signal.cancelled() => {
            info!("Run cancelled, interrupt listener exiting");
        }
    }
}

#[cfg(unix)]
async fn shutdown_requested() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_requested() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_interrupt_triggers_signal() {
        let signal = CancelSignal::new();
        let (tx, rx) = oneshot::channel::<()>();
        let listener = tokio::spawn(forward_interrupt(
            async move {
                let _ = rx.await;
                Ok("SIGINT")
            },
            signal.clone(),
        ));

        tx.send(()).unwrap();
        listener.await.unwrap();
        assert_eq!(signal.reason(), Some(StopReason::Interrupted));
    }

    #[tokio::test]
    async fn test_listener_exits_when_run_ends() {
        let signal = CancelSignal::new();
        let listener = tokio::spawn(forward_interrupt(
            std::future::pending(),
            signal.clone(),
        ));

        signal.trigger(StopReason::TargetReached);
        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.reason(), Some(StopReason::TargetReached));
    }

    #[tokio::test]
    async fn test_listener_error_does_not_cancel() {
        let signal = CancelSignal::new();
        forward_interrupt(
            async { Err(std::io::Error::other("no signal support")) },
            signal.clone(),
        )
        .await;
        assert!(!signal.is_cancelled());
    }
}
