//! Collaborator interfaces the monitor reports to.

use async_trait::async_trait;
use guard_core::{MessageKey, Result};
use tracing::{info, warn};

/// Receives user-facing notices (toasts, the warning modal, the expiry modal).
pub trait NotificationPort: Send + Sync {
    fn notify(&self, kind: MessageKey, text: &str);
}

/// Secures data and forces re-authentication once a session ends.
#[async_trait]
pub trait TerminationPort: Send + Sync {
    /// Persist or flush in-progress state before logout.
    async fn secure_data(&self) -> Result<()>;

    /// Send the user back to the login screen.
    fn force_reauth(&self);
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    fn notify(&self, kind: MessageKey, text: &str) {
        match kind {
            MessageKey::Warning | MessageKey::Logout | MessageKey::SecuringData => {
                warn!(kind = %kind, "{}", text);
            }
            _ => info!(kind = %kind, "{}", text),
        }
    }
}

/// Terminator with nothing to secure. Logs the re-authentication request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTerminator;

#[async_trait]
impl TerminationPort for LogTerminator {
    async fn secure_data(&self) -> Result<()> {
        info!("No session data to secure");
        Ok(())
    }

    fn force_reauth(&self) {
        warn!("Re-authentication required");
    }
}
