//! Server-side wrapper around the origin-change notifier.

use async_trait::async_trait;
use rotating_auth::notify::{Notifier, NotifyError, OriginChange};
use std::sync::Arc;

use crate::{logging, metrics};

/// Records every origin change as a security event and metric before
/// handing it to the configured notifier
pub struct AuditedNotifier {
    inner: Arc<dyn Notifier>,
}

impl AuditedNotifier {
    pub fn new(inner: Arc<dyn Notifier>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Notifier for AuditedNotifier {
    async fn notify(&self, alert: &OriginChange) -> Result<(), NotifyError> {
        metrics::origin_change_alerts();
        logging::log_security_event(
            "origin_change",
            Some(&alert.owner_id.to_string()),
            Some(&alert.new_origin),
            &format!("Token refresh from new address (previously {})", alert.old_origin),
        );
        self.inner.notify(alert).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<OriginChange>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, alert: &OriginChange) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forwards_to_inner_notifier() {
        let inner = Arc::new(Recording::default());
        let notifier = AuditedNotifier::new(inner.clone());

        let alert = OriginChange::new(Uuid::new_v4(), "1.2.3.4", "5.6.7.8");
        notifier.notify(&alert).await.unwrap();

        assert_eq!(inner.seen.lock().unwrap().as_slice(), &[alert]);
    }
}
