use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use groupbuy_inventory::StockAdjusted;

use crate::store::{StorefrontStore, User};

use super::{Notification, NotificationError, NotificationStore};

/// Outcome of one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Outbox records marked dispatched.
    pub records: usize,
    /// Newly stored notifications.
    pub emitted: usize,
    /// Notifications that already existed (redelivery).
    pub duplicates: usize,
}

/// Turns committed `StockAdjusted` outbox records into admin notifications.
pub struct NotificationDispatcher<S: ?Sized, N: ?Sized> {
    store: Arc<S>,
    notifications: Arc<N>,
    batch_size: u32,
}

impl<S, N> NotificationDispatcher<S, N>
where
    S: StorefrontStore + ?Sized,
    N: NotificationStore + ?Sized,
{
    pub fn new(store: Arc<S>, notifications: Arc<N>, batch_size: u32) -> Self {
        Self {
            store,
            notifications,
            batch_size: batch_size.max(1),
        }
    }

    /// Process one batch of pending outbox records in sequence order.
    ///
    /// Records are marked dispatched only after every notification derived
    /// from them was stored; on failure the processed prefix is marked and the
    /// rest stays pending for the next pass.
    #[instrument(skip(self), err)]
    pub async fn dispatch_pending(&self) -> Result<DispatchReport, NotificationError> {
        let records = self.store.pending_outbox(self.batch_size).await?;
        if records.is_empty() {
            return Ok(DispatchReport::default());
        }

        let mut report = DispatchReport::default();
        let mut admins: Option<Vec<User>> = None;
        let mut done: Vec<Uuid> = Vec::with_capacity(records.len());

        for record in &records {
            let envelope = &record.envelope;
            let event_id = envelope.event_id();

            let event = match envelope.decode::<StockAdjusted>(StockAdjusted::EVENT_TYPE) {
                Ok(event) => event,
                Err(e) => {
                    warn!(event_id = %event_id, error = %e, "skipping undecodable outbox record");
                    done.push(event_id);
                    continue;
                }
            };

            let Some(alert) = event.alert() else {
                done.push(event_id);
                continue;
            };

            // Loaded once per batch, and only if some record needs it.
            if admins.is_none() {
                match self.store.list_admins().await {
                    Ok(list) => admins = Some(list),
                    Err(e) => {
                        self.mark(&done, &mut report).await?;
                        return Err(e.into());
                    }
                }
            }
            let recipients = admins.as_deref().unwrap_or_default();
            if recipients.is_empty() {
                warn!(event_id = %event_id, alert = alert.as_str(), "no administrators to notify");
            }

            let now = Utc::now();
            for admin in recipients {
                let notification = Notification::for_alert(admin.id, alert, &event, event_id, now);
                match self.notifications.emit(&notification).await {
                    Ok(true) => report.emitted += 1,
                    Ok(false) => report.duplicates += 1,
                    Err(e) => {
                        self.mark(&done, &mut report).await?;
                        return Err(e);
                    }
                }
            }

            info!(
                event_id = %event_id,
                product_id = %event.product_id,
                alert = alert.as_str(),
                recipients = recipients.len(),
                "stock alert dispatched"
            );
            done.push(event_id);
        }

        self.mark(&done, &mut report).await?;
        debug!(records = report.records, emitted = report.emitted, "outbox batch dispatched");
        Ok(report)
    }

    async fn mark(
        &self,
        ids: &[Uuid],
        report: &mut DispatchReport,
    ) -> Result<(), NotificationError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.mark_outbox_dispatched(ids, Utc::now()).await?;
        report.records += ids.len();
        Ok(())
    }
}
