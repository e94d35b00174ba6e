use super::{EventOutcome, ProcessError};
use crate::webhooks::daimo::http_server::DaimoWebhookEvent;

/// Unknown statuses are acknowledged and dropped so new provider event types
/// cannot break the pipeline.
pub fn handle_unknown_event(event: &DaimoWebhookEvent) -> Result<EventOutcome, ProcessError> {
    tracing::warn!(
        "Ignoring webhook with unknown status '{}' for payment {}",
        event.status,
        event.id
    );

    Ok(EventOutcome::default())
}
