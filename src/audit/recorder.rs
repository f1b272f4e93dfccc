use std::sync::Arc;

use super::{AuditEvent, AuditLogger, EventType};
use crate::geo::GeoResolver;

/// Writes access-stream events enriched with the client's resolved location.
#[derive(Clone, Debug)]
pub struct AccessRecorder {
    audit: Arc<AuditLogger>,
    geo: Arc<GeoResolver>,
}

impl AccessRecorder {
    #[must_use]
    pub fn new(audit: Arc<AuditLogger>, geo: Arc<GeoResolver>) -> Self {
        Self { audit, geo }
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub async fn record(&self, ip: &str, event_type: EventType, details: &str) {
        let geo = self.geo.resolve(ip).await;
        self.audit
            .write(AuditEvent::new(&geo.ip, &geo.location, event_type, details))
            .await;
    }
}
