use serde::Deserialize;

/// Notification envelope the gateway POSTs to the webhook endpoint. Parsed
/// leniently: anything that is not a `payment.succeeded` notification with
/// an object id is acknowledged and dropped, because the provider retries
/// forever on any non-200 response.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayNotification {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub event: Option<String>,
    pub object: Option<NotificationObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationObject {
    pub id: Option<String>,
    pub status: Option<String>,
}

impl GatewayNotification {
    /// The external payment id, if this is a succeeded-payment notification
    /// worth processing at all.
    pub fn succeeded_payment_id(&self) -> Option<&str> {
        if self.kind.as_deref() != Some("notification")
            || self.event.as_deref() != Some("payment.succeeded")
        {
            return None;
        }
        self.object.as_ref()?.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GatewayNotification {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_the_payment_id_from_a_succeeded_notification() {
        let note = parse(
            r#"{"type":"notification","event":"payment.succeeded",
                "object":{"id":"pay-123","status":"succeeded"}}"#,
        );
        assert_eq!(note.succeeded_payment_id(), Some("pay-123"));
    }

    #[test]
    fn ignores_other_events_and_malformed_envelopes() {
        let cancelled = parse(
            r#"{"type":"notification","event":"payment.canceled",
                "object":{"id":"pay-123"}}"#,
        );
        assert_eq!(cancelled.succeeded_payment_id(), None);

        let wrong_kind = parse(r#"{"type":"ping","event":"payment.succeeded"}"#);
        assert_eq!(wrong_kind.succeeded_payment_id(), None);

        let missing_id = parse(
            r#"{"type":"notification","event":"payment.succeeded","object":{}}"#,
        );
        assert_eq!(missing_id.succeeded_payment_id(), None);

        let empty = parse("{}");
        assert_eq!(empty.succeeded_payment_id(), None);
    }
}
