#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Unpaid,
    Started,
    Completed,
    Bounced,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "payment_unpaid",
            PaymentStatus::Started => "payment_started",
            PaymentStatus::Completed => "payment_completed",
            PaymentStatus::Bounced => "payment_bounced",
            PaymentStatus::Refunded => "payment_refunded",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "payment_unpaid" => Some(PaymentStatus::Unpaid),
            "payment_started" => Some(PaymentStatus::Started),
            "payment_completed" => Some(PaymentStatus::Completed),
            "payment_bounced" => Some(PaymentStatus::Bounced),
            "payment_refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// The full transition table. A bounce after completion is how a chain
    /// reorg revert is recorded; bounced and refunded are terminal.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Unpaid, Started)
                | (Unpaid, Completed)
                | (Unpaid, Bounced)
                | (Started, Completed)
                | (Started, Bounced)
                | (Started, Refunded)
                | (Completed, Bounced)
                | (Completed, Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Bounced | PaymentStatus::Refunded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for status in [
            PaymentStatus::Unpaid,
            PaymentStatus::Started,
            PaymentStatus::Completed,
            PaymentStatus::Bounced,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("payment_pending"), None);
    }

    #[test]
    fn happy_path_transitions_allowed() {
        assert!(PaymentStatus::Unpaid.can_transition_to(PaymentStatus::Started));
        assert!(PaymentStatus::Started.can_transition_to(PaymentStatus::Completed));
        // Providers sometimes skip the started event entirely.
        assert!(PaymentStatus::Unpaid.can_transition_to(PaymentStatus::Completed));
    }

    #[test]
    fn completed_cannot_regress_to_started() {
        assert!(!PaymentStatus::Completed.can_transition_to(PaymentStatus::Started));
        assert!(!PaymentStatus::Completed.can_transition_to(PaymentStatus::Unpaid));
    }

    #[test]
    fn reorg_revert_is_a_legal_transition() {
        assert!(PaymentStatus::Completed.can_transition_to(PaymentStatus::Bounced));
        assert!(PaymentStatus::Completed.can_transition_to(PaymentStatus::Refunded));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for next in [
            PaymentStatus::Unpaid,
            PaymentStatus::Started,
            PaymentStatus::Completed,
            PaymentStatus::Bounced,
            PaymentStatus::Refunded,
        ] {
            assert!(!PaymentStatus::Bounced.can_transition_to(next));
            assert!(!PaymentStatus::Refunded.can_transition_to(next));
        }
        assert!(PaymentStatus::Bounced.is_terminal());
        assert!(PaymentStatus::Refunded.is_terminal());
        assert!(!PaymentStatus::Completed.is_terminal());
    }

    #[test]
    fn no_self_transitions() {
        for status in [
            PaymentStatus::Unpaid,
            PaymentStatus::Started,
            PaymentStatus::Completed,
        ] {
            assert!(!status.can_transition_to(status));
        }
    }
}
