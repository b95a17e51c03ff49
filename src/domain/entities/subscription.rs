use serde::{Deserialize, Serialize};

/// Lifecycle state of a subscription.
///
/// The only legal transitions are `Active -> Cancelled` (user or admin
/// cancels) and `Active -> Expired` (end date passed). `Cancelled` and
/// `Expired` are terminal; every status write goes through the subscription
/// repository guarded by `can_transition_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Cancelled | SubscriptionStatus::Expired
        )
    }

    pub fn can_transition_to(&self, next: SubscriptionStatus) -> bool {
        matches!(
            (self, next),
            (
                SubscriptionStatus::Active,
                SubscriptionStatus::Cancelled | SubscriptionStatus::Expired
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_cancel_or_expire() {
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Cancelled));
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Expired));
        assert!(!SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Active));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for terminal in [SubscriptionStatus::Cancelled, SubscriptionStatus::Expired] {
            assert!(terminal.is_terminal());
            for next in [
                SubscriptionStatus::Active,
                SubscriptionStatus::Cancelled,
                SubscriptionStatus::Expired,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn serializes_uppercase() {
        let json = serde_json::to_string(&SubscriptionStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
        let parsed: SubscriptionStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(parsed, SubscriptionStatus::Cancelled);
    }
}
