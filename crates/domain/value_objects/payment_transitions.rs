//! Payment outcome mapping and the guards applied to webhook-driven transitions.

use crate::domain::value_objects::enums::{
    order_statuses::OrderStatus, payment_statuses::PaymentStatus,
};

/// Final outcome of a payment intent as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl PaymentOutcome {
    /// Maps a provider event type onto an outcome. Unknown types yield `None`.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "payment_intent.succeeded" | "checkout.session.completed" => {
                Some(PaymentOutcome::Succeeded)
            }
            "payment_intent.payment_failed" => Some(PaymentOutcome::Failed),
            "payment_intent.canceled" => Some(PaymentOutcome::Cancelled),
            _ => None,
        }
    }

    pub fn from_payment_status(status: PaymentStatus) -> Option<Self> {
        match status {
            PaymentStatus::Succeeded => Some(PaymentOutcome::Succeeded),
            PaymentStatus::Failed => Some(PaymentOutcome::Failed),
            PaymentStatus::Cancelled => Some(PaymentOutcome::Cancelled),
            PaymentStatus::Pending | PaymentStatus::Processing => None,
        }
    }

    pub fn target(&self) -> StatusPair {
        match self {
            PaymentOutcome::Succeeded => StatusPair {
                payment_status: PaymentStatus::Succeeded,
                status: OrderStatus::Paid,
            },
            PaymentOutcome::Failed => StatusPair {
                payment_status: PaymentStatus::Failed,
                status: OrderStatus::Cancelled,
            },
            PaymentOutcome::Cancelled => StatusPair {
                payment_status: PaymentStatus::Cancelled,
                status: OrderStatus::Cancelled,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPair {
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    Apply,
    AlreadyApplied,
    Stale,
}

/// Decides whether a webhook may move `current` to `target`.
///
/// A target equal to the current pair is a replay. Otherwise the payment status
/// must strictly increase in rank, so terminal states never move again.
pub fn decide_transition(current: StatusPair, target: StatusPair) -> TransitionDecision {
    if current == target {
        return TransitionDecision::AlreadyApplied;
    }

    if target.payment_status.rank() > current.payment_status.rank() {
        TransitionDecision::Apply
    } else {
        TransitionDecision::Stale
    }
}

/// Order status forced by a manual payment-status update. Non-final payment
/// statuses leave the order status alone.
pub fn order_status_for(payment_status: PaymentStatus) -> Option<OrderStatus> {
    PaymentOutcome::from_payment_status(payment_status).map(|outcome| outcome.target().status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(payment_status: PaymentStatus, status: OrderStatus) -> StatusPair {
        StatusPair {
            payment_status,
            status,
        }
    }

    #[test]
    fn maps_event_types() {
        assert_eq!(
            PaymentOutcome::from_event_type("payment_intent.succeeded"),
            Some(PaymentOutcome::Succeeded)
        );
        assert_eq!(
            PaymentOutcome::from_event_type("checkout.session.completed"),
            Some(PaymentOutcome::Succeeded)
        );
        assert_eq!(
            PaymentOutcome::from_event_type("payment_intent.payment_failed"),
            Some(PaymentOutcome::Failed)
        );
        assert_eq!(
            PaymentOutcome::from_event_type("payment_intent.canceled"),
            Some(PaymentOutcome::Cancelled)
        );
        assert_eq!(PaymentOutcome::from_event_type("charge.refunded"), None);
    }

    #[test]
    fn pending_order_moves_to_paid() {
        let current = pair(PaymentStatus::Processing, OrderStatus::Pending);
        let target = PaymentOutcome::Succeeded.target();

        assert_eq!(target, pair(PaymentStatus::Succeeded, OrderStatus::Paid));
        assert_eq!(decide_transition(current, target), TransitionDecision::Apply);
    }

    #[test]
    fn replayed_success_is_skipped() {
        let current = pair(PaymentStatus::Succeeded, OrderStatus::Paid);
        let target = PaymentOutcome::Succeeded.target();

        assert_eq!(
            decide_transition(current, target),
            TransitionDecision::AlreadyApplied
        );
    }

    #[test]
    fn success_after_cancel_is_stale() {
        let current = pair(PaymentStatus::Cancelled, OrderStatus::Cancelled);
        let target = PaymentOutcome::Succeeded.target();

        assert_eq!(decide_transition(current, target), TransitionDecision::Stale);
    }

    #[test]
    fn cancel_after_success_is_stale() {
        let current = pair(PaymentStatus::Succeeded, OrderStatus::Paid);
        let target = PaymentOutcome::Cancelled.target();

        assert_eq!(decide_transition(current, target), TransitionDecision::Stale);
    }

    #[test]
    fn success_after_failure_is_applied() {
        let current = pair(PaymentStatus::Failed, OrderStatus::Cancelled);
        let target = PaymentOutcome::Succeeded.target();

        assert_eq!(decide_transition(current, target), TransitionDecision::Apply);
    }

    #[test]
    fn failure_after_failure_with_manual_status_is_stale() {
        // Operator reopened the order but payment status is unchanged.
        let current = pair(PaymentStatus::Failed, OrderStatus::Pending);
        let target = PaymentOutcome::Failed.target();

        assert_eq!(decide_transition(current, target), TransitionDecision::Stale);
    }

    #[test]
    fn manual_mapping_leaves_non_final_statuses_alone() {
        assert_eq!(order_status_for(PaymentStatus::Succeeded), Some(OrderStatus::Paid));
        assert_eq!(order_status_for(PaymentStatus::Failed), Some(OrderStatus::Cancelled));
        assert_eq!(order_status_for(PaymentStatus::Cancelled), Some(OrderStatus::Cancelled));
        assert_eq!(order_status_for(PaymentStatus::Processing), None);
        assert_eq!(order_status_for(PaymentStatus::Pending), None);
    }
}
