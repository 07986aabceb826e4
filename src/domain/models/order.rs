//! Order-side value types consumed by the reconciliation job.
//!
//! The order/payment platform itself is an external collaborator; the
//! job only sees these narrow projections of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Payment verification results for an order, used as a proxy for
/// payment risk when deciding whether a case may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSignals {
    /// Address verification (AVS) response code, if received.
    pub avs_code: Option<String>,
    /// Card verification (CVV) response code, if received.
    pub cvv_code: Option<String>,
}

impl VerificationSignals {
    pub fn new(avs_code: Option<String>, cvv_code: Option<String>) -> Self {
        Self { avs_code, cvv_code }
    }

    /// True when both signals have arrived and are non-empty.
    pub fn both_present(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.avs_code) && present(&self.cvv_code)
    }
}

/// Store and currency context of an order, handed to the payment
/// environment hook before remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderContext {
    pub store_id: String,
    pub currency: String,
}

/// Outbound case body submitted to the remote review service.
///
/// Built by the order gateway from current order data on every
/// submission attempt; never cached across ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasePayload {
    pub order_reference: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Current remote state of a case, as fetched from the review service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewUpdate {
    /// Flat attribute map in the remote service's vocabulary.
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ReviewUpdate {
    pub fn new(fields: BTreeMap<String, serde_json::Value>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_present_requires_both() {
        let none = VerificationSignals::default();
        assert!(!none.both_present());

        let avs_only = VerificationSignals::new(Some("Y".into()), None);
        assert!(!avs_only.both_present());

        let cvv_only = VerificationSignals::new(None, Some("M".into()));
        assert!(!cvv_only.both_present());

        let both = VerificationSignals::new(Some("Y".into()), Some("M".into()));
        assert!(both.both_present());
    }

    #[test]
    fn test_empty_string_counts_as_absent() {
        let signals = VerificationSignals::new(Some(String::new()), Some("M".into()));
        assert!(!signals.both_present());
    }
}
