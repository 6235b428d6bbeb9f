//! Attestation lifecycle.
//!
//! A purchase moves through request → proof fetch → verification →
//! delivery. Each step is an external call, so the state only advances
//! when the caller reports what happened. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

use crate::types::AttestationProof;

/// Where a single attestation request currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttestationState {
    Unrequested,
    Requested {
        request_id: String,
    },
    ResultAvailable {
        request_id: String,
        proof: AttestationProof,
    },
    Verified {
        request_id: String,
        proof: AttestationProof,
    },
    Rejected {
        request_id: String,
    },
    Delivered {
        request_id: String,
        transaction_hash: String,
    },
    Failed {
        error: String,
    },
}

/// Outcome of one external step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationEvent {
    Requested { request_id: String },
    ResultFetched(AttestationProof),
    NotReady,
    Verified(bool),
    Delivered { transaction_hash: String },
    Failed(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("cannot apply {event} while {state}")]
    InvalidTransition { state: &'static str, event: &'static str },
}

impl AttestationState {
    /// Short name of the state, used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            AttestationState::Unrequested => "unrequested",
            AttestationState::Requested { .. } => "requested",
            AttestationState::ResultAvailable { .. } => "result_available",
            AttestationState::Verified { .. } => "verified",
            AttestationState::Rejected { .. } => "rejected",
            AttestationState::Delivered { .. } => "delivered",
            AttestationState::Failed { .. } => "failed",
        }
    }

    /// Rejected, Delivered and Failed accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttestationState::Rejected { .. }
                | AttestationState::Delivered { .. }
                | AttestationState::Failed { .. }
        )
    }

    /// The contract-assigned request id, once known.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AttestationState::Requested { request_id }
            | AttestationState::ResultAvailable { request_id, .. }
            | AttestationState::Verified { request_id, .. }
            | AttestationState::Rejected { request_id }
            | AttestationState::Delivered { request_id, .. } => Some(request_id),
            AttestationState::Unrequested | AttestationState::Failed { .. } => None,
        }
    }

    /// Applies an event, returning the next state.
    pub fn apply(self, event: AttestationEvent) -> Result<AttestationState, FlowError> {
        use AttestationEvent as E;
        use AttestationState as S;

        match (self, event) {
            (state, E::Failed(error)) if !state.is_terminal() => Ok(S::Failed { error }),
            (S::Unrequested, E::Requested { request_id }) => Ok(S::Requested { request_id }),
            (S::Requested { request_id }, E::NotReady) => Ok(S::Requested { request_id }),
            (S::Requested { request_id }, E::ResultFetched(proof)) => {
                Ok(S::ResultAvailable { request_id, proof })
            }
            (S::ResultAvailable { request_id, proof }, E::Verified(true)) => {
                Ok(S::Verified { request_id, proof })
            }
            (S::ResultAvailable { request_id, .. }, E::Verified(false)) => {
                Ok(S::Rejected { request_id })
            }
            (S::Verified { request_id, .. }, E::Delivered { transaction_hash }) => {
                Ok(S::Delivered {
                    request_id,
                    transaction_hash,
                })
            }
            (state, event) => Err(FlowError::InvalidTransition {
                state: state.name(),
                event: event_name(&event),
            }),
        }
    }
}

fn event_name(event: &AttestationEvent) -> &'static str {
    match event {
        AttestationEvent::Requested { .. } => "requested",
        AttestationEvent::ResultFetched(_) => "result_fetched",
        AttestationEvent::NotReady => "not_ready",
        AttestationEvent::Verified(_) => "verified",
        AttestationEvent::Delivered { .. } => "delivered",
        AttestationEvent::Failed(_) => "failed",
    }
}
