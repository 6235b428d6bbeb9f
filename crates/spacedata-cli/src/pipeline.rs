//! Request → fetch → verify → deliver, driven through the attestation
//! state machine.

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use spacedata_attest::{AttestationEvent, AttestationProof, AttestationState};

use crate::api::{AttestationApi, FetchStatus};
use crate::poll::{PollOutcome, PollPolicy};

/// Where a pipeline run ended.
#[derive(Debug, PartialEq)]
pub enum RunOutcome {
    /// The request transaction succeeded but carried no request id.
    MissingRequestId { transaction_hash: String },
    /// The DA layer had no proof within the wait budget.
    NotReady { request_id: String, waited: Duration },
    /// Every step ran; the state is Delivered or Rejected.
    Finished(AttestationState),
}

/// Polls the DA layer until a proof appears or the policy gives up.
pub fn await_proof<A, S>(
    api: &A,
    request_id: &str,
    policy: &PollPolicy,
    sleep: S,
) -> Result<PollOutcome<AttestationProof>>
where
    A: AttestationApi + ?Sized,
    S: FnMut(Duration),
{
    policy.run(
        |attempt| {
            let status = api.fetch_attestation(request_id)?;
            if status == FetchStatus::Pending {
                println!("  {} attempt {}: result not ready yet", "…".yellow(), attempt);
            }
            Ok(match status {
                FetchStatus::Ready(proof) => Some(proof),
                FetchStatus::Pending => None,
            })
        },
        sleep,
    )
}

pub fn run<A, S>(
    api: &A,
    attestation_type: &str,
    parameters: &str,
    policy: &PollPolicy,
    sleep: S,
) -> Result<RunOutcome>
where
    A: AttestationApi + ?Sized,
    S: FnMut(Duration),
{
    let state = AttestationState::Unrequested;

    let submission = api.request_attestation(attestation_type, parameters)?;
    println!("{} Attestation requested", "✓".green().bold());
    println!("  Transaction: {}", submission.transaction_hash);
    let Some(request_id) = submission.request_id else {
        return Ok(RunOutcome::MissingRequestId {
            transaction_hash: submission.transaction_hash,
        });
    };
    println!("  Request ID:  {}", request_id);
    let state = state.apply(AttestationEvent::Requested {
        request_id: request_id.clone(),
    })?;

    let proof = match await_proof(api, &request_id, policy, sleep)? {
        PollOutcome::Ready { value, attempts } => {
            println!("{} Proof available after {} attempt(s)", "✓".green().bold(), attempts);
            value
        }
        PollOutcome::TimedOut { waited, .. } => {
            return Ok(RunOutcome::NotReady { request_id, waited });
        }
    };
    let state = state.apply(AttestationEvent::ResultFetched(proof.clone()))?;

    let verified = api.verify_attestation(&request_id, &proof.attestation_response, &proof.proof)?;
    let state = state.apply(AttestationEvent::Verified(verified))?;
    if !verified {
        return Ok(RunOutcome::Finished(state));
    }
    println!("{} Proof verified on-chain", "✓".green().bold());

    let transaction_hash = api.deliver_data(&request_id, &proof.attestation_response, &proof.proof)?;
    let state = state.apply(AttestationEvent::Delivered { transaction_hash })?;
    Ok(RunOutcome::Finished(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacedata_attest::AttestationSubmission;
    use std::cell::{Cell, RefCell};

    struct StubApi {
        request_id: Option<String>,
        ready_after: u32,
        verified: bool,
        fetches: Cell<u32>,
        delivered: RefCell<Vec<String>>,
    }

    impl StubApi {
        fn new(ready_after: u32, verified: bool) -> Self {
            Self {
                request_id: Some("0xabc".to_string()),
                ready_after,
                verified,
                fetches: Cell::new(0),
                delivered: RefCell::new(Vec::new()),
            }
        }
    }

    impl AttestationApi for StubApi {
        fn request_attestation(&self, _t: &str, _p: &str) -> Result<AttestationSubmission> {
            Ok(AttestationSubmission {
                success: true,
                transaction_hash: "0xtx".to_string(),
                request_id: self.request_id.clone(),
            })
        }

        fn fetch_attestation(&self, _request_id: &str) -> Result<FetchStatus> {
            self.fetches.set(self.fetches.get() + 1);
            if self.fetches.get() < self.ready_after {
                return Ok(FetchStatus::Pending);
            }
            Ok(FetchStatus::Ready(AttestationProof {
                attestation_response: "0x01".to_string(),
                proof: "0x02".to_string(),
            }))
        }

        fn verify_attestation(&self, _id: &str, _r: &str, _p: &str) -> Result<bool> {
            Ok(self.verified)
        }

        fn deliver_data(&self, request_id: &str, _r: &str, _p: &str) -> Result<String> {
            self.delivered.borrow_mut().push(request_id.to_string());
            Ok("0xdelivered".to_string())
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: 0.0,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_full_run_delivers() {
        let api = StubApi::new(2, true);
        let outcome = run(&api, "satellite.observation", "digest", &fast_policy(), |_| {}).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Finished(AttestationState::Delivered {
                request_id: "0xabc".to_string(),
                transaction_hash: "0xdelivered".to_string(),
            })
        );
        assert_eq!(api.fetches.get(), 2);
        assert_eq!(api.delivered.borrow().as_slice(), ["0xabc"]);
    }

    #[test]
    fn test_rejected_proof_is_not_delivered() {
        let api = StubApi::new(1, false);
        let outcome = run(&api, "t", "p", &fast_policy(), |_| {}).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Finished(AttestationState::Rejected {
                request_id: "0xabc".to_string()
            })
        );
        assert!(api.delivered.borrow().is_empty());
    }

    #[test]
    fn test_missing_request_id_stops_after_request() {
        let api = StubApi {
            request_id: None,
            ..StubApi::new(1, true)
        };
        let outcome = run(&api, "t", "p", &fast_policy(), |_| {}).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::MissingRequestId {
                transaction_hash: "0xtx".to_string()
            }
        );
        assert_eq!(api.fetches.get(), 0);
    }

    #[test]
    fn test_not_ready_within_budget() {
        let api = StubApi::new(u32::MAX, true);
        let mut slept = Duration::ZERO;
        let outcome = run(&api, "t", "p", &fast_policy(), |d| slept += d).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::NotReady {
                request_id: "0xabc".to_string(),
                waited: Duration::from_secs(5),
            }
        );
        assert_eq!(slept, Duration::from_secs(5));
        assert!(api.delivered.borrow().is_empty());
    }
}
