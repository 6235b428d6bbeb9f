//! Contract bindings for the attestation hub, verifier and data purchase contracts.

use alloy::primitives::{Address, B256};
use alloy::rpc::types::Log;
use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IFdcHub {
        // Declared by the deployed hub with the request id as the first
        // indexed topic; deployments whose non-indexed fields differ are
        // handled by `request_id_from_logs`.
        event AttestationRequested(
            bytes32 indexed requestId,
            address indexed requester,
            string attestationType,
            string parameters
        );

        function requestAttestation(string attestationType, string parameters) external returns (bytes32);
    }
}

sol! {
    #[sol(rpc)]
    interface IFdcVerification {
        function verifyAttestation(
            bytes32 requestId,
            bytes32 attestationResponse,
            bytes proof
        ) external view returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    interface IDataPurchase {
        function deliverData(bytes32 requestId, bytes32 attestationResponse, bytes proof) external;
    }
}

/// Finds the request id emitted by `hub` in a receipt's logs.
///
/// A log matching [`IFdcHub::AttestationRequested`] wins. Otherwise the first
/// log from the hub that carries an indexed topic is read as the request id.
pub fn request_id_from_logs(hub: Address, logs: &[Log]) -> Option<B256> {
    let hub_logs = || logs.iter().filter(|log| log.inner.address == hub);

    if let Some(event) = hub_logs().find_map(|log| log.log_decode::<IFdcHub::AttestationRequested>().ok()) {
        return Some(event.inner.data.requestId);
    }

    let (log, request_id) = hub_logs().find_map(|log| Some((log, *log.topics().get(1)?)))?;
    tracing::warn!(
        "Hub log with signature {:?} did not match AttestationRequested; using its first indexed topic as request id",
        log.topics().first()
    );
    Some(request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, keccak256, Bytes, LogData};
    use alloy::sol_types::SolEvent;

    const HUB: Address = address!("2330d0cc23fd6764b7c67023c8fb85ae7287bfc9");
    const OTHER: Address = address!("00000000000000000000000000000000000000aa");
    const REQUEST_ID: B256 = b256!("1111111111111111111111111111111111111111111111111111111111111111");

    fn log(emitter: Address, data: LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address: emitter, data },
            ..Default::default()
        }
    }

    fn requested_event() -> LogData {
        IFdcHub::AttestationRequested {
            requestId: REQUEST_ID,
            requester: OTHER,
            attestationType: "satellite.observation".to_string(),
            parameters: "digest".to_string(),
        }
        .encode_log_data()
    }

    #[test]
    fn test_decodes_typed_event() {
        let logs = vec![log(HUB, requested_event())];
        assert_eq!(request_id_from_logs(HUB, &logs), Some(REQUEST_ID));
    }

    #[test]
    fn test_falls_back_to_first_indexed_topic() {
        let signature = keccak256("AttestationRequested(bytes32,bytes)");
        let data = LogData::new_unchecked(vec![signature, REQUEST_ID], Bytes::from_static(&[0u8; 32]));
        let logs = vec![log(HUB, data)];
        assert_eq!(request_id_from_logs(HUB, &logs), Some(REQUEST_ID));
    }

    #[test]
    fn test_ignores_logs_from_other_contracts() {
        let logs = vec![log(OTHER, requested_event())];
        assert_eq!(request_id_from_logs(HUB, &logs), None);

        let unindexed = LogData::new_unchecked(vec![keccak256("Ping()")], Bytes::new());
        assert_eq!(request_id_from_logs(HUB, &[log(HUB, unindexed)]), None);
    }
}
