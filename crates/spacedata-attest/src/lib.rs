// SpaceData Attest - attestation primitives shared by the server and the CLI

pub mod flow;
pub mod hash;
pub mod hexbytes;
pub mod jcs;
pub mod request_id;
pub mod types;

pub use flow::{AttestationEvent, AttestationState, FlowError};
pub use hash::{keccak256_hex, sha256_hex};
pub use hexbytes::{decode_hex, strip_0x, to_bytes32, HexError};
pub use jcs::jcs_canonical_bytes;
pub use request_id::{generate_request_id, metadata_digest};
pub use types::{
    AttestationProof, AttestationSubmission, ChainConfigView, DeliveryReceipt, ErrorBody,
    FetchedProof, GenerateRequestIdBody, GeneratedRequestId, PendingAttestation, ProofBody,
    RequestAttestationBody, VerificationOutcome,
};
