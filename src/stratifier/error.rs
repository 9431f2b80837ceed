use super::*;

/// Protocol-level errors surfaced to a miner as a Stratum JSON-RPC error
/// array. Distinct from `stratum::InternalError`, which is raised while
/// decoding wire values before a method even has a typed request to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StratumError {
    MethodNotAllowed,
    Unauthorized,
    NotAuthorized,
    WorkerMismatch,
    Stale,
    InvalidNonce2Length,
    NtimeOutOfRange,
    InvalidVersionMask,
    Duplicate,
    AboveTarget,
    UnsupportedExtension,
}

impl StratumError {
    pub(crate) fn into_response(self, traceback: Option<Value>) -> JsonRpcError {
        let (code, message) = match self {
            StratumError::MethodNotAllowed => {
                (StratumErrorCode::MethodNotFound, "Method not allowed in current state")
            }
            StratumError::Unauthorized => (StratumErrorCode::UnauthorizedWorker, "Unauthorized worker"),
            StratumError::NotAuthorized => {
                (StratumErrorCode::UnauthorizedOrInvalidShare, "Unauthorized or invalid share")
            }
            StratumError::WorkerMismatch => {
                (StratumErrorCode::UnauthorizedWorker, "Submitted worker does not match authorized worker")
            }
            StratumError::Stale => (StratumErrorCode::UnauthorizedOrInvalidShare, "Job not found or stale"),
            StratumError::InvalidNonce2Length => {
                (StratumErrorCode::UnauthorizedOrInvalidShare, "Incorrect size of extranonce2")
            }
            StratumError::NtimeOutOfRange => {
                (StratumErrorCode::UnauthorizedOrInvalidShare, "ntime out of range")
            }
            StratumError::InvalidVersionMask => {
                (StratumErrorCode::UnauthorizedOrInvalidShare, "Invalid version bits")
            }
            StratumError::Duplicate => (StratumErrorCode::UnauthorizedOrInvalidShare, "Duplicate share"),
            StratumError::AboveTarget => {
                (StratumErrorCode::UnauthorizedOrInvalidShare, "Share above target")
            }
            StratumError::UnsupportedExtension => {
                (StratumErrorCode::MethodNotFound, "Unsupported extension")
            }
        };

        JsonRpcError {
            error_code: code.code(),
            message: message.to_string(),
            traceback,
        }
    }
}
