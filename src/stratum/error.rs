use {super::*, bitcoin::address::ParseError as AddressParseError};

/// Stratum error codes carried in JSON-RPC error arrays (`[code, message, data]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StratumErrorCode {
    MethodNotFound = 20,
    UnauthorizedWorker = 21,
    UnauthorizedOrInvalidShare = 23,
}

impl StratumErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Internal, typed errors raised while decoding Stratum wire values.
#[derive(Debug, Snafu)]
pub enum InternalError {
    #[snafu(display("invalid value: {reason}"))]
    InvalidValue { reason: String },

    #[snafu(display("parse error: {message}"))]
    Parse { message: String },

    #[snafu(display("invalid hex integer '{input}': {source}"))]
    ParseHexInt {
        input: String,
        source: std::num::ParseIntError,
    },

    #[snafu(display("username has no address component"))]
    EmptyUsername,

    #[snafu(display("invalid address: {source}"))]
    InvalidAddress { source: AddressParseError },

    #[snafu(display("address network mismatch: expected {expected:?}, got address {address}"))]
    NetworkMismatch { expected: Network, address: String },

    #[snafu(display("could not infer network for address"))]
    UnknownNetwork,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub error_code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: StratumErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: code.code(),
            message: message.into(),
            traceback: None,
        }
    }

    pub fn method_not_found() -> Self {
        Self::new(StratumErrorCode::MethodNotFound, "Method not found")
    }

    pub fn unauthorized_worker() -> Self {
        Self::new(StratumErrorCode::UnauthorizedWorker, "Unauthorized worker")
    }

    pub fn invalid_share(message: impl Into<String>) -> Self {
        Self::new(StratumErrorCode::UnauthorizedOrInvalidShare, message)
    }
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.error_code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.traceback {
            Some(traceback) => write!(
                f,
                "Stratum error {}: {} (traceback: {})",
                self.error_code,
                self.message,
                serde_json::to_string(traceback).unwrap_or_else(|_| "<invalid traceback>".into())
            ),
            None => write!(f, "Stratum error {}: {}", self.error_code, self.message),
        }
    }
}
