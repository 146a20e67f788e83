use std::fmt;
use mongodb::bson;
use derive_more::Display;
use tokio::task::JoinError;
use tonic::{Code, Status};
use std::net::AddrParseError;

#[cfg(feature = "kafka")]
use rdkafka::{error::KafkaError, message::OwnedMessage};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorCode {
    TonicStartError         = 400,
    HashThreadingIssue      = 401,
    IOError                 = 402,
    InvalidConfig           = 403,
    StoreError              = 500,
    StoreTimeout            = 501,
    UnableToReadCredentials = 502,
    InvalidBSON             = 503,
    InvalidJSON             = 504,
    HashingError            = 505,
    InvalidPHCFormat        = 506,
    KafkaSendError          = 507,
    InvalidName             = 1000,
    InvalidPhone            = 1001,
    InvalidEmail            = 1002,
    PasswordTooShort        = 1003,
    PasswordTooLong         = 1004,
    InvalidRole             = 1005,
    InvalidBalance          = 1006,
    InvalidAmountFormat     = 1007,
    InvalidTime             = 1008,
    NegativeAmount          = 1100,
    InsufficientFunds       = 1101,
    AccountNotMatched       = 2000,
    AccountNotFound         = 2001,
    DuplicateAccount        = 2002,
    CredentialsNotMatched   = 2003,
    InvalidToken            = 2100,
    DeliveryFailed          = 2200,
}

///
/// The broad family an error code belongs to. Presentation layers map these to user-facing messages.
///
#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub enum ErrorKind {
    Validation,
    InvalidAmount,
    InsufficientFunds,
    Lookup,
    NotFound,
    Duplicate,
    InvalidToken,
    Unauthenticated,
    Delivery,
    Store,
    Internal,
}

impl ErrorCode {
    pub fn with_msg(&self, message: &str) -> TurnstileError {
        TurnstileError::new(*self, message)
    }

    pub fn kind(&self) -> ErrorKind {
        use ErrorCode::*;

        match self {
            InvalidName         |
            InvalidPhone        |
            InvalidEmail        |
            PasswordTooShort    |
            PasswordTooLong     |
            InvalidRole         |
            InvalidBalance      |
            InvalidAmountFormat |
            InvalidTime         => ErrorKind::Validation,

            NegativeAmount        => ErrorKind::InvalidAmount,
            InsufficientFunds     => ErrorKind::InsufficientFunds,
            AccountNotMatched     => ErrorKind::Lookup,
            AccountNotFound       => ErrorKind::NotFound,
            DuplicateAccount      => ErrorKind::Duplicate,
            InvalidToken          => ErrorKind::InvalidToken,
            CredentialsNotMatched => ErrorKind::Unauthenticated,
            DeliveryFailed        => ErrorKind::Delivery,

            StoreError   |
            StoreTimeout => ErrorKind::Store,

            TonicStartError         |
            HashThreadingIssue      |
            IOError                 |
            InvalidConfig           |
            UnableToReadCredentials |
            InvalidBSON             |
            InvalidJSON             |
            HashingError            |
            InvalidPHCFormat        |
            KafkaSendError          => ErrorKind::Internal,
        }
    }

    ///
    /// The input field an error relates to. Only field-level validation failures identify one,
    /// a failed account lookup never does.
    ///
    pub fn field(&self) -> Option<&'static str> {
        use ErrorCode::*;

        match self {
            InvalidName          => Some("name"),
            InvalidPhone         => Some("phone"),
            InvalidEmail         => Some("email"),
            PasswordTooShort     |
            PasswordTooLong      => Some("password"),
            InvalidRole          => Some("role"),
            InvalidBalance       => Some("balance"),
            InvalidAmountFormat  |
            NegativeAmount       => Some("amount"),
            InvalidTime          => Some("new_time"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnstileError {
    error_code: ErrorCode,
    message: String,
}

impl TurnstileError {
    pub fn new(error_code: ErrorCode, message: &str) -> Self {
        TurnstileError { error_code, message: message.to_string() }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn kind(&self) -> ErrorKind {
        self.error_code.kind()
    }

    pub fn field(&self) -> Option<&'static str> {
        self.error_code.field()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    ///
    /// Negative amounts are a specialised validation failure.
    ///
    pub fn is_validation(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::InvalidAmount)
    }
}

impl fmt::Display for TurnstileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}): {}", self.error_code as u32, self.error_code, self.message)
    }
}

impl std::error::Error for TurnstileError {}

impl From<tonic::transport::Error> for TurnstileError {
    fn from(error: tonic::transport::Error) -> Self {
        ErrorCode::TonicStartError.with_msg(&format!("Failed to start gRPC server: {}", error))
    }
}

impl From<AddrParseError> for TurnstileError {
    fn from(error: AddrParseError) -> Self {
        ErrorCode::InvalidConfig.with_msg(&format!("The server address is not valid: {}", error))
    }
}

impl From<argon2::Error> for TurnstileError {
    fn from(error: argon2::Error) -> Self {
        ErrorCode::HashingError.with_msg(&format!("Invalid configuration for argon2: {}", error))
    }
}

impl From<argon2::password_hash::Error> for TurnstileError {
    fn from(error: argon2::password_hash::Error) -> Self {
        ErrorCode::HashingError.with_msg(&format!("Unable to hash password: {}", error))
    }
}

impl From<serde_json::Error> for TurnstileError {
    fn from(error: serde_json::Error) -> Self {
        ErrorCode::InvalidJSON.with_msg(&format!("Unable to convert to json: {}", error))
    }
}

impl From<mongodb::error::Error> for TurnstileError {
    fn from(error: mongodb::error::Error) -> Self {
        ErrorCode::StoreError.with_msg(&format!("MongoDB error: {}", error))
    }
}

impl From<bson::ser::Error> for TurnstileError {
    fn from(error: bson::ser::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to serialise BSON: {}", error))
    }
}

impl From<bson::de::Error> for TurnstileError {
    fn from(error: bson::de::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to deserialise BSON: {}", error))
    }
}

impl From<JoinError> for TurnstileError {
    fn from(error: JoinError) -> Self {
        ErrorCode::HashThreadingIssue.with_msg(&format!("Unable to hash: {}", error))
    }
}

impl From<std::io::Error> for TurnstileError {
    fn from(error: std::io::Error) -> Self {
        ErrorCode::IOError.with_msg(&format!("IO error: {}", error))
    }
}

#[cfg(feature = "kafka")]
impl From<KafkaError> for TurnstileError {
    fn from(error: KafkaError) -> Self {
        ErrorCode::KafkaSendError.with_msg(&format!("Kafka error: {}", error))
    }
}

#[cfg(feature = "kafka")]
impl From<(KafkaError, OwnedMessage)> for TurnstileError {
    fn from((error, message): (KafkaError, OwnedMessage)) -> Self {
        ErrorCode::KafkaSendError.with_msg(&format!("Kafka error: {}, message: {:?}", error, message))
    }
}

///
/// Convert our internal error into a gRPC status response.
///
impl From<TurnstileError> for Status {
    fn from(error: TurnstileError) -> Self {
        let code = match error.kind() {
            ErrorKind::Validation        |
            ErrorKind::InvalidAmount     => Code::InvalidArgument,
            ErrorKind::InsufficientFunds => Code::FailedPrecondition,
            ErrorKind::Lookup            |
            ErrorKind::NotFound          => Code::NotFound,
            ErrorKind::Duplicate         => Code::AlreadyExists,
            ErrorKind::InvalidToken      => Code::PermissionDenied,
            ErrorKind::Unauthenticated   => Code::Unauthenticated,
            ErrorKind::Delivery          |
            ErrorKind::Store             => Code::Unavailable,
            ErrorKind::Internal          => Code::Internal,
        };

        Status::with_details(code, error.message, format!("{}", error.error_code as u32).into())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_identify_their_field() {
        let err = ErrorCode::InvalidPhone.with_msg("bad phone");
        assert!(err.is_validation());
        assert_eq!(err.field(), Some("phone"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_lookup_errors_never_identify_a_field() {
        let err = ErrorCode::AccountNotMatched.with_msg("no match");
        assert!(!err.is_validation());
        assert_eq!(err.field(), None);
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_negative_amount_is_a_validation_failure() {
        let err = ErrorCode::NegativeAmount.with_msg("negative");
        assert!(err.is_validation());
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert_eq!(err.field(), Some("amount"));
    }

    #[test]
    fn test_status_carries_numeric_code_in_details() {
        let status = Status::from(ErrorCode::InvalidToken.with_msg("used"));
        assert_eq!(status.code(), Code::PermissionDenied);
        assert_eq!(status.details(), "2100".as_bytes());

        let status = Status::from(ErrorCode::InsufficientFunds.with_msg("poor"));
        assert_eq!(status.code(), Code::FailedPrecondition);
        assert_eq!(status.details(), "1101".as_bytes());
    }
}
