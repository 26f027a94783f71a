use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use thiserror::Error;

use crate::instruction::MultisigInstruction;

/// Offset of the multisig program's custom error codes (Anchor convention).
pub const ERROR_CODE_OFFSET: u32 = 6000;

/// Seeds constraint violation raised by the Anchor runtime.
pub const CONSTRAINT_SEEDS: u32 = 2006;

/// `SystemError::AccountAlreadyInUse` raised when an `init` target exists.
pub const ACCOUNT_ALREADY_IN_USE: u32 = 0;

/// Errors raised by the on-chain multisig program.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("The given owner is not part of this multisig")]
    InvalidOwner,

    #[error("Owners length must be non zero")]
    EmptyOwners,

    #[error("Owners must be unique")]
    UniqueOwners,

    #[error("Not enough owners signed this transaction")]
    NotEnoughSigners,

    #[error("The given transaction has already been executed")]
    AlreadyExecuted,

    #[error("Threshold must be less than or equal to the number of owners")]
    InvalidThreshold,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        ERROR_CODE_OFFSET + self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let code = match code.checked_sub(ERROR_CODE_OFFSET)? {
            0 => Self::InvalidOwner,
            1 => Self::EmptyOwners,
            2 => Self::UniqueOwners,
            3 => Self::NotEnoughSigners,
            4 => Self::AlreadyExecuted,
            5 => Self::InvalidThreshold,
            _ => return None,
        };
        Some(code)
    }
}

impl From<ErrorCode> for ProgramError {
    fn from(e: ErrorCode) -> Self {
        ProgramError::Custom(e.code())
    }
}

/// Everything the client can fail with.
///
/// Local preconditions (`UnknownAccount`, `MalformedInstructionsFile`, ...)
/// abort the command that hit them. Rejections by the multisig program and
/// transport failures are recoverable: bulk flows log them and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigClientError {
    #[error("Account {0} not found")]
    UnknownAccount(Pubkey),

    #[error("Unknown program {0}")]
    UnknownProgram(Pubkey),

    #[error("Account {0} does not hold the expected data")]
    InvalidAccountData(Pubkey),

    #[error("Signer is not an owner of this multisig")]
    Unauthorized,

    #[error("Transaction has already been executed")]
    AlreadyExecuted,

    #[error("Not enough owners approved this transaction")]
    ThresholdNotMet,

    #[error("Transaction index is stale")]
    StaleIndex,

    #[error("Invalid multisig: {0}")]
    InvalidMultisig(ErrorCode),

    #[error("Malformed instructions file: {0}")]
    MalformedInstructionsFile(String),

    #[error("No viable bump seed for derived address")]
    AddressDerivation,

    #[error("Rejected by program: {0}")]
    Rejected(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),
}

impl MultisigClientError {
    /// True for outcomes decided remotely or by the network. These never
    /// indicate corrupted local state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::AlreadyExecuted
                | Self::ThresholdNotMet
                | Self::StaleIndex
                | Self::Rejected(_)
                | Self::TransportFailure(_)
        )
    }

    /// Classifies a custom error code raised by the multisig program itself.
    pub fn from_custom_code(code: u32) -> Self {
        match ErrorCode::from_code(code) {
            Some(ErrorCode::InvalidOwner) => Self::Unauthorized,
            Some(ErrorCode::AlreadyExecuted) => Self::AlreadyExecuted,
            Some(ErrorCode::NotEnoughSigners) => Self::ThresholdNotMet,
            Some(other) => Self::InvalidMultisig(other),
            None => Self::Rejected(format!("custom program error: {code:#x}")),
        }
    }

    /// Classifies a custom error code raised while the multisig program
    /// processed the instruction encoded in `data`.
    ///
    /// An occupied or mis-seeded `init` target only means a stale index when
    /// the instruction creates an account; anything else raising those codes
    /// is an inner failure. Data that is not a multisig instruction yields
    /// [`MultisigClientError::Rejected`].
    pub fn from_instruction_code(data: &[u8], code: u32) -> Self {
        match MultisigInstruction::unpack(data) {
            None => Self::Rejected(format!("custom program error: {code:#x}")),
            Some(
                MultisigInstruction::CreateMultisig { .. }
                | MultisigInstruction::CreateTransaction { .. },
            ) if matches!(code, ACCOUNT_ALREADY_IN_USE | CONSTRAINT_SEEDS) => Self::StaleIndex,
            Some(_) => Self::from_custom_code(code),
        }
    }

    /// [`From<ProgramError>`], with custom codes classified against the
    /// instruction encoded in `data`.
    pub fn from_program_error(data: &[u8], e: ProgramError) -> Self {
        match e {
            ProgramError::Custom(code) => Self::from_instruction_code(data, code),
            other => other.into(),
        }
    }
}

impl From<ProgramError> for MultisigClientError {
    fn from(e: ProgramError) -> Self {
        match e {
            ProgramError::Custom(code) => Self::from_custom_code(code),
            ProgramError::MissingRequiredSignature => Self::Unauthorized,
            other => Self::Rejected(other.to_string()),
        }
    }
}
