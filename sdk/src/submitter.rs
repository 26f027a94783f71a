use std::fmt;

use solana_program::{instruction::Instruction, pubkey::Pubkey};

use crate::error::MultisigClientError;

/// Signs and broadcasts instructions as one transaction.
///
/// Rejections by the multisig program come back classified (see
/// [`MultisigClientError::from_custom_code`]); network errors come back as
/// [`MultisigClientError::TransportFailure`]. Implementations never retry.
pub trait Submitter {
    /// The identity that signs, pays, proposes, approves and executes.
    fn payer(&self) -> Pubkey;

    fn submit(&self, instructions: &[Instruction]) -> Result<Confirmation, MultisigClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub signature: String,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature)
    }
}
