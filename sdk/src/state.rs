use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::ErrorCode;

/// Size of the type tag that prefixes every Anchor account and instruction.
pub const DISCRIMINATOR_LEN: usize = 8;

/// First eight bytes of `sha256("<namespace>:<name>")`.
pub fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

/// Account types owned by the multisig program: a discriminator followed by
/// the Borsh-encoded fields. Accounts may be allocated larger than the
/// encoded value, so trailing bytes are ignored.
pub trait AccountState: BorshSerialize + BorshDeserialize {
    const TYPE_NAME: &'static str;

    fn account_discriminator() -> [u8; DISCRIMINATOR_LEN] {
        discriminator("account", Self::TYPE_NAME)
    }

    fn unpack(data: &[u8]) -> Option<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return None;
        }
        let (tag, mut body) = data.split_at(DISCRIMINATOR_LEN);
        if tag != Self::account_discriminator() {
            return None;
        }
        Self::deserialize(&mut body).ok()
    }

    fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let body = borsh::to_vec(self).map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        let mut data = Self::account_discriminator().to_vec();
        data.extend(body);
        Ok(data)
    }
}

/// A governing account: the owner set and approval threshold.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Multisig {
    pub key: Pubkey,
    pub owners: Vec<Pubkey>,
    pub threshold: u8,
    pub transaction_count: u64,
    pub owner_set_seqno: u32,
    pub bump: u8,
}

impl Multisig {
    pub const SEED_PREFIX: &'static [u8] = b"multisig";

    /// The rules the program enforces on a new owner set.
    pub fn validate(owners: &[Pubkey], threshold: u8) -> Result<(), ErrorCode> {
        if owners.is_empty() {
            return Err(ErrorCode::EmptyOwners);
        }
        if threshold == 0 || threshold as usize > owners.len() {
            return Err(ErrorCode::InvalidThreshold);
        }
        if (1..owners.len()).any(|i| owners[i..].contains(&owners[i - 1])) {
            return Err(ErrorCode::UniqueOwners);
        }
        Ok(())
    }

    pub fn owner_index(&self, owner: &Pubkey) -> Option<usize> {
        self.owners.iter().position(|k| k == owner)
    }

    pub fn is_owner(&self, owner: &Pubkey) -> bool {
        self.owner_index(owner).is_some()
    }
}

impl AccountState for Multisig {
    const TYPE_NAME: &'static str = "Multisig";
}

/// A proposal: an indexed instruction bundle awaiting owner approvals.
/// Stored on chain under the `Transaction` account type.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub multisig: Pubkey,
    pub proposer: Pubkey,
    pub executor: Pubkey,
    pub instructions: Vec<TxInstruction>,
    /// One flag per multisig owner, in owner order.
    pub signers: Vec<bool>,
    pub owner_set_seqno: u32,
    pub index: u64,
    pub executed_at: Option<i64>,
    pub created_at: i64,
}

impl Proposal {
    pub fn sig_count(&self) -> usize {
        self.signers.iter().filter(|s| **s).count()
    }

    pub fn is_executed(&self) -> bool {
        self.executed_at.is_some()
    }

    /// Owners whose approval flag is set.
    pub fn approvals(&self, multisig: &Multisig) -> Vec<Pubkey> {
        multisig
            .owners
            .iter()
            .zip(&self.signers)
            .filter(|(_, signed)| **signed)
            .map(|(owner, _)| *owner)
            .collect()
    }

    pub fn has_approved(&self, multisig: &Multisig, owner: &Pubkey) -> bool {
        multisig
            .owner_index(owner)
            .and_then(|i| self.signers.get(i).copied())
            .unwrap_or(false)
    }

    /// Whether the multisig program would accept an execute attempt,
    /// as far as this snapshot knows.
    pub fn is_eligible(&self, multisig: &Multisig) -> bool {
        !self.is_executed() && self.sig_count() >= multisig.threshold as usize
    }

    pub fn status(&self) -> ProposalStatus {
        if self.is_executed() {
            ProposalStatus::Executed
        } else if self.sig_count() == 0 {
            ProposalStatus::Created
        } else {
            ProposalStatus::Approving
        }
    }
}

impl AccountState for Proposal {
    const TYPE_NAME: &'static str = "Transaction";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Created,
    Approving,
    Executed,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalStatus::Created => write!(f, "created"),
            ProposalStatus::Approving => write!(f, "approving"),
            ProposalStatus::Executed => write!(f, "executed"),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct TxInstruction {
    pub program_id: Pubkey,
    pub keys: Vec<TxAccountMeta>,
    pub data: Vec<u8>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl From<&TxInstruction> for Instruction {
    fn from(ix: &TxInstruction) -> Instruction {
        Instruction {
            program_id: ix.program_id,
            accounts: ix.keys.iter().map(|k| AccountMeta::from(*k)).collect(),
            data: ix.data.clone(),
        }
    }
}

impl From<Instruction> for TxInstruction {
    fn from(ix: Instruction) -> TxInstruction {
        TxInstruction {
            program_id: ix.program_id,
            keys: ix.accounts.into_iter().map(TxAccountMeta::from).collect(),
            data: ix.data,
        }
    }
}

impl From<TxAccountMeta> for AccountMeta {
    fn from(meta: TxAccountMeta) -> AccountMeta {
        AccountMeta {
            pubkey: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

impl From<AccountMeta> for TxAccountMeta {
    fn from(meta: AccountMeta) -> TxAccountMeta {
        TxAccountMeta {
            pubkey: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}
