use borsh::BorshDeserialize;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::state::{discriminator, TxInstruction, DISCRIMINATOR_LEN};

/// Instructions understood by the multisig program. On the wire each one is
/// `sha256("global:<name>")[..8]` followed by its Borsh-encoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultisigInstruction {
    /// Create a multisig account.
    /// Accounts:
    /// 0. [writable] multisig (PDA of `["multisig", key]`)
    /// 1. [writable, signer] payer
    /// 2. [] system_program
    CreateMultisig {
        /// Seed the multisig address is derived from.
        key: Pubkey,
        owners: Vec<Pubkey>,
        /// Approvals required to execute.
        threshold: u8,
    },

    /// Create a transaction under a multisig. The proposer's approval is
    /// recorded on creation.
    /// Accounts:
    /// 0. [writable] multisig
    /// 1. [writable] transaction (PDA of `[multisig, transaction_count]`)
    /// 2. [signer] proposer
    /// 3. [writable, signer] payer
    /// 4. [] system_program
    CreateTransaction { instructions: Vec<TxInstruction> },

    /// Approve an existing transaction.
    /// Accounts:
    /// 0. [] multisig
    /// 1. [writable] transaction
    /// 2. [signer] owner
    Approve,

    /// Execute a transaction once enough owners approved it.
    /// Accounts:
    /// 0. [] multisig
    /// 1. [writable] transaction
    /// 2. [signer] executor
    /// 3.. every account and program the stored instructions reference
    ExecuteTransaction,
}

impl MultisigInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMultisig { .. } => "create_multisig",
            Self::CreateTransaction { .. } => "create_transaction",
            Self::Approve => "approve",
            Self::ExecuteTransaction => "execute_transaction",
        }
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let args = match self {
            Self::CreateMultisig { key, owners, threshold } => {
                borsh::to_vec(&(key, owners, threshold))
            }
            Self::CreateTransaction { instructions } => borsh::to_vec(instructions),
            Self::Approve | Self::ExecuteTransaction => Ok(Vec::new()),
        }
        .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;

        let mut data = discriminator("global", self.name()).to_vec();
        data.extend(args);
        Ok(data)
    }

    pub fn unpack(input: &[u8]) -> Option<Self> {
        if input.len() < DISCRIMINATOR_LEN {
            return None;
        }
        let (tag, args) = input.split_at(DISCRIMINATOR_LEN);
        let is = |name: &str| tag == discriminator("global", name);

        if is("create_multisig") {
            let (key, owners, threshold) =
                <(Pubkey, Vec<Pubkey>, u8)>::try_from_slice(args).ok()?;
            Some(Self::CreateMultisig { key, owners, threshold })
        } else if is("create_transaction") {
            let instructions = Vec::<TxInstruction>::try_from_slice(args).ok()?;
            Some(Self::CreateTransaction { instructions })
        } else if is("approve") && args.is_empty() {
            Some(Self::Approve)
        } else if is("execute_transaction") && args.is_empty() {
            Some(Self::ExecuteTransaction)
        } else {
            None
        }
    }
}

pub fn create_multisig(
    program_id: &Pubkey,
    multisig: &Pubkey,
    payer: &Pubkey,
    key: Pubkey,
    owners: Vec<Pubkey>,
    threshold: u8,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*multisig, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: MultisigInstruction::CreateMultisig { key, owners, threshold }.pack()?,
    })
}

pub fn create_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    proposer: &Pubkey,
    payer: &Pubkey,
    instructions: Vec<TxInstruction>,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*multisig, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new_readonly(*proposer, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: MultisigInstruction::CreateTransaction { instructions }.pack()?,
    })
}

pub fn approve(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    owner: &Pubkey,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*multisig, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new_readonly(*owner, true),
        ],
        data: MultisigInstruction::Approve.pack()?,
    })
}

/// `remaining` is appended after the fixed accounts; see
/// [`crate::execution::remaining_accounts`].
pub fn execute_transaction(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    executor: &Pubkey,
    remaining: Vec<AccountMeta>,
) -> Result<Instruction, ProgramError> {
    let mut accounts = vec![
        AccountMeta::new_readonly(*multisig, false),
        AccountMeta::new(*transaction, false),
        AccountMeta::new_readonly(*executor, true),
    ];
    accounts.extend(remaining);
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: MultisigInstruction::ExecuteTransaction.pack()?,
    })
}
