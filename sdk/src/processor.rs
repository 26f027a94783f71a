//! In-memory model of the multisig program's instruction handlers.
//!
//! Used by [`crate::ledger::Ledger`] to stand in for the deployed program.
//! Errors are the same `ProgramError` codes the cluster reports, so they go
//! through the classification the RPC path uses.

use std::collections::BTreeMap;

use solana_program::{
    entrypoint::ProgramResult, instruction::AccountMeta, program_error::ProgramError,
    pubkey::Pubkey,
};
use tracing::debug;

use crate::{
    error::{ErrorCode, ACCOUNT_ALREADY_IN_USE, CONSTRAINT_SEEDS},
    instruction::MultisigInstruction,
    pda,
    state::{AccountState, Multisig, Proposal, TxInstruction},
};

pub type AccountStore = BTreeMap<Pubkey, Vec<u8>>;

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        store: &mut AccountStore,
        accounts: &[AccountMeta],
        input: &[u8],
        now: i64,
    ) -> ProgramResult {
        let ix = MultisigInstruction::unpack(input).ok_or(ProgramError::InvalidInstructionData)?;

        match ix {
            MultisigInstruction::CreateMultisig { key, owners, threshold } => {
                Self::process_create_multisig(program_id, store, accounts, key, owners, threshold)
            }
            MultisigInstruction::CreateTransaction { instructions } => {
                Self::process_create_transaction(program_id, store, accounts, instructions, now)
            }
            MultisigInstruction::Approve => Self::process_approve(store, accounts),
            MultisigInstruction::ExecuteTransaction => Self::process_execute(store, accounts, now),
        }
    }

    fn process_create_multisig(
        program_id: &Pubkey,
        store: &mut AccountStore,
        accounts: &[AccountMeta],
        key: Pubkey,
        owners: Vec<Pubkey>,
        threshold: u8,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let multisig_meta = next_account_meta(acc_iter)?;
        let payer = next_account_meta(acc_iter)?;
        let _system_program = next_account_meta(acc_iter)?;

        if !payer.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        Multisig::validate(&owners, threshold)?;

        let (pda, bump) =
            pda::multisig(&key, program_id).map_err(|_| ProgramError::InvalidSeeds)?;
        if pda != multisig_meta.pubkey {
            return Err(ProgramError::Custom(CONSTRAINT_SEEDS));
        }
        if store.contains_key(&pda) {
            return Err(ProgramError::Custom(ACCOUNT_ALREADY_IN_USE));
        }

        let multisig = Multisig {
            key,
            owners,
            threshold,
            transaction_count: 0,
            owner_set_seqno: 0,
            bump,
        };
        store.insert(pda, multisig.pack()?);
        debug!(multisig = %pda, threshold, "multisig initialized");
        Ok(())
    }

    fn process_create_transaction(
        program_id: &Pubkey,
        store: &mut AccountStore,
        accounts: &[AccountMeta],
        instructions: Vec<TxInstruction>,
        now: i64,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let multisig_meta = next_account_meta(acc_iter)?;
        let transaction_meta = next_account_meta(acc_iter)?;
        let proposer = next_account_meta(acc_iter)?;
        let payer = next_account_meta(acc_iter)?;
        let _system_program = next_account_meta(acc_iter)?;

        if !proposer.is_signer || !payer.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut multisig: Multisig = load(store, &multisig_meta.pubkey)?;
        let owner_index = multisig
            .owner_index(&proposer.pubkey)
            .ok_or(ErrorCode::InvalidOwner)?;

        let (pda, _) =
            pda::transaction(&multisig_meta.pubkey, multisig.transaction_count, program_id)
                .map_err(|_| ProgramError::InvalidSeeds)?;
        if pda != transaction_meta.pubkey {
            return Err(ProgramError::Custom(CONSTRAINT_SEEDS));
        }
        if store.contains_key(&pda) {
            return Err(ProgramError::Custom(ACCOUNT_ALREADY_IN_USE));
        }

        let mut signers = vec![false; multisig.owners.len()];
        signers[owner_index] = true;

        let proposal = Proposal {
            multisig: multisig_meta.pubkey,
            proposer: proposer.pubkey,
            executor: Pubkey::default(),
            instructions,
            signers,
            owner_set_seqno: multisig.owner_set_seqno,
            index: multisig.transaction_count,
            executed_at: None,
            created_at: now,
        };
        multisig.transaction_count = multisig.transaction_count.saturating_add(1);

        let (proposal_data, multisig_data) = (proposal.pack()?, multisig.pack()?);
        store.insert(pda, proposal_data);
        store.insert(multisig_meta.pubkey, multisig_data);
        debug!(transaction = %pda, index = proposal.index, "transaction created");
        Ok(())
    }

    fn process_approve(store: &mut AccountStore, accounts: &[AccountMeta]) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let multisig_meta = next_account_meta(acc_iter)?;
        let transaction_meta = next_account_meta(acc_iter)?;
        let owner = next_account_meta(acc_iter)?;

        if !owner.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let multisig: Multisig = load(store, &multisig_meta.pubkey)?;
        let mut proposal: Proposal = load(store, &transaction_meta.pubkey)?;
        check_membership(&multisig, &multisig_meta.pubkey, &proposal)?;

        if proposal.is_executed() {
            return Err(ErrorCode::AlreadyExecuted.into());
        }
        let owner_index = multisig
            .owner_index(&owner.pubkey)
            .ok_or(ErrorCode::InvalidOwner)?;

        // Approving twice leaves the flag set.
        proposal.signers[owner_index] = true;
        store.insert(transaction_meta.pubkey, proposal.pack()?);
        debug!(
            transaction = %transaction_meta.pubkey,
            "approved: {}/{}",
            proposal.sig_count(),
            multisig.threshold
        );
        Ok(())
    }

    fn process_execute(
        store: &mut AccountStore,
        accounts: &[AccountMeta],
        now: i64,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let multisig_meta = next_account_meta(acc_iter)?;
        let transaction_meta = next_account_meta(acc_iter)?;
        let executor = next_account_meta(acc_iter)?;

        if !executor.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let multisig: Multisig = load(store, &multisig_meta.pubkey)?;
        let mut proposal: Proposal = load(store, &transaction_meta.pubkey)?;
        check_membership(&multisig, &multisig_meta.pubkey, &proposal)?;

        if proposal.is_executed() {
            return Err(ErrorCode::AlreadyExecuted.into());
        }
        if proposal.sig_count() < multisig.threshold as usize {
            return Err(ErrorCode::NotEnoughSigners.into());
        }

        proposal.executor = executor.pubkey;
        proposal.executed_at = Some(now);
        store.insert(transaction_meta.pubkey, proposal.pack()?);
        debug!(
            transaction = %transaction_meta.pubkey,
            instructions = proposal.instructions.len(),
            "transaction executed"
        );
        Ok(())
    }
}

fn next_account_meta<'a, I: Iterator<Item = &'a AccountMeta>>(
    iter: &mut I,
) -> Result<&'a AccountMeta, ProgramError> {
    iter.next().ok_or(ProgramError::NotEnoughAccountKeys)
}

fn load<T: AccountState>(store: &AccountStore, address: &Pubkey) -> Result<T, ProgramError> {
    let data = store.get(address).ok_or(ProgramError::UninitializedAccount)?;
    T::unpack(data).ok_or(ProgramError::InvalidAccountData)
}

/// `has_one = multisig` plus the owner-set sequence check.
fn check_membership(multisig: &Multisig, address: &Pubkey, proposal: &Proposal) -> ProgramResult {
    if proposal.multisig != *address || proposal.owner_set_seqno != multisig.owner_set_seqno {
        return Err(ProgramError::InvalidAccountData);
    }
    Ok(())
}
