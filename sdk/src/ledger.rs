//! A single-process stand-in for a cluster running the multisig program.
//!
//! [`Ledger`] is an [`AccountReader`]; [`Ledger::session`] hands out a
//! [`Submitter`] that signs as one identity. Transactions apply atomically:
//! a failing instruction leaves every account untouched.

use std::{cell::RefCell, collections::BTreeSet};

use solana_program::{instruction::Instruction, program_error::ProgramError, pubkey::Pubkey};
use tracing::{debug, info};

use crate::{
    error::MultisigClientError,
    instruction::MultisigInstruction,
    processor::{AccountStore, Processor},
    reader::AccountReader,
    state::{AccountState, Multisig, Proposal, TxInstruction},
    submitter::{Confirmation, Submitter},
};

const GENESIS_TIMESTAMP: i64 = 1_700_000_000;

pub struct Ledger {
    program_id: Pubkey,
    state: RefCell<LedgerState>,
}

struct LedgerState {
    accounts: AccountStore,
    clock: i64,
    transaction_count: u64,
    unreachable: BTreeSet<Pubkey>,
    executed: Vec<TxInstruction>,
}

impl Ledger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: RefCell::new(LedgerState {
                accounts: AccountStore::new(),
                clock: GENESIS_TIMESTAMP,
                transaction_count: 0,
                unreachable: BTreeSet::new(),
                executed: Vec::new(),
            }),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Stores raw bytes at `address`, e.g. a program account owned by
    /// another loader.
    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.state.borrow_mut().accounts.insert(address, data);
    }

    pub fn set_clock(&self, unix_timestamp: i64) {
        self.state.borrow_mut().clock = unix_timestamp;
    }

    /// Every later submission that references `address` fails with
    /// [`MultisigClientError::TransportFailure`] before reaching the program.
    pub fn drop_submissions_touching(&self, address: Pubkey) {
        self.state.borrow_mut().unreachable.insert(address);
    }

    /// Instructions released by executed proposals, in execution order.
    pub fn executed_instructions(&self) -> Vec<TxInstruction> {
        self.state.borrow().executed.clone()
    }

    pub fn session(&self, signer: Pubkey) -> LedgerSession<'_> {
        LedgerSession { ledger: self, signer }
    }

    fn process_transaction(
        &self,
        signer: &Pubkey,
        instructions: &[Instruction],
    ) -> Result<Confirmation, MultisigClientError> {
        let mut state = self.state.borrow_mut();

        let touches_unreachable = instructions
            .iter()
            .flat_map(|ix| ix.accounts.iter())
            .any(|meta| state.unreachable.contains(&meta.pubkey));
        if touches_unreachable {
            return Err(MultisigClientError::TransportFailure("connection reset".to_string()));
        }

        let mut accounts = state.accounts.clone();
        let now = state.clock;
        let mut released = Vec::new();

        for ix in instructions {
            if ix.accounts.iter().any(|meta| meta.is_signer && meta.pubkey != *signer) {
                return Err(ProgramError::MissingRequiredSignature.into());
            }
            if ix.program_id != self.program_id {
                return Err(MultisigClientError::Rejected(format!(
                    "program {} is not deployed",
                    ix.program_id
                )));
            }
            Processor::process(&self.program_id, &mut accounts, &ix.accounts, &ix.data, now)
                .map_err(|e| MultisigClientError::from_program_error(&ix.data, e))?;

            if let Some(proposal) = ix
                .accounts
                .get(1)
                .filter(|_| {
                    MultisigInstruction::unpack(&ix.data)
                        == Some(MultisigInstruction::ExecuteTransaction)
                })
                .and_then(|meta| accounts.get(&meta.pubkey))
                .and_then(|data| Proposal::unpack(data))
            {
                released.extend(proposal.instructions);
            }
        }

        state.accounts = accounts;
        state.executed.extend(released);
        state.clock += 1;
        state.transaction_count += 1;
        let signature = format!("local-{}", state.transaction_count);
        debug!(%signer, %signature, "transaction committed");
        Ok(Confirmation { signature })
    }
}

impl AccountReader for Ledger {
    fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, MultisigClientError> {
        Ok(self.state.borrow().accounts.get(address).cloned())
    }

    fn get_proposals_for(
        &self,
        multisig: &Pubkey,
    ) -> Result<Vec<(Pubkey, Proposal)>, MultisigClientError> {
        let state = self.state.borrow();
        Ok(state
            .accounts
            .iter()
            .filter_map(|(address, data)| Some((*address, Proposal::unpack(data)?)))
            .filter(|(_, proposal)| proposal.multisig == *multisig)
            .collect())
    }

    fn find_multisigs_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<(Pubkey, Multisig)>, MultisigClientError> {
        let state = self.state.borrow();
        Ok(state
            .accounts
            .iter()
            .filter_map(|(address, data)| Some((*address, Multisig::unpack(data)?)))
            .filter(|(_, multisig)| multisig.is_owner(owner))
            .collect())
    }
}

/// Submits to a [`Ledger`] as `signer`, who also pays.
pub struct LedgerSession<'a> {
    ledger: &'a Ledger,
    signer: Pubkey,
}

impl Submitter for LedgerSession<'_> {
    fn payer(&self) -> Pubkey {
        self.signer
    }

    fn submit(&self, instructions: &[Instruction]) -> Result<Confirmation, MultisigClientError> {
        let result = self.ledger.process_transaction(&self.signer, instructions);
        if let Err(ref e) = result {
            info!(signer = %self.signer, "transaction failed: {e}");
        }
        result
    }
}
