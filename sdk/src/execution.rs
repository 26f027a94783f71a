use solana_program::{instruction::AccountMeta, pubkey::Pubkey};
use tracing::info;

use crate::{
    error::MultisigClientError,
    instruction, pda,
    reader::AccountReader,
    state::Proposal,
    submitter::{Confirmation, Submitter},
};

/// Accounts the program needs to invoke the proposal's instructions: each
/// instruction's accounts in order, then its target program. The authority
/// signs through the program, never as a transaction signer.
pub fn remaining_accounts(proposal: &Proposal, authority: &Pubkey) -> Vec<AccountMeta> {
    proposal
        .instructions
        .iter()
        .flat_map(|ix| {
            ix.keys
                .iter()
                .map(|k| AccountMeta {
                    pubkey: k.pubkey,
                    is_signer: k.is_signer && k.pubkey != *authority,
                    is_writable: k.is_writable,
                })
                .chain(std::iter::once(AccountMeta::new_readonly(ix.program_id, false)))
        })
        .collect()
}

pub struct ExecutionDispatcher<'a, R: ?Sized, S: ?Sized> {
    reader: &'a R,
    submitter: &'a S,
    program_id: Pubkey,
}

impl<'a, R, S> ExecutionDispatcher<'a, R, S>
where
    R: AccountReader + ?Sized,
    S: Submitter + ?Sized,
{
    pub fn new(reader: &'a R, submitter: &'a S, program_id: Pubkey) -> Self {
        Self { reader, submitter, program_id }
    }

    /// Submits `execute_transaction` for `proposal`.
    ///
    /// The threshold and executed flag are left to the program: a repeated
    /// call comes back as [`MultisigClientError::AlreadyExecuted`] and an
    /// under-approved one as [`MultisigClientError::ThresholdNotMet`].
    pub fn execute(&self, proposal: &Pubkey) -> Result<Confirmation, MultisigClientError> {
        let current = self.reader.get_proposal(proposal)?;
        let (authority, _) = pda::signer(&current.multisig, &self.program_id)?;

        let ix = instruction::execute_transaction(
            &self.program_id,
            &current.multisig,
            proposal,
            &self.submitter.payer(),
            remaining_accounts(&current, &authority),
        )?;
        let confirmation = self.submitter.submit(&[ix])?;
        info!(%proposal, index = current.index, %confirmation, "executed");
        Ok(confirmation)
    }
}
