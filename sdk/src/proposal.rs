use solana_program::{instruction::Instruction, pubkey::Pubkey};
use tracing::debug;

use crate::{
    error::MultisigClientError, instruction, pda, reader::AccountReader, state::TxInstruction,
};

/// A proposal ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub index: u64,
    pub address: Pubkey,
    pub instruction: Instruction,
}

pub struct ProposalBuilder<'a, R: ?Sized> {
    reader: &'a R,
    program_id: Pubkey,
}

impl<'a, R: AccountReader + ?Sized> ProposalBuilder<'a, R> {
    pub fn new(reader: &'a R, program_id: Pubkey) -> Self {
        Self { reader, program_id }
    }

    /// Assembles the `create_transaction` instruction for `multisig`.
    ///
    /// Without `explicit_index` the multisig is read right here and its
    /// `transaction_count` used. Another proposer can still take that index
    /// before submission; the program then rejects ours with
    /// [`MultisigClientError::StaleIndex`].
    pub fn build(
        &self,
        multisig: &Pubkey,
        instructions: Vec<TxInstruction>,
        explicit_index: Option<u64>,
        proposer: &Pubkey,
        payer: &Pubkey,
    ) -> Result<ProposalDraft, MultisigClientError> {
        let index = match explicit_index {
            Some(index) => index,
            None => self.reader.get_multisig(multisig)?.transaction_count,
        };
        let (address, _) = pda::transaction(multisig, index, &self.program_id)?;
        debug!(%multisig, index, %address, instructions = instructions.len(), "built proposal");

        Ok(ProposalDraft {
            index,
            address,
            instruction: instruction::create_transaction(
                &self.program_id,
                multisig,
                &address,
                proposer,
                payer,
                instructions,
            )?,
        })
    }
}
