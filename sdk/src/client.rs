use solana_program::pubkey::Pubkey;
use tracing::info;

use crate::{
    approval::{Approval, ApprovalTracker, BulkApproval, BulkProgress},
    error::MultisigClientError,
    execution::ExecutionDispatcher,
    instruction, pda,
    proposal::{ProposalBuilder, ProposalDraft},
    reader::AccountReader,
    state::{Multisig, Proposal, TxInstruction},
    submitter::{Confirmation, Submitter},
    upgrade::UpgradeInstructionBuilder,
};

/// Command-level operations over a reader and a submitter.
///
/// Holds no state of its own: every call reads what it needs right before
/// building, and the program decides whether a submission is accepted.
pub struct MultisigClient<'a, R: ?Sized, S: ?Sized> {
    reader: &'a R,
    submitter: &'a S,
    program_id: Pubkey,
}

impl<'a, R, S> MultisigClient<'a, R, S>
where
    R: AccountReader + ?Sized,
    S: Submitter + ?Sized,
{
    pub fn new(reader: &'a R, submitter: &'a S, program_id: Pubkey) -> Self {
        Self { reader, submitter, program_id }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn wallet(&self) -> Pubkey {
        self.submitter.payer()
    }

    /// Address of the multisig seeded by `key`.
    pub fn multisig_address(&self, key: &Pubkey) -> Result<Pubkey, MultisigClientError> {
        Ok(pda::multisig(key, &self.program_id)?.0)
    }

    pub fn proposal_address(
        &self,
        multisig: &Pubkey,
        index: u64,
    ) -> Result<Pubkey, MultisigClientError> {
        Ok(pda::transaction(multisig, index, &self.program_id)?.0)
    }

    pub fn get_multisig(&self, multisig: &Pubkey) -> Result<Multisig, MultisigClientError> {
        self.reader.get_multisig(multisig)
    }

    pub fn get_proposal(&self, proposal: &Pubkey) -> Result<Proposal, MultisigClientError> {
        self.reader.get_proposal(proposal)
    }

    pub fn find_owned_multisigs(&self) -> Result<Vec<(Pubkey, Multisig)>, MultisigClientError> {
        self.reader.find_multisigs_by_owner(&self.wallet())
    }

    /// Creates the multisig seeded by `key`. Returns its address.
    pub fn create_multisig(
        &self,
        key: Pubkey,
        owners: Vec<Pubkey>,
        threshold: u8,
    ) -> Result<(Pubkey, Confirmation), MultisigClientError> {
        Multisig::validate(&owners, threshold).map_err(MultisigClientError::InvalidMultisig)?;
        let address = self.multisig_address(&key)?;
        let ix = instruction::create_multisig(
            &self.program_id,
            &address,
            &self.wallet(),
            key,
            owners,
            threshold,
        )?;
        let confirmation = self.submitter.submit(&[ix])?;
        info!(multisig = %address, %key, "multisig created");
        Ok((address, confirmation))
    }

    pub fn create_proposal(
        &self,
        multisig: &Pubkey,
        instructions: Vec<TxInstruction>,
        index: Option<u64>,
    ) -> Result<(ProposalDraft, Confirmation), MultisigClientError> {
        let wallet = self.wallet();
        let draft = ProposalBuilder::new(self.reader, self.program_id)
            .build(multisig, instructions, index, &wallet, &wallet)?;
        let confirmation = self.submitter.submit(&[draft.instruction.clone()])?;
        info!(transaction = %draft.address, index = draft.index, "transaction created");
        Ok((draft, confirmation))
    }

    pub fn approve(&self, multisig: &Pubkey, index: u64) -> Result<Approval, MultisigClientError> {
        let proposal = self.proposal_address(multisig, index)?;
        self.approval_tracker().approve(&proposal)
    }

    pub fn approve_all(&self, multisig: &Pubkey) -> Result<BulkApproval, MultisigClientError> {
        self.approval_tracker().approve_all(multisig)
    }

    pub fn approve_all_with<F>(
        &self,
        multisig: &Pubkey,
        progress: F,
    ) -> Result<BulkApproval, MultisigClientError>
    where
        F: FnMut(BulkProgress<'_>),
    {
        self.approval_tracker().approve_all_with(multisig, progress)
    }

    pub fn execute(
        &self,
        multisig: &Pubkey,
        index: u64,
    ) -> Result<Confirmation, MultisigClientError> {
        let proposal = self.proposal_address(multisig, index)?;
        ExecutionDispatcher::new(self.reader, self.submitter, self.program_id).execute(&proposal)
    }

    /// Proposes upgrading `program` from `buffer` under the multisig's
    /// authority. The buffer's lamports go back to the wallet.
    pub fn propose_upgrade(
        &self,
        multisig: &Pubkey,
        index: Option<u64>,
        program: &Pubkey,
        buffer: &Pubkey,
    ) -> Result<(ProposalDraft, Confirmation), MultisigClientError> {
        let bundle = UpgradeInstructionBuilder::new(self.reader, self.program_id).build_upgrade(
            program,
            buffer,
            multisig,
            &self.wallet(),
        )?;
        self.create_proposal(multisig, bundle, index)
    }

    fn approval_tracker(&self) -> ApprovalTracker<'a, R, S> {
        ApprovalTracker::new(self.reader, self.submitter, self.program_id)
    }
}
