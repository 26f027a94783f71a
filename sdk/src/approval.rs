use std::fmt;

use solana_program::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::{
    error::MultisigClientError,
    instruction,
    reader::AccountReader,
    submitter::{Confirmation, Submitter},
};

/// Result of one approval submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub confirmation: Confirmation,
    /// Owners that had approved when the proposal was read back, or `None`
    /// when the read-back failed after the approval landed.
    pub approvals: Option<Vec<Pubkey>>,
}

/// Steps of an approve-all run, in the order they happen.
#[derive(Debug)]
pub enum BulkProgress<'r> {
    Found(usize),
    Attempting(u64),
    Outcome(u64, &'r Result<Approval, MultisigClientError>),
}

/// Tally of an approve-all run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkApproval {
    /// Proposals found for the multisig, executed ones included.
    pub found: usize,
    pub attempted: usize,
    pub approved: usize,
    pub failures: Vec<(u64, MultisigClientError)>,
}

impl fmt::Display for BulkApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "approved {} of {} attempted", self.approved, self.attempted)
    }
}

pub struct ApprovalTracker<'a, R: ?Sized, S: ?Sized> {
    reader: &'a R,
    submitter: &'a S,
    program_id: Pubkey,
}

impl<'a, R, S> ApprovalTracker<'a, R, S>
where
    R: AccountReader + ?Sized,
    S: Submitter + ?Sized,
{
    pub fn new(reader: &'a R, submitter: &'a S, program_id: Pubkey) -> Self {
        Self { reader, submitter, program_id }
    }

    /// Approves `proposal` as the submitter's payer.
    ///
    /// Membership and the executed flag are checked against a fresh read;
    /// the program has the final word either way. Approving a proposal the
    /// caller already approved is submitted like any other approval.
    pub fn approve(&self, proposal: &Pubkey) -> Result<Approval, MultisigClientError> {
        let caller = self.submitter.payer();
        let current = self.reader.get_proposal(proposal)?;
        let multisig = self.reader.get_multisig(&current.multisig)?;

        if !multisig.is_owner(&caller) {
            return Err(MultisigClientError::Unauthorized);
        }
        if current.is_executed() {
            return Err(MultisigClientError::AlreadyExecuted);
        }

        let ix = instruction::approve(&self.program_id, &current.multisig, proposal, &caller)?;
        let confirmation = self.submitter.submit(&[ix])?;

        let approvals = match self.reader.get_proposal(proposal) {
            Ok(updated) => Some(updated.approvals(&multisig)),
            Err(e) => {
                warn!(%proposal, %confirmation, "approval landed but read-back failed: {e}");
                None
            }
        };
        Ok(Approval { confirmation, approvals })
    }

    /// Approves every pending proposal of `multisig`, lowest index first.
    ///
    /// A failed approval is logged and the loop moves on.
    pub fn approve_all(&self, multisig: &Pubkey) -> Result<BulkApproval, MultisigClientError> {
        self.approve_all_with(multisig, |_| {})
    }

    /// [`Self::approve_all`], reporting each step to `progress`.
    pub fn approve_all_with<F>(
        &self,
        multisig: &Pubkey,
        mut progress: F,
    ) -> Result<BulkApproval, MultisigClientError>
    where
        F: FnMut(BulkProgress<'_>),
    {
        let mut proposals = self.reader.get_proposals_for(multisig)?;
        proposals.sort_by_key(|(_, p)| p.index);
        debug!(%multisig, found = proposals.len(), "approving pending transactions");
        progress(BulkProgress::Found(proposals.len()));

        let mut tally = BulkApproval { found: proposals.len(), ..Default::default() };
        for (address, proposal) in proposals.iter().filter(|(_, p)| !p.is_executed()) {
            progress(BulkProgress::Attempting(proposal.index));
            tally.attempted += 1;
            let result = self.approve(address);
            progress(BulkProgress::Outcome(proposal.index, &result));
            match result {
                Ok(approval) => {
                    info!(index = proposal.index, signature = %approval.confirmation, "approved");
                    tally.approved += 1;
                }
                Err(e) => {
                    warn!(index = proposal.index, "approval failed: {e}");
                    tally.failures.push((proposal.index, e));
                }
            }
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::Ledger,
        pda,
        proposal::ProposalBuilder,
        state::{Multisig, Proposal},
    };
    use assert_matches::assert_matches;
    use std::cell::Cell;

    struct Setup {
        ledger: Ledger,
        multisig: Pubkey,
        owners: Vec<Pubkey>,
    }

    fn setup(owner_count: usize, threshold: u8) -> Setup {
        let ledger = Ledger::new(crate::id());
        let owners: Vec<Pubkey> = (0..owner_count).map(|_| Pubkey::new_unique()).collect();
        let key = Pubkey::new_unique();
        let (multisig, _) = pda::multisig(&key, &crate::id()).unwrap();
        ledger
            .session(owners[0])
            .submit(&[instruction::create_multisig(
                &crate::id(),
                &multisig,
                &owners[0],
                key,
                owners.clone(),
                threshold,
            )
            .unwrap()])
            .unwrap();
        Setup { ledger, multisig, owners }
    }

    fn propose(s: &Setup, proposer: Pubkey) -> Pubkey {
        let draft = ProposalBuilder::new(&s.ledger, crate::id())
            .build(&s.multisig, vec![], None, &proposer, &proposer)
            .unwrap();
        s.ledger.session(proposer).submit(&[draft.instruction]).unwrap();
        draft.address
    }

    #[test]
    fn approval_returns_updated_set() {
        let s = setup(3, 2);
        let (a, b) = (s.owners[0], s.owners[1]);
        let tx = propose(&s, a);

        let session = s.ledger.session(b);
        let tracker = ApprovalTracker::new(&s.ledger, &session, crate::id());
        let approval = tracker.approve(&tx).unwrap();
        assert_eq!(approval.approvals, Some(vec![a, b]));
    }

    #[test]
    fn re_approval_is_not_an_error() {
        let s = setup(2, 2);
        let a = s.owners[0];
        let tx = propose(&s, a);

        let session = s.ledger.session(a);
        let tracker = ApprovalTracker::new(&s.ledger, &session, crate::id());
        assert_eq!(tracker.approve(&tx).unwrap().approvals, Some(vec![a]));
        assert_eq!(tracker.approve(&tx).unwrap().approvals, Some(vec![a]));
    }

    #[test]
    fn non_owner_is_refused_before_submission() {
        let s = setup(2, 1);
        let tx = propose(&s, s.owners[0]);
        let outsider = s.ledger.session(Pubkey::new_unique());

        assert_matches!(
            ApprovalTracker::new(&s.ledger, &outsider, crate::id()).approve(&tx),
            Err(MultisigClientError::Unauthorized)
        );
    }

    #[test]
    fn unknown_proposal_is_fatal() {
        let s = setup(2, 1);
        let session = s.ledger.session(s.owners[0]);
        let missing = Pubkey::new_unique();
        assert_eq!(
            ApprovalTracker::new(&s.ledger, &session, crate::id()).approve(&missing),
            Err(MultisigClientError::UnknownAccount(missing))
        );
    }

    #[test]
    fn approve_all_continues_past_failures() {
        let s = setup(2, 2);
        let (a, b) = (s.owners[0], s.owners[1]);
        let first = propose(&s, a);
        let second = propose(&s, a);
        let _third = propose(&s, a);
        s.ledger.drop_submissions_touching(second);

        let session = s.ledger.session(b);
        let tally = ApprovalTracker::new(&s.ledger, &session, crate::id())
            .approve_all(&s.multisig)
            .unwrap();

        assert_eq!(tally.found, 3);
        assert_eq!(tally.attempted, 3);
        assert_eq!(tally.approved, 2);
        assert_eq!(tally.to_string(), "approved 2 of 3 attempted");
        assert_matches!(
            tally.failures.as_slice(),
            [(1, MultisigClientError::TransportFailure(_))]
        );
        let multisig = s.ledger.get_multisig(&s.multisig).unwrap();
        assert!(s.ledger.get_proposal(&first).unwrap().is_eligible(&multisig));
        assert!(!s.ledger.get_proposal(&second).unwrap().is_eligible(&multisig));
    }

    /// Serves `budget` account reads from the ledger, then times out.
    struct ExhaustibleReader<'a> {
        ledger: &'a Ledger,
        budget: Cell<usize>,
    }

    impl AccountReader for ExhaustibleReader<'_> {
        fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, MultisigClientError> {
            match self.budget.get() {
                0 => Err(MultisigClientError::TransportFailure("read timeout".to_string())),
                n => {
                    self.budget.set(n - 1);
                    self.ledger.get_account(address)
                }
            }
        }

        fn get_proposals_for(
            &self,
            multisig: &Pubkey,
        ) -> Result<Vec<(Pubkey, Proposal)>, MultisigClientError> {
            self.ledger.get_proposals_for(multisig)
        }

        fn find_multisigs_by_owner(
            &self,
            owner: &Pubkey,
        ) -> Result<Vec<(Pubkey, Multisig)>, MultisigClientError> {
            self.ledger.find_multisigs_by_owner(owner)
        }
    }

    #[test]
    fn landed_approval_survives_failed_read_back() {
        let s = setup(2, 2);
        let (a, b) = (s.owners[0], s.owners[1]);
        let tx = propose(&s, a);

        // Proposal and multisig reads succeed; the read-back does not.
        let reader = ExhaustibleReader { ledger: &s.ledger, budget: Cell::new(2) };
        let session = s.ledger.session(b);
        let approval = ApprovalTracker::new(&reader, &session, crate::id()).approve(&tx).unwrap();

        assert_eq!(approval.approvals, None);
        assert_eq!(s.ledger.get_proposal(&tx).unwrap().signers, vec![true, true]);
    }

    #[test]
    fn approve_all_counts_approvals_whose_read_back_failed() {
        let s = setup(2, 2);
        let (a, b) = (s.owners[0], s.owners[1]);
        let first = propose(&s, a);
        let second = propose(&s, a);

        let reader = ExhaustibleReader { ledger: &s.ledger, budget: Cell::new(2) };
        let session = s.ledger.session(b);
        let tally = ApprovalTracker::new(&reader, &session, crate::id())
            .approve_all(&s.multisig)
            .unwrap();

        assert_eq!(tally.to_string(), "approved 1 of 2 attempted");
        assert_matches!(
            tally.failures.as_slice(),
            [(1, MultisigClientError::TransportFailure(_))]
        );
        assert_eq!(s.ledger.get_proposal(&first).unwrap().signers, vec![true, true]);
        assert_eq!(s.ledger.get_proposal(&second).unwrap().signers, vec![true, false]);
    }

    #[test]
    fn progress_reports_every_step() {
        let s = setup(2, 2);
        let a = s.owners[0];
        propose(&s, a);
        propose(&s, a);
        let (second, _) = pda::transaction(&s.multisig, 1, &crate::id()).unwrap();
        s.ledger.drop_submissions_touching(second);

        let session = s.ledger.session(s.owners[1]);
        let mut steps = Vec::new();
        ApprovalTracker::new(&s.ledger, &session, crate::id())
            .approve_all_with(&s.multisig, |step| {
                steps.push(match step {
                    BulkProgress::Found(n) => format!("found {n}"),
                    BulkProgress::Attempting(i) => format!("attempt {i}"),
                    BulkProgress::Outcome(i, Ok(_)) => format!("ok {i}"),
                    BulkProgress::Outcome(i, Err(_)) => format!("err {i}"),
                })
            })
            .unwrap();

        assert_eq!(steps, ["found 2", "attempt 0", "ok 0", "attempt 1", "err 1"]);
    }
}
