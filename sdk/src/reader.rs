use solana_program::pubkey::Pubkey;

use crate::{
    error::MultisigClientError,
    state::{AccountState, Multisig, Proposal},
};

/// Read access to accounts owned by the multisig program.
///
/// A missing account is `Ok(None)` from [`AccountReader::get_account`]; the
/// typed accessors turn it into [`MultisigClientError::UnknownAccount`].
pub trait AccountReader {
    fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, MultisigClientError>;

    /// Every proposal of `multisig`, executed or not.
    fn get_proposals_for(
        &self,
        multisig: &Pubkey,
    ) -> Result<Vec<(Pubkey, Proposal)>, MultisigClientError>;

    fn find_multisigs_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<(Pubkey, Multisig)>, MultisigClientError>;

    fn get_multisig(&self, address: &Pubkey) -> Result<Multisig, MultisigClientError> {
        get_state(self, address)
    }

    fn get_proposal(&self, address: &Pubkey) -> Result<Proposal, MultisigClientError> {
        get_state(self, address)
    }
}

fn get_state<T, R>(reader: &R, address: &Pubkey) -> Result<T, MultisigClientError>
where
    T: AccountState,
    R: AccountReader + ?Sized,
{
    let data = reader
        .get_account(address)?
        .ok_or(MultisigClientError::UnknownAccount(*address))?;
    T::unpack(&data).ok_or(MultisigClientError::InvalidAccountData(*address))
}
