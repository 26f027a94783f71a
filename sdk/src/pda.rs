//! Program derived addresses used by the multisig program.
//!
//! The program re-derives every address it is handed and rejects mismatches,
//! so the bump search here must land on the same canonical bump it does.

use solana_program::pubkey::Pubkey;
use tracing::trace;

use crate::{error::MultisigClientError, state::Multisig};

pub const SIGNER_SEED: &[u8] = b"signer";

/// Finds the canonical address for `seeds`: the highest bump in `255..=0`
/// whose address falls off the ed25519 curve.
pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> Option<(Pubkey, u8)> {
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump = seeds.to_vec();
        with_bump.push(&bump_seed);
        if let Ok(address) = Pubkey::create_program_address(&with_bump, program_id) {
            trace!(%address, bump, "derived address");
            return Some((address, bump));
        }
    }
    None
}

fn try_derive(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), MultisigClientError> {
    derive(seeds, program_id).ok_or(MultisigClientError::AddressDerivation)
}

/// `("multisig", key)`
pub fn multisig(key: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8), MultisigClientError> {
    try_derive(&[Multisig::SEED_PREFIX, key.as_ref()], program_id)
}

/// `(multisig, "signer")`: the authority that signs executed instructions.
pub fn signer(multisig: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8), MultisigClientError> {
    try_derive(&[multisig.as_ref(), SIGNER_SEED], program_id)
}

/// `(multisig, index as u64 LE)`
pub fn transaction(
    multisig: &Pubkey,
    index: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), MultisigClientError> {
    try_derive(&[multisig.as_ref(), &index.to_le_bytes()], program_id)
}
