//! Proposal payload for upgrading a program deployed with the upgradeable
//! BPF loader, using the multisig authority as upgrade authority.

use solana_program::{bpf_loader_upgradeable, pubkey::Pubkey, sysvar};
use tracing::debug;

use crate::{
    error::MultisigClientError,
    pda,
    reader::AccountReader,
    state::{TxAccountMeta, TxInstruction},
};

/// Start of the program-data address in an upgradeable program account,
/// after the `u32` state tag.
pub const PROGRAMDATA_ADDRESS_OFFSET: usize = 4;

/// Loader instruction tag for `Upgrade`, encoded as a little-endian `u32`.
pub const UPGRADE_OPCODE: u32 = 3;

/// Reads the program-data address out of a program account's raw bytes.
/// `None` when the account is too short to hold one.
pub fn programdata_address(program_account: &[u8]) -> Option<Pubkey> {
    let end = PROGRAMDATA_ADDRESS_OFFSET + 32;
    let bytes = program_account.get(PROGRAMDATA_ADDRESS_OFFSET..end)?;
    Pubkey::try_from(bytes).ok()
}

pub struct UpgradeInstructionBuilder<'a, R: ?Sized> {
    reader: &'a R,
    program_id: Pubkey,
}

impl<'a, R: AccountReader + ?Sized> UpgradeInstructionBuilder<'a, R> {
    pub fn new(reader: &'a R, program_id: Pubkey) -> Self {
        Self { reader, program_id }
    }

    /// Builds the single-instruction bundle that upgrades `program` from
    /// `buffer`, refunding the buffer's lamports to `spill`.
    pub fn build_upgrade(
        &self,
        program: &Pubkey,
        buffer: &Pubkey,
        multisig: &Pubkey,
        spill: &Pubkey,
    ) -> Result<Vec<TxInstruction>, MultisigClientError> {
        let programdata = self
            .reader
            .get_account(program)?
            .as_deref()
            .and_then(programdata_address)
            .ok_or(MultisigClientError::UnknownProgram(*program))?;
        let (authority, _) = pda::signer(multisig, &self.program_id)?;
        debug!(%program, %programdata, %authority, "building upgrade");

        let keys = vec![
            meta(authority, true, true),
            meta(*program, true, false),
            meta(programdata, true, false),
            meta(*buffer, true, false),
            meta(*spill, false, false),
            meta(sysvar::rent::id(), false, false),
            meta(sysvar::clock::id(), false, false),
        ];

        Ok(vec![TxInstruction {
            program_id: bpf_loader_upgradeable::id(),
            keys,
            data: UPGRADE_OPCODE.to_le_bytes().to_vec(),
        }])
    }
}

fn meta(pubkey: Pubkey, is_writable: bool, is_signer: bool) -> TxAccountMeta {
    TxAccountMeta { pubkey, is_signer, is_writable }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use assert_matches::assert_matches;

    fn program_account(programdata: &Pubkey) -> Vec<u8> {
        let mut data = 2u32.to_le_bytes().to_vec();
        data.extend_from_slice(programdata.as_ref());
        data
    }

    #[test]
    fn programdata_is_read_at_offset_four() {
        let programdata = Pubkey::new_unique();
        let mut data = program_account(&programdata);
        assert_eq!(programdata_address(&data), Some(programdata));

        data.extend_from_slice(&[0xaa; 16]);
        assert_eq!(programdata_address(&data), Some(programdata));
        assert_eq!(programdata_address(&data[..35]), None);
        assert_eq!(programdata_address(&[]), None);
    }

    #[test]
    fn upgrade_bundle_layout() {
        let ledger = Ledger::new(crate::id());
        let (program, programdata, buffer, spill) = (
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        let multisig = Pubkey::new_unique();
        ledger.set_account(program, program_account(&programdata));

        let bundle = UpgradeInstructionBuilder::new(&ledger, crate::id())
            .build_upgrade(&program, &buffer, &multisig, &spill)
            .unwrap();
        let (authority, _) = pda::signer(&multisig, &crate::id()).unwrap();

        assert_eq!(bundle.len(), 1);
        let ix = &bundle[0];
        assert_eq!(ix.program_id.to_string(), "BPFLoaderUpgradeab1e11111111111111111111111");
        assert_eq!(ix.data, vec![3, 0, 0, 0]);
        assert_eq!(
            ix.keys,
            vec![
                TxAccountMeta { pubkey: authority, is_signer: true, is_writable: true },
                TxAccountMeta { pubkey: program, is_signer: false, is_writable: true },
                TxAccountMeta { pubkey: programdata, is_signer: false, is_writable: true },
                TxAccountMeta { pubkey: buffer, is_signer: false, is_writable: true },
                TxAccountMeta { pubkey: spill, is_signer: false, is_writable: false },
                TxAccountMeta {
                    pubkey: sysvar::rent::id(),
                    is_signer: false,
                    is_writable: false,
                },
                TxAccountMeta {
                    pubkey: sysvar::clock::id(),
                    is_signer: false,
                    is_writable: false,
                },
            ]
        );
    }

    #[test]
    fn missing_or_truncated_program_is_unknown() {
        let ledger = Ledger::new(crate::id());
        let builder = UpgradeInstructionBuilder::new(&ledger, crate::id());
        let (program, buffer, multisig, spill) = (
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );

        assert_matches!(
            builder.build_upgrade(&program, &buffer, &multisig, &spill),
            Err(MultisigClientError::UnknownProgram(p)) if p == program
        );

        ledger.set_account(program, vec![2, 0, 0, 0, 1, 2, 3]);
        assert_matches!(
            builder.build_upgrade(&program, &buffer, &multisig, &spill),
            Err(MultisigClientError::UnknownProgram(_))
        );
    }
}
