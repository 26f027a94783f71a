use multisig_sdk::state::Multisig;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CliMultisig {
    pub address: String,
    pub key: String,
    pub owners: Vec<String>,
    pub threshold: u8,
    pub transaction_count: u64,
    pub owner_set_seqno: u32,
}

impl CliMultisig {
    pub fn new(address: &Pubkey, multisig: &Multisig) -> Self {
        Self {
            address: address.to_string(),
            key: multisig.key.to_string(),
            owners: multisig.owners.iter().map(Pubkey::to_string).collect(),
            threshold: multisig.threshold,
            transaction_count: multisig.transaction_count,
            owner_set_seqno: multisig.owner_set_seqno,
        }
    }
}
