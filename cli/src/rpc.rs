use std::str::FromStr;

use anyhow::{anyhow, Result};
use multisig_sdk::{
    reader::AccountReader,
    state::{AccountState, Multisig, Proposal, DISCRIMINATOR_LEN},
    submitter::{Confirmation, Submitter},
    MultisigClientError,
};
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::{Transaction, TransactionError},
};
use tracing::{debug, warn};

use crate::config::CliConfig;

/// A JSON-RPC endpoint plus the wallet that signs and pays for submissions.
pub struct RpcCluster {
    rpc: RpcClient,
    program_id: Pubkey,
    payer: Keypair,
}

impl RpcCluster {
    pub fn connect(config: &CliConfig) -> Result<Self> {
        let payer = read_keypair_file(&config.keypair_path).map_err(|e| {
            anyhow!("failed to read keypair {}: {e}", config.keypair_path.display())
        })?;
        debug!(url = %config.json_rpc_url, wallet = %payer.pubkey(), "connecting");
        Ok(Self {
            rpc: RpcClient::new_with_commitment(config.json_rpc_url.clone(), config.commitment),
            program_id: config.program_id,
            payer,
        })
    }

    fn classify(&self, err: ClientError, instructions: &[Instruction]) -> MultisigClientError {
        let failing = preflight_logs(&err).and_then(failing_program);
        classify_client_error(err, instructions, &self.program_id, failing)
    }

    fn program_accounts<T: AccountState>(
        &self,
        filters: Vec<RpcFilterType>,
    ) -> Result<Vec<(Pubkey, T)>, MultisigClientError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.rpc.commitment()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .rpc
            .get_program_accounts_with_config(&self.program_id, config)
            .map_err(|e| self.classify(e, &[]))?;
        Ok(accounts
            .into_iter()
            .filter_map(|(address, account)| match T::unpack(&account.data) {
                Some(state) => Some((address, state)),
                None => {
                    warn!(%address, kind = T::TYPE_NAME, "skipping undecodable account");
                    None
                }
            })
            .collect())
    }
}

fn discriminator_filter<T: AccountState>() -> RpcFilterType {
    RpcFilterType::Memcmp(Memcmp::new_base58_encoded(0, &T::account_discriminator()))
}

impl AccountReader for RpcCluster {
    fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, MultisigClientError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .map_err(|e| self.classify(e, &[]))?;
        Ok(response.value.map(|account| account.data))
    }

    fn get_proposals_for(
        &self,
        multisig: &Pubkey,
    ) -> Result<Vec<(Pubkey, Proposal)>, MultisigClientError> {
        self.program_accounts(vec![
            discriminator_filter::<Proposal>(),
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                DISCRIMINATOR_LEN,
                multisig.as_ref(),
            )),
        ])
    }

    fn find_multisigs_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<(Pubkey, Multisig)>, MultisigClientError> {
        // The owner list is variable length, so membership is checked after decoding.
        let all: Vec<(Pubkey, Multisig)> =
            self.program_accounts(vec![discriminator_filter::<Multisig>()])?;
        Ok(all.into_iter().filter(|(_, multisig)| multisig.is_owner(owner)).collect())
    }
}

impl Submitter for RpcCluster {
    fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    fn submit(&self, instructions: &[Instruction]) -> Result<Confirmation, MultisigClientError> {
        let blockhash = self.rpc.get_latest_blockhash().map_err(|e| self.classify(e, &[]))?;
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.payer.pubkey()),
            &[&self.payer],
            blockhash,
        );
        let signature = self
            .rpc
            .send_and_confirm_transaction(&transaction)
            .map_err(|e| self.classify(e, instructions))?;
        Ok(Confirmation { signature: signature.to_string() })
    }
}

fn preflight_logs(err: &ClientError) -> Option<&[String]> {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
            ..
        }) => simulation.logs.as_deref(),
        _ => None,
    }
}

/// The innermost program that reported a failure, from lines such as
/// `Program <id> failed: custom program error: 0x1770`.
pub fn failing_program(logs: &[String]) -> Option<Pubkey> {
    logs.iter().find_map(|line| {
        let (id, _) = line.strip_prefix("Program ")?.split_once(" failed: ")?;
        Pubkey::from_str(id).ok()
    })
}

/// Sorts an RPC failure into a program rejection or a transport failure.
///
/// Custom codes are only read as multisig errors when the failing
/// instruction targets `program_id` and no other program is known to have
/// raised them.
pub fn classify_client_error(
    err: ClientError,
    instructions: &[Instruction],
    program_id: &Pubkey,
    failing: Option<Pubkey>,
) -> MultisigClientError {
    match err.get_transaction_error() {
        Some(TransactionError::InstructionError(index, InstructionError::Custom(code))) => {
            match instructions.get(usize::from(index)) {
                Some(ix)
                    if ix.program_id == *program_id
                        && failing.map_or(true, |p| p == *program_id) =>
                {
                    MultisigClientError::from_instruction_code(&ix.data, code)
                }
                _ => MultisigClientError::Rejected(format!(
                    "instruction {index}: custom program error: {code:#x}"
                )),
            }
        }
        Some(TransactionError::InstructionError(_, InstructionError::MissingRequiredSignature)) => {
            MultisigClientError::Unauthorized
        }
        Some(other) => MultisigClientError::Rejected(other.to_string()),
        None => MultisigClientError::TransportFailure(err.to_string()),
    }
}
