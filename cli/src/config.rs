use std::{env, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use clap::Args;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

/// Connection and wallet settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Cluster moniker (devnet, testnet, mainnet-beta, localnet) or RPC URL
    #[arg(short = 'u', long = "url", env = "MULTISIG_URL", default_value = "devnet")]
    pub url: String,

    /// Wallet keypair file [default: ~/.config/solana/id.json]
    #[arg(short = 'k', long, env = "MULTISIG_KEYPAIR")]
    pub keypair: Option<PathBuf>,

    /// Address of the deployed multisig program
    #[arg(long, env = "MULTISIG_PROGRAM_ID", default_value_t = multisig_sdk::id())]
    pub program_id: Pubkey,

    /// Commitment level for reads and confirmations
    #[arg(long, default_value = "confirmed", value_parser = CommitmentConfig::from_str)]
    pub commitment: CommitmentConfig,

    /// Log filter, e.g. `debug` or `multisig_sdk=trace` (overrides RUST_LOG)
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub json_rpc_url: String,
    pub keypair_path: PathBuf,
    pub program_id: Pubkey,
    pub commitment: CommitmentConfig,
}

impl ConfigArgs {
    pub fn resolve(&self) -> Result<CliConfig> {
        let keypair_path = match &self.keypair {
            Some(path) => path.clone(),
            None => default_keypair_path()?,
        };
        Ok(CliConfig {
            json_rpc_url: cluster_url(&self.url),
            keypair_path,
            program_id: self.program_id,
            commitment: self.commitment,
        })
    }
}

/// Maps a cluster moniker to its public RPC endpoint. Anything else is taken
/// to be a URL already.
pub fn cluster_url(moniker: &str) -> String {
    match moniker {
        "devnet" | "d" => "https://api.devnet.solana.com".to_string(),
        "testnet" | "t" => "https://api.testnet.solana.com".to_string(),
        "mainnet-beta" | "m" => "https://api.mainnet-beta.solana.com".to_string(),
        "localnet" | "localhost" | "l" => "http://localhost:8899".to_string(),
        url => url.to_string(),
    }
}

fn default_keypair_path() -> Result<PathBuf> {
    let home = env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set; pass --keypair"))?;
    Ok(PathBuf::from(home).join(".config/solana/id.json"))
}
