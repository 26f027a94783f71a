use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use multisig_sdk::{
    approval::{BulkApproval, BulkProgress},
    instructions_file,
    reader::AccountReader,
    submitter::Submitter,
    MultisigClient, MultisigClientError,
};
use serde::Serialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

use crate::output::CliMultisig;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a multisig owned by the given keys and the wallet
    CreateMultisig {
        /// Comma-separated owner public keys
        #[arg(long, value_delimiter = ',', required = true)]
        keys: Vec<Pubkey>,
        /// Approvals needed to execute a transaction
        #[arg(short, long)]
        threshold: u8,
        /// Seed key for the multisig address [default: random]
        #[arg(long)]
        key: Option<Pubkey>,
    },
    /// Print a multisig account
    ShowMultisig {
        /// Multisig key
        key: Pubkey,
    },
    /// List the multisigs the wallet is an owner of
    ShowOwnedMultisig,
    DeleteMultisig {
        key: Pubkey,
    },
    /// Propose the instructions in a JSON file
    CreateTransaction {
        file: PathBuf,
        /// Multisig key
        #[arg(short, long)]
        multisig: Pubkey,
        /// Transaction index [default: the multisig's next index]
        #[arg(short, long)]
        index: Option<u64>,
    },
    DeleteTransaction {
        index: u64,
        #[arg(short, long)]
        multisig: Pubkey,
    },
    /// Approve one transaction
    Approve {
        index: u64,
        /// Multisig key
        #[arg(short, long)]
        multisig: Pubkey,
    },
    /// Approve every pending transaction of a multisig
    ApproveAll {
        /// Multisig key
        #[arg(short, long)]
        multisig: Pubkey,
    },
    /// Execute an approved transaction
    Execute {
        index: u64,
        /// Multisig key
        #[arg(short, long)]
        multisig: Pubkey,
    },
    /// Propose upgrading a program from a buffer
    UpgradeProgram {
        /// Multisig key
        #[arg(short, long)]
        multisig: Pubkey,
        #[arg(long)]
        program_id_to_upgrade: Pubkey,
        /// Buffer holding the new program data
        #[arg(long)]
        buffer: Pubkey,
        #[arg(short, long)]
        index: Option<u64>,
    },
}

/// Prints the submission outcome line and hands the result on.
fn submitted<T>(result: Result<T, MultisigClientError>) -> Result<T> {
    println!("{}", outcome_line(&result));
    result.map_err(Into::into)
}

fn outcome_line<T>(result: &Result<T, MultisigClientError>) -> &'static str {
    match result {
        Ok(_) => "OK",
        Err(_) => "Error",
    }
}

fn progress_lines(step: &BulkProgress<'_>) -> Vec<String> {
    match step {
        BulkProgress::Found(n) => vec![format!("Found {n} transaction(s)...")],
        BulkProgress::Attempting(index) => vec![format!("Approving transaction #{index}...")],
        BulkProgress::Outcome(_, result @ Ok(approval)) => vec![
            format!("Signature: {}", approval.confirmation),
            outcome_line(*result).to_string(),
        ],
        BulkProgress::Outcome(_, result @ Err(e)) => {
            vec![outcome_line(*result).to_string(), e.to_string()]
        }
    }
}

/// Nothing is totalled when the multisig has no transactions at all.
fn total_line(tally: &BulkApproval) -> Option<String> {
    (tally.found > 0)
        .then(|| format!("Total approved: {} of {} attempted", tally.approved, tally.attempted))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The requested keys as a set, with the wallet always a member.
fn owner_set(keys: Vec<Pubkey>, wallet: Pubkey) -> Vec<Pubkey> {
    let mut owners = Vec::with_capacity(keys.len() + 1);
    for key in keys.into_iter().chain(std::iter::once(wallet)) {
        if !owners.contains(&key) {
            owners.push(key);
        }
    }
    owners
}

pub fn run<R, S>(client: &MultisigClient<'_, R, S>, command: Command) -> Result<()>
where
    R: AccountReader + ?Sized,
    S: Submitter + ?Sized,
{
    match command {
        Command::CreateMultisig { keys, threshold, key } => {
            let owners = owner_set(keys, client.wallet());
            let key = key.unwrap_or_else(|| Keypair::new().pubkey());
            let (address, confirmation) =
                submitted(client.create_multisig(key, owners, threshold))?;
            println!("Key: {key}");
            println!("Address: {address}");
            println!("Signature: {confirmation}");
        }
        Command::ShowMultisig { key } => {
            let address = client.multisig_address(&key)?;
            let multisig = client.get_multisig(&address)?;
            print_json(&CliMultisig::new(&address, &multisig))?;
        }
        Command::ShowOwnedMultisig => {
            let owned: Vec<CliMultisig> = client
                .find_owned_multisigs()?
                .iter()
                .map(|(address, multisig)| CliMultisig::new(address, multisig))
                .collect();
            print_json(&owned)?;
        }
        Command::DeleteMultisig { .. } | Command::DeleteTransaction { .. } => {
            println!("Unimplemented");
        }
        Command::CreateTransaction { file, multisig, index } => {
            let instructions = instructions_file::load(&file)?;
            let address = client.multisig_address(&multisig)?;
            let (draft, confirmation) =
                submitted(client.create_proposal(&address, instructions, index))?;
            println!("Transaction: {} (index {})", draft.address, draft.index);
            println!("Signature: {confirmation}");
        }
        Command::Approve { index, multisig } => {
            let address = client.multisig_address(&multisig)?;
            let approval = submitted(client.approve(&address, index))?;
            println!("Signature: {}", approval.confirmation);
            if let Some(approvals) = approval.approvals {
                println!("Approvals: {}", approvals.len());
            }
        }
        Command::ApproveAll { multisig } => {
            let address = client.multisig_address(&multisig)?;
            let tally = client.approve_all_with(&address, |step| {
                for line in progress_lines(&step) {
                    println!("{line}");
                }
            })?;
            if let Some(total) = total_line(&tally) {
                println!("{total}");
            }
        }
        Command::Execute { index, multisig } => {
            let address = client.multisig_address(&multisig)?;
            let confirmation = submitted(client.execute(&address, index))?;
            println!("Signature: {confirmation}");
        }
        Command::UpgradeProgram { multisig, program_id_to_upgrade, buffer, index } => {
            let address = client.multisig_address(&multisig)?;
            let (draft, confirmation) = submitted(client.propose_upgrade(
                &address,
                index,
                &program_id_to_upgrade,
                &buffer,
            ))?;
            println!("Transaction: {} (index {})", draft.address, draft.index);
            println!("Signature: {confirmation}");
        }
    }
    Ok(())
}
