//! Client for the multisig program: owners of a multisig propose instruction
//! bundles, approve them, and execute them under the multisig's derived
//! authority once the threshold is met.

pub mod approval;
pub mod client;
pub mod error;
pub mod execution;
pub mod instruction;
pub mod instructions_file;
pub mod ledger;
pub mod pda;
pub mod processor;
pub mod proposal;
pub mod reader;
pub mod state;
pub mod submitter;
pub mod upgrade;

pub use client::MultisigClient;
pub use error::MultisigClientError;

solana_program::declare_id!("4GUuiefBoY1Qeou69d2bM2mQTEgr8wBFes3KqZaFXZzn");
