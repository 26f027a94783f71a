//! JSON instruction bundles, as written by hand or dumped from web3 tooling.
//!
//! ```json
//! [
//!   {
//!     "programId": "11111111111111111111111111111111",
//!     "keys": [{ "pubkey": "...", "isSigner": true, "isWritable": true }],
//!     "data": [2, 0, 0, 0]
//!   }
//! ]
//! ```
//!
//! `data` may also be a serialized Node buffer: `{ "type": "Buffer", "data": [...] }`.

use std::{fs, path::Path, str::FromStr};

use serde::Deserialize;
use solana_program::pubkey::Pubkey;

use crate::{
    error::MultisigClientError,
    state::{TxAccountMeta, TxInstruction},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawInstruction {
    #[serde(alias = "program_id")]
    program_id: String,
    #[serde(default, alias = "accounts")]
    keys: Vec<RawAccountMeta>,
    #[serde(default)]
    data: RawData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccountMeta {
    pubkey: String,
    #[serde(default, alias = "is_signer")]
    is_signer: bool,
    #[serde(default, alias = "is_writable")]
    is_writable: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawData {
    Bytes(Vec<u8>),
    Buffer { data: Vec<u8> },
}

impl Default for RawData {
    fn default() -> Self {
        RawData::Bytes(Vec::new())
    }
}

impl RawData {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            RawData::Bytes(bytes) | RawData::Buffer { data: bytes } => bytes,
        }
    }
}

fn malformed(msg: impl ToString) -> MultisigClientError {
    MultisigClientError::MalformedInstructionsFile(msg.to_string())
}

fn parse_pubkey(value: &str, what: &str, position: usize) -> Result<Pubkey, MultisigClientError> {
    Pubkey::from_str(value)
        .map_err(|e| malformed(format!("instruction #{position}: invalid {what} '{value}': {e}")))
}

pub fn parse(json: &str) -> Result<Vec<TxInstruction>, MultisigClientError> {
    let raw: Vec<RawInstruction> = serde_json::from_str(json).map_err(malformed)?;
    if raw.is_empty() {
        return Err(malformed("no instructions"));
    }

    raw.into_iter()
        .enumerate()
        .map(|(position, ix)| {
            let keys = ix
                .keys
                .iter()
                .map(|k| {
                    Ok(TxAccountMeta {
                        pubkey: parse_pubkey(&k.pubkey, "account", position)?,
                        is_signer: k.is_signer,
                        is_writable: k.is_writable,
                    })
                })
                .collect::<Result<Vec<_>, MultisigClientError>>()?;
            Ok(TxInstruction {
                program_id: parse_pubkey(&ix.program_id, "program id", position)?,
                keys,
                data: ix.data.into_bytes(),
            })
        })
        .collect()
}

pub fn load(path: &Path) -> Result<Vec<TxInstruction>, MultisigClientError> {
    let json = fs::read_to_string(path)
        .map_err(|e| malformed(format!("{}: {e}", path.display())))?;
    parse(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SYSTEM: &str = "11111111111111111111111111111111";

    #[test]
    fn parses_web3_shape() {
        let account = Pubkey::new_unique();
        let json = format!(
            r#"[{{
                "programId": "{SYSTEM}",
                "keys": [{{ "pubkey": "{account}", "isSigner": true, "isWritable": false }}],
                "data": {{ "type": "Buffer", "data": [2, 0, 0, 0] }}
            }}]"#
        );
        let bundle = parse(&json).unwrap();
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle[0].program_id, Pubkey::from_str(SYSTEM).unwrap());
        assert_eq!(
            bundle[0].keys,
            vec![TxAccountMeta { pubkey: account, is_signer: true, is_writable: false }]
        );
        assert_eq!(bundle[0].data, vec![2, 0, 0, 0]);
    }

    #[test]
    fn accepts_snake_case_and_plain_bytes() {
        let account = Pubkey::new_unique();
        let json = format!(
            r#"[
                {{
                    "program_id": "{SYSTEM}",
                    "accounts": [{{ "pubkey": "{account}", "is_writable": true }}],
                    "data": [7]
                }},
                {{ "programId": "{SYSTEM}" }}
            ]"#
        );
        let bundle = parse(&json).unwrap();
        assert!(bundle[0].keys[0].is_writable && !bundle[0].keys[0].is_signer);
        assert_eq!(bundle[0].data, vec![7]);
        assert!(bundle[1].keys.is_empty() && bundle[1].data.is_empty());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_matches!(parse("{}"), Err(MultisigClientError::MalformedInstructionsFile(_)));
        assert_matches!(parse("[]"), Err(MultisigClientError::MalformedInstructionsFile(_)));
        assert_matches!(
            parse(r#"[{ "programId": "not-a-key" }]"#),
            Err(MultisigClientError::MalformedInstructionsFile(msg)) if msg.contains("not-a-key")
        );
        assert_matches!(
            parse(&format!(r#"[{{ "programId": "{SYSTEM}", "data": [256] }}]"#)),
            Err(MultisigClientError::MalformedInstructionsFile(_))
        );
    }

    #[test]
    fn missing_file_is_malformed() {
        assert_matches!(
            load(Path::new("/nonexistent/instructions.json")),
            Err(MultisigClientError::MalformedInstructionsFile(_))
        );
    }
}
