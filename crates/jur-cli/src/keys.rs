//! # `key` Subcommand
//!
//! Signing key files. A key file is plain JSON holding the derived
//! address, the public key, and the secret seed in hex; whoever holds
//! the file holds the key.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};

use jur_core::Address;
use jur_crypto::{SigningKeyPair, SigningPublicKey};

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyFile {
    pub address: Address,
    pub public_key: SigningPublicKey,
    pub secret_seed: String,
}

impl KeyFile {
    pub fn from_keys(keys: &SigningKeyPair) -> Self {
        Self {
            address: keys.address(),
            public_key: keys.public_key(),
            secret_seed: encode_seed(&keys.secret_bytes()),
        }
    }

    pub fn to_keys(&self) -> Result<SigningKeyPair> {
        let seed = decode_seed(&self.secret_seed)?;
        let keys = SigningKeyPair::from_seed(&seed);
        if keys.address() != self.address {
            bail!(
                "key file address {} does not match the address derived from its seed",
                self.address
            );
        }
        Ok(keys)
    }
}

pub fn load_keypair(path: &Path) -> Result<SigningKeyPair> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading key file {}", path.display()))?;
    let file: KeyFile = serde_json::from_str(&data)
        .with_context(|| format!("parsing key file {}", path.display()))?;
    file.to_keys()
}

fn encode_seed(seed: &[u8; 32]) -> String {
    seed.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_seed(hex: &str) -> Result<[u8; 32]> {
    if hex.len() != 64 {
        bail!("secret seed must be 64 hex characters, got {}", hex.len());
    }
    let mut seed = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).context("secret seed is not ASCII hex")?;
        seed[i] = u8::from_str_radix(pair, 16).context("secret seed is not hex")?;
    }
    Ok(seed)
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub command: KeyCommand,
}

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Generate a fresh signing key file.
    Generate {
        /// Where to write the key file.
        #[arg(long)]
        out: PathBuf,
    },
}

pub fn run(args: KeyArgs) -> Result<()> {
    match args.command {
        KeyCommand::Generate { out } => {
            if out.exists() {
                bail!("key file {} already exists", out.display());
            }
            let keys = SigningKeyPair::generate();
            let file = KeyFile::from_keys(&keys);
            let mut data = serde_json::to_string_pretty(&file)?;
            data.push('\n');
            fs::write(&out, data)
                .with_context(|| format!("writing key file {}", out.display()))?;
            println!("OK: signing key {} written to {}", keys.address(), out.display());
        }
    }
    Ok(())
}
