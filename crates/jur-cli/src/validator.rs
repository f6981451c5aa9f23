//! # `validator` Subcommand
//!
//! Validator registration, removal, and signing-key rotation. All
//! owner-gated except `rotate-key`, which a validator calls for itself.

use std::path::Path;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use jur_core::Address;
use jur_registry::CallContext;

use crate::store;

#[derive(Args, Debug)]
pub struct ValidatorArgs {
    #[command(subcommand)]
    pub command: ValidatorCommand,
}

#[derive(Subcommand, Debug)]
pub enum ValidatorCommand {
    /// Register a validator.
    Add {
        #[arg(long)]
        caller: Address,
        /// Identity address of the new validator.
        #[arg(long)]
        address: Address,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Deregister a validator and drop its approvals.
    Remove {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        address: Address,
    },
    /// Rotate the caller's own signing key.
    RotateKey {
        /// The validator rotating its key.
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        new_key: Address,
    },
    /// List registered validators.
    List,
    /// Print one validator with its rotation history.
    Show {
        #[arg(long)]
        address: Address,
    },
}

pub fn run(state: &Path, args: ValidatorArgs) -> Result<()> {
    match args.command {
        ValidatorCommand::Add {
            caller,
            address,
            description,
        } => {
            let mut registry = store::load(state)?;
            registry.add_validator(&CallContext::new(caller), address, description)?;
            store::save(state, &registry)?;
            println!("OK: validator {address} added");
        }
        ValidatorCommand::Remove { caller, address } => {
            let mut registry = store::load(state)?;
            registry.remove_validator(&CallContext::new(caller), address)?;
            store::save(state, &registry)?;
            println!("OK: validator {address} removed");
        }
        ValidatorCommand::RotateKey { caller, new_key } => {
            let mut registry = store::load(state)?;
            registry.set_signing_key(&CallContext::new(caller), new_key)?;
            store::save(state, &registry)?;
            println!("OK: validator {caller} now signs with {new_key}");
        }
        ValidatorCommand::List => {
            let registry = store::load(state)?;
            for validator in registry.directory().validators() {
                println!(
                    "{} key={} {:?}",
                    validator.address, validator.signing_key, validator.description
                );
            }
        }
        ValidatorCommand::Show { address } => {
            let registry = store::load(state)?;
            let Some(validator) = registry.validator(address) else {
                bail!("validator {address} is not registered");
            };
            println!("{}", serde_json::to_string_pretty(validator)?);
        }
    }
    Ok(())
}
