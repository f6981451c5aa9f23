//! # `registry` Subcommand
//!
//! Registry lifecycle: initialize a state file, inspect it, hand the
//! registry to a new owner.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use jur_core::Address;
use jur_registry::{CallContext, Jurisdiction};

use crate::store;

#[derive(Args, Debug)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistryCommand,
}

#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// Create a fresh registry state file.
    Init {
        /// Address identifying this registry; approvals bind to it.
        #[arg(long)]
        address: Address,
        /// Owner address for administrative operations.
        #[arg(long)]
        owner: Address,
    },
    /// Print a summary of the registry.
    Show,
    /// Hand the registry to a new owner.
    TransferOwnership {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        new_owner: Address,
    },
}

pub fn run(state: &Path, args: RegistryArgs) -> Result<()> {
    match args.command {
        RegistryCommand::Init { address, owner } => {
            let registry = Jurisdiction::new(address, owner)?;
            store::create(state, &registry)?;
            println!("OK: registry {address} initialized at {}", state.display());
        }
        RegistryCommand::Show => {
            let registry = store::load(state)?;
            println!("registry {}", registry.address());
            println!("owner {}", registry.owner());
            println!("validators: {}", registry.directory().validators().count());
            println!(
                "attribute types: {}",
                registry.directory().attribute_types().count()
            );
            println!("approvals: {}", registry.directory().approvals().count());
            println!("records: {}", registry.ledger().len());
            println!("escrowed: {}", registry.escrowed_total());
        }
        RegistryCommand::TransferOwnership { caller, new_owner } => {
            let mut registry = store::load(state)?;
            registry.transfer_ownership(&CallContext::new(caller), new_owner)?;
            store::save(state, &registry)?;
            println!("OK: registry owner is now {new_owner}");
        }
    }
    Ok(())
}
