//! # `approval` Subcommand
//!
//! The owner's approval grants (which validator may issue which type)
//! and validator-side invalidation of signed approval envelopes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};

use jur_core::{Address, AttributeTypeId};
use jur_registry::CallContext;

use crate::{signing, store};

#[derive(Args, Debug)]
pub struct ApprovalArgs {
    #[command(subcommand)]
    pub command: ApprovalCommand,
}

#[derive(Subcommand, Debug)]
pub enum ApprovalCommand {
    /// Allow a validator to issue an attribute type.
    Grant {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        validator: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
    },
    /// Withdraw a validator's approval for a type.
    Revoke {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        validator: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
    },
    /// Burn a signed approval envelope before anyone consumes it.
    Invalidate {
        /// The validator whose key signed the envelope.
        #[arg(long)]
        caller: Address,
        /// Path to the envelope JSON.
        #[arg(long)]
        approval: PathBuf,
    },
}

pub fn run(state: &Path, args: ApprovalArgs) -> Result<()> {
    match args.command {
        ApprovalCommand::Grant {
            caller,
            validator,
            type_id,
        } => {
            let mut registry = store::load(state)?;
            registry.add_approval(&CallContext::new(caller), validator, type_id)?;
            store::save(state, &registry)?;
            println!("OK: validator {validator} approved for type {type_id}");
        }
        ApprovalCommand::Revoke {
            caller,
            validator,
            type_id,
        } => {
            let mut registry = store::load(state)?;
            registry.remove_approval(&CallContext::new(caller), validator, type_id)?;
            store::save(state, &registry)?;
            println!("OK: validator {validator} approval for type {type_id} withdrawn");
        }
        ApprovalCommand::Invalidate { caller, approval } => {
            let signed = signing::read_envelope(&approval)?;
            let mut registry = store::load(state)?;
            let digest = registry.invalidate_approval(&CallContext::new(caller), &signed)?;
            store::save(state, &registry)?;
            println!("OK: approval {digest} invalidated");
        }
    }
    Ok(())
}
