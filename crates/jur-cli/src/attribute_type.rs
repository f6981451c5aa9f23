//! # `attribute-type` Subcommand
//!
//! Type definitions, their pricing, and secondary-source declarations.
//! Owner-gated throughout.

use std::path::Path;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use jur_core::{Address, Amount, AttributeTypeId};
use jur_registry::{AttributeTypeDef, CallContext, SecondarySource};

use crate::store;

#[derive(Args, Debug)]
pub struct AttributeTypeArgs {
    #[command(subcommand)]
    pub command: AttributeTypeCommand,
}

#[derive(Subcommand, Debug)]
pub enum AttributeTypeCommand {
    /// Define an attribute type (or renew a removed one verbatim).
    Add {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        id: AttributeTypeId,
        #[arg(long)]
        description: String,
        /// Subjects may neither self-issue nor self-remove this type.
        #[arg(long)]
        restricted: bool,
        /// No operator-mediated issuance for this type.
        #[arg(long)]
        only_personal: bool,
        #[arg(long, default_value = "0")]
        minimum_stake: Amount,
        #[arg(long, default_value = "0")]
        jurisdiction_fee: Amount,
        /// Registry address to fall through to when no local record exists.
        #[arg(long, requires = "source_type")]
        source_registry: Option<Address>,
        /// Type id to ask the secondary registry about.
        #[arg(long, requires = "source_registry")]
        source_type: Option<AttributeTypeId>,
    },
    /// Remove a type definition (its commitment stays behind).
    Remove {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        id: AttributeTypeId,
    },
    /// Change the minimum stake of a live type.
    SetStake {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        id: AttributeTypeId,
        #[arg(long)]
        stake: Amount,
    },
    /// Change the jurisdiction fee of a live type.
    SetFee {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        id: AttributeTypeId,
        #[arg(long)]
        fee: Amount,
    },
    /// Point a live type at a secondary source, or clear it.
    SetSource {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        id: AttributeTypeId,
        #[arg(long, requires = "source_type")]
        source_registry: Option<Address>,
        #[arg(long, requires = "source_registry")]
        source_type: Option<AttributeTypeId>,
    },
    /// List type definitions.
    List,
}

fn source_from(
    source_registry: Option<Address>,
    source_type: Option<AttributeTypeId>,
) -> Result<Option<SecondarySource>> {
    match (source_registry, source_type) {
        (Some(registry), Some(remote_type_id)) => Ok(Some(SecondarySource {
            registry,
            remote_type_id,
        })),
        (None, None) => Ok(None),
        // clap's `requires` already rejects these; keep the handler total.
        _ => bail!("--source-registry and --source-type must be given together"),
    }
}

pub fn run(state: &Path, args: AttributeTypeArgs) -> Result<()> {
    match args.command {
        AttributeTypeCommand::Add {
            caller,
            id,
            description,
            restricted,
            only_personal,
            minimum_stake,
            jurisdiction_fee,
            source_registry,
            source_type,
        } => {
            let def = AttributeTypeDef {
                id,
                description,
                restricted,
                only_personal,
                minimum_stake,
                jurisdiction_fee,
                secondary_source: source_from(source_registry, source_type)?,
            };
            let mut registry = store::load(state)?;
            registry.add_attribute_type(&CallContext::new(caller), def)?;
            store::save(state, &registry)?;
            println!("OK: attribute type {id} defined");
        }
        AttributeTypeCommand::Remove { caller, id } => {
            let mut registry = store::load(state)?;
            registry.remove_attribute_type(&CallContext::new(caller), id)?;
            store::save(state, &registry)?;
            println!("OK: attribute type {id} removed");
        }
        AttributeTypeCommand::SetStake { caller, id, stake } => {
            let mut registry = store::load(state)?;
            registry.set_minimum_stake(&CallContext::new(caller), id, stake)?;
            store::save(state, &registry)?;
            println!("OK: attribute type {id} minimum stake is now {stake}");
        }
        AttributeTypeCommand::SetFee { caller, id, fee } => {
            let mut registry = store::load(state)?;
            registry.set_jurisdiction_fee(&CallContext::new(caller), id, fee)?;
            store::save(state, &registry)?;
            println!("OK: attribute type {id} jurisdiction fee is now {fee}");
        }
        AttributeTypeCommand::SetSource {
            caller,
            id,
            source_registry,
            source_type,
        } => {
            let source = source_from(source_registry, source_type)?;
            let mut registry = store::load(state)?;
            registry.set_secondary_source(&CallContext::new(caller), id, source)?;
            store::save(state, &registry)?;
            match source {
                Some(source) => println!(
                    "OK: attribute type {id} now falls through to {} type {}",
                    source.registry, source.remote_type_id
                ),
                None => println!("OK: attribute type {id} secondary source cleared"),
            }
        }
        AttributeTypeCommand::List => {
            let registry = store::load(state)?;
            for def in registry.directory().attribute_types() {
                let source = match def.secondary_source {
                    Some(source) => format!("{}#{}", source.registry, source.remote_type_id),
                    None => "-".to_string(),
                };
                println!(
                    "{} {:?} restricted={} only-personal={} stake={} fee={} source={}",
                    def.id,
                    def.description,
                    def.restricted,
                    def.only_personal,
                    def.minimum_stake,
                    def.jurisdiction_fee,
                    source
                );
            }
        }
    }
    Ok(())
}
