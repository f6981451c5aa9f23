//! # `attribute` Subcommand
//!
//! The attribute lifecycle: the three issuance paths, the three
//! revocation paths, and queries. `query` can attach other registry
//! state files as live secondary sources for the duration of the call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use jur_core::{Address, Amount, AttributeTypeId, AttributeValue};
use jur_registry::{CallContext, IssuanceReceipt, RevocationReceipt, Transfer};

use crate::{signing, store};

#[derive(Args, Debug)]
pub struct AttributeArgs {
    #[command(subcommand)]
    pub command: AttributeCommand,
}

#[derive(Subcommand, Debug)]
pub enum AttributeCommand {
    /// Issue directly as an approved validator.
    Issue {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        subject: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
        #[arg(long)]
        value: AttributeValue,
        /// Funds attached to cover stake and fees.
        #[arg(long, default_value = "0")]
        funds: Amount,
    },
    /// Consume a signed approval as its subject.
    Add {
        #[arg(long)]
        caller: Address,
        #[arg(long, default_value = "0")]
        funds: Amount,
        /// Path to the envelope JSON.
        #[arg(long)]
        approval: PathBuf,
    },
    /// Consume a signed approval as its operator.
    AddFor {
        #[arg(long)]
        caller: Address,
        #[arg(long, default_value = "0")]
        funds: Amount,
        #[arg(long)]
        approval: PathBuf,
    },
    /// Revoke as the issuing validator or the owner.
    Revoke {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        subject: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
        /// Per-unit price used to size the revocation rebate.
        #[arg(long, default_value = "0")]
        fee_rate: Amount,
    },
    /// Drop one's own unrestricted attribute.
    Remove {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
        #[arg(long, default_value = "0")]
        fee_rate: Amount,
    },
    /// Drop a record as the operator that placed it.
    RemoveFor {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        subject: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
        #[arg(long, default_value = "0")]
        fee_rate: Amount,
    },
    /// Ask whether a subject visibly holds an attribute.
    Query {
        #[arg(long)]
        subject: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
        /// Other registry state files to attach as secondary sources.
        #[arg(long)]
        attach: Vec<PathBuf>,
    },
    /// Print the raw record, visibility ignored.
    Show {
        #[arg(long)]
        subject: Address,
        #[arg(long)]
        type_id: AttributeTypeId,
    },
}

fn print_transfers(transfers: &[Transfer]) {
    for transfer in transfers {
        println!(
            "  transfer {} -> {} ({:?})",
            transfer.amount, transfer.to, transfer.reason
        );
    }
}

fn print_issuance(receipt: &IssuanceReceipt) {
    println!(
        "OK: type {} issued to {} by {} (staked {})",
        receipt.attribute_type, receipt.subject, receipt.issuing_validator, receipt.staked
    );
    print_transfers(&receipt.transfers);
}

fn print_revocation(receipt: &RevocationReceipt) {
    println!(
        "OK: type {} revoked for {} (released {})",
        receipt.attribute_type, receipt.subject, receipt.released
    );
    print_transfers(&receipt.transfers);
}

pub fn run(state: &Path, args: AttributeArgs) -> Result<()> {
    match args.command {
        AttributeCommand::Issue {
            caller,
            subject,
            type_id,
            value,
            funds,
        } => {
            let mut registry = store::load(state)?;
            let ctx = CallContext::new(caller).with_value(funds);
            let receipt = registry.issue_attribute(&ctx, subject, type_id, value)?;
            store::save(state, &registry)?;
            print_issuance(&receipt);
        }
        AttributeCommand::Add {
            caller,
            funds,
            approval,
        } => {
            let signed = signing::read_envelope(&approval)?;
            let mut registry = store::load(state)?;
            let ctx = CallContext::new(caller).with_value(funds);
            let receipt = registry.add_attribute(&ctx, &signed)?;
            store::save(state, &registry)?;
            print_issuance(&receipt);
        }
        AttributeCommand::AddFor {
            caller,
            funds,
            approval,
        } => {
            let signed = signing::read_envelope(&approval)?;
            let mut registry = store::load(state)?;
            let ctx = CallContext::new(caller).with_value(funds);
            let receipt = registry.add_attribute_for(&ctx, &signed)?;
            store::save(state, &registry)?;
            print_issuance(&receipt);
        }
        AttributeCommand::Revoke {
            caller,
            subject,
            type_id,
            fee_rate,
        } => {
            let mut registry = store::load(state)?;
            let ctx = CallContext::new(caller).with_fee_rate(fee_rate);
            let receipt = registry.revoke_attribute(&ctx, subject, type_id)?;
            store::save(state, &registry)?;
            print_revocation(&receipt);
        }
        AttributeCommand::Remove {
            caller,
            type_id,
            fee_rate,
        } => {
            let mut registry = store::load(state)?;
            let ctx = CallContext::new(caller).with_fee_rate(fee_rate);
            let receipt = registry.remove_attribute(&ctx, type_id)?;
            store::save(state, &registry)?;
            print_revocation(&receipt);
        }
        AttributeCommand::RemoveFor {
            caller,
            subject,
            type_id,
            fee_rate,
        } => {
            let mut registry = store::load(state)?;
            let ctx = CallContext::new(caller).with_fee_rate(fee_rate);
            let receipt = registry.remove_attribute_for(&ctx, subject, type_id)?;
            store::save(state, &registry)?;
            print_revocation(&receipt);
        }
        AttributeCommand::Query {
            subject,
            type_id,
            attach,
        } => {
            let mut registry = store::load(state)?;
            for path in &attach {
                let source = store::load(path)?;
                let address = source.address();
                tracing::info!(registry = %address, path = %path.display(), "attached secondary source");
                registry.attach_source(address, Arc::new(source));
            }
            if registry.has_attribute(subject, type_id) {
                match registry.attribute_value(subject, type_id) {
                    Some(value) => println!("present value={value}"),
                    None => println!("present"),
                }
            } else {
                println!("absent");
            }
        }
        AttributeCommand::Show { subject, type_id } => {
            let registry = store::load(state)?;
            let Some(record) = registry.attribute_record(subject, type_id) else {
                bail!("no record of type {type_id} for {subject}");
            };
            println!("{}", serde_json::to_string_pretty(record)?);
        }
    }
    Ok(())
}
