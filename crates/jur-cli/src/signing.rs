//! # `approval-sign` Subcommand
//!
//! Off-line signing of approval envelopes. A validator signs the seven
//! approval fields with its key file; the resulting JSON envelope is
//! handed to the subject or operator, who consumes it with
//! `attribute add` / `attribute add-for`. No registry state is touched
//! here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use jur_core::{Address, Amount, AttributeTypeId, AttributeValue};
use jur_crypto::{ApprovalMessage, SignedApproval};

use crate::keys;

#[derive(Args, Debug)]
pub struct SignApprovalArgs {
    /// Key file produced by `jur key generate`.
    #[arg(long)]
    pub key_file: PathBuf,
    /// Address of the registry the approval is bound to.
    #[arg(long)]
    pub registry: Address,
    /// Subject the attribute is for.
    #[arg(long)]
    pub subject: Address,
    /// Operator allowed to submit it; omit for subject self-issuance.
    #[arg(long)]
    pub operator: Option<Address>,
    /// Exact funds the consumer must attach.
    #[arg(long)]
    pub funds_required: Amount,
    /// The signing validator's fee, paid out of the funds.
    #[arg(long, default_value = "0")]
    pub validator_fee: Amount,
    #[arg(long)]
    pub type_id: AttributeTypeId,
    #[arg(long)]
    pub value: AttributeValue,
    /// Write the envelope here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: SignApprovalArgs) -> Result<()> {
    let keys = keys::load_keypair(&args.key_file)?;
    let message = ApprovalMessage {
        registry: args.registry,
        subject: args.subject,
        operator: args.operator.unwrap_or(Address::ZERO),
        funds_required: args.funds_required,
        validator_fee: args.validator_fee,
        attribute_type_id: args.type_id,
        value: args.value,
    };
    let signed = SignedApproval::sign(message, &keys)?;
    let digest = signed.message.digest()?;

    let mut envelope = serde_json::to_string_pretty(&signed)?;
    envelope.push('\n');
    match &args.out {
        Some(path) => {
            fs::write(path, envelope)
                .with_context(|| format!("writing approval envelope {}", path.display()))?;
            println!("OK: approval {digest} signed by {}", keys.address());
        }
        None => print!("{envelope}"),
    }
    Ok(())
}

pub fn read_envelope(path: &Path) -> Result<SignedApproval> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading approval envelope {}", path.display()))?;
    let signed = serde_json::from_str(&data)
        .with_context(|| format!("parsing approval envelope {}", path.display()))?;
    Ok(signed)
}
