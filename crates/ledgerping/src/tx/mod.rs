//! Probe transaction construction and signing.

pub use solana_sdk::hash::Hash;
pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::{Keypair, Signature, Signer};
pub use solana_sdk::transaction::Transaction;

use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::{pubkey, system_instruction};

use crate::cluster::ProbeMode;
use crate::config::WorkerConfig;
use crate::error::ProbeError;

/// SPL memo program
pub const MEMO_PROGRAM_ID: Pubkey = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

/// Memo text attached to memo probes
pub const PING_MEMO: &[u8] = b"ping";

/// Amount moved by transfer probes
pub const PING_LAMPORTS: u64 = 1;

/// Instructions for one probe of the given mode
pub fn probe_instructions(
    mode: ProbeMode,
    fee_payer: &Pubkey,
    config: &WorkerConfig,
) -> Result<Vec<Instruction>, ProbeError> {
    match mode {
        ProbeMode::Transfer => {
            let receiver = match config.receiver.as_deref().map(str::trim) {
                Some(receiver) if !receiver.is_empty() => receiver
                    .parse::<Pubkey>()
                    .map_err(|e| ProbeError::Submission(format!("invalid receiver {receiver}: {e}")))?,
                _ => *fee_payer,
            };
            Ok(vec![system_instruction::transfer(fee_payer, &receiver, PING_LAMPORTS)])
        }
        ProbeMode::Memo => {
            let mut instructions = Vec::with_capacity(3);
            if let Some(units) = config.request_units.filter(|units| *units > 0) {
                instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(units));
            }
            if let Some(price) = config.compute_unit_price.filter(|price| *price > 0) {
                instructions.push(ComputeBudgetInstruction::set_compute_unit_price(price));
            }
            instructions.push(Instruction::new_with_bytes(MEMO_PROGRAM_ID, PING_MEMO, Vec::new()));
            Ok(instructions)
        }
    }
}

/// Build and sign one probe transaction
pub fn build_probe_transaction(
    mode: ProbeMode,
    fee_payer: &Keypair,
    config: &WorkerConfig,
    recent_blockhash: Hash,
) -> Result<Transaction, ProbeError> {
    let payer = fee_payer.pubkey();
    let instructions = probe_instructions(mode, &payer, config)?;
    Ok(Transaction::new_signed_with_payer(&instructions, Some(&payer), &[fee_payer], recent_blockhash))
}
