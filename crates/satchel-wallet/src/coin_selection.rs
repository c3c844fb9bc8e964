//! First-fit coin selection.
//!
//! UTXOs are consumed in the order the explorer listed them until the running
//! total covers the target. The result is the shortest prefix of the listing
//! that suffices, so the same listing always yields the same selection. No
//! attempt is made to minimize fees or change.

use tracing::debug;

use satchel_core::types::Utxo;

use crate::error::WalletError;

/// Default base fee in smallest units (fixed per transaction).
pub const DEFAULT_BASE_FEE: u64 = 1_000;

/// Default additional fee per input in smallest units.
pub const DEFAULT_FEE_PER_INPUT: u64 = 500;

/// Linear fee schedule: `base_fee + fee_per_input * inputs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub base_fee: u64,
    pub fee_per_input: u64,
}

impl FeePolicy {
    pub fn new(base_fee: u64, fee_per_input: u64) -> Self {
        Self {
            base_fee,
            fee_per_input,
        }
    }

    /// Fee for a transaction spending `inputs` outputs. `None` on overflow.
    pub fn fee_for(&self, inputs: usize) -> Option<u64> {
        self.fee_per_input
            .checked_mul(inputs as u64)?
            .checked_add(self.base_fee)
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_FEE, DEFAULT_FEE_PER_INPUT)
    }
}

/// Result of fee-aware selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected UTXOs, in listing order.
    pub selected: Vec<Utxo>,
    /// Total value of `selected`.
    pub total: u64,
    /// Fee for spending exactly `selected`.
    pub fee: u64,
}

impl CoinSelection {
    /// Value left over after `amount` and the fee.
    pub fn change(&self, amount: u64) -> Option<u64> {
        self.total.checked_sub(amount)?.checked_sub(self.fee)
    }
}

/// First-fit coin selector.
pub struct CoinSelector;

impl CoinSelector {
    /// Select the shortest listing-order prefix of `utxos` whose sum is at
    /// least `target`.
    ///
    /// A zero target selects nothing. Fails with
    /// [`WalletError::InsufficientFunds`] when the whole listing falls short.
    pub fn select(utxos: &[Utxo], target: u64) -> Result<Vec<Utxo>, WalletError> {
        let mut selected = Vec::new();
        let mut total: u64 = 0;

        for utxo in utxos {
            if total >= target {
                break;
            }
            total = total.saturating_add(utxo.value);
            selected.push(utxo.clone());
        }

        if total < target {
            return Err(WalletError::InsufficientFunds {
                have: total,
                need: target,
            });
        }

        debug!(inputs = selected.len(), total, target, "coins selected");
        Ok(selected)
    }

    /// Select the shortest listing-order prefix covering `amount` plus the
    /// fee for the inputs chosen so far.
    ///
    /// Each additional input raises the fee, so the requirement is
    /// re-evaluated after every step.
    pub fn select_for_payment(
        utxos: &[Utxo],
        amount: u64,
        policy: &FeePolicy,
    ) -> Result<CoinSelection, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount("amount must be non-zero".into()));
        }

        let mut selected = Vec::new();
        let mut total: u64 = 0;

        for utxo in utxos {
            selected.push(utxo.clone());
            total = total.saturating_add(utxo.value);

            let fee = Self::fee(policy, selected.len())?;
            if total >= amount.saturating_add(fee) {
                debug!(inputs = selected.len(), total, amount, fee, "coins selected");
                return Ok(CoinSelection {
                    selected,
                    total,
                    fee,
                });
            }
        }

        let fee = Self::fee(policy, selected.len().max(1))?;
        Err(WalletError::InsufficientFunds {
            have: total,
            need: amount.saturating_add(fee),
        })
    }

    fn fee(policy: &FeePolicy, inputs: usize) -> Result<u64, WalletError> {
        policy
            .fee_for(inputs)
            .ok_or_else(|| WalletError::InvalidAmount("fee overflow".into()))
    }
}
