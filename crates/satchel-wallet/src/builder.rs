//! Unsigned transaction assembly.
//!
//! Outputs are always laid out in the same order:
//! 1. the recipient, paid exactly `amount`
//! 2. an optional zero-value data output
//! 3. change back to the sender, emitted even when it is zero
//!
//! Inputs keep the order of the selection they were built from.

use tracing::debug;

use satchel_core::address::{Address, Network};
use satchel_core::constants::{MAX_DATA_PAYLOAD, TX_VERSION};
use satchel_core::error::TransactionError;
use satchel_core::types::{self, Transaction, TxInput, TxOutput, Utxo};

use crate::coin_selection::{CoinSelector, FeePolicy};
use crate::error::WalletError;

/// A transaction with empty unlocking data, ready for [`Signer`](crate::signer::Signer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub(crate) tx: Transaction,
    pub(crate) inputs: Vec<Utxo>,
    pub(crate) amount: u64,
    pub(crate) fee: u64,
    pub(crate) change: u64,
}

impl UnsignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// The UTXOs being spent, in input order.
    pub fn inputs(&self) -> &[Utxo] {
        &self.inputs
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn change(&self) -> u64 {
        self.change
    }

    /// Sum of the spent UTXO values.
    pub fn input_total(&self) -> u64 {
        // Overflow was rejected at build time.
        types::total_value(&self.inputs).unwrap_or(u64::MAX)
    }
}

/// Builder for payment transactions.
///
/// # Example
/// ```ignore
/// let unsigned = TransactionBuilder::new()
///     .set_fee_policy(policy)
///     .build(&selected, &recipient, 3_000, &change_address, None)?;
/// let signed = Signer::sign(unsigned, &key)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    fee_policy: FeePolicy,
}

impl TransactionBuilder {
    /// Create a builder with the default fee policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fee_policy(&mut self, policy: FeePolicy) -> &mut Self {
        self.fee_policy = policy;
        self
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fee_policy
    }

    /// Build an unsigned transaction spending exactly `selected`.
    ///
    /// Fails with [`WalletError::InvalidAmount`] for a zero amount,
    /// [`WalletError::InvalidRecipient`] when the recipient is on another
    /// network than the change address, [`WalletError::DataTooLarge`] for an
    /// oversized payload, and [`WalletError::InsufficientFunds`] when the
    /// inputs do not cover `amount` plus the fee.
    pub fn build(
        &self,
        selected: &[Utxo],
        recipient: &Address,
        amount: u64,
        change_address: &Address,
        data: Option<&[u8]>,
    ) -> Result<UnsignedTransaction, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount("amount must be non-zero".into()));
        }

        if recipient.network() != change_address.network() {
            return Err(WalletError::InvalidRecipient(format!(
                "{recipient} is a {} address, wallet is on {}",
                recipient.network(),
                change_address.network()
            )));
        }

        let data_len = data.map_or(0, <[u8]>::len);
        if data_len > MAX_DATA_PAYLOAD {
            return Err(WalletError::DataTooLarge {
                size: data_len,
                max: MAX_DATA_PAYLOAD,
            });
        }

        let total = types::total_value(selected).ok_or(TransactionError::ValueOverflow)?;
        let fee = self
            .fee_policy
            .fee_for(selected.len())
            .ok_or_else(|| WalletError::InvalidAmount("fee overflow".into()))?;
        let need = amount
            .checked_add(fee)
            .ok_or_else(|| WalletError::InvalidAmount("amount plus fee overflows".into()))?;

        if selected.is_empty() || total < need {
            return Err(WalletError::InsufficientFunds { have: total, need });
        }
        let change = total - need;

        let inputs = selected
            .iter()
            .map(|u| TxInput::unsigned(u.outpoint.clone()))
            .collect::<Vec<_>>();

        let mut outputs = Vec::with_capacity(3);
        outputs.push(TxOutput::to_address(recipient, amount));
        if let Some(payload) = data {
            outputs.push(TxOutput::data(payload.to_vec()));
        }
        outputs.push(TxOutput::to_address(change_address, change));

        let tx = Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: 0,
        };

        debug!(
            inputs = selected.len(),
            amount,
            fee,
            change,
            data = data_len,
            "built unsigned transaction"
        );

        Ok(UnsignedTransaction {
            tx,
            inputs: selected.to_vec(),
            amount,
            fee,
            change,
        })
    }

    /// Select coins from `utxos` with this builder's fee policy, then build.
    pub fn build_payment(
        &self,
        utxos: &[Utxo],
        recipient: &Address,
        amount: u64,
        change_address: &Address,
        data: Option<&[u8]>,
    ) -> Result<UnsignedTransaction, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount("amount must be non-zero".into()));
        }
        let selection = CoinSelector::select_for_payment(utxos, amount, &self.fee_policy)?;
        self.build(&selection.selected, recipient, amount, change_address, data)
    }
}

/// Parse a recipient address and require it to be on `network`.
pub fn parse_recipient(text: &str, network: Network) -> Result<Address, WalletError> {
    let address: Address = text
        .trim()
        .parse()
        .map_err(|e| WalletError::InvalidRecipient(format!("{text}: {e}")))?;
    if address.network() != network {
        return Err(WalletError::InvalidRecipient(format!(
            "{text} is a {} address, expected {network}",
            address.network()
        )));
    }
    Ok(address)
}
