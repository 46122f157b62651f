//! Journaled world state.
//!
//! All mutations funnel through methods that first push a pre-image entry onto
//! the journal; `revert_to` replays the journal backwards (LIFO) to a
//! checkpoint, `commit` simply forgets the checkpoint. Account deletion
//! (self-destructs, EIP-161 sweeps) is deferred to transaction finalization,
//! so during execution a self-destructed contract still has its code and
//! storage.

use crate::error::ExitError;
use hearth_engine_trie::{sec_trie_root, Trie};
use hearth_engine_types::account::{Account, EMPTY_CODE_HASH, EMPTY_ROOT};
use hearth_engine_types::log::Log;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::{keccak256, H256, U256};
use std::collections::{BTreeMap, BTreeSet};

/// One account held in memory: the trie commitment fields plus the live code
/// and storage they commit to.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: Wei,
    pub code: Vec<u8>,
    pub storage: BTreeMap<H256, H256>,
}

impl AccountState {
    /// The EIP-161 emptiness predicate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }
}

/// A reversible mutation, recorded before the mutation is applied.
#[derive(Debug, Clone)]
enum JournalEntry {
    AccountCreated(Address),
    BalanceChange(Address, Wei),
    NonceChange(Address, u64),
    CodeChange(Address, Vec<u8>),
    StorageChange(Address, H256, Option<H256>),
    TransientChange(Address, H256, H256),
    AddressWarmed(Address),
    SlotWarmed(Address, H256),
    Touched(Address),
    Created(Address),
    SelfDestructRecorded(Address),
    LogEmitted,
    RefundChange(i64),
}

/// A position in the journal that execution can roll back to.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint(usize);

#[derive(Debug, Default)]
pub struct JournaledState {
    accounts: BTreeMap<Address, AccountState>,
    transient: BTreeMap<(Address, H256), H256>,
    warm_addresses: BTreeSet<Address>,
    warm_slots: BTreeSet<(Address, H256)>,
    touched: BTreeSet<Address>,
    created: BTreeSet<Address>,
    selfdestructs: BTreeSet<Address>,
    logs: Vec<Log>,
    refund: i64,
    /// Value each written slot had when the current transaction began.
    original_storage: BTreeMap<(Address, H256), H256>,
    journal: Vec<JournalEntry>,
}

impl JournaledState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the state from a flat pre-allocation.
    #[must_use]
    pub fn from_accounts(accounts: BTreeMap<Address, AccountState>) -> Self {
        Self {
            accounts,
            ..Self::default()
        }
    }

    // ----- reads ------------------------------------------------------------

    #[must_use]
    pub fn exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// Dead means nonexistent, or empty under EIP-161.
    #[must_use]
    pub fn is_dead(&self, address: &Address) -> bool {
        self.accounts.get(address).map_or(true, AccountState::is_empty)
    }

    #[must_use]
    pub fn get_account(&self, address: &Address) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    #[must_use]
    pub fn balance(&self, address: &Address) -> Wei {
        self.accounts
            .get(address)
            .map_or_else(Wei::zero, |a| a.balance)
    }

    #[must_use]
    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.nonce)
    }

    #[must_use]
    pub fn code(&self, address: &Address) -> &[u8] {
        self.accounts.get(address).map_or(&[], |a| a.code.as_slice())
    }

    /// `EXTCODEHASH` semantics: zero for dead accounts, `keccak(code)`
    /// otherwise.
    #[must_use]
    pub fn code_hash(&self, address: &Address) -> H256 {
        if self.is_dead(address) {
            H256::zero()
        } else {
            keccak256(self.code(address))
        }
    }

    #[must_use]
    pub fn storage(&self, address: &Address, key: &H256) -> H256 {
        self.accounts
            .get(address)
            .and_then(|a| a.storage.get(key).copied())
            .unwrap_or_default()
    }

    /// The slot value at the start of the current transaction.
    #[must_use]
    pub fn original_storage(&self, address: &Address, key: &H256) -> H256 {
        self.original_storage
            .get(&(*address, *key))
            .copied()
            .unwrap_or_else(|| self.storage(address, key))
    }

    #[must_use]
    pub fn transient_storage(&self, address: &Address, key: &H256) -> H256 {
        self.transient
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    #[must_use]
    pub fn refund(&self) -> i64 {
        self.refund
    }

    #[must_use]
    pub fn was_created_in_tx(&self, address: &Address) -> bool {
        self.created.contains(address)
    }

    #[must_use]
    pub fn is_marked_selfdestruct(&self, address: &Address) -> bool {
        self.selfdestructs.contains(address)
    }

    #[must_use]
    pub fn accounts(&self) -> &BTreeMap<Address, AccountState> {
        &self.accounts
    }

    // ----- writes -----------------------------------------------------------

    fn account_mut(&mut self, address: Address) -> &mut AccountState {
        if !self.accounts.contains_key(&address) {
            self.journal.push(JournalEntry::AccountCreated(address));
            self.accounts.insert(address, AccountState::default());
        }
        self.accounts.get_mut(&address).expect("entry just ensured")
    }

    /// Inserts an account without journaling. Only for pre-state setup.
    pub fn insert_account(&mut self, address: Address, account: AccountState) {
        self.accounts.insert(address, account);
    }

    /// Removes an account without journaling. Only for end-of-transaction
    /// sweeps, which are never rolled back.
    pub fn remove_account(&mut self, address: &Address) {
        self.accounts.remove(address);
    }

    pub fn set_balance(&mut self, address: Address, balance: Wei) {
        let old = self.balance(&address);
        self.journal.push(JournalEntry::BalanceChange(address, old));
        self.account_mut(address).balance = balance;
    }

    pub fn add_balance(&mut self, address: Address, amount: Wei) {
        if amount.is_zero() && !self.exists(&address) {
            // A zero credit must not conjure an account into existence.
            return;
        }
        let new_balance = self.balance(&address).saturating_add(amount);
        self.set_balance(address, new_balance);
    }

    pub fn sub_balance(&mut self, address: Address, amount: Wei) -> Result<(), ExitError> {
        let new_balance = self
            .balance(&address)
            .checked_sub(amount)
            .ok_or(ExitError::InsufficientBalance)?;
        self.set_balance(address, new_balance);
        Ok(())
    }

    /// Moves `value` between accounts, touching the target.
    pub fn transfer(&mut self, from: Address, to: Address, value: Wei) -> Result<(), ExitError> {
        self.touch(to);
        if value.is_zero() {
            return Ok(());
        }
        self.sub_balance(from, value)?;
        self.add_balance(to, value);
        Ok(())
    }

    pub fn inc_nonce(&mut self, address: Address) {
        let old = self.nonce(&address);
        self.journal.push(JournalEntry::NonceChange(address, old));
        self.account_mut(address).nonce = old + 1;
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        let old = self.nonce(&address);
        self.journal.push(JournalEntry::NonceChange(address, old));
        self.account_mut(address).nonce = nonce;
    }

    pub fn set_code(&mut self, address: Address, code: Vec<u8>) {
        let old = self.code(&address).to_vec();
        self.journal.push(JournalEntry::CodeChange(address, old));
        self.account_mut(address).code = code;
    }

    pub fn set_storage(&mut self, address: Address, key: H256, value: H256) {
        let current = self.storage(&address, &key);
        self.original_storage
            .entry((address, key))
            .or_insert(current);

        let had = self
            .accounts
            .get(&address)
            .and_then(|a| a.storage.get(&key).copied());
        self.journal
            .push(JournalEntry::StorageChange(address, key, had));

        let account = self.account_mut(address);
        if value.is_zero() {
            account.storage.remove(&key);
        } else {
            account.storage.insert(key, value);
        }
    }

    pub fn set_transient_storage(&mut self, address: Address, key: H256, value: H256) {
        let old = self.transient_storage(&address, &key);
        self.journal
            .push(JournalEntry::TransientChange(address, key, old));
        if value.is_zero() {
            self.transient.remove(&(address, key));
        } else {
            self.transient.insert((address, key), value);
        }
    }

    /// Marks an address warm; returns whether it was cold before.
    pub fn access_address(&mut self, address: Address) -> bool {
        let cold = self.warm_addresses.insert(address);
        if cold {
            self.journal.push(JournalEntry::AddressWarmed(address));
        }
        cold
    }

    /// Marks a storage slot warm; returns whether it was cold before.
    pub fn access_slot(&mut self, address: Address, key: H256) -> bool {
        let cold = self.warm_slots.insert((address, key));
        if cold {
            self.journal.push(JournalEntry::SlotWarmed(address, key));
        }
        cold
    }

    /// Pre-warms an entry without journaling; used for the transaction-level
    /// access list, which never rolls back.
    pub fn warm_unconditionally(&mut self, address: Address, keys: &[H256]) {
        self.warm_addresses.insert(address);
        for key in keys {
            self.warm_slots.insert((address, *key));
        }
    }

    pub fn touch(&mut self, address: Address) {
        if self.touched.insert(address) {
            self.journal.push(JournalEntry::Touched(address));
        }
    }

    pub fn mark_created(&mut self, address: Address) {
        if self.created.insert(address) {
            self.journal.push(JournalEntry::Created(address));
        }
    }

    pub fn record_selfdestruct(&mut self, address: Address) {
        if self.selfdestructs.insert(address) {
            self.journal
                .push(JournalEntry::SelfDestructRecorded(address));
        }
    }

    pub fn log(&mut self, log: Log) {
        self.journal.push(JournalEntry::LogEmitted);
        self.logs.push(log);
    }

    pub fn add_refund(&mut self, amount: i64) {
        self.journal.push(JournalEntry::RefundChange(self.refund));
        self.refund += amount;
    }

    // ----- checkpoints ------------------------------------------------------

    #[must_use]
    pub fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    pub fn commit(&mut self, _checkpoint: Checkpoint) {
        // Entries below the checkpoint become part of the parent's view;
        // nothing to do.
    }

    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let entry = self.journal.pop().expect("length checked above");
            match entry {
                JournalEntry::AccountCreated(address) => {
                    self.accounts.remove(&address);
                }
                JournalEntry::BalanceChange(address, old) => {
                    if let Some(account) = self.accounts.get_mut(&address) {
                        account.balance = old;
                    }
                }
                JournalEntry::NonceChange(address, old) => {
                    if let Some(account) = self.accounts.get_mut(&address) {
                        account.nonce = old;
                    }
                }
                JournalEntry::CodeChange(address, old) => {
                    if let Some(account) = self.accounts.get_mut(&address) {
                        account.code = old;
                    }
                }
                JournalEntry::StorageChange(address, key, had) => {
                    if let Some(account) = self.accounts.get_mut(&address) {
                        match had {
                            Some(old) => {
                                account.storage.insert(key, old);
                            }
                            None => {
                                account.storage.remove(&key);
                            }
                        }
                    }
                }
                JournalEntry::TransientChange(address, key, old) => {
                    if old.is_zero() {
                        self.transient.remove(&(address, key));
                    } else {
                        self.transient.insert((address, key), old);
                    }
                }
                JournalEntry::AddressWarmed(address) => {
                    self.warm_addresses.remove(&address);
                }
                JournalEntry::SlotWarmed(address, key) => {
                    self.warm_slots.remove(&(address, key));
                }
                JournalEntry::Touched(address) => {
                    self.touched.remove(&address);
                }
                JournalEntry::Created(address) => {
                    self.created.remove(&address);
                }
                JournalEntry::SelfDestructRecorded(address) => {
                    self.selfdestructs.remove(&address);
                }
                JournalEntry::LogEmitted => {
                    self.logs.pop();
                }
                JournalEntry::RefundChange(old) => {
                    self.refund = old;
                }
            }
        }
    }

    // ----- transaction finalization ----------------------------------------

    /// Deletes self-destructed accounts. The opcode handler only records
    /// addresses whose deletion is actually due under the active fork.
    pub fn finalize_selfdestructs(&mut self) {
        let addresses: Vec<Address> = self.selfdestructs.iter().copied().collect();
        for address in addresses {
            self.accounts.remove(&address);
        }
        self.selfdestructs.clear();
    }

    /// The EIP-161 sweep: touched empty accounts are deleted.
    pub fn remove_touched_empty_accounts(&mut self) {
        let addresses: Vec<Address> = self.touched.iter().copied().collect();
        for address in addresses {
            if self
                .accounts
                .get(&address)
                .is_some_and(AccountState::is_empty)
            {
                self.accounts.remove(&address);
            }
        }
    }

    /// Clears per-transaction substate. Warm sets, touches, logs, and refunds
    /// carry between frames but never between transactions.
    pub fn clear_transaction_substate(&mut self) {
        self.transient.clear();
        self.warm_addresses.clear();
        self.warm_slots.clear();
        self.touched.clear();
        self.created.clear();
        self.selfdestructs.clear();
        self.logs.clear();
        self.refund = 0;
        self.original_storage.clear();
        self.journal.clear();
    }

    /// Drains the accumulated logs.
    pub fn take_logs(&mut self) -> Vec<Log> {
        core::mem::take(&mut self.logs)
    }

    // ----- commitments ------------------------------------------------------

    #[must_use]
    pub fn storage_root(&self, address: &Address) -> H256 {
        self.accounts
            .get(address)
            .map_or(EMPTY_ROOT, |account| storage_root(&account.storage))
    }

    #[must_use]
    pub fn state_root(&self) -> H256 {
        let mut trie = Trie::new();
        for (address, account) in &self.accounts {
            let committed = Account {
                nonce: account.nonce,
                balance: account.balance,
                storage_root: storage_root(&account.storage),
                code_hash: if account.code.is_empty() {
                    EMPTY_CODE_HASH
                } else {
                    keccak256(&account.code)
                },
            };
            trie.insert(
                keccak256(address.as_bytes()).as_bytes(),
                rlp::encode(&committed).to_vec(),
            );
        }
        trie.root()
    }
}

fn storage_root(storage: &BTreeMap<H256, H256>) -> H256 {
    sec_trie_root(storage.iter().filter_map(|(key, value)| {
        if value.is_zero() {
            None
        } else {
            let trimmed = U256::from_big_endian(value.as_bytes());
            Some((key.as_bytes().to_vec(), rlp::encode(&trimmed).to_vec()))
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_array([n; 20])
    }

    #[test]
    fn test_rollback_restores_balances_and_storage() {
        let mut state = JournaledState::new();
        state.insert_account(
            addr(1),
            AccountState {
                balance: Wei::new_u64(100),
                ..Default::default()
            },
        );

        let checkpoint = state.checkpoint();
        state.transfer(addr(1), addr(2), Wei::new_u64(40)).unwrap();
        state.set_storage(addr(1), H256::repeat_byte(1), H256::repeat_byte(9));
        assert_eq!(state.balance(&addr(2)), Wei::new_u64(40));

        state.revert_to(checkpoint);
        assert_eq!(state.balance(&addr(1)), Wei::new_u64(100));
        assert!(!state.exists(&addr(2)));
        assert_eq!(state.storage(&addr(1), &H256::repeat_byte(1)), H256::zero());
    }

    #[test]
    fn test_nested_checkpoints_commit_inner() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), AccountState::default());

        let outer = state.checkpoint();
        state.set_nonce(addr(1), 5);
        let inner = state.checkpoint();
        state.set_nonce(addr(1), 9);
        state.commit(inner);
        assert_eq!(state.nonce(&addr(1)), 9);

        state.revert_to(outer);
        assert_eq!(state.nonce(&addr(1)), 0);
    }

    #[test]
    fn test_warm_sets_roll_back() {
        let mut state = JournaledState::new();
        let checkpoint = state.checkpoint();
        assert!(state.access_address(addr(3)));
        assert!(!state.access_address(addr(3)));
        state.revert_to(checkpoint);
        assert!(state.access_address(addr(3)));
    }

    #[test]
    fn test_original_storage_is_per_transaction() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), AccountState::default());
        let key = H256::repeat_byte(7);

        state.set_storage(addr(1), key, H256::repeat_byte(1));
        state.set_storage(addr(1), key, H256::repeat_byte(2));
        assert_eq!(state.original_storage(&addr(1), &key), H256::zero());

        state.clear_transaction_substate();
        assert_eq!(state.original_storage(&addr(1), &key), H256::repeat_byte(2));
    }

    #[test]
    fn test_zero_credit_does_not_create_account() {
        let mut state = JournaledState::new();
        state.add_balance(addr(9), Wei::zero());
        assert!(!state.exists(&addr(9)));
    }

    #[test]
    fn test_state_root_changes_with_content() {
        let mut state = JournaledState::new();
        let empty_root = state.state_root();
        state.insert_account(
            addr(1),
            AccountState {
                balance: Wei::new_u64(1),
                ..Default::default()
            },
        );
        assert_ne!(state.state_root(), empty_root);
        assert_eq!(state.storage_root(&addr(1)), EMPTY_ROOT);
    }

    #[test]
    fn test_eip161_sweep_removes_touched_empty() {
        let mut state = JournaledState::new();
        state.insert_account(addr(1), AccountState::default());
        state.insert_account(
            addr(2),
            AccountState {
                nonce: 1,
                ..Default::default()
            },
        );
        state.touch(addr(1));
        state.touch(addr(2));
        state.remove_touched_empty_accounts();
        assert!(!state.exists(&addr(1)));
        assert!(state.exists(&addr(2)));
    }
}
