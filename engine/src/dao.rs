//! The DAO-fork irregular state change.

use hearth_engine_evm::JournaledState;
use hearth_engine_types::types::{Address, Wei};

/// The refund contract every drained balance moves to.
#[must_use]
pub fn dao_hardfork_beneficiary() -> Address {
    Address::decode("bf4ed7b27f1d666546e30d74d50d173d20bca754").unwrap_or_else(|_e| Address::zero())
}

/// Applies the irregular state change at the DAO fork block: the balances of
/// every account on the drain list move to the withdrawal contract. The
/// mainnet drain list (the DAO and its child DAOs) is chain-configuration
/// data, supplied by the caller.
pub fn apply_dao_fork(state: &mut JournaledState, drain_list: &[Address], beneficiary: Address) {
    let mut drained = Wei::zero();
    for address in drain_list {
        let balance = state.balance(address);
        if !balance.is_zero() {
            state.set_balance(*address, Wei::zero());
            drained = drained.saturating_add(balance);
        }
    }
    let credited = state.balance(&beneficiary).saturating_add(drained);
    state.set_balance(beneficiary, credited);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_moves_every_balance() {
        let mut state = JournaledState::new();
        let a = Address::from_array([1; 20]);
        let b = Address::from_array([2; 20]);
        state.set_balance(a, Wei::new_u64(10));
        state.set_balance(b, Wei::new_u64(5));

        let beneficiary = dao_hardfork_beneficiary();
        apply_dao_fork(&mut state, &[a, b], beneficiary);

        assert!(state.balance(&a).is_zero());
        assert!(state.balance(&b).is_zero());
        assert_eq!(state.balance(&beneficiary), Wei::new_u64(15));
    }

    #[test]
    fn test_beneficiary_constant() {
        assert_eq!(
            dao_hardfork_beneficiary().encode(),
            "bf4ed7b27f1d666546e30d74d50d173d20bca754"
        );
    }
}
