use crate::error::ExitError;

/// Tracks the gas budget of one frame.
#[derive(Debug, Clone)]
pub struct Gasometer {
    gas_limit: u64,
    used: u64,
}

impl Gasometer {
    #[must_use]
    pub fn new(gas_limit: u64) -> Self {
        Self { gas_limit, used: 0 }
    }

    #[must_use]
    pub fn gas_left(&self) -> u64 {
        self.gas_limit - self.used
    }

    #[must_use]
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    #[must_use]
    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn record_cost(&mut self, cost: u64) -> Result<(), ExitError> {
        if self.gas_left() < cost {
            return Err(ExitError::OutOfGas);
        }
        self.used += cost;
        Ok(())
    }

    /// Hands back gas a child frame did not consume.
    pub fn return_gas(&mut self, gas: u64) {
        self.used = self.used.saturating_sub(gas);
    }

    /// Burns everything left; used when a frame exits with an exception.
    pub fn consume_all(&mut self) {
        self.used = self.gas_limit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_return() {
        let mut gas = Gasometer::new(100);
        gas.record_cost(60).unwrap();
        assert_eq!(gas.gas_left(), 40);
        gas.return_gas(10);
        assert_eq!(gas.gas_left(), 50);
        assert!(matches!(gas.record_cost(51), Err(ExitError::OutOfGas)));
        // A failed charge must not consume anything.
        assert_eq!(gas.gas_left(), 50);
    }

    #[test]
    fn test_consume_all() {
        let mut gas = Gasometer::new(100);
        gas.record_cost(1).unwrap();
        gas.consume_all();
        assert_eq!(gas.gas_left(), 0);
        assert_eq!(gas.used(), 100);
    }
}
