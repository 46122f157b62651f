mod address;
mod gas;
mod wei;

pub use address::{Address, AddressError};
pub use gas::EthGas;
pub use wei::{Wei, ZERO_WEI};
