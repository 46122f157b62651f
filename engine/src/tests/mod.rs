mod sanity;
mod state_transition;

use hearth_engine_transactions::eip_1559::{SignedTransaction1559, Transaction1559};
use hearth_engine_transactions::eip_4844::{SignedTransaction4844, Transaction4844};
use hearth_engine_transactions::legacy::{LegacyEthSignedTransaction, TransactionLegacy};
use hearth_engine_types::types::Address;
use hearth_engine_types::{keccak256, H256, U256};
use rlp::RlpStream;

/// The well-known test secret key used throughout the ethereum test suites.
pub const TEST_SECRET: [u8; 32] = [
    0x45, 0xa9, 0x15, 0xe4, 0xd0, 0x60, 0x14, 0x9e, 0xb4, 0x36, 0x59, 0x60, 0xe6, 0xa7, 0xa4,
    0x5f, 0x33, 0x43, 0x93, 0x09, 0x30, 0x61, 0x11, 0x6b, 0x19, 0x7e, 0x32, 0x40, 0x06, 0x5f,
    0xf2, 0xd8,
];

pub fn test_address() -> Address {
    let secret = libsecp256k1::SecretKey::parse(&TEST_SECRET).unwrap();
    let public = libsecp256k1::PublicKey::from_secret_key(&secret);
    let hash = keccak256(&public.serialize()[1..]);
    Address::try_from_slice(&hash[12..]).unwrap()
}

fn sign_hash(hash: H256) -> (u8, U256, U256) {
    let secret = libsecp256k1::SecretKey::parse(&TEST_SECRET).unwrap();
    let message = libsecp256k1::Message::parse(hash.as_fixed_bytes());
    let (signature, recovery_id) = libsecp256k1::sign(&message, &secret);
    let serialized = signature.serialize();
    (
        recovery_id.serialize(),
        U256::from_big_endian(&serialized[..32]),
        U256::from_big_endian(&serialized[32..]),
    )
}

pub fn sign_legacy(
    transaction: TransactionLegacy,
    chain_id: Option<u64>,
) -> LegacyEthSignedTransaction {
    let mut stream = RlpStream::new();
    transaction.rlp_append_unsigned(&mut stream, chain_id);
    let (recovery_id, r, s) = sign_hash(keccak256(stream.as_raw()));
    let v = match chain_id {
        None => 27 + u64::from(recovery_id),
        Some(id) => 35 + 2 * id + u64::from(recovery_id),
    };
    LegacyEthSignedTransaction {
        transaction,
        v,
        r,
        s,
    }
}

pub fn sign_eip1559(transaction: Transaction1559) -> SignedTransaction1559 {
    let mut stream = RlpStream::new();
    stream.append(&hearth_engine_transactions::eip_1559::TYPE_BYTE);
    transaction.rlp_append_unsigned(&mut stream);
    let (parity, r, s) = sign_hash(keccak256(stream.as_raw()));
    SignedTransaction1559 {
        transaction,
        parity,
        r,
        s,
    }
}

pub fn sign_eip4844(transaction: Transaction4844) -> SignedTransaction4844 {
    let mut stream = RlpStream::new();
    stream.append(&hearth_engine_transactions::eip_4844::TYPE_BYTE);
    transaction.rlp_append_unsigned(&mut stream);
    let (parity, r, s) = sign_hash(keccak256(stream.as_raw()));
    SignedTransaction4844 {
        transaction,
        parity,
        r,
        s,
    }
}
