//! Contract address derivation for CREATE and CREATE2.

use evm_core::word::word_to_bytes;
use evm_core::{Address, Word};
use sha3::{Digest, Keccak256};

/// `keccak256(rlp([sender, nonce]))[12..]`
pub fn create_address(sender: Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(30);
    payload.push(0x80 + 20);
    payload.extend_from_slice(sender.as_bytes());
    match nonce {
        0 => payload.push(0x80),
        n if n < 0x80 => payload.push(n as u8),
        n => {
            let bytes = n.to_be_bytes();
            let skip = (n.leading_zeros() / 8) as usize;
            payload.push(0x80 + (8 - skip) as u8);
            payload.extend_from_slice(&bytes[skip..]);
        }
    }
    let mut rlp = Vec::with_capacity(payload.len() + 1);
    rlp.push(0xc0 + payload.len() as u8);
    rlp.extend_from_slice(&payload);
    Address::from_slice(&Keccak256::digest(&rlp)[12..])
}

/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`
pub fn create2_address(sender: Address, salt: Word, init_code: &[u8]) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update([0xffu8]);
    hasher.update(sender.as_bytes());
    hasher.update(word_to_bytes(salt));
    hasher.update(Keccak256::digest(init_code));
    Address::from_slice(&hasher.finalize()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn create_addresses_follow_nonce() {
        let sender = Address::from(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            create_address(sender, 0),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            create_address(sender, 1),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
        assert_eq!(
            create_address(sender, 2),
            Address::from(hex!("f778b86fa74e846c4f0a1fbd1335fe81c00a0c91"))
        );
    }

    #[test]
    fn large_nonces_encode_without_panicking() {
        let sender = Address::repeat_byte(0x11);
        assert_ne!(create_address(sender, 0x80), create_address(sender, 0x7f));
        assert_ne!(create_address(sender, u64::MAX), create_address(sender, u64::MAX - 1));
    }

    #[test]
    fn create2_reference_vectors() {
        assert_eq!(
            create2_address(Address::zero(), Word::zero(), &[0x00]),
            Address::from(hex!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"))
        );
        assert_eq!(
            create2_address(
                Address::from(hex!("deadbeef00000000000000000000000000000000")),
                Word::zero(),
                &[0x00]
            ),
            Address::from(hex!("b928f69bb1d91cd65274e3c79d8986362984fda3"))
        );
    }
}
