//! Fixed-offset ABI layouts for the four.meme launchpad contract.
//!
//! The launchpad speaks a small, stable binary dialect. Offsets and selector
//! values below are pinned against confirmed mainnet transactions; the unit
//! tests keep them honest. Changing any constant silently produces plausible
//! but wrong calldata, so decode/encode lives behind this one module.

use alloy::primitives::{address, b256, Address, B256, U256};
use thiserror::Error;

/// four.meme main contract (BSC mainnet).
pub const FOURMEME_CONTRACT: Address = address!("5c952063c7fc8610FFDB798152D69F0B9550762b");

/// `buyTokenAMAP(address,uint256,uint256)` - direct buy on the bonding curve.
pub const BUY_SELECTOR: [u8; 4] = [0x87, 0xf2, 0x76, 0x55];

/// `sellToken(address,uint256,uint256)` - direct sell on the bonding curve.
pub const SELL_SELECTOR: [u8; 4] = [0x3e, 0x11, 0x74, 0x1f];

/// `createAndBuy` - token creation combined with the creator's initial buy.
/// This is the only creation method whose calldata carries the CREATE2 salt
/// at a known offset, so it is the only one address prediction works for.
pub const CREATE_AND_BUY_SELECTOR: [u8; 4] = [0x51, 0x9e, 0xbb, 0x10];

/// All known token-creation entry points on the launchpad.
pub const CREATE_SELECTORS: [[u8; 4]; 3] = [
    CREATE_AND_BUY_SELECTOR,
    [0x47, 0xee, 0x97, 0xff],
    [0x81, 0x0c, 0x70, 0x5b],
];

/// topic0 of the TokenCreated event emitted on every launch.
pub const TOKEN_CREATED_TOPIC: B256 =
    b256!("396d5e902b675b032348d3d2e9517ee8f0c4a926603fbc075d3d282ff00cad20");

/// Word index of the CREATE2 salt inside createAndBuy calldata.
pub const CREATE_AND_BUY_SALT_WORD: usize = 5;

// ERC-20 / pancake-pair selectors used by the market-cap probe and the
// launchpad trade adapter.
pub const ERC20_BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
pub const ERC20_ALLOWANCE: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];
pub const ERC20_APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
pub const ERC20_DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
pub const FACTORY_GET_PAIR: [u8; 4] = [0xe6, 0xa4, 0x39, 0x05];
pub const PAIR_GET_RESERVES: [u8; 4] = [0x09, 0x02, 0xf1, 0xac];
pub const PAIR_TOKEN0: [u8; 4] = [0x0d, 0xfe, 0x16, 0x81];

const WORD: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("event data too short: {0} bytes, need at least {1}")]
    DataTooShort(usize, usize),
    #[error("unexpected topic0 for TokenCreated event")]
    WrongTopic,
}

/// A decoded TokenCreated launch event.
///
/// The event packs the creator and the new token address as the first two
/// data words (addresses in the low 20 bytes); later words carry curve
/// parameters this engine does not consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCreated {
    pub creator: Address,
    pub token: Address,
}

/// Returns true when `input` begins with any of the launchpad's creation
/// selectors.
pub fn is_create_selector(input: &[u8]) -> bool {
    input.len() >= 4 && CREATE_SELECTORS.iter().any(|sel| &input[..4] == sel)
}

/// Returns true when `input` is a createAndBuy call (the predictable one).
pub fn is_create_and_buy(input: &[u8]) -> bool {
    input.len() >= 4 && input[..4] == CREATE_AND_BUY_SELECTOR
}

/// Encode the direct buy call: selector ++ token (left-padded) ++ minOut ++
/// flags. minOut stays zero on the sniping path - speed over slippage
/// protection.
pub fn build_buy_calldata(token: Address, min_out: U256, flags: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 3 * WORD);
    data.extend_from_slice(&BUY_SELECTOR);
    push_address_word(&mut data, token);
    data.extend_from_slice(&min_out.to_be_bytes::<32>());
    data.extend_from_slice(&flags.to_be_bytes::<32>());
    data
}

/// Encode the direct sell call: selector ++ token ++ amount ++ minEthAmount.
pub fn build_sell_calldata(token: Address, amount: U256, min_eth: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 3 * WORD);
    data.extend_from_slice(&SELL_SELECTOR);
    push_address_word(&mut data, token);
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data.extend_from_slice(&min_eth.to_be_bytes::<32>());
    data
}

/// Encode an ERC-20 `approve(spender, amount)` call.
pub fn build_approve_calldata(spender: Address, amount: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&ERC20_APPROVE);
    push_address_word(&mut data, spender);
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data
}

/// Encode an ERC-20 `balanceOf(owner)` call.
pub fn build_balance_of_calldata(owner: Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&ERC20_BALANCE_OF);
    push_address_word(&mut data, owner);
    data
}

/// Encode an ERC-20 `allowance(owner, spender)` call.
pub fn build_allowance_calldata(owner: Address, spender: Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&ERC20_ALLOWANCE);
    push_address_word(&mut data, owner);
    push_address_word(&mut data, spender);
    data
}

/// Encode a factory `getPair(a, b)` call.
pub fn build_get_pair_calldata(a: Address, b: Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&FACTORY_GET_PAIR);
    push_address_word(&mut data, a);
    push_address_word(&mut data, b);
    data
}

/// Extract the CREATE2 salt word from createAndBuy calldata.
///
/// Returns `None` for any other selector or when the input is shorter than
/// selector + six words. No panics - callers fall back to the confirmed-log
/// path on `None`.
pub fn extract_create_salt(input: &[u8]) -> Option<B256> {
    if !is_create_and_buy(input) {
        return None;
    }
    let start = 4 + CREATE_AND_BUY_SALT_WORD * WORD;
    let end = start + WORD;
    if input.len() < end {
        return None;
    }
    Some(B256::from_slice(&input[start..end]))
}

/// Decode a TokenCreated log's data section.
pub fn decode_token_created(topic0: B256, data: &[u8]) -> Result<TokenCreated, AbiError> {
    if topic0 != TOKEN_CREATED_TOPIC {
        return Err(AbiError::WrongTopic);
    }
    if data.len() < 2 * WORD {
        return Err(AbiError::DataTooShort(data.len(), 2 * WORD));
    }
    Ok(TokenCreated {
        creator: address_from_word(&data[..WORD]),
        token: address_from_word(&data[WORD..2 * WORD]),
    })
}

/// Decode a 32-byte ABI word as a uint256.
pub fn decode_u256_word(data: &[u8]) -> Option<U256> {
    if data.len() < WORD {
        return None;
    }
    Some(U256::from_be_slice(&data[..WORD]))
}

/// Decode a 32-byte ABI word as an address (low 20 bytes).
pub fn decode_address_word(data: &[u8]) -> Option<Address> {
    if data.len() < WORD {
        return None;
    }
    Some(address_from_word(&data[..WORD]))
}

fn push_address_word(out: &mut Vec<u8>, addr: Address) {
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(addr.as_slice());
}

fn address_from_word(word: &[u8]) -> Address {
    Address::from_slice(&word[12..32])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_slice(&[byte; 20])
    }

    #[test]
    fn buy_calldata_layout() {
        let token = addr(0xab);
        let data = build_buy_calldata(token, U256::ZERO, U256::ZERO);

        assert_eq!(data.len(), 100);
        assert_eq!(&data[..4], &BUY_SELECTOR);
        // token left-padded into the first word
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], token.as_slice());
        // minOut and flags both zero
        assert!(data[36..].iter().all(|b| *b == 0));
    }

    #[test]
    fn sell_calldata_layout() {
        let token = addr(0x11);
        let data = build_sell_calldata(token, U256::from(1234u64), U256::ZERO);

        assert_eq!(data.len(), 100);
        assert_eq!(&data[..4], &SELL_SELECTOR);
        assert_eq!(&data[16..36], token.as_slice());
        assert_eq!(decode_u256_word(&data[36..68]), Some(U256::from(1234u64)));
    }

    #[test]
    fn salt_is_the_sixth_word() {
        let mut input = CREATE_AND_BUY_SELECTOR.to_vec();
        for word in 0u8..7 {
            let mut w = [0u8; 32];
            w[31] = word;
            input.extend_from_slice(&w);
        }

        let salt = extract_create_salt(&input).unwrap();
        assert_eq!(salt.as_slice()[31], 5);
    }

    #[test]
    fn salt_rejects_short_input() {
        let mut input = CREATE_AND_BUY_SELECTOR.to_vec();
        input.extend_from_slice(&[0u8; 5 * 32]); // one word short
        assert_eq!(extract_create_salt(&input), None);
    }

    #[test]
    fn salt_rejects_other_selectors() {
        let mut input = vec![0x47, 0xee, 0x97, 0xff];
        input.extend_from_slice(&[0u8; 7 * 32]);
        assert_eq!(extract_create_salt(&input), None);
    }

    #[test]
    fn create_selector_set() {
        assert!(is_create_selector(&[0x51, 0x9e, 0xbb, 0x10, 0x00]));
        assert!(is_create_selector(&[0x47, 0xee, 0x97, 0xff]));
        assert!(is_create_selector(&[0x81, 0x0c, 0x70, 0x5b]));
        assert!(!is_create_selector(&[0x87, 0xf2, 0x76, 0x55]));
        assert!(!is_create_selector(&[0x51, 0x9e]));
    }

    #[test]
    fn token_created_decode() {
        let creator = addr(0xca);
        let token = addr(0x70);
        let mut data = Vec::new();
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(creator.as_slice());
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(token.as_slice());
        // trailing curve parameters are ignored
        data.extend_from_slice(&[0xff; 64]);

        let event = decode_token_created(TOKEN_CREATED_TOPIC, &data).unwrap();
        assert_eq!(event.creator, creator);
        assert_eq!(event.token, token);
    }

    #[test]
    fn token_created_rejects_short_data() {
        let err = decode_token_created(TOKEN_CREATED_TOPIC, &[0u8; 40]).unwrap_err();
        assert_eq!(err, AbiError::DataTooShort(40, 64));
    }

    #[test]
    fn token_created_rejects_wrong_topic() {
        let err = decode_token_created(B256::ZERO, &[0u8; 64]).unwrap_err();
        assert_eq!(err, AbiError::WrongTopic);
    }
}
