// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 calldata and event decoding.

use alloy::{
    primitives::{Address, Bytes, FixedBytes, U256},
    sol,
    sol_types::SolCall,
};

use crate::error::{ChainError, ChainResult};

// Define the ERC-20 interface using alloy's sol! macro
sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: FixedBytes<32> = FixedBytes::new([
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d, 0xaa,
    0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23, 0xb3, 0xef,
]);

/// `balanceOf(owner)` calldata.
pub fn balance_of_calldata(owner: Address) -> Bytes {
    IERC20::balanceOfCall { account: owner }.abi_encode().into()
}

/// `transfer(to, amount)` calldata.
pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

/// Recipient of a `transfer(to, amount)` call, if `input` is one.
pub fn transfer_recipient(input: &[u8]) -> Option<Address> {
    IERC20::transferCall::abi_decode(input).ok().map(|call| call.to)
}

/// First 32-byte word of a call result, big-endian.
pub fn decode_word(output: &[u8]) -> ChainResult<U256> {
    if output.len() < 32 {
        return Err(ChainError::Decode(format!(
            "Expected a 32-byte return word, got {} bytes",
            output.len()
        )));
    }
    Ok(U256::from_be_slice(&output[..32]))
}

/// Address held in the low 20 bytes of an indexed topic.
pub fn topic_address(topic: &FixedBytes<32>) -> Address {
    Address::from_slice(&topic[12..])
}
