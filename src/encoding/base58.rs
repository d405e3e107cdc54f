// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Base58 with the Bitcoin alphabet, as used by IPFS CIDv0.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Reverse lookup, 0xFF marks characters outside the alphabet.
const INDEX: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base58Error {
    InvalidCharacter { character: char, index: usize },
}

impl fmt::Display for Base58Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Base58Error::InvalidCharacter { character, index } => {
                write!(f, "invalid base58 character {:?} at {}", character, index)
            }
        }
    }
}

pub fn encode(input: &[u8]) -> String {
    let zeros = input.iter().take_while(|b| **b == 0).count();

    // Little-endian base-58 digits of the big-endian input number.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &byte in &input[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('1');
    }
    for &d in digits.iter().rev() {
        out.push(ALPHABET[d as usize] as char);
    }
    out
}

pub fn decode(input: &str) -> Result<Vec<u8>, Base58Error> {
    let zeros = input.bytes().take_while(|c| *c == b'1').count();

    // Little-endian base-256 bytes.
    let mut bytes: Vec<u8> = Vec::with_capacity(input.len() * 733 / 1000 + 1);
    for (index, character) in input.char_indices().skip(zeros) {
        let value = if character.is_ascii() {
            INDEX[character as usize]
        } else {
            0xFF
        };
        if value == 0xFF {
            return Err(Base58Error::InvalidCharacter { character, index });
        }

        let mut carry = value as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut out = Vec::with_capacity(zeros + bytes.len());
    out.resize(zeros, 0);
    out.extend(bytes.iter().rev());
    Ok(out)
}
