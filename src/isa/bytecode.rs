// Reference rust implementation of the Bali virtual machine (BVM).
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2021-2025 by
//     Dr Maxim Orlovsky <orlovsky@ubideco.org>
//
// Copyright (C) 2021-2025 UBIDECO Labs,
//     Laboratories for Distributed and Cognitive Computing, Switzerland.
//     All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::fmt::{self, Display, Formatter, Write};
use core::str::FromStr;

use amplify::hex::{self, FromHex, ToHex};

use super::opcodes::*;
use super::{Instr, Operation};

/// Extracts the operation field from an instruction word.
#[inline]
pub fn decode_operation(word: u16) -> Operation {
    Operation::from_bits(((word & OPERATION_MASK) >> OPERATION_SHIFT) as u8)
}

/// Extracts the modifier field from an instruction word.
#[inline]
pub fn decode_modifier(word: u16) -> u8 { ((word & MODIFIER_MASK) >> MODIFIER_SHIFT) as u8 }

/// Extracts the operand field from an instruction word.
#[inline]
pub fn decode_operand(word: u16) -> u16 { word & OPERAND_MASK }

/// Composes an instruction word from its three fields.
///
/// # Panics
///
/// If the modifier exceeds two bits or the operand exceeds [`OPERAND_MAX`].
pub fn encode(operation: Operation, modifier: u8, operand: u16) -> u16 {
    assert!(modifier <= 0b11, "modifier value {modifier} exceeds two bits");
    assert!(operand <= OPERAND_MAX, "operand value {operand} exceeds eleven bits");
    ((operation as u16) << OPERATION_SHIFT) | ((modifier as u16) << MODIFIER_SHIFT) | operand
}

/// Detects whether a word lies inside the instruction classification table.
#[inline]
pub fn is_valid(word: u16) -> bool { !matches!(Instr::decode(word), Instr::Reserved(_)) }

/// Renders a single disassembly table row for a word, prefixed with a bracketed address label
/// when one is given.
///
/// Address operands render as bracketed 3-hex-digit addresses, table indexes as decimals and
/// absent operands as `~`.
pub fn disassemble(word: u16, label: Option<u16>) -> String {
    let instr = Instr::decode(word);
    let operand = if instr.operand_is_address() && instr.operand() > 0 {
        format!("[{:03X}]", instr.operand())
    } else if instr.operand_is_index() {
        format!("{:>5}", instr.operand())
    } else {
        format!("{:>5}", "~")
    };
    let row = format!(
        "{word:04X}  {}{}  {operand}  {instr}",
        instr.operation() as u8,
        instr.modifier(),
    );
    match label {
        Some(addr) => format!("[{addr:03X}]:  {row}"),
        None => row,
    }
}

impl Instr {
    /// Decodes an instruction word.
    ///
    /// The decoding is total: words outside the classification table yield [`Instr::Reserved`],
    /// which fails execution when reached.
    pub fn decode(word: u16) -> Instr {
        let operation = ((word & OPERATION_MASK) >> OPERATION_SHIFT) as u8;
        let modifier = ((word & MODIFIER_MASK) >> MODIFIER_SHIFT) as u8;
        let operand = word & OPERAND_MASK;
        match (operation, modifier, operand) {
            (OP_JUMP, JUMP_ANY, 0) => Instr::Skip,
            (OP_JUMP, JUMP_ANY, addr) => Instr::Jump { addr },
            (OP_JUMP, JUMP_ON_NONE, addr) if addr > 0 => Instr::JumpOnNone { addr },
            (OP_JUMP, JUMP_ON_TRUE, addr) if addr > 0 => Instr::JumpOnTrue { addr },
            (OP_JUMP, JUMP_ON_FALSE, addr) if addr > 0 => Instr::JumpOnFalse { addr },

            (OP_PUSH, PUSH_HANDLER, addr) if addr > 0 => Instr::PushHandler { addr },
            (OP_PUSH, PUSH_ELEMENT, index) if index > 0 => Instr::PushElement { index },
            (OP_PUSH, PUSH_CODE, index) if index > 0 => Instr::PushCode { index },

            (OP_POP, POP_HANDLER, 0) => Instr::PopHandler,
            (OP_POP, POP_COMPONENT, 0) => Instr::PopComponent,

            (OP_LOAD, LOAD_VARIABLE, index) if index > 0 => Instr::LoadVariable { index },
            (OP_LOAD, LOAD_PARAMETER, index) if index > 0 => Instr::LoadParameter { index },
            (OP_LOAD, LOAD_DOCUMENT, index) if index > 0 => Instr::LoadDocument { index },
            (OP_LOAD, LOAD_MESSAGE, index) if index > 0 => Instr::LoadMessage { index },

            (OP_STORE, STORE_VARIABLE, index) if index > 0 => Instr::StoreVariable { index },
            (OP_STORE, STORE_DOCUMENT, index) if index > 0 => Instr::StoreDocument { index },
            (OP_STORE, STORE_DRAFT, index) if index > 0 => Instr::StoreDraft { index },
            (OP_STORE, STORE_MESSAGE, index) if index > 0 => Instr::StoreMessage { index },

            (OP_INVOKE, arity, index) if index > 0 => Instr::Invoke { index, arity },

            (OP_EXECUTE, EXECUTE_ANY, index) if index > 0 => Instr::Execute { index },
            (OP_EXECUTE, EXECUTE_WITH_PARAMETERS, index) if index > 0 => {
                Instr::ExecuteWith { index }
            }
            (OP_EXECUTE, EXECUTE_ON_TARGET, index) if index > 0 => Instr::ExecuteOn { index },
            (OP_EXECUTE, EXECUTE_ON_TARGET_WITH_PARAMETERS, index) if index > 0 => {
                Instr::ExecuteOnWith { index }
            }

            (OP_HANDLE, HANDLE_EXCEPTION, 0) => Instr::HandleException,
            (OP_HANDLE, HANDLE_RESULT, 0) => Instr::HandleResult,

            _ => Instr::Reserved(word),
        }
    }

    /// Encodes the instruction back into its word form.
    pub fn encode(self) -> u16 {
        match self {
            Instr::Reserved(word) => word,
            instr => encode(instr.operation(), instr.modifier(), instr.operand()),
        }
    }
}

/// Errors processing persisted bytecode content.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum BytecodeError {
    /// bytecode byte string has an odd length {0} which can't be paired into 16-bit words
    OddLength(usize),

    /// bytecode contains {0} words, exceeding the 11-bit address space
    TooLong(usize),

    /// invalid base-16 encoding of bytecode: {0}
    #[from]
    Hex(hex::Error),
}

/// Bytecode of a single procedure: an ordered sequence of 16-bit instruction words.
///
/// Addresses are 1-based; address zero means "no address". When persisted inside documents the
/// words are paired into big-endian bytes and base-16 encoded.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Bytecode(Vec<u16>);

impl Bytecode {
    /// Constructs empty bytecode.
    pub fn new() -> Self { Bytecode(vec![]) }

    /// Constructs bytecode from instruction words.
    ///
    /// # Panics
    ///
    /// If the number of words exceeds the 11-bit address space.
    pub fn with(words: impl IntoIterator<Item = u16>) -> Self {
        let words = words.into_iter().collect::<Vec<_>>();
        assert!(words.len() <= OPERAND_MAX as usize, "bytecode exceeds the 11-bit address space");
        Bytecode(words)
    }

    /// Returns the number of instruction words.
    pub fn len(&self) -> u16 { self.0.len() as u16 }

    /// Detects empty bytecode.
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Returns the word at a 1-based address.
    pub fn word(&self, addr: u16) -> Option<u16> {
        addr.checked_sub(1).and_then(|i| self.0.get(i as usize)).copied()
    }

    /// Decodes the instruction at a 1-based address.
    pub fn instr(&self, addr: u16) -> Option<Instr> { self.word(addr).map(Instr::decode) }

    /// Iterates instruction words in address order.
    pub fn words(&self) -> impl Iterator<Item = u16> + '_ { self.0.iter().copied() }

    /// Serializes words into big-endian byte pairs.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|word| word.to_be_bytes()).collect()
    }

    /// Deserializes big-endian byte pairs into words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BytecodeError> {
        if bytes.len() % 2 != 0 {
            return Err(BytecodeError::OddLength(bytes.len()));
        }
        if bytes.len() / 2 > OPERAND_MAX as usize {
            return Err(BytecodeError::TooLong(bytes.len() / 2));
        }
        let words = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Bytecode(words))
    }

    /// Renders a human-readable listing: a header line plus one table row per word.
    pub fn disassemble(&self) -> String {
        let mut listing = String::from("Addr:   Code  OM  Oprnd  Mnemonic\n");
        for (no, word) in self.0.iter().enumerate() {
            writeln!(listing, "{}", disassemble(*word, Some(no as u16 + 1)))
                .expect("writing to a string never fails");
        }
        listing
    }
}

impl Display for Bytecode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.to_bytes().to_hex()) }
}

impl FromStr for Bytecode {
    type Err = BytecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = Vec::<u8>::from_hex(s)?;
        Bytecode::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_encode_identity_on_all_words() {
        for word in 0..=u16::MAX {
            let instr = Instr::decode(word);
            assert_eq!(instr.encode(), word, "word {word:#06X} does not survive the codec");
        }
    }

    #[test]
    fn field_extraction_identity() {
        for op_bits in 0..8u8 {
            let operation = Operation::from_bits(op_bits);
            for modifier in 0..4u8 {
                for operand in [0u16, 1, 2, 1000, OPERAND_MAX] {
                    let word = encode(operation, modifier, operand);
                    assert_eq!(decode_operation(word), operation);
                    assert_eq!(decode_modifier(word), modifier);
                    assert_eq!(decode_operand(word), operand);
                }
            }
        }
    }

    #[test]
    fn classification_table() {
        // JUMP: zero operand is well-formed only with a zero modifier (SKIP)
        assert!(is_valid(encode(Operation::Jump, JUMP_ANY, 0)));
        assert!(is_valid(encode(Operation::Jump, JUMP_ANY, 5)));
        assert!(is_valid(encode(Operation::Jump, JUMP_ON_FALSE, 5)));
        assert!(!is_valid(encode(Operation::Jump, JUMP_ON_NONE, 0)));

        // PUSH: modifier 3 is reserved; operand must be positive
        assert!(is_valid(encode(Operation::Push, PUSH_HANDLER, 4)));
        assert!(is_valid(encode(Operation::Push, PUSH_CODE, 1)));
        assert!(!is_valid(encode(Operation::Push, PUSH_ELEMENT, 0)));
        assert!(!is_valid(encode(Operation::Push, 0b11, 1)));

        // POP: operand must be zero; modifiers 2-3 are reserved
        assert!(is_valid(encode(Operation::Pop, POP_COMPONENT, 0)));
        assert!(!is_valid(encode(Operation::Pop, POP_COMPONENT, 1)));
        assert!(!is_valid(encode(Operation::Pop, 0b10, 0)));

        // LOAD/STORE: all four modifiers, index must be positive
        for modifier in 0..4u8 {
            assert!(is_valid(encode(Operation::Load, modifier, 1)));
            assert!(is_valid(encode(Operation::Store, modifier, 1)));
            assert!(!is_valid(encode(Operation::Load, modifier, 0)));
            assert!(!is_valid(encode(Operation::Store, modifier, 0)));
        }

        // INVOKE: modifier is the arity; index must be positive
        assert!(is_valid(encode(Operation::Invoke, 3, 17)));
        assert!(!is_valid(encode(Operation::Invoke, 3, 0)));

        // EXECUTE: index must be positive
        assert!(is_valid(encode(Operation::Execute, EXECUTE_ON_TARGET, 2)));
        assert!(!is_valid(encode(Operation::Execute, EXECUTE_ANY, 0)));

        // HANDLE: operand must be zero; modifiers 2-3 are reserved
        assert!(is_valid(encode(Operation::Handle, HANDLE_EXCEPTION, 0)));
        assert!(is_valid(encode(Operation::Handle, HANDLE_RESULT, 0)));
        assert!(!is_valid(encode(Operation::Handle, HANDLE_RESULT, 1)));
        assert!(!is_valid(encode(Operation::Handle, 0b10, 0)));
    }

    #[test]
    fn skip_instruction() {
        assert_eq!(Instr::decode(SKIP_INSTRUCTION), Instr::Skip);
        assert_eq!(Instr::Skip.encode(), SKIP_INSTRUCTION);
    }

    #[test]
    fn byte_pairing_is_big_endian() {
        let bytecode = Bytecode::with([0x2801, 0xF800]);
        assert_eq!(bytecode.to_bytes(), vec![0x28, 0x01, 0xF8, 0x00]);
        assert_eq!(Bytecode::from_bytes(&[0x28, 0x01, 0xF8, 0x00]).unwrap(), bytecode);
        assert_eq!(Bytecode::from_bytes(&[0x28, 0x01, 0xF8]), Err(BytecodeError::OddLength(3)));
    }

    #[test]
    fn base16_roundtrip() {
        let bytecode = Bytecode::with([
            encode(Operation::Push, PUSH_ELEMENT, 1),
            encode(Operation::Handle, HANDLE_RESULT, 0),
        ]);
        let base16 = bytecode.to_string();
        assert_eq!(base16, "2801e800");
        assert_eq!(Bytecode::from_str(&base16).unwrap(), bytecode);
    }

    #[test]
    fn one_based_addressing() {
        let bytecode = Bytecode::with([0x0000, 0x2801]);
        assert_eq!(bytecode.word(0), None);
        assert_eq!(bytecode.word(1), Some(0x0000));
        assert_eq!(bytecode.word(2), Some(0x2801));
        assert_eq!(bytecode.word(3), None);
        assert_eq!(bytecode.instr(2), Some(Instr::PushElement { index: 1 }));
    }

    #[test]
    fn listing() {
        let bytecode = Bytecode::with([
            SKIP_INSTRUCTION,
            encode(Operation::Push, PUSH_HANDLER, 4),
            encode(Operation::Push, PUSH_ELEMENT, 1),
            encode(Operation::Handle, HANDLE_RESULT, 0),
            0xFFFF,
        ]);
        assert_eq!(bytecode.disassemble(), "\
            Addr:   Code  OM  Oprnd  Mnemonic\n\
            [001]:  0000  00      ~  SKIP INSTRUCTION\n\
            [002]:  2004  10  [004]  PUSH HANDLER [004]\n\
            [003]:  2801  11      1  PUSH ELEMENT 1\n\
            [004]:  E800  71      ~  HANDLE RESULT\n\
            [005]:  FFFF  73      ~  RESERVED FFFF\n");
        assert_eq!(disassemble(0x2004, None), "2004  10  [004]  PUSH HANDLER [004]");
    }
}
