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

#![allow(missing_docs)]
#![allow(clippy::unusual_byte_groupings)]

//! Instruction word layout.
//!
//! Each instruction is a single 16-bit big-endian word with three fields:
//!
//! ```text
//!  15  14  13   12  11   10  9  8  7  6  5  4  3  2  1  0
//! [ operation ][modifier][            operand            ]
//! ```
//!
//! The operand is a 1-based table index or a 1-based bytecode address depending on the
//! operation; zero is reserved for "no operand" and is only well-formed where explicitly
//! permitted by the classification rules.

// Field masks and shifts
pub const OPERATION_MASK: u16 = 0b111_00_00000000000;
pub const MODIFIER_MASK: u16 = 0b000_11_00000000000;
pub const OPERAND_MASK: u16 = 0b000_00_11111111111;
pub const OPERATION_SHIFT: u8 = 13;
pub const MODIFIER_SHIFT: u8 = 11;

/// Maximal operand value fitting the 11-bit operand field.
pub const OPERAND_MAX: u16 = 0x07FF;

// Operations
pub const OP_JUMP: u8 = 0b000;
pub const OP_PUSH: u8 = 0b001;
pub const OP_POP: u8 = 0b010;
pub const OP_LOAD: u8 = 0b011;
pub const OP_STORE: u8 = 0b100;
pub const OP_INVOKE: u8 = 0b101;
pub const OP_EXECUTE: u8 = 0b110;
pub const OP_HANDLE: u8 = 0b111;

// JUMP modifiers: jump condition popped from the component stack
pub const JUMP_ANY: u8 = 0b00;
pub const JUMP_ON_NONE: u8 = 0b01;
pub const JUMP_ON_TRUE: u8 = 0b10;
pub const JUMP_ON_FALSE: u8 = 0b11;

// PUSH modifiers: what is pushed onto which stack
pub const PUSH_HANDLER: u8 = 0b00;
pub const PUSH_ELEMENT: u8 = 0b01;
pub const PUSH_CODE: u8 = 0b10;

// POP modifiers
pub const POP_HANDLER: u8 = 0b00;
pub const POP_COMPONENT: u8 = 0b01;

// LOAD modifiers: symbol table class the operand indexes into
pub const LOAD_VARIABLE: u8 = 0b00;
pub const LOAD_PARAMETER: u8 = 0b01;
pub const LOAD_DOCUMENT: u8 = 0b10;
pub const LOAD_MESSAGE: u8 = 0b11;

// STORE modifiers
pub const STORE_VARIABLE: u8 = 0b00;
pub const STORE_DOCUMENT: u8 = 0b01;
pub const STORE_DRAFT: u8 = 0b10;
pub const STORE_MESSAGE: u8 = 0b11;

// EXECUTE modifiers: calling convention
pub const EXECUTE_ANY: u8 = 0b00;
pub const EXECUTE_WITH_PARAMETERS: u8 = 0b01;
pub const EXECUTE_ON_TARGET: u8 = 0b10;
pub const EXECUTE_ON_TARGET_WITH_PARAMETERS: u8 = 0b11;

// HANDLE modifiers
pub const HANDLE_EXCEPTION: u8 = 0b00;
pub const HANDLE_RESULT: u8 = 0b01;

/// The distinguished no-operation word: JUMP with a zero modifier and a zero operand.
pub const SKIP_INSTRUCTION: u16 = 0x0000;
