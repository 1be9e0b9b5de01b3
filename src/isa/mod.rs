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

//! Instruction set architecture of the Bali virtual machine.
//!
//! The ISA is a fixed-width 16-bit encoding with eight operations and up to four modifiers per
//! operation; of the 32 (operation, modifier) pairs the classification table defines 23, and
//! the remaining slots are reserved and fail execution.

mod bytecode;
mod exec;
mod instr;
pub mod opcodes;

pub use bytecode::{
    decode_modifier, decode_operand, decode_operation, disassemble, encode, is_valid, Bytecode,
    BytecodeError,
};
pub use exec::{ExecStep, VmContext};
pub(crate) use exec::{invalid_bytecode, unwind};
pub use instr::{Instr, Operation};
pub use opcodes::{
    EXECUTE_ANY, EXECUTE_ON_TARGET, EXECUTE_ON_TARGET_WITH_PARAMETERS, EXECUTE_WITH_PARAMETERS,
    HANDLE_EXCEPTION, HANDLE_RESULT, JUMP_ANY, JUMP_ON_FALSE, JUMP_ON_NONE, JUMP_ON_TRUE,
    LOAD_DOCUMENT, LOAD_MESSAGE, LOAD_PARAMETER, LOAD_VARIABLE, OPERAND_MAX, POP_COMPONENT,
    POP_HANDLER, PUSH_CODE, PUSH_ELEMENT, PUSH_HANDLER, SKIP_INSTRUCTION, STORE_DOCUMENT,
    STORE_DRAFT, STORE_MESSAGE, STORE_VARIABLE,
};
