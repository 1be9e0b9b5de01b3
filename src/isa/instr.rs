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

use core::fmt::{self, Display, Formatter};

use super::opcodes::*;

/// Operation field of an instruction word (bits 15-13).
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[repr(u8)]
pub enum Operation {
    #[display("JUMP")]
    Jump = OP_JUMP,

    #[display("PUSH")]
    Push = OP_PUSH,

    #[display("POP")]
    Pop = OP_POP,

    #[display("LOAD")]
    Load = OP_LOAD,

    #[display("STORE")]
    Store = OP_STORE,

    #[display("INVOKE")]
    Invoke = OP_INVOKE,

    #[display("EXECUTE")]
    Execute = OP_EXECUTE,

    #[display("HANDLE")]
    Handle = OP_HANDLE,
}

impl Operation {
    /// Constructs an operation from the three operation bits of an instruction word.
    ///
    /// # Panics
    ///
    /// If the provided value does not fit into three bits.
    pub fn from_bits(bits: u8) -> Operation {
        match bits {
            OP_JUMP => Operation::Jump,
            OP_PUSH => Operation::Push,
            OP_POP => Operation::Pop,
            OP_LOAD => Operation::Load,
            OP_STORE => Operation::Store,
            OP_INVOKE => Operation::Invoke,
            OP_EXECUTE => Operation::Execute,
            OP_HANDLE => Operation::Handle,
            wrong => panic!("operation value {wrong} exceeds three bits"),
        }
    }
}

/// Decoded instruction.
///
/// Each variant corresponds to one defined (operation, modifier) pair; every well-formed word
/// decodes to exactly one of them. Words outside the classification table decode to
/// [`Instr::Reserved`], which fails execution with an invalid-bytecode exception.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Instr {
    /// The no-operation instruction (JUMP with a zero operand).
    Skip,

    /// Transfers control to the operand address unconditionally.
    Jump { addr: u16 },

    /// Pops a condition and transfers control if the condition is `none`.
    JumpOnNone { addr: u16 },

    /// Pops a condition and transfers control if the condition is `true`.
    JumpOnTrue { addr: u16 },

    /// Pops a condition and transfers control if the condition is `false`.
    JumpOnFalse { addr: u16 },

    /// Installs an exception handler address on the handler stack.
    PushHandler { addr: u16 },

    /// Pushes an element literal from the literal table onto the component stack.
    PushElement { index: u16 },

    /// Pushes a code literal from the literal table onto the component stack.
    PushCode { index: u16 },

    /// Removes the top address from the handler stack.
    PopHandler,

    /// Removes the top value from the component stack.
    PopComponent,

    /// Pushes the indexed variable of the current procedure context.
    LoadVariable { index: u16 },

    /// Pushes the indexed parameter of the current procedure context.
    LoadParameter { index: u16 },

    /// Fetches the document cited by the indexed variable and pushes it.
    LoadDocument { index: u16 },

    /// Dequeues a message from the queue named by the indexed variable; waits on empty.
    LoadMessage { index: u16 },

    /// Pops a value into the indexed variable.
    StoreVariable { index: u16 },

    /// Pops a document, commits it and updates the citation in the indexed variable.
    StoreDocument { index: u16 },

    /// Pops a document and saves it as a draft cited by the indexed variable.
    StoreDraft { index: u16 },

    /// Pops a message and enqueues it on the queue named by the indexed variable.
    StoreMessage { index: u16 },

    /// Calls the indexed intrinsic function with `arity` popped arguments.
    Invoke { index: u16, arity: u8 },

    /// Calls the indexed procedure of the type cited on top of the stack.
    Execute { index: u16 },

    /// Calls the indexed procedure passing a popped parameter list.
    ExecuteWith { index: u16 },

    /// Calls the indexed procedure of the popped target component's type.
    ExecuteOn { index: u16 },

    /// Calls the indexed procedure on a popped target with a popped parameter list.
    ExecuteOnWith { index: u16 },

    /// Pops an exception and transfers control to the innermost live handler.
    HandleException,

    /// Pops the procedure result and returns it to the caller frame.
    HandleResult,

    /// A word outside the classification table; fails execution when reached.
    Reserved(u16),
}

impl Instr {
    /// Returns the operation field of the instruction.
    pub fn operation(self) -> Operation {
        match self {
            Instr::Skip
            | Instr::Jump { .. }
            | Instr::JumpOnNone { .. }
            | Instr::JumpOnTrue { .. }
            | Instr::JumpOnFalse { .. } => Operation::Jump,
            Instr::PushHandler { .. } | Instr::PushElement { .. } | Instr::PushCode { .. } => {
                Operation::Push
            }
            Instr::PopHandler | Instr::PopComponent => Operation::Pop,
            Instr::LoadVariable { .. }
            | Instr::LoadParameter { .. }
            | Instr::LoadDocument { .. }
            | Instr::LoadMessage { .. } => Operation::Load,
            Instr::StoreVariable { .. }
            | Instr::StoreDocument { .. }
            | Instr::StoreDraft { .. }
            | Instr::StoreMessage { .. } => Operation::Store,
            Instr::Invoke { .. } => Operation::Invoke,
            Instr::Execute { .. }
            | Instr::ExecuteWith { .. }
            | Instr::ExecuteOn { .. }
            | Instr::ExecuteOnWith { .. } => Operation::Execute,
            Instr::HandleException | Instr::HandleResult => Operation::Handle,
            Instr::Reserved(word) => {
                Operation::from_bits(((word & OPERATION_MASK) >> OPERATION_SHIFT) as u8)
            }
        }
    }

    /// Returns the modifier field of the instruction.
    pub fn modifier(self) -> u8 {
        match self {
            Instr::Skip | Instr::Jump { .. } => JUMP_ANY,
            Instr::JumpOnNone { .. } => JUMP_ON_NONE,
            Instr::JumpOnTrue { .. } => JUMP_ON_TRUE,
            Instr::JumpOnFalse { .. } => JUMP_ON_FALSE,
            Instr::PushHandler { .. } => PUSH_HANDLER,
            Instr::PushElement { .. } => PUSH_ELEMENT,
            Instr::PushCode { .. } => PUSH_CODE,
            Instr::PopHandler => POP_HANDLER,
            Instr::PopComponent => POP_COMPONENT,
            Instr::LoadVariable { .. } => LOAD_VARIABLE,
            Instr::LoadParameter { .. } => LOAD_PARAMETER,
            Instr::LoadDocument { .. } => LOAD_DOCUMENT,
            Instr::LoadMessage { .. } => LOAD_MESSAGE,
            Instr::StoreVariable { .. } => STORE_VARIABLE,
            Instr::StoreDocument { .. } => STORE_DOCUMENT,
            Instr::StoreDraft { .. } => STORE_DRAFT,
            Instr::StoreMessage { .. } => STORE_MESSAGE,
            Instr::Invoke { arity, .. } => arity,
            Instr::Execute { .. } => EXECUTE_ANY,
            Instr::ExecuteWith { .. } => EXECUTE_WITH_PARAMETERS,
            Instr::ExecuteOn { .. } => EXECUTE_ON_TARGET,
            Instr::ExecuteOnWith { .. } => EXECUTE_ON_TARGET_WITH_PARAMETERS,
            Instr::HandleException => HANDLE_EXCEPTION,
            Instr::HandleResult => HANDLE_RESULT,
            Instr::Reserved(word) => ((word & MODIFIER_MASK) >> MODIFIER_SHIFT) as u8,
        }
    }

    /// Returns the operand field of the instruction; zero means "no operand".
    pub fn operand(self) -> u16 {
        match self {
            Instr::Skip
            | Instr::PopHandler
            | Instr::PopComponent
            | Instr::HandleException
            | Instr::HandleResult => 0,
            Instr::Jump { addr }
            | Instr::JumpOnNone { addr }
            | Instr::JumpOnTrue { addr }
            | Instr::JumpOnFalse { addr }
            | Instr::PushHandler { addr } => addr,
            Instr::PushElement { index }
            | Instr::PushCode { index }
            | Instr::LoadVariable { index }
            | Instr::LoadParameter { index }
            | Instr::LoadDocument { index }
            | Instr::LoadMessage { index }
            | Instr::StoreVariable { index }
            | Instr::StoreDocument { index }
            | Instr::StoreDraft { index }
            | Instr::StoreMessage { index }
            | Instr::Invoke { index, .. }
            | Instr::Execute { index }
            | Instr::ExecuteWith { index }
            | Instr::ExecuteOn { index }
            | Instr::ExecuteOnWith { index } => index,
            Instr::Reserved(word) => word & OPERAND_MASK,
        }
    }

    /// Detects whether the operand designates a bytecode address.
    pub fn operand_is_address(self) -> bool {
        matches!(
            self,
            Instr::Skip
                | Instr::Jump { .. }
                | Instr::JumpOnNone { .. }
                | Instr::JumpOnTrue { .. }
                | Instr::JumpOnFalse { .. }
                | Instr::PushHandler { .. }
        )
    }

    /// Detects whether the operand designates a 1-based table index.
    pub fn operand_is_index(self) -> bool {
        matches!(
            self,
            Instr::PushElement { .. }
                | Instr::PushCode { .. }
                | Instr::LoadVariable { .. }
                | Instr::LoadParameter { .. }
                | Instr::LoadDocument { .. }
                | Instr::LoadMessage { .. }
                | Instr::StoreVariable { .. }
                | Instr::StoreDocument { .. }
                | Instr::StoreDraft { .. }
                | Instr::StoreMessage { .. }
                | Instr::Invoke { .. }
                | Instr::Execute { .. }
                | Instr::ExecuteWith { .. }
                | Instr::ExecuteOn { .. }
                | Instr::ExecuteOnWith { .. }
        )
    }
}

impl Display for Instr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Instr::Skip => f.write_str("SKIP INSTRUCTION"),
            Instr::Jump { addr } => write!(f, "JUMP TO [{addr:03X}]"),
            Instr::JumpOnNone { addr } => write!(f, "JUMP TO [{addr:03X}] ON NONE"),
            Instr::JumpOnTrue { addr } => write!(f, "JUMP TO [{addr:03X}] ON TRUE"),
            Instr::JumpOnFalse { addr } => write!(f, "JUMP TO [{addr:03X}] ON FALSE"),
            Instr::PushHandler { addr } => write!(f, "PUSH HANDLER [{addr:03X}]"),
            Instr::PushElement { index } => write!(f, "PUSH ELEMENT {index}"),
            Instr::PushCode { index } => write!(f, "PUSH CODE {index}"),
            Instr::PopHandler => f.write_str("POP HANDLER"),
            Instr::PopComponent => f.write_str("POP COMPONENT"),
            Instr::LoadVariable { index } => write!(f, "LOAD VARIABLE {index}"),
            Instr::LoadParameter { index } => write!(f, "LOAD PARAMETER {index}"),
            Instr::LoadDocument { index } => write!(f, "LOAD DOCUMENT {index}"),
            Instr::LoadMessage { index } => write!(f, "LOAD MESSAGE {index}"),
            Instr::StoreVariable { index } => write!(f, "STORE VARIABLE {index}"),
            Instr::StoreDocument { index } => write!(f, "STORE DOCUMENT {index}"),
            Instr::StoreDraft { index } => write!(f, "STORE DRAFT {index}"),
            Instr::StoreMessage { index } => write!(f, "STORE MESSAGE {index}"),
            Instr::Invoke { index, arity: 0 } => write!(f, "INVOKE {index}"),
            Instr::Invoke { index, arity: 1 } => write!(f, "INVOKE {index} WITH 1 PARAMETER"),
            Instr::Invoke { index, arity } => {
                write!(f, "INVOKE {index} WITH {arity} PARAMETERS")
            }
            Instr::Execute { index } => write!(f, "EXECUTE {index}"),
            Instr::ExecuteWith { index } => write!(f, "EXECUTE {index} WITH PARAMETERS"),
            Instr::ExecuteOn { index } => write!(f, "EXECUTE {index} ON TARGET"),
            Instr::ExecuteOnWith { index } => {
                write!(f, "EXECUTE {index} ON TARGET WITH PARAMETERS")
            }
            Instr::HandleException => f.write_str("HANDLE EXCEPTION"),
            Instr::HandleResult => f.write_str("HANDLE RESULT"),
            Instr::Reserved(word) => write!(f, "RESERVED {word:04X}"),
        }
    }
}
