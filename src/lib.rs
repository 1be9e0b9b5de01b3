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

#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Rust implementation of the Bali virtual machine (BVM): a stack-based bytecode processor for
//! a document-oriented programming platform. Procedures are compiled from a higher-level
//! notation by an upstream compiler, stored as persistent documents in a content-addressed
//! cloud repository and executed by a processor which can suspend, serialize itself to a
//! document and resume later, on the same or on a different physical host.
//!
//!
//! ## Design
//!
//! The machine is built around a small number of hard guarantees:
//!
//! * Cooperative determinism: one processor executes one task; no instruction ever observes
//!   concurrent mutation of the state it owns.
//! * Metered execution: every instruction charges one unit of the task's account balance; a
//!   task out of gas checkpoints itself instead of failing.
//! * Loss-less checkpoints: at every instruction boundary the complete task state (component
//!   stack, handler stack and procedure-call stack) round-trips through a document with no
//!   drift, so a restored continuation is indistinguishable from an uninterrupted one.
//! * Total decoding: every 16-bit word decodes; words outside the instruction classification
//!   table execute as faults feeding the regular exception-unwinding mechanism.
//! * Structured unwinding: exception handlers are one-shot addresses on a stack shared across
//!   the call stack, scoped to their installing frame by boundary markers.
//!
//!
//! ## Instruction set
//!
//! Each instruction is one 16-bit big-endian word: a 3-bit operation (JUMP, PUSH, POP, LOAD,
//! STORE, INVOKE, EXECUTE, HANDLE), a 2-bit modifier and an 11-bit operand holding a 1-based
//! table index or bytecode address. See [`isa`] module documentation for the full
//! classification table and [`isa::Instr`] for per-instruction semantics.
//!
//! The machine does not parse source procedures, does not assemble bytecode and does not store
//! documents: the compiler, the cloud repository, the digital notary and the intrinsic function
//! library are external collaborators accessed through the interfaces in [`Repository`] and
//! [`IntrinsicTable`].

#[macro_use]
extern crate amplify;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

mod core;
pub mod data;
pub mod isa;
mod repo;
mod vm;

pub use data::{
    Citation, CitationError, DocDigest, NotationError, OrderedSet, Symbol, SymbolError, Tag,
    Template, Value, Version, VersionError,
};
pub use isa::{
    disassemble, encode, is_valid, Bytecode, BytecodeError, ExecStep, Instr, Operation, VmContext,
};
pub use repo::{
    wait_queue, IntrinsicTable, MemRepository, NoIntrinsics, RepoError, Repository,
};
pub use vm::Vm;

pub use self::core::{ContextError, Frame, Status, Task};
