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

//! Task and procedure contexts: the complete, serializable state of a running task.

mod frame;
mod task;

pub use frame::Frame;
pub use task::{Status, Task};

use crate::data::Value;
use crate::isa::BytecodeError;

/// Errors assembling, importing or exporting task and procedure contexts.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ContextError {
    /// type document carries no procedure definitions
    NoProcedures,

    /// type document does not define procedure {0}
    UnknownProcedure(u16),

    /// procedure definition carries no bytecode
    NoBytecode,

    /// malformed bytecode in a procedure definition: {0}
    #[from]
    Bytecode(BytecodeError),

    /// required field ${0} is missing from the document
    MissingField(&'static str),

    /// field ${0} of the document holds a value of an unexpected type
    WrongField(&'static str),

    /// processor status "{0}" is not known
    WrongStatus(String),
}

/// Reads a required catalog field of a document.
pub(crate) fn doc_field<'doc>(
    doc: &'doc Value,
    name: &'static str,
) -> Result<&'doc Value, ContextError> {
    doc.get_attribute(name).ok_or(ContextError::MissingField(name))
}

/// Reads a required list-valued catalog field of a document.
pub(crate) fn doc_list(doc: &Value, name: &'static str) -> Result<Vec<Value>, ContextError> {
    doc_field(doc, name)?
        .as_list()
        .map(<[Value]>::to_vec)
        .ok_or(ContextError::WrongField(name))
}

/// Reads a required non-negative integer catalog field of a document.
pub(crate) fn doc_u64(doc: &Value, name: &'static str) -> Result<u64, ContextError> {
    doc_field(doc, name)?
        .as_u64()
        .ok_or(ContextError::WrongField(name))
}
