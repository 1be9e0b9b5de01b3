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

use super::{doc_field, doc_list, ContextError};
use crate::data::{Citation, Symbol, Value};
use crate::isa::Bytecode;

/// Procedure context: the activation record of a single procedure call.
///
/// Frames live on the procedure stack of a [`Task`](super::Task). The component and handler
/// stacks are *not* part of the frame: they are shared across the whole call stack and belong
/// to the task.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Frame {
    /// Receiver of a method-style call, or `none`.
    pub(crate) target: Value,

    /// Citation of the type document owning the procedure.
    pub(crate) type_ref: Citation,

    /// Name of the procedure within the type document.
    pub(crate) name: Symbol,

    /// Literal table, indexed 1-based; immutable.
    pub(crate) literals: Vec<Value>,

    /// Variable cells, indexed 1-based; initialized to `none`.
    pub(crate) variables: Vec<Value>,

    /// Parameter values, indexed 1-based; immutable once the call is entered.
    pub(crate) parameters: Vec<Value>,

    /// Compiled procedure body.
    pub(crate) bytecode: Bytecode,

    /// 1-based address of the next instruction; `len + 1` when the frame ran off the end.
    pub(crate) next_address: u16,
}

impl Frame {
    /// Builds the activation frame for a procedure of a type document.
    ///
    /// The procedure is selected by its 1-based ordinal within the `$procedureDefinitions`
    /// catalog of the type document. Variable cells are allocated per the procedure's
    /// `$variableValues` declaration and initialized to `none`; the passed parameter values are
    /// padded with `none` up to the declared parameter count.
    pub fn with(
        type_ref: Citation,
        type_doc: &Value,
        procedure: u16,
        target: Value,
        parameters: Vec<Value>,
    ) -> Result<Frame, ContextError> {
        let literals = type_doc
            .get_attribute("literalValues")
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        let definitions = type_doc
            .get_attribute("procedureDefinitions")
            .and_then(Value::as_catalog)
            .ok_or(ContextError::NoProcedures)?;
        let (name, definition) = procedure
            .checked_sub(1)
            .and_then(|ordinal| definitions.get(ordinal as usize))
            .ok_or(ContextError::UnknownProcedure(procedure))?;

        let bytecode = definition
            .get_attribute("bytecodeInstructions")
            .and_then(Value::as_binary)
            .ok_or(ContextError::NoBytecode)?;
        let bytecode = Bytecode::from_bytes(bytecode)?;

        let variables = definition
            .get_attribute("variableValues")
            .and_then(Value::as_list)
            .map(<[Value]>::len)
            .unwrap_or_default();
        let declared = definition
            .get_attribute("parameterValues")
            .and_then(Value::as_list)
            .map(<[Value]>::len)
            .unwrap_or_default();
        let mut parameters = parameters;
        if parameters.len() < declared {
            parameters.resize(declared, Value::NONE);
        }

        Ok(Frame {
            target,
            type_ref,
            name: name.clone(),
            literals,
            variables: vec![Value::NONE; variables],
            parameters,
            bytecode,
            next_address: 1,
        })
    }

    /// Returns the target component of the call (`none` for plain procedure calls).
    pub fn target(&self) -> &Value { &self.target }

    /// Returns the citation of the owning type document.
    pub fn type_ref(&self) -> &Citation { &self.type_ref }

    /// Returns the procedure name.
    pub fn name(&self) -> &Symbol { &self.name }

    /// Returns the procedure bytecode.
    pub fn bytecode(&self) -> &Bytecode { &self.bytecode }

    /// Returns the 1-based address of the next instruction to execute.
    pub fn next_address(&self) -> u16 { self.next_address }

    /// Returns the 1-based literal table entry.
    pub fn literal(&self, index: u16) -> Option<&Value> {
        (index as usize).checked_sub(1).and_then(|i| self.literals.get(i))
    }

    /// Returns the 1-based parameter value.
    pub fn parameter(&self, index: u16) -> Option<&Value> {
        (index as usize).checked_sub(1).and_then(|i| self.parameters.get(i))
    }

    /// Returns the 1-based variable cell content.
    pub fn variable(&self, index: u16) -> Option<&Value> {
        (index as usize).checked_sub(1).and_then(|i| self.variables.get(i))
    }

    /// Replaces the content of the 1-based variable cell, returning whether the cell exists.
    pub fn set_variable(&mut self, index: u16, value: Value) -> bool {
        match (index as usize).checked_sub(1).and_then(|i| self.variables.get_mut(i)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Advances the next-instruction pointer past the just-fetched instruction.
    pub(crate) fn advance(&mut self) { self.next_address += 1 }

    /// Rewinds the next-instruction pointer so the current instruction is re-attempted.
    pub(crate) fn rewind(&mut self) { self.next_address -= 1 }

    /// Transfers the next-instruction pointer to an absolute 1-based address.
    pub(crate) fn jump(&mut self, addr: u16) { self.next_address = addr }

    /// Serializes the frame into its document form.
    pub fn to_document(&self) -> Value {
        Value::catalog([
            (Symbol::from("targetComponent"), self.target.clone()),
            (Symbol::from("typeReference"), Value::Reference(self.type_ref.clone())),
            (Symbol::from("procedureName"), Value::Symbol(self.name.clone())),
            (Symbol::from("literalValues"), Value::List(self.literals.clone())),
            (Symbol::from("variableValues"), Value::List(self.variables.clone())),
            (Symbol::from("parameterValues"), Value::List(self.parameters.clone())),
            (Symbol::from("bytecodeInstructions"), Value::Binary(self.bytecode.to_bytes())),
            (Symbol::from("nextAddress"), Value::number(self.next_address as f64)),
        ])
    }

    /// Restores a frame from its document form.
    pub fn from_document(doc: &Value) -> Result<Frame, ContextError> {
        let type_ref = doc_field(doc, "typeReference")?
            .as_reference()
            .cloned()
            .ok_or(ContextError::WrongField("typeReference"))?;
        let name = match doc_field(doc, "procedureName")? {
            Value::Symbol(symbol) => symbol.clone(),
            _ => return Err(ContextError::WrongField("procedureName")),
        };
        let bytecode = doc_field(doc, "bytecodeInstructions")?
            .as_binary()
            .ok_or(ContextError::WrongField("bytecodeInstructions"))?;
        let next_address = doc_field(doc, "nextAddress")?
            .as_u64()
            .and_then(|addr| u16::try_from(addr).ok())
            .ok_or(ContextError::WrongField("nextAddress"))?;
        Ok(Frame {
            target: doc_field(doc, "targetComponent")?.clone(),
            type_ref,
            name,
            literals: doc_list(doc, "literalValues")?,
            variables: doc_list(doc, "variableValues")?,
            parameters: doc_list(doc, "parameterValues")?,
            bytecode: Bytecode::from_bytes(bytecode)?,
            next_address,
        })
    }
}
