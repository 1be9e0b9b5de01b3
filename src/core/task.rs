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

use core::str::FromStr;

use super::{doc_field, doc_list, doc_u64, ContextError, Frame};
use crate::data::{Symbol, Tag, Value};

/// Processor status of a task.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum Status {
    /// The task executes instructions whenever a processor drives it.
    #[default]
    #[display("active")]
    Active,

    /// The task awaits a message on an empty queue and can be resumed once one arrives.
    #[display("waiting")]
    Waiting,

    /// The task terminated with a result or an unhandled exception.
    #[display("done")]
    Done,
}

impl FromStr for Status {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "waiting" => Ok(Status::Waiting),
            "done" => Ok(Status::Done),
            wrong => Err(ContextError::WrongStatus(wrong.to_owned())),
        }
    }
}

/// Task context: the complete state of a single task between two instructions.
///
/// The component stack and the handler stack are shared across the whole procedure-call stack;
/// a procedure call does not introduce new stacks. On the handler stack, the reserved address
/// zero marks a frame boundary: it is pushed when a frame is entered via EXECUTE, so that
/// unwinding can tell which handlers belong to an abandoned frame. A task serializes to a
/// document at every instruction boundary with no loss of information.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Task {
    pub(crate) task_tag: Tag,
    pub(crate) account_tag: Tag,
    pub(crate) balance: u64,
    pub(crate) status: Status,
    pub(crate) cycles: u64,
    pub(crate) components: Vec<Value>,
    pub(crate) handlers: Vec<u16>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) result: Option<Value>,
    pub(crate) exception: Option<Value>,
}

impl Task {
    /// Constructs a new active task executing an initial procedure frame.
    pub fn new(task_tag: Tag, account_tag: Tag, balance: u64, initial: Frame) -> Task {
        Task {
            task_tag,
            account_tag,
            balance,
            status: Status::Active,
            cycles: 0,
            components: vec![],
            handlers: vec![],
            frames: vec![initial],
            result: None,
            exception: None,
        }
    }

    /// Returns the task identity.
    pub fn task_tag(&self) -> Tag { self.task_tag }

    /// Returns the account charged for the task execution.
    pub fn account_tag(&self) -> Tag { self.account_tag }

    /// Returns the remaining account balance (gas).
    pub fn balance(&self) -> u64 { self.balance }

    /// Returns the processor status.
    pub fn status(&self) -> Status { self.status }

    /// Returns the number of instructions executed over the task lifetime.
    pub fn cycles(&self) -> u64 { self.cycles }

    /// Returns the shared component stack, bottom first.
    pub fn components(&self) -> &[Value] { &self.components }

    /// Returns the shared handler stack, bottom first; zero entries are frame boundaries.
    pub fn handlers(&self) -> &[u16] { &self.handlers }

    /// Returns the procedure-call stack, bottom first.
    pub fn frames(&self) -> &[Frame] { &self.frames }

    /// Returns the task result, set once the status turns [`Status::Done`].
    pub fn result(&self) -> Option<&Value> { self.result.as_ref() }

    /// Returns the unhandled exception, set once the status turns [`Status::Done`].
    pub fn exception(&self) -> Option<&Value> { self.exception.as_ref() }

    /// Returns the current procedure context.
    ///
    /// # Panics
    ///
    /// If the procedure stack is empty, which violates the task invariant for non-done statuses.
    pub fn frame(&self) -> &Frame {
        self.frames.last().expect("a non-done task must have a current procedure context")
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("a non-done task must have a current procedure context")
    }

    /// Pushes a value onto the shared component stack.
    ///
    /// Also used by embedders to prime the stack of a task before running it.
    pub fn push_component(&mut self, value: Value) { self.components.push(value) }

    /// Pops the top value off the shared component stack.
    pub fn pop_component(&mut self) -> Option<Value> { self.components.pop() }

    pub(crate) fn push_handler(&mut self, addr: u16) { self.handlers.push(addr) }

    /// Pops a handler address installed by the current frame.
    ///
    /// Returns `None` on an empty handler stack and on a frame boundary: handlers installed by
    /// outer frames are not poppable from within a callee.
    pub(crate) fn pop_handler(&mut self) -> Option<u16> {
        match self.handlers.last() {
            Some(&addr) if addr > 0 => self.handlers.pop(),
            _ => None,
        }
    }

    /// Drops all handlers installed by the current frame together with its boundary marker.
    pub(crate) fn drop_frame_handlers(&mut self) {
        while matches!(self.handlers.last(), Some(&addr) if addr > 0) {
            self.handlers.pop();
        }
        if self.handlers.last() == Some(&0) {
            self.handlers.pop();
        }
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        // the boundary marker scopes the callee's handlers
        self.handlers.push(0);
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) -> Option<Frame> {
        let frame = self.frames.pop();
        if frame.is_some() {
            self.drop_frame_handlers();
        }
        frame
    }

    pub(crate) fn set_status(&mut self, status: Status) { self.status = status }

    /// Reactivates a waiting task so a processor can re-attempt its pending receive.
    ///
    /// Used by the scheduling collaborator when a message may have arrived for the task; has no
    /// effect on active or done tasks.
    pub fn activate(&mut self) {
        if self.status == Status::Waiting {
            self.status = Status::Active;
        }
    }

    /// Terminates the task with a result.
    pub(crate) fn set_result(&mut self, result: Value) {
        self.result = Some(result);
        self.status = Status::Done;
    }

    /// Terminates the task with an unhandled exception.
    pub(crate) fn set_exception(&mut self, exception: Value) {
        self.exception = Some(exception);
        self.status = Status::Done;
    }

    /// Charges one clock cycle and one unit of the account balance for an executed instruction.
    pub(crate) fn charge(&mut self) {
        self.balance = self.balance.saturating_sub(1);
        self.cycles += 1;
    }

    /// Serializes the task into its document form.
    pub fn to_document(&self) -> Value {
        let mut assoc = vec![
            (Symbol::from("taskTag"), Value::Tag(self.task_tag)),
            (Symbol::from("accountTag"), Value::Tag(self.account_tag)),
            (Symbol::from("accountBalance"), Value::number(self.balance as f64)),
            (Symbol::from("processorStatus"), Value::symbol(&self.status.to_string())),
            (Symbol::from("clockCycles"), Value::number(self.cycles as f64)),
            (Symbol::from("componentStack"), Value::List(self.components.clone())),
            (
                Symbol::from("handlerStack"),
                Value::list(self.handlers.iter().map(|addr| Value::number(*addr as f64))),
            ),
            (
                Symbol::from("procedureStack"),
                Value::list(self.frames.iter().map(Frame::to_document)),
            ),
        ];
        if let Some(result) = &self.result {
            assoc.push((Symbol::from("result"), result.clone()));
        }
        if let Some(exception) = &self.exception {
            assoc.push((Symbol::from("exception"), exception.clone()));
        }
        Value::Catalog(assoc)
    }

    /// Restores a task from its document form.
    pub fn from_document(doc: &Value) -> Result<Task, ContextError> {
        let task_tag = match doc_field(doc, "taskTag")? {
            Value::Tag(tag) => *tag,
            _ => return Err(ContextError::WrongField("taskTag")),
        };
        let account_tag = match doc_field(doc, "accountTag")? {
            Value::Tag(tag) => *tag,
            _ => return Err(ContextError::WrongField("accountTag")),
        };
        let status = match doc_field(doc, "processorStatus")? {
            Value::Symbol(symbol) => Status::from_str(symbol.as_str())?,
            _ => return Err(ContextError::WrongField("processorStatus")),
        };
        let handlers = doc_list(doc, "handlerStack")?
            .iter()
            .map(|value| {
                value
                    .as_u64()
                    .and_then(|addr| u16::try_from(addr).ok())
                    .ok_or(ContextError::WrongField("handlerStack"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let frames = doc_list(doc, "procedureStack")?
            .iter()
            .map(Frame::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Task {
            task_tag,
            account_tag,
            balance: doc_u64(doc, "accountBalance")?,
            status,
            cycles: doc_u64(doc, "clockCycles")?,
            components: doc_list(doc, "componentStack")?,
            handlers,
            frames,
            result: doc.get_attribute("result").cloned(),
            exception: doc.get_attribute("exception").cloned(),
        })
    }
}
