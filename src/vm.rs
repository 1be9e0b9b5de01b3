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

//! Bali virtual machine processor.

use crate::core::{ContextError, Status, Task};
use crate::data::{Symbol, Value};
use crate::isa::{invalid_bytecode, unwind, ExecStep, Instr, VmContext};
use crate::repo::{wait_queue, IntrinsicTable, RepoError, Repository};

/// Bali virtual machine providing single-core cooperative execution of one task.
///
/// The processor drives the fetch-decode-dispatch cycle while the task stays runnable, then
/// routes the task to a completion event, a suspension event or the well-known wait queue.
/// The next-instruction pointer is advanced right after the fetch, so branching instructions
/// store their targets verbatim and no increment is applied after a taken branch.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Vm {
    /// The task context driven by this processor.
    pub task: Task,
}

impl Vm {
    /// Constructs a processor around an existing task context.
    pub fn with(task: Task) -> Vm { Vm { task } }

    /// Imports a task context from its document form and constructs a processor around it.
    ///
    /// Together with the export performed on suspension this makes an execution continuation
    /// indistinguishable from one which never left the original host.
    pub fn import(document: &Value) -> Result<Vm, ContextError> {
        Task::from_document(document).map(Vm::with)
    }

    /// Detects whether the next instruction can be executed: the task must be active, have gas
    /// left and its next-instruction pointer must stay inside the current procedure body.
    pub fn is_runnable(&self) -> bool {
        self.task.status() == Status::Active
            && self.task.balance() > 0
            && !self.task.frames().is_empty()
            && self.task.frame().next_address() <= self.task.frame().bytecode().len()
    }

    /// Fetches, decodes and executes a single instruction, charging one unit of gas and one
    /// clock cycle.
    pub fn step<R: Repository, T: IntrinsicTable>(&mut self, context: &mut VmContext<R, T>) {
        let frame = self.task.frame_mut();
        let addr = frame.next_address();
        let Some(word) = frame.bytecode().word(addr) else {
            return;
        };
        frame.advance();
        let instr = Instr::decode(word);

        #[cfg(debug_assertions)]
        eprint!("\n@{:03X}> {:48} balance={}", addr, instr.to_string(), self.task.balance());

        let step = instr.exec(&mut self.task, context);
        self.task.charge();
        self.apply(step);
    }

    /// Applies the movement produced by an executed instruction, resolving raised exceptions
    /// through the handler-unwinding mechanism.
    fn apply(&mut self, step: ExecStep) {
        let mut step = step;
        loop {
            match step {
                ExecStep::Next | ExecStep::Stop => return,
                ExecStep::Wait => {
                    // rewind so the same instruction is re-attempted after resume
                    self.task.frame_mut().rewind();
                    self.task.set_status(Status::Waiting);
                    return;
                }
                ExecStep::Jump(addr) => {
                    if addr == 0 || addr > self.task.frame().bytecode().len() {
                        step = ExecStep::Throw(invalid_bytecode());
                        continue;
                    }
                    self.task.frame_mut().jump(addr);
                    return;
                }
                ExecStep::Throw(exception) => {
                    step = unwind(&mut self.task, exception);
                }
            }
        }
    }

    /// Executes instructions while the task is runnable, then routes the task out.
    ///
    /// * A task still active (out of gas, or fallen off the end of its procedure) is exported
    ///   and a `$suspension` event carrying the serialized task context is published.
    /// * A waiting task is exported and enqueued on the well-known wait queue.
    /// * A done task produces a `$completion` event carrying the task identity, the final
    ///   balance and cycle count, and its result or exception.
    ///
    /// Returns the status the task terminated with.
    pub fn run<R: Repository, T: IntrinsicTable>(
        &mut self,
        context: &mut VmContext<R, T>,
    ) -> Result<Status, RepoError> {
        while self.is_runnable() {
            self.step(context);
        }
        #[cfg(debug_assertions)]
        eprintln!();

        match self.task.status() {
            Status::Active => context.repository.publish_event(&self.suspension_event())?,
            Status::Waiting => context
                .repository
                .queue_message(wait_queue(), &self.task.to_document())?,
            Status::Done => context.repository.publish_event(&self.completion_event())?,
        }
        Ok(self.task.status())
    }

    /// Builds the `$suspension` event carrying the full serialized task context.
    fn suspension_event(&self) -> Value {
        Value::catalog([
            (Symbol::from("eventType"), Value::symbol("suspension")),
            (Symbol::from("taskTag"), Value::Tag(self.task.task_tag())),
            (Symbol::from("taskContext"), self.task.to_document()),
        ])
    }

    /// Builds the `$completion` event carrying the task outcome.
    fn completion_event(&self) -> Value {
        let mut assoc = vec![
            (Symbol::from("eventType"), Value::symbol("completion")),
            (Symbol::from("taskTag"), Value::Tag(self.task.task_tag())),
            (Symbol::from("accountTag"), Value::Tag(self.task.account_tag())),
            (Symbol::from("accountBalance"), Value::number(self.task.balance() as f64)),
            (Symbol::from("clockCycles"), Value::number(self.task.cycles() as f64)),
        ];
        if let Some(result) = self.task.result() {
            assoc.push((Symbol::from("result"), result.clone()));
        }
        if let Some(exception) = self.task.exception() {
            assoc.push((Symbol::from("exception"), exception.clone()));
        }
        Value::Catalog(assoc)
    }
}
