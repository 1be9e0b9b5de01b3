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

use super::Instr;
use crate::core::{Frame, Task};
use crate::data::{Citation, DocDigest, Value};
use crate::repo::{IntrinsicTable, RepoError, Repository};

/// Machine movement after instruction execution.
///
/// The dispatcher advances the next-instruction pointer right after the fetch; a branching
/// handler therefore stores its target verbatim through [`ExecStep::Jump`] and no further
/// increment is applied.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ExecStep {
    /// Proceed to the next instruction.
    Next,

    /// Transfer control to an absolute 1-based address within the current frame.
    Jump(u16),

    /// Park the task until a message arrives; the current instruction is re-attempted on resume.
    Wait,

    /// Raise an exception and run the handler-unwinding mechanism.
    Throw(Value),

    /// The task terminated; its result or exception is already recorded.
    Stop,
}

/// External collaborators accessible to the executing machine.
///
/// Passed to every instruction explicitly; the machine holds no hidden bindings to the
/// environment it runs in.
pub struct VmContext<'ctx, R: Repository, T: IntrinsicTable> {
    pub repository: &'ctx mut R,
    pub intrinsics: &'ctx mut T,
}

pub(crate) fn invalid_bytecode() -> Value { Value::symbol("invalidBytecode") }
fn stack_underflow() -> Value { Value::symbol("stackUnderflow") }
fn not_a_reference() -> Value { Value::symbol("notAReference") }
fn repository_failure() -> Value { Value::symbol("repositoryFailure") }

impl Instr {
    /// Executes the instruction against a task, taking its stacks and the current procedure
    /// context as input and output.
    pub fn exec<R: Repository, T: IntrinsicTable>(
        self,
        task: &mut Task,
        context: &mut VmContext<R, T>,
    ) -> ExecStep {
        match self {
            Instr::Skip => ExecStep::Next,
            Instr::Jump { addr } => ExecStep::Jump(addr),
            Instr::JumpOnNone { addr } => jump_if(task, addr, Value::NONE),
            Instr::JumpOnTrue { addr } => jump_if(task, addr, Value::TRUE),
            Instr::JumpOnFalse { addr } => jump_if(task, addr, Value::FALSE),

            Instr::PushHandler { addr } => {
                task.push_handler(addr);
                ExecStep::Next
            }
            Instr::PushElement { index } => push_literal(task, index, false),
            Instr::PushCode { index } => push_literal(task, index, true),

            Instr::PopHandler => match task.pop_handler() {
                Some(_) => ExecStep::Next,
                None => ExecStep::Throw(stack_underflow()),
            },
            Instr::PopComponent => match task.pop_component() {
                Some(_) => ExecStep::Next,
                None => ExecStep::Throw(stack_underflow()),
            },

            Instr::LoadVariable { index } => match task.frame().variable(index).cloned() {
                Some(value) => {
                    task.push_component(value);
                    ExecStep::Next
                }
                None => ExecStep::Throw(invalid_bytecode()),
            },
            Instr::LoadParameter { index } => match task.frame().parameter(index).cloned() {
                Some(value) => {
                    task.push_component(value);
                    ExecStep::Next
                }
                None => ExecStep::Throw(invalid_bytecode()),
            },
            Instr::LoadDocument { index } => load_document(task, index, context),
            Instr::LoadMessage { index } => load_message(task, index, context),

            Instr::StoreVariable { index } => {
                let Some(value) = task.pop_component() else {
                    return ExecStep::Throw(stack_underflow());
                };
                match task.frame_mut().set_variable(index, value) {
                    true => ExecStep::Next,
                    false => ExecStep::Throw(invalid_bytecode()),
                }
            }
            Instr::StoreDocument { index } => store_document(task, index, context),
            Instr::StoreDraft { index } => store_draft(task, index, context),
            Instr::StoreMessage { index } => store_message(task, index, context),

            Instr::Invoke { index, arity } => invoke(task, index, arity, context),

            Instr::Execute { index } => execute(task, index, false, false, context),
            Instr::ExecuteWith { index } => execute(task, index, false, true, context),
            Instr::ExecuteOn { index } => execute(task, index, true, false, context),
            Instr::ExecuteOnWith { index } => execute(task, index, true, true, context),

            Instr::HandleException => match task.pop_component() {
                Some(exception) => ExecStep::Throw(exception),
                None => ExecStep::Throw(stack_underflow()),
            },
            Instr::HandleResult => handle_result(task),

            Instr::Reserved(_) => ExecStep::Throw(invalid_bytecode()),
        }
    }
}

/// Runs the exception-unwinding mechanism.
///
/// One-shot handler discipline: the innermost handler installed by a still-live frame is
/// removed from the handler stack and receives control with the exception pushed onto the
/// shared component stack. Frames without live handlers are abandoned together with their
/// handler-stack segment. An exception unwinding past the bottom frame terminates the task.
pub(crate) fn unwind(task: &mut Task, exception: Value) -> ExecStep {
    loop {
        if let Some(addr) = task.pop_handler() {
            task.push_component(exception);
            return ExecStep::Jump(addr);
        }
        task.pop_frame();
        if task.frames().is_empty() {
            task.set_exception(exception);
            return ExecStep::Stop;
        }
    }
}

fn jump_if(task: &mut Task, addr: u16, expected: Value) -> ExecStep {
    match task.pop_component() {
        Some(condition) if condition == expected => ExecStep::Jump(addr),
        Some(_) => ExecStep::Next,
        None => ExecStep::Throw(stack_underflow()),
    }
}

fn push_literal(task: &mut Task, index: u16, expect_code: bool) -> ExecStep {
    let Some(literal) = task.frame().literal(index).cloned() else {
        return ExecStep::Throw(invalid_bytecode());
    };
    if matches!(literal, Value::Code(_)) != expect_code {
        return ExecStep::Throw(invalid_bytecode());
    }
    task.push_component(literal);
    ExecStep::Next
}

/// Fetches a document through the repository: drafts by tag and version, committed content by
/// its citation, verifying the content digest.
fn fetch<R: Repository>(repository: &mut R, citation: &Citation) -> Result<Value, RepoError> {
    let document = if citation.is_draft() {
        repository.retrieve_draft(citation.tag, &citation.version)?
    } else {
        repository.retrieve_document(citation)?
    };
    if let Some(digest) = citation.digest {
        if DocDigest::of(document.to_string()) != digest {
            return Err(RepoError::NotFound(citation.clone()));
        }
    }
    Ok(document)
}

fn load_document<R: Repository, T: IntrinsicTable>(
    task: &mut Task,
    index: u16,
    context: &mut VmContext<R, T>,
) -> ExecStep {
    let Some(variable) = task.frame().variable(index) else {
        return ExecStep::Throw(invalid_bytecode());
    };
    let Some(citation) = variable.as_reference().cloned() else {
        return ExecStep::Throw(not_a_reference());
    };
    match fetch(context.repository, &citation) {
        Ok(document) => {
            task.push_component(document);
            ExecStep::Next
        }
        Err(_) => ExecStep::Throw(repository_failure()),
    }
}

fn load_message<R: Repository, T: IntrinsicTable>(
    task: &mut Task,
    index: u16,
    context: &mut VmContext<R, T>,
) -> ExecStep {
    let Some(variable) = task.frame().variable(index) else {
        return ExecStep::Throw(invalid_bytecode());
    };
    let Some(queue) = variable.as_tag() else {
        return ExecStep::Throw(not_a_reference());
    };
    match context.repository.receive_message(queue) {
        Ok(Some(message)) => {
            task.push_component(message);
            ExecStep::Next
        }
        Ok(None) => ExecStep::Wait,
        Err(_) => ExecStep::Throw(repository_failure()),
    }
}

fn store_document<R: Repository, T: IntrinsicTable>(
    task: &mut Task,
    index: u16,
    context: &mut VmContext<R, T>,
) -> ExecStep {
    let Some(document) = task.pop_component() else {
        return ExecStep::Throw(stack_underflow());
    };
    let Some(variable) = task.frame().variable(index) else {
        return ExecStep::Throw(invalid_bytecode());
    };
    let Some(citation) = variable.as_reference().cloned() else {
        return ExecStep::Throw(not_a_reference());
    };
    match context.repository.commit_document(citation.tag, &citation.version, &document) {
        Ok(committed) => {
            // the cell keeps citing the same document, now at its committed content
            task.frame_mut().set_variable(index, Value::Reference(committed));
            ExecStep::Next
        }
        Err(_) => ExecStep::Throw(repository_failure()),
    }
}

fn store_draft<R: Repository, T: IntrinsicTable>(
    task: &mut Task,
    index: u16,
    context: &mut VmContext<R, T>,
) -> ExecStep {
    let Some(document) = task.pop_component() else {
        return ExecStep::Throw(stack_underflow());
    };
    let Some(variable) = task.frame().variable(index) else {
        return ExecStep::Throw(invalid_bytecode());
    };
    let Some(citation) = variable.as_reference().cloned() else {
        return ExecStep::Throw(not_a_reference());
    };
    match context.repository.save_draft(citation.tag, &citation.version, &document) {
        Ok(()) => ExecStep::Next,
        Err(_) => ExecStep::Throw(repository_failure()),
    }
}

fn store_message<R: Repository, T: IntrinsicTable>(
    task: &mut Task,
    index: u16,
    context: &mut VmContext<R, T>,
) -> ExecStep {
    let Some(message) = task.pop_component() else {
        return ExecStep::Throw(stack_underflow());
    };
    let Some(variable) = task.frame().variable(index) else {
        return ExecStep::Throw(invalid_bytecode());
    };
    let Some(queue) = variable.as_tag() else {
        return ExecStep::Throw(not_a_reference());
    };
    match context.repository.queue_message(queue, &message) {
        Ok(()) => ExecStep::Next,
        Err(_) => ExecStep::Throw(repository_failure()),
    }
}

fn invoke<R: Repository, T: IntrinsicTable>(
    task: &mut Task,
    index: u16,
    arity: u8,
    context: &mut VmContext<R, T>,
) -> ExecStep {
    // the first pop is argument 1, the second pop argument 2, the third pop argument 3
    let mut args = Vec::with_capacity(arity as usize);
    for _ in 0..arity {
        match task.pop_component() {
            Some(arg) => args.push(arg),
            None => return ExecStep::Throw(stack_underflow()),
        }
    }
    match context.intrinsics.invoke(index, args) {
        Ok(result) => {
            task.push_component(result);
            ExecStep::Next
        }
        Err(exception) => ExecStep::Throw(exception),
    }
}

fn execute<R: Repository, T: IntrinsicTable>(
    task: &mut Task,
    index: u16,
    on_target: bool,
    with_parameters: bool,
    context: &mut VmContext<R, T>,
) -> ExecStep {
    let Some(component) = task.pop_component() else {
        return ExecStep::Throw(stack_underflow());
    };
    let (target, citation) = if on_target {
        let Some(citation) = component.get_attribute("type").and_then(Value::as_reference).cloned()
        else {
            return ExecStep::Throw(not_a_reference());
        };
        (component, citation)
    } else {
        let Some(citation) = component.as_reference().cloned() else {
            return ExecStep::Throw(not_a_reference());
        };
        (Value::NONE, citation)
    };
    let parameters = if with_parameters {
        match task.pop_component() {
            Some(Value::List(items)) => items,
            Some(_) => return ExecStep::Throw(invalid_bytecode()),
            None => return ExecStep::Throw(stack_underflow()),
        }
    } else {
        vec![]
    };
    let type_doc = match fetch(context.repository, &citation) {
        Ok(document) => document,
        Err(_) => return ExecStep::Throw(repository_failure()),
    };
    match Frame::with(citation, &type_doc, index, target, parameters) {
        Ok(frame) => {
            task.push_frame(frame);
            ExecStep::Next
        }
        Err(_) => ExecStep::Throw(invalid_bytecode()),
    }
}

fn handle_result(task: &mut Task) -> ExecStep {
    let Some(result) = task.pop_component() else {
        return ExecStep::Throw(stack_underflow());
    };
    task.pop_frame();
    if task.frames().is_empty() {
        task.set_result(result);
        return ExecStep::Stop;
    }
    // the shared stack leaves the result in place for the caller to observe
    task.push_component(result);
    ExecStep::Next
}
