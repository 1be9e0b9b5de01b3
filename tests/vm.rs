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

//! End-to-end task execution scenarios.

use bvm::isa::opcodes::*;
use bvm::{
    encode, wait_queue, Bytecode, Citation, Frame, MemRepository, NoIntrinsics, Operation,
    Repository, Status, Symbol, Tag, Task, Value, Version, Vm, VmContext,
};

fn tag(fill: u8) -> Tag { Tag::from([fill; 32]) }

/// Builds a single-procedure type document with the given literal table, variable cell count
/// and bytecode.
fn type_document(literals: Vec<Value>, variables: usize, words: Vec<u16>) -> Value {
    Value::catalog([
        (Symbol::from("literalValues"), Value::List(literals)),
        (
            Symbol::from("procedureDefinitions"),
            Value::catalog([(
                Symbol::from("main"),
                Value::catalog([
                    (
                        Symbol::from("bytecodeInstructions"),
                        Value::Binary(Bytecode::with(words).to_bytes()),
                    ),
                    (
                        Symbol::from("variableValues"),
                        Value::List(vec![Value::NONE; variables]),
                    ),
                    (Symbol::from("parameterValues"), Value::list([])),
                ]),
            )]),
        ),
    ])
}

fn entry_frame(literals: Vec<Value>, variables: usize, words: Vec<u16>) -> Frame {
    let type_ref = Citation::draft(tag(0x42), Version::default());
    let type_doc = type_document(literals, variables, words);
    Frame::with(type_ref, &type_doc, 1, Value::NONE, vec![]).unwrap()
}

fn task_with(frame: Frame, balance: u64) -> Task {
    Task::new(tag(0x01), tag(0x02), balance, frame)
}

fn run(vm: &mut Vm, repo: &mut MemRepository) -> Status {
    let mut intrinsics = NoIntrinsics;
    let mut context = VmContext {
        repository: repo,
        intrinsics: &mut intrinsics,
    };
    vm.run(&mut context).unwrap()
}

#[test]
fn noop_step_and_suspension() {
    let frame = entry_frame(vec![], 0, vec![SKIP_INSTRUCTION]);
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();
    let mut intrinsics = NoIntrinsics;
    let mut context = VmContext {
        repository: &mut repo,
        intrinsics: &mut intrinsics,
    };

    vm.step(&mut context);
    assert_eq!(vm.task.frame().next_address(), 2);
    assert_eq!(vm.task.balance(), 9);
    assert_eq!(vm.task.cycles(), 1);
    assert_eq!(vm.task.status(), Status::Active);

    // no more instructions: the task checkpoints with a suspension event
    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Active);
    assert_eq!(repo.events().len(), 1);
    let event = &repo.events()[0];
    assert_eq!(event.get_attribute("eventType"), Some(&Value::symbol("suspension")));
    let exported = event.get_attribute("taskContext").unwrap();
    assert_eq!(Task::from_document(exported).unwrap(), vm.task);
}

#[test]
fn unconditional_jump_over_invalid_word() {
    let frame = entry_frame(vec![], 0, vec![
        encode(Operation::Jump, JUMP_ANY, 3),
        0xFFFF,
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    let mut task = task_with(frame, 10);
    task.push_component(Value::symbol("payload"));
    let mut vm = Vm::with(task);
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&Value::symbol("payload")));
    assert_eq!(vm.task.exception(), None);
    // the invalid word at address 2 was never touched
    assert_eq!(vm.task.cycles(), 2);
}

#[test]
fn push_element_and_return() {
    let frame = entry_frame(vec![Value::symbol("hello")], 0, vec![
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&Value::symbol("hello")));

    // the completion event carries the task outcome
    let event = &repo.events()[0];
    assert_eq!(event.get_attribute("eventType"), Some(&Value::symbol("completion")));
    assert_eq!(event.get_attribute("taskTag"), Some(&Value::Tag(tag(0x01))));
    assert_eq!(event.get_attribute("accountTag"), Some(&Value::Tag(tag(0x02))));
    assert_eq!(event.get_attribute("accountBalance"), Some(&Value::number(8.0)));
    assert_eq!(event.get_attribute("clockCycles"), Some(&Value::number(2.0)));
    assert_eq!(event.get_attribute("result"), Some(&Value::symbol("hello")));
}

#[test]
fn exception_recovery_via_handler() {
    let frame = entry_frame(
        vec![Value::symbol("boom"), Value::symbol("recovered")],
        0,
        vec![
            encode(Operation::Push, PUSH_HANDLER, 4),
            encode(Operation::Push, PUSH_ELEMENT, 1),
            encode(Operation::Handle, HANDLE_EXCEPTION, 0),
            encode(Operation::Push, PUSH_ELEMENT, 2),
            encode(Operation::Handle, HANDLE_RESULT, 0),
        ],
    );
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&Value::symbol("recovered")));
    assert_eq!(vm.task.exception(), None);
    // the handled exception is still on the stack under the popped result
    assert_eq!(vm.task.components(), &[Value::symbol("boom")]);
    assert!(vm.task.handlers().is_empty());
}

#[test]
fn conditional_jump_on_false_taken() {
    let frame = entry_frame(
        vec![Value::symbol("bad"), Value::symbol("good"), Value::FALSE],
        0,
        vec![
            encode(Operation::Push, PUSH_ELEMENT, 3),
            encode(Operation::Jump, JUMP_ON_FALSE, 5),
            encode(Operation::Push, PUSH_ELEMENT, 1),
            encode(Operation::Handle, HANDLE_RESULT, 0),
            encode(Operation::Push, PUSH_ELEMENT, 2),
            encode(Operation::Handle, HANDLE_RESULT, 0),
        ],
    );
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&Value::symbol("good")));
}

#[test]
fn load_message_on_empty_queue_waits() {
    let queue = tag(0x55);
    let mut frame = entry_frame(vec![], 1, vec![encode(Operation::Load, LOAD_MESSAGE, 1)]);
    frame.set_variable(1, Value::Tag(queue));
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Waiting);
    // the instruction will be re-attempted on resume
    assert_eq!(vm.task.frame().next_address(), 1);
    assert_eq!(vm.task.balance(), 9);
    assert_eq!(vm.task.cycles(), 1);

    // the task is parked on the well-known wait queue
    let parked = repo.queue(wait_queue());
    assert_eq!(parked.len(), 1);
    assert_eq!(Task::from_document(&parked[0]).unwrap(), vm.task);
    assert!(repo.events().is_empty());
}

#[test]
fn waiting_task_resumes_when_message_arrives() {
    let queue = tag(0x55);
    let mut frame = entry_frame(vec![], 1, vec![
        encode(Operation::Load, LOAD_MESSAGE, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    frame.set_variable(1, Value::Tag(queue));
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    assert_eq!(run(&mut vm, &mut repo), Status::Waiting);

    // a message arrives; the parked context is picked up by some processor and resumed
    let parked = repo.queue(wait_queue());
    let mut resumed = Vm::import(&parked[0]).unwrap();
    resumed.task.activate();
    let mut intrinsics = NoIntrinsics;
    let mut context = VmContext {
        repository: &mut repo,
        intrinsics: &mut intrinsics,
    };
    context.repository.queue_message(queue, &Value::text("wake up")).unwrap();

    resumed.run(&mut context).unwrap();
    assert_eq!(resumed.task.status(), Status::Done);
    assert_eq!(resumed.task.result(), Some(&Value::text("wake up")));
}

#[test]
fn procedure_call_and_return() {
    let mut repo = MemRepository::new();

    // the callee type lives in the repository
    let callee_doc = type_document(vec![Value::symbol("hello")], 0, vec![
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    let callee_ref = repo
        .commit_document(tag(0x77), &Version::default(), &callee_doc)
        .unwrap();

    let frame = entry_frame(vec![Value::Reference(callee_ref)], 0, vec![
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Execute, EXECUTE_ANY, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    let mut vm = Vm::with(task_with(frame, 10));

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&Value::symbol("hello")));
    // five instructions: push, execute, callee push, callee return, caller return
    assert_eq!(vm.task.cycles(), 5);
}

#[test]
fn callee_exception_handled_by_caller() {
    let mut repo = MemRepository::new();

    let callee_doc = type_document(vec![Value::symbol("boom")], 0, vec![
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Handle, HANDLE_EXCEPTION, 0),
    ]);
    let callee_ref = repo
        .commit_document(tag(0x77), &Version::default(), &callee_doc)
        .unwrap();

    let frame = entry_frame(
        vec![Value::Reference(callee_ref), Value::symbol("handled")],
        0,
        vec![
            encode(Operation::Push, PUSH_HANDLER, 5),
            encode(Operation::Push, PUSH_ELEMENT, 1),
            encode(Operation::Execute, EXECUTE_ANY, 1),
            encode(Operation::Handle, HANDLE_RESULT, 0),
            encode(Operation::Pop, POP_COMPONENT, 0),
            encode(Operation::Push, PUSH_ELEMENT, 2),
            encode(Operation::Handle, HANDLE_RESULT, 0),
        ],
    );
    let mut vm = Vm::with(task_with(frame, 20));

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&Value::symbol("handled")));
    assert_eq!(vm.task.frames().len(), 0);
    assert!(vm.task.handlers().is_empty());
}

#[test]
fn method_call_on_target_with_parameters() {
    let mut repo = MemRepository::new();

    // the method returns its first parameter
    let method_doc = type_document(vec![], 0, vec![
        encode(Operation::Load, LOAD_PARAMETER, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    let method_ref = repo
        .commit_document(tag(0x77), &Version::default(), &method_doc)
        .unwrap();

    let target = Value::catalog([
        (Symbol::from("type"), Value::Reference(method_ref)),
        (Symbol::from("state"), Value::number(1.0)),
    ]);
    let parameters = Value::list([Value::text("first"), Value::text("second")]);

    // the parameter list goes under the target on the stack
    let frame = entry_frame(vec![parameters, target], 0, vec![
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Push, PUSH_ELEMENT, 2),
        encode(Operation::Execute, EXECUTE_ON_TARGET_WITH_PARAMETERS, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    let mut vm = Vm::with(task_with(frame, 20));

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&Value::text("first")));
}

#[test]
fn draft_save_and_reload() {
    let draft_ref = Citation::draft(tag(0x66), Version::default());
    let document = Value::catalog([(Symbol::from("note"), Value::text("work in progress"))]);

    let mut frame = entry_frame(vec![document.clone()], 1, vec![
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Store, STORE_DRAFT, 1),
        encode(Operation::Load, LOAD_DOCUMENT, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    frame.set_variable(1, Value::Reference(draft_ref));
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), Some(&document));
    assert_eq!(repo.retrieve_draft(tag(0x66), &Version::default()).unwrap(), document);
}

#[test]
fn unhandled_exception_terminates_the_task() {
    let frame = entry_frame(vec![], 0, vec![encode(Operation::Pop, POP_COMPONENT, 0)]);
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    // popping an empty stack is a fatal fault
    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.result(), None);
    assert_eq!(vm.task.exception(), Some(&Value::symbol("stackUnderflow")));

    let event = &repo.events()[0];
    assert_eq!(event.get_attribute("eventType"), Some(&Value::symbol("completion")));
    assert_eq!(event.get_attribute("exception"), Some(&Value::symbol("stackUnderflow")));
}

#[test]
fn reserved_word_faults() {
    let frame = entry_frame(vec![], 0, vec![0xFFFF]);
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.exception(), Some(&Value::symbol("invalidBytecode")));
}

#[test]
fn gas_exhaustion_suspends_with_status_unchanged() {
    // an endless loop burns exactly the granted balance
    let frame = entry_frame(vec![], 0, vec![encode(Operation::Jump, JUMP_ANY, 1)]);
    let mut vm = Vm::with(task_with(frame, 5));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Active);
    assert_eq!(vm.task.balance(), 0);
    assert_eq!(vm.task.cycles(), 5);

    let event = &repo.events()[0];
    assert_eq!(event.get_attribute("eventType"), Some(&Value::symbol("suspension")));
}

#[test]
fn cancellation_by_zeroing_the_balance() {
    let queue = tag(0x55);
    let mut frame = entry_frame(vec![], 1, vec![encode(Operation::Load, LOAD_MESSAGE, 1)]);
    frame.set_variable(1, Value::Tag(queue));
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();
    assert_eq!(run(&mut vm, &mut repo), Status::Waiting);

    // a supervisor cancels the parked task by zeroing the balance on its persisted document
    let parked = repo.queue(wait_queue());
    let cancelled = Value::Catalog(
        parked[0]
            .as_catalog()
            .unwrap()
            .iter()
            .map(|(key, value)| match key.as_str() {
                "accountBalance" => (key.clone(), Value::number(0.0)),
                _ => (key.clone(), value.clone()),
            })
            .collect(),
    );

    // the next resume publishes a suspension event without executing an instruction
    let mut resumed = Vm::import(&cancelled).unwrap();
    resumed.task.activate();
    let status = run(&mut resumed, &mut repo);
    assert_eq!(status, Status::Active);
    assert_eq!(resumed.task.cycles(), 1);
    assert_eq!(repo.events().len(), 1);
    assert_eq!(
        repo.events()[0].get_attribute("eventType"),
        Some(&Value::symbol("suspension"))
    );
}

#[test]
fn checkpoint_is_indistinguishable_from_continuation() {
    let literals = vec![Value::symbol("boom"), Value::symbol("recovered")];
    let words = vec![
        encode(Operation::Push, PUSH_HANDLER, 4),
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Handle, HANDLE_EXCEPTION, 0),
        encode(Operation::Push, PUSH_ELEMENT, 2),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ];
    let mut vm = Vm::with(task_with(entry_frame(literals, 0, words), 10));
    let mut repo = MemRepository::new();
    let mut intrinsics = NoIntrinsics;
    let mut context = VmContext {
        repository: &mut repo,
        intrinsics: &mut intrinsics,
    };

    // checkpoint mid-execution, with a pending handler and a value on the stack
    vm.step(&mut context);
    vm.step(&mut context);
    let checkpoint = vm.task.to_document();

    let mut restored = Vm::import(&checkpoint).unwrap();
    assert_eq!(restored.task, vm.task);

    let mut repo2 = MemRepository::new();
    let original = run(&mut vm, &mut repo);
    let resumed = run(&mut restored, &mut repo2);
    assert_eq!(original, resumed);
    assert_eq!(vm.task.result(), restored.task.result());
    assert_eq!(vm.task.cycles(), restored.task.cycles());
    assert_eq!(vm.task.balance(), restored.task.balance());
}

#[test]
fn every_instruction_charges_gas_and_cycles() {
    let frame = entry_frame(vec![Value::symbol("x")], 1, vec![
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Store, STORE_VARIABLE, 1),
        encode(Operation::Load, LOAD_VARIABLE, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    let mut vm = Vm::with(task_with(frame, 100));
    let mut repo = MemRepository::new();
    let mut intrinsics = NoIntrinsics;
    let mut context = VmContext {
        repository: &mut repo,
        intrinsics: &mut intrinsics,
    };

    let mut executed = 0;
    while vm.is_runnable() {
        let balance = vm.task.balance();
        let cycles = vm.task.cycles();
        vm.step(&mut context);
        executed += 1;
        assert_eq!(vm.task.balance(), balance - 1);
        assert_eq!(vm.task.cycles(), cycles + 1);
    }
    assert_eq!(executed, 4);
    assert_eq!(vm.task.result(), Some(&Value::symbol("x")));
}

#[test]
fn jump_outside_the_procedure_body_faults() {
    let frame = entry_frame(vec![], 0, vec![encode(Operation::Jump, JUMP_ANY, 100)]);
    let mut vm = Vm::with(task_with(frame, 10));
    let mut repo = MemRepository::new();

    let status = run(&mut vm, &mut repo);
    assert_eq!(status, Status::Done);
    assert_eq!(vm.task.exception(), Some(&Value::symbol("invalidBytecode")));
}
