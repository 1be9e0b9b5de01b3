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

//! Runs a two-instruction procedure which returns a `$hello` symbol, printing the bytecode
//! listing, the execution outcome and the published completion event.

use bvm::isa::opcodes::{HANDLE_RESULT, PUSH_ELEMENT};
use bvm::{
    encode, Bytecode, Citation, Frame, MemRepository, NoIntrinsics, Operation, Symbol, Tag, Task,
    Value, Version, Vm, VmContext,
};

fn main() {
    let bytecode = Bytecode::with([
        encode(Operation::Push, PUSH_ELEMENT, 1),
        encode(Operation::Handle, HANDLE_RESULT, 0),
    ]);
    println!("{}", bytecode.disassemble());

    let type_doc = Value::catalog([
        (Symbol::from("literalValues"), Value::list([Value::symbol("hello")])),
        (
            Symbol::from("procedureDefinitions"),
            Value::catalog([(
                Symbol::from("greet"),
                Value::catalog([(
                    Symbol::from("bytecodeInstructions"),
                    Value::Binary(bytecode.to_bytes()),
                )]),
            )]),
        ),
    ]);

    let type_ref = Citation::draft(Tag::from([0xBA; 32]), Version::default());
    let frame = Frame::with(type_ref, &type_doc, 1, Value::NONE, vec![])
        .expect("the type document defines procedure 1");
    let task = Task::new(Tag::from([0x01; 32]), Tag::from([0x02; 32]), 100, frame);

    let mut repo = MemRepository::new();
    let mut intrinsics = NoIntrinsics;
    let mut context = VmContext {
        repository: &mut repo,
        intrinsics: &mut intrinsics,
    };

    let mut vm = Vm::with(task);
    let status = vm.run(&mut context).expect("the in-memory repository never fails");

    println!("status: {status}");
    if let Some(result) = vm.task.result() {
        println!("result: {result}");
    }
    for event in repo.events() {
        println!("event:  {event}");
    }
}
