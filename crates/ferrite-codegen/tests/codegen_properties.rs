// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Whole-program properties of the compiler, exercised through the public
//! API only.

use std::collections::HashSet;
use std::sync::Mutex;

use ferrite_codegen::ast::build::*;
use ferrite_codegen::ast::{BinaryOperator, Program, UpdateOperator, VariableKind};
use ferrite_codegen::compiler::{CompileQueue, CompiledFunction, JobState, OpCode};
use ferrite_codegen::{CompileMode, CompiledProgram, Compiler, CompilerContext, CompilerOptions, SourceUnit};

fn compile(program: Program) -> CompiledProgram {
    Compiler::new(CompilerOptions::default())
        .compile(program)
        .expect("Compilation should succeed")
}

/// A program touching most of the lowering paths.
fn kitchen_sink() -> Program {
    module(vec![
        let_decl("total", Some(num(0.0))),
        for_loop(
            Some(let_decl("i", Some(num(0.0)))),
            Some(binary(BinaryOperator::LessThan, ident("i"), num(10.0))),
            Some(update(UpdateOperator::Increment, ident("i"), false)),
            block(vec![
                expr_stmt(arrow(vec![], ident("i"))),
                if_stmt(
                    binary(BinaryOperator::StrictEqual, ident("i"), num(3.0)),
                    cont(None),
                    None,
                ),
            ]),
        ),
        for_of(
            VariableKind::Const,
            "x",
            array(vec![num(1.0), num(2.0)]),
            block(vec![try_stmt(
                vec![expr_stmt(call(ident("f"), vec![ident("x")]))],
                Some((Some("e"), vec![brk(None)])),
                Some(vec![expr_stmt(call(ident("g"), vec![]))]),
            )]),
        ),
        switch(
            ident("total"),
            vec![
                case(Some(num(1.0)), vec![brk(None)]),
                case(None, vec![expr_stmt(num(2.0))]),
            ],
        ),
        pattern_decl(
            VariableKind::Let,
            array_pat(vec![Some(element(pat("a"))), None], Some(pat("rest"))),
            ident("xs"),
        ),
        generator_decl("gen", vec![], vec![expr_stmt(yield_expr(Some(num(1.0))))]),
        async_decl("run", vec!["p"], vec![ret(Some(await_expr(ident("p"))))]),
        expr_stmt(chain(optional_member(ident("o"), "p"))),
    ])
}

fn registers_used(func: &CompiledFunction) -> impl Iterator<Item = u16> + '_ {
    func.instructions.iter().flat_map(|insn| {
        let regs: Vec<u16> = match &insn.opcode {
            OpCode::Lda(reg) | OpCode::Sta(reg) => vec![reg.0],
            OpCode::Mov { dst, src } => vec![dst.0, src.0],
            OpCode::Binary { lhs, .. } => vec![lhs.0],
            OpCode::LdObjByName { obj, .. } | OpCode::StObjByName { obj, .. } => vec![obj.0],
            // Highest register of the argument window
            OpCode::Call { start, argc } => vec![start.0 + *argc],
            OpCode::CallThis { start, argc } | OpCode::NewObj { start, argc } => vec![start.0 + 1 + *argc],
            OpCode::IteratorNext { iter } | OpCode::CloseIterator { iter } => vec![iter.0],
            _ => vec![],
        };
        regs
    })
}

#[test]
fn test_registers_stay_within_frame() {
    let compiled = compile(kitchen_sink());
    for func in &compiled.functions {
        for reg in registers_used(func) {
            assert!(
                u32::from(reg) < func.register_count,
                "{} uses v{} with {} registers",
                func.name,
                reg,
                func.register_count
            );
        }
    }
}

#[test]
fn test_branch_targets_resolved_inside_function() {
    let compiled = compile(kitchen_sink());
    for func in &compiled.functions {
        let end = func.instructions.len() as u32;
        for insn in &func.instructions {
            if let Some(label) = insn.opcode.branch_target() {
                let offset = func.label_offset(label).expect("unbound label");
                assert!(offset <= end);
            }
        }
        for entry in &func.catch_table {
            assert!(entry.try_begin < entry.try_end);
            assert!(entry.try_end <= end);
            assert!(entry.handler < end);
        }
    }
}

#[test]
fn test_every_function_ends_in_terminator() {
    let compiled = compile(kitchen_sink());
    for func in &compiled.functions {
        let last = &func.instructions.last().expect("empty function").opcode;
        assert!(last.is_terminator(), "{} ends with {:?}", func.name, last);
    }
}

#[test]
fn test_compilation_is_deterministic() {
    let first = compile(kitchen_sink());
    for threads in [1, 2, 8] {
        let again = Compiler::new(CompilerOptions {
            threads,
            ..CompilerOptions::default()
        })
        .compile(kitchen_sink())
        .unwrap();
        assert_eq!(first, again, "output differs with {} threads", threads);
    }
}

#[test]
fn test_merge_mode_is_equivalent() {
    let merged = Compiler::new(CompilerOptions {
        mode: CompileMode::Merge,
        ..CompilerOptions::default()
    })
    .compile(kitchen_sink())
    .unwrap();
    assert_eq!(compile(kitchen_sink()), merged);
}

#[test]
fn test_literal_indices_unique_across_units() {
    let units: Vec<SourceUnit> = (0..6)
        .map(|n| {
            let program = module(vec![
                expr_stmt(array(vec![num(f64::from(n)), string("a")])),
                expr_stmt(array(vec![boolean(true)])),
            ]);
            SourceUnit::new(format!("unit{}.js", n), program).unwrap()
        })
        .collect();
    let compiled = Compiler::new(CompilerOptions::default()).compile_units(&units).unwrap();

    let indices: HashSet<u32> = compiled.literal_buffers.iter().map(|buffer| buffer.index).collect();
    assert_eq!(indices.len(), 12);
    for func in &compiled.functions {
        for insn in &func.instructions {
            if let OpCode::CreateArrayWithBuffer(index) = insn.opcode {
                assert!(compiled.literal_buffer(index).is_some());
            }
        }
    }
}

#[test]
fn test_failing_unit_does_not_stop_others() {
    let good = |name: &str| {
        SourceUnit::new(
            name,
            module(vec![function_decl("f", vec![], vec![ret(Some(num(1.0)))])]),
        )
        .unwrap()
    };
    let bad = SourceUnit::new(
        "bad.js",
        module(vec![function_decl("h", vec![], vec![expr_stmt(yield_expr(None))])]),
    )
    .unwrap();
    let units = vec![good("a.js"), bad, good("b.js")];

    let ctx = CompilerContext::new(CompilerOptions::default());
    let err = Compiler::new(CompilerOptions::default())
        .compile_into(&ctx, &units)
        .unwrap_err();
    assert!(err.is_internal());

    // Every function but `h` was emitted
    let emitted = ctx.drain_functions();
    assert_eq!(emitted.len(), 5);
    assert!(emitted.iter().all(|code| code.name != "h"));
}

#[test]
fn test_linking_is_all_or_nothing() {
    let units = vec![
        SourceUnit::new("ok.js", module(vec![expr_stmt(num(1.0))])).unwrap(),
        SourceUnit::new("bad.js", module(vec![brk(None)])).unwrap(),
    ];
    let result = Compiler::new(CompilerOptions::default()).compile_units(&units);
    assert!(result.is_err());
}

#[test]
fn test_queue_dependencies_order_jobs() {
    let log = Mutex::new(Vec::new());
    let queue = CompileQueue::new();
    let first = {
        let log = &log;
        queue.schedule("first", move || {
            log.lock().unwrap().push("first");
            Ok(())
        })
    };
    let second = {
        let log = &log;
        queue.schedule("second", move || {
            log.lock().unwrap().push("second");
            Ok(())
        })
    };
    queue.depends_on(first, second);
    queue.run(2).unwrap();

    assert_eq!(queue.state(first), JobState::Completed);
    assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
}

#[test]
fn test_program_accepted_as_json() {
    let json = r#"{
        "kind": "Module",
        "body": [
            { "Expression": { "expression": { "Literal": { "Number": 7.0 } } } }
        ]
    }"#;
    let program: Program = serde_json::from_str(json).unwrap();
    let compiled = compile(program);
    let main = compiled.function("<main>").unwrap();
    let ops: Vec<&OpCode> = main.instructions.iter().map(|insn| &insn.opcode).collect();
    assert_eq!(ops, vec![&OpCode::LdaInt(7), &OpCode::ReturnUndefined]);
}

#[test]
fn test_listing_names_every_function() {
    let listing = compile(kitchen_sink()).to_string();
    for name in ["<main>", "gen", "run"] {
        assert!(listing.contains(&format!("function {} ", name)), "missing {}", name);
    }
}
