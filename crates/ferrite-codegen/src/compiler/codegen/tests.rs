// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the bytecode compiler.

use super::*;
use crate::ast::build::*;
use crate::ast::visit::collect_functions;
use crate::binder::bind;
use crate::compiler::emitter::{CompiledFunction, CompiledProgram, LiteralValue};
use crate::error::ErrorKind;
use crate::options::CompilerOptions;

fn compile_with(mut program: Program, options: CompilerOptions) -> Result<CompiledProgram> {
    let tree = bind(&mut program)?;
    let ctx = CompilerContext::new(options);
    compile_function(&ctx, &tree, 0, &program, None)?;
    for func in collect_functions(&program, tree.function_count()).into_iter().flatten() {
        compile_function(&ctx, &tree, 0, &program, Some(func))?;
    }
    ctx.finalize()
}

fn compile_source(program: Program) -> Result<CompiledProgram> {
    compile_with(program, CompilerOptions::default())
}

fn compile_ok(program: Program) -> CompiledProgram {
    compile_source(program).expect("Compilation should succeed")
}

fn function<'p>(compiled: &'p CompiledProgram, name: &str) -> &'p CompiledFunction {
    compiled
        .function(name)
        .unwrap_or_else(|| panic!("no function named {}", name))
}

fn opcodes(func: &CompiledFunction) -> Vec<OpCode> {
    func.instructions.iter().map(|insn| insn.opcode.clone()).collect()
}

fn main_ops(program: Program) -> Vec<OpCode> {
    opcodes(function(&compile_ok(program), "<main>"))
}

fn count(ops: &[OpCode], pred: impl Fn(&OpCode) -> bool) -> usize {
    ops.iter().filter(|op| pred(op)).count()
}

fn position(ops: &[OpCode], pred: impl Fn(&OpCode) -> bool) -> usize {
    ops.iter().position(pred).expect("instruction not found")
}

// ============================================================================
// Registers and variables
// ============================================================================

#[test]
fn test_compile_empty_program() {
    let compiled = compile_ok(module(vec![]));
    let main = function(&compiled, "<main>");
    assert_eq!(opcodes(main), vec![OpCode::ReturnUndefined]);
    assert_eq!(main.register_count, MANDATORY_PARAMS);
    assert_eq!(main.param_count, MANDATORY_PARAMS);
}

#[test]
fn test_let_lives_in_register() {
    let ops = main_ops(module(vec![let_decl("x", Some(num(1.0))), expr_stmt(ident("x"))]));
    assert_eq!(
        ops,
        vec![
            OpCode::LdaInt(1),
            OpCode::Sta(VReg(3)),
            OpCode::Lda(VReg(3)),
            OpCode::ReturnUndefined,
        ]
    );
}

#[test]
fn test_binary_uses_temporary() {
    let ops = main_ops(module(vec![expr_stmt(binary(BinaryOperator::Add, num(1.0), num(2.0)))]));
    assert_eq!(
        ops,
        vec![
            OpCode::LdaInt(1),
            OpCode::Sta(VReg(3)),
            OpCode::LdaInt(2),
            OpCode::Binary {
                op: BinaryOperator::Add,
                lhs: VReg(3),
            },
            OpCode::ReturnUndefined,
        ]
    );
}

#[test]
fn test_temporaries_released_between_statements() {
    let compiled = compile_ok(module(vec![
        expr_stmt(binary(BinaryOperator::Add, num(1.0), num(2.0))),
        expr_stmt(binary(BinaryOperator::Multiply, num(3.0), num(4.0))),
    ]));
    let main = function(&compiled, "<main>");
    let stores = count(&opcodes(main), |op| *op == OpCode::Sta(VReg(3)));
    assert_eq!(stores, 2);
    assert_eq!(main.register_count, 4);
}

#[test]
fn test_non_integral_number_literal() {
    let ops = main_ops(module(vec![expr_stmt(num(1.5)), expr_stmt(num(-0.0))]));
    assert_eq!(ops[0], OpCode::LdaNumber(1.5));
    assert!(matches!(ops[1], OpCode::LdaNumber(value) if value == 0.0 && value.is_sign_negative()));
}

#[test]
fn test_register_window_exhausted() {
    let options = CompilerOptions {
        max_registers: 4,
        ..CompilerOptions::default()
    };
    let program = module(vec![let_decl("x", Some(binary(BinaryOperator::Add, num(1.0), num(2.0))))]);
    let err = compile_with(program, options).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_script_globals() {
    let ops = main_ops(script(vec![var_decl("g", Some(num(1.0))), let_decl("l", Some(num(2.0)))]));
    assert!(ops.contains(&OpCode::StGlobalVar("g".into())));
    assert!(ops.contains(&OpCode::StLetToGlobalRecord("l".into())));
}

#[test]
fn test_typeof_unresolved_does_not_throw() {
    let ops = main_ops(module(vec![expr_stmt(unary(UnaryOperator::Typeof, ident("zz")))]));
    assert_eq!(
        ops,
        vec![
            OpCode::LdGlobalVar("zz".into()),
            OpCode::Unary(UnaryOperator::Typeof),
            OpCode::ReturnUndefined,
        ]
    );
}

#[test]
fn test_const_assignment_throws() {
    let ops = main_ops(module(vec![
        const_decl("c", num(1.0)),
        expr_stmt(assign(pat("c"), num(2.0))),
    ]));
    assert!(ops.contains(&OpCode::ThrowConstAssignment("c".into())));
}

// ============================================================================
// Lexical environments
// ============================================================================

#[test]
fn test_captured_let_lives_in_environment() {
    let compiled = compile_ok(module(vec![
        let_decl("x", Some(num(1.0))),
        function_decl("f", vec![], vec![ret(Some(ident("x")))]),
    ]));

    let main = opcodes(function(&compiled, "<main>"));
    assert_eq!(main[0], OpCode::NewLexEnv { slots: 1 });
    assert_eq!(main[1], OpCode::LdaHole);
    assert_eq!(main[2], OpCode::StLexVar { level: 0, slot: 0 });
    assert!(main.contains(&OpCode::DefineFunction {
        function: FunctionId(1),
        name: "f".into(),
        length: 0,
    }));

    let f = opcodes(function(&compiled, "f"));
    let load = position(&f, |op| matches!(op, OpCode::LdLexVar { level: 0, slot: 0 }));
    assert_eq!(f[load + 1], OpCode::ThrowUndefinedIfHole("x".into()));
}

#[test]
fn test_debug_info_scope_literal() {
    let program = module(vec![
        let_decl("x", Some(num(1.0))),
        function_decl("f", vec![], vec![ret(Some(ident("x")))]),
    ]);
    let compiled = compile_with(program, CompilerOptions::debug()).unwrap();
    let main = opcodes(function(&compiled, "<main>"));
    let OpCode::NewLexEnvWithScopeInfo { slots: 1, literal } = main[0] else {
        panic!("expected scope info, got {:?}", main[0]);
    };
    let buffer = compiled.literal_buffer(literal).unwrap();
    assert_eq!(
        buffer.values,
        vec![
            LiteralValue::Integer(1),
            LiteralValue::String("x".into()),
            LiteralValue::Integer(0),
        ]
    );
}

#[test]
fn test_block_environment_popped() {
    let ops = main_ops(module(vec![block(vec![
        let_decl("y", Some(num(1.0))),
        expr_stmt(arrow(vec![], ident("y"))),
    ])]));
    assert_eq!(count(&ops, |op| matches!(op, OpCode::NewLexEnv { .. })), 1);
    assert_eq!(count(&ops, |op| *op == OpCode::PopLexEnv), 1);
    assert!(position(&ops, |op| *op == OpCode::PopLexEnv) > position(&ops, |op| matches!(op, OpCode::DefineFunction { .. })));
}

#[test]
fn test_for_loop_copies_environment_per_iteration() {
    let ops = main_ops(module(vec![for_loop(
        Some(let_decl("i", Some(num(0.0)))),
        Some(binary(BinaryOperator::LessThan, ident("i"), num(3.0))),
        Some(update(UpdateOperator::Increment, ident("i"), false)),
        block(vec![expr_stmt(arrow(vec![], ident("i")))]),
    )]));

    assert_eq!(count(&ops, |op| *op == OpCode::NewLexEnv { slots: 1 }), 2);
    assert_eq!(count(&ops, |op| *op == OpCode::PopLexEnv), 2);

    // The copy happens before the update runs
    let copy = ops
        .iter()
        .rposition(|op| *op == OpCode::NewLexEnv { slots: 1 })
        .unwrap();
    let increment = position(&ops, |op| *op == OpCode::Inc);
    assert!(copy < increment);
}

#[test]
fn test_for_loop_continue_reaches_environment_copy() {
    let compiled = compile_ok(module(vec![for_loop(
        Some(let_decl("i", Some(num(0.0)))),
        Some(binary(BinaryOperator::LessThan, ident("i"), num(3.0))),
        Some(update(UpdateOperator::Increment, ident("i"), false)),
        block(vec![expr_stmt(arrow(vec![], ident("i"))), cont(None)]),
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);

    let closure = position(&ops, |op| matches!(op, OpCode::DefineFunction { .. }));
    let jump = closure + position(&ops[closure..], |op| matches!(op, OpCode::Jmp(_)));
    let OpCode::Jmp(cont) = ops[jump] else {
        unreachable!()
    };

    // The copy stashes each slot in a temporary before the update
    let copy = (jump..ops.len() - 1)
        .find(|&index| {
            ops[index] == OpCode::LdLexVar { level: 0, slot: 0 } && matches!(ops[index + 1], OpCode::Sta(_))
        })
        .expect("no environment copy");
    assert_eq!(main.label_offset(cont), Some(copy as u32));
    assert_eq!(ops[copy + 2], OpCode::PopLexEnv);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_else_layout() {
    let compiled = compile_ok(module(vec![
        let_decl("x", Some(num(0.0))),
        if_stmt(ident("x"), expr_stmt(num(1.0)), Some(expr_stmt(num(2.0)))),
    ]));
    let main = function(&compiled, "<main>");
    assert_eq!(
        opcodes(main),
        vec![
            OpCode::LdaInt(0),
            OpCode::Sta(VReg(3)),
            OpCode::Lda(VReg(3)),
            OpCode::Jfalse(Label(0)),
            OpCode::LdaInt(1),
            OpCode::Jmp(Label(1)),
            OpCode::LdaInt(2),
            OpCode::ReturnUndefined,
        ]
    );
    assert_eq!(main.label_offset(Label(0)), Some(6));
    assert_eq!(main.label_offset(Label(1)), Some(7));
}

#[test]
fn test_comparison_branches_directly() {
    let ops = main_ops(module(vec![
        let_decl("a", Some(num(1.0))),
        if_stmt(
            binary(BinaryOperator::LessThan, ident("a"), num(2.0)),
            expr_stmt(num(3.0)),
            None,
        ),
    ]));
    let compare = position(&ops, |op| matches!(op, OpCode::Binary { op: BinaryOperator::LessThan, .. }));
    assert!(matches!(ops[compare + 1], OpCode::Jfalse(_)));
}

#[test]
fn test_not_condition_inverts() {
    let ops = main_ops(module(vec![
        let_decl("a", Some(boolean(true))),
        if_stmt(unary(UnaryOperator::LogicalNot, ident("a")), expr_stmt(num(1.0)), None),
    ]));
    // No materialized negation
    assert!(!ops.contains(&OpCode::Unary(UnaryOperator::LogicalNot)));
    assert_eq!(ops[2], OpCode::Lda(VReg(3)));
    assert_eq!(ops[3], OpCode::Jfalse(Label(1)));
    assert_eq!(ops[4], OpCode::Jmp(Label(0)));
}

#[test]
fn test_while_break_and_continue() {
    let compiled = compile_ok(module(vec![
        let_decl("x", Some(boolean(true))),
        while_loop(
            ident("x"),
            block(vec![if_stmt(ident("y"), brk(None), None), cont(None)]),
        ),
    ]));
    let main = function(&compiled, "<main>");
    assert_eq!(
        opcodes(main),
        vec![
            OpCode::LdaTrue,
            OpCode::Sta(VReg(3)),
            OpCode::Lda(VReg(3)),
            OpCode::Jfalse(Label(1)),
            OpCode::TryLdGlobalByName("y".into()),
            OpCode::Jfalse(Label(2)),
            OpCode::Jmp(Label(1)),
            OpCode::Jmp(Label(0)),
            OpCode::Jmp(Label(0)),
            OpCode::ReturnUndefined,
        ]
    );
    assert_eq!(main.label_offset(Label(0)), Some(2));
    assert_eq!(main.label_offset(Label(1)), Some(9));
    assert_eq!(main.label_offset(Label(2)), Some(7));
}

#[test]
fn test_labeled_continue_targets_outer_loop() {
    let ops = main_ops(module(vec![labeled(
        "outer",
        while_loop(
            boolean(true),
            block(vec![while_loop(boolean(true), block(vec![cont(Some("outer"))]))]),
        ),
    )]));
    assert_eq!(
        ops,
        vec![
            OpCode::LdaTrue,
            OpCode::Jfalse(Label(1)),
            OpCode::LdaTrue,
            OpCode::Jfalse(Label(3)),
            OpCode::Jmp(Label(0)),
            OpCode::Jmp(Label(2)),
            OpCode::Jmp(Label(0)),
            OpCode::ReturnUndefined,
        ]
    );
}

#[test]
fn test_labeled_block_break() {
    let ops = main_ops(module(vec![labeled(
        "done",
        block(vec![brk(Some("done")), expr_stmt(num(1.0))]),
    )]));
    assert_eq!(ops[0], OpCode::Jmp(Label(0)));
    assert_eq!(ops[1], OpCode::LdaInt(1));
}

#[test]
fn test_undefined_label() {
    let err = compile_source(module(vec![while_loop(boolean(true), brk(Some("nope")))])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("nope"));
}

#[test]
fn test_continue_outside_loop() {
    let err = compile_source(module(vec![cont(None)])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn test_continue_to_labeled_block_is_illegal() {
    let program = module(vec![labeled("l", block(vec![while_loop(boolean(true), cont(Some("l")))]))]);
    let err = compile_source(program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn test_switch_first_match_layout() {
    let compiled = compile_ok(module(vec![
        let_decl("x", Some(num(2.0))),
        switch(
            ident("x"),
            vec![
                case(Some(num(1.0)), vec![expr_stmt(num(10.0))]),
                case(None, vec![expr_stmt(num(20.0))]),
                case(Some(num(2.0)), vec![expr_stmt(num(30.0)), brk(None)]),
            ],
        ),
    ]));
    let main = function(&compiled, "<main>");
    let strict_equal = OpCode::Binary {
        op: BinaryOperator::StrictEqual,
        lhs: VReg(4),
    };
    assert_eq!(
        opcodes(main),
        vec![
            OpCode::LdaInt(2),
            OpCode::Sta(VReg(3)),
            OpCode::Lda(VReg(3)),
            OpCode::Sta(VReg(4)),
            OpCode::LdaInt(1),
            strict_equal.clone(),
            OpCode::Jtrue(Label(0)),
            OpCode::LdaInt(2),
            strict_equal,
            OpCode::Jtrue(Label(2)),
            OpCode::Jmp(Label(1)),
            OpCode::LdaInt(10),
            OpCode::LdaInt(20),
            OpCode::LdaInt(30),
            OpCode::Jmp(Label(3)),
            OpCode::ReturnUndefined,
        ]
    );
    assert_eq!(main.label_offset(Label(0)), Some(11));
    assert_eq!(main.label_offset(Label(1)), Some(12));
    assert_eq!(main.label_offset(Label(2)), Some(13));
    assert_eq!(main.label_offset(Label(3)), Some(15));
}

#[test]
fn test_switch_without_default_jumps_to_end() {
    let compiled = compile_ok(module(vec![switch(
        num(1.0),
        vec![case(Some(num(1.0)), vec![expr_stmt(num(10.0))])],
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);
    let dispatch_end = position(&ops, |op| matches!(op, OpCode::Jmp(_)));
    let OpCode::Jmp(end) = ops[dispatch_end] else {
        unreachable!()
    };
    assert_eq!(main.label_offset(end), Some(ops.len() as u32 - 1));
}

#[test]
fn test_switch_duplicate_case_first_wins() {
    let compiled = compile_ok(module(vec![switch(
        num(3.0),
        vec![
            case(Some(num(3.0)), vec![expr_stmt(num(10.0))]),
            case(Some(num(1.0)), vec![expr_stmt(num(11.0))]),
            case(Some(num(3.0)), vec![expr_stmt(num(12.0))]),
            case(None, vec![expr_stmt(num(13.0))]),
        ],
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);

    let tests: Vec<Label> = ops
        .iter()
        .filter_map(|op| match op {
            OpCode::Jtrue(label) => Some(*label),
            _ => None,
        })
        .collect();
    assert_eq!(tests.len(), 3);

    let first_body = position(&ops, |op| *op == OpCode::LdaInt(10));
    let third_body = position(&ops, |op| *op == OpCode::LdaInt(12));
    assert_eq!(main.label_offset(tests[0]), Some(first_body as u32));
    assert_eq!(main.label_offset(tests[2]), Some(third_body as u32));
    assert!(first_body < third_body);
}

// ============================================================================
// Try, finally and iterators
// ============================================================================

#[test]
fn test_break_inlines_finalizer() {
    let compiled = compile_ok(module(vec![while_loop(
        boolean(true),
        block(vec![try_stmt(
            vec![expr_stmt(ident("g")), brk(None)],
            None,
            Some(vec![expr_stmt(call(ident("f"), vec![]))]),
        )]),
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);

    // Once inlined on the break, once in the exceptional path
    assert_eq!(count(&ops, |op| matches!(op, OpCode::Call { .. })), 2);
    assert_eq!(main.catch_table.len(), 1);

    // The inlined copy is not covered by its own handler
    let entry = main.catch_table[0];
    let inlined = position(&ops, |op| matches!(op, OpCode::Call { .. })) as u32;
    assert!(entry.try_end <= inlined);
    assert!(matches!(ops[entry.handler as usize], OpCode::Sta(_)));
}

#[test]
fn test_return_runs_finalizer_before_returning() {
    let compiled = compile_ok(module(vec![function_decl(
        "f",
        vec![],
        vec![try_stmt(
            vec![ret(Some(num(1.0)))],
            None,
            Some(vec![expr_stmt(call(ident("g"), vec![]))]),
        )],
    )]));
    let ops = opcodes(function(&compiled, "f"));
    let call = position(&ops, |op| matches!(op, OpCode::Call { .. }));
    let ret = position(&ops, |op| *op == OpCode::Return);
    assert!(call < ret);
    assert!(matches!(ops[ret - 1], OpCode::Lda(_)));
}

#[test]
fn test_try_catch_binds_exception() {
    let compiled = compile_ok(module(vec![try_stmt(
        vec![throw(num(1.0))],
        Some((Some("e"), vec![expr_stmt(ident("e"))])),
        None,
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);
    assert_eq!(main.catch_table.len(), 1);
    let handler = main.catch_table[0].handler as usize;
    let OpCode::Sta(exception) = ops[handler] else {
        panic!("handler starts with {:?}", ops[handler]);
    };
    assert_eq!(ops[handler + 1], OpCode::Lda(exception));
}

#[test]
fn test_nested_regions_innermost_first() {
    let compiled = compile_ok(module(vec![try_stmt(
        vec![try_stmt(vec![throw(num(1.0))], Some((None, vec![])), None)],
        Some((None, vec![])),
        None,
    )]));
    let main = function(&compiled, "<main>");
    let depths: Vec<u32> = main.catch_table.iter().map(|entry| entry.depth).collect();
    assert_eq!(depths, vec![1, 0]);
}

#[test]
fn test_for_of_break_closes_iterator() {
    let compiled = compile_ok(module(vec![for_of(
        VariableKind::Let,
        "x",
        ident("xs"),
        block(vec![brk(None)]),
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);
    // Inlined on the break and in the close handler
    assert_eq!(count(&ops, |op| matches!(op, OpCode::CloseIterator { .. })), 2);
    assert_eq!(main.catch_table.len(), 1);
}

#[test]
fn test_for_of_continue_keeps_iterator_open() {
    let ops = main_ops(module(vec![for_of(
        VariableKind::Let,
        "x",
        ident("xs"),
        block(vec![cont(None)]),
    )]));
    assert_eq!(count(&ops, |op| matches!(op, OpCode::CloseIterator { .. })), 1);
}

#[test]
fn test_break_out_of_try_closes_iterator_unprotected() {
    // for (x of xs) { try { break; } catch {} }
    let compiled = compile_ok(module(vec![for_of(
        VariableKind::Let,
        "x",
        ident("xs"),
        block(vec![try_stmt(vec![brk(None)], Some((None, vec![])), None)]),
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);

    let close = position(&ops, |op| matches!(op, OpCode::CloseIterator { .. })) as u32;
    assert!(matches!(ops[close as usize + 1], OpCode::Jmp(_)));
    for entry in &main.catch_table {
        assert!(
            close < entry.try_begin || close >= entry.try_end,
            "CloseIterator at {} covered by [{}, {})",
            close,
            entry.try_begin,
            entry.try_end
        );
    }
}

#[test]
fn test_for_in_uses_property_iterator() {
    let ops = main_ops(module(vec![for_in(
        VariableKind::Const,
        "k",
        ident("obj"),
        block(vec![]),
    )]));
    let next = position(&ops, |op| matches!(op, OpCode::GetNextPropName { .. }));
    assert!(ops.contains(&OpCode::GetPropIterator));
    assert!(matches!(ops[next + 1], OpCode::Jundefined(_)));
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_optional_chain_layout() {
    let compiled = compile_ok(module(vec![expr_stmt(chain(member(
        optional_member(ident("a"), "b"),
        "c",
    )))]));
    let main = function(&compiled, "<main>");
    assert_eq!(
        opcodes(main),
        vec![
            OpCode::TryLdGlobalByName("a".into()),
            OpCode::Jnullish(Label(0)),
            OpCode::Sta(VReg(4)),
            OpCode::LdObjByName {
                obj: VReg(4),
                name: "b".into(),
            },
            OpCode::Sta(VReg(3)),
            OpCode::LdObjByName {
                obj: VReg(3),
                name: "c".into(),
            },
            OpCode::Jmp(Label(1)),
            OpCode::LdaUndefined,
            OpCode::ReturnUndefined,
        ]
    );
    assert_eq!(main.label_offset(Label(0)), Some(7));
    assert_eq!(main.label_offset(Label(1)), Some(8));
}

#[test]
fn test_optional_hops_share_one_label() {
    let ops = main_ops(module(vec![expr_stmt(chain(optional_member(
        optional_member(ident("a"), "b"),
        "c",
    )))]));
    let targets: Vec<&OpCode> = ops.iter().filter(|op| matches!(op, OpCode::Jnullish(_))).collect();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0], targets[1]);
    assert_eq!(count(&ops, |op| *op == OpCode::LdaUndefined), 1);
}

#[test]
fn test_optional_call_guards_callee() {
    let ops = main_ops(module(vec![expr_stmt(chain(optional_call(ident("f"), vec![])))]));
    assert_eq!(ops[0], OpCode::TryLdGlobalByName("f".into()));
    assert!(matches!(ops[1], OpCode::Jnullish(_)));
}

#[test]
fn test_method_call_layout() {
    let ops = main_ops(module(vec![expr_stmt(call(member(ident("o"), "m"), vec![num(1.0)]))]));
    assert_eq!(
        ops,
        vec![
            OpCode::TryLdGlobalByName("o".into()),
            OpCode::Sta(VReg(4)),
            OpCode::LdObjByName {
                obj: VReg(4),
                name: "m".into(),
            },
            OpCode::Sta(VReg(3)),
            OpCode::LdaInt(1),
            OpCode::Sta(VReg(5)),
            OpCode::CallThis {
                start: VReg(3),
                argc: 1,
            },
            OpCode::ReturnUndefined,
        ]
    );
}

#[test]
fn test_new_passes_constructor_as_new_target() {
    let ops = main_ops(module(vec![expr_stmt(new(ident("C"), vec![]))]));
    assert_eq!(
        ops,
        vec![
            OpCode::TryLdGlobalByName("C".into()),
            OpCode::Sta(VReg(3)),
            OpCode::Sta(VReg(4)),
            OpCode::NewObj {
                start: VReg(3),
                argc: 0,
            },
            OpCode::ReturnUndefined,
        ]
    );
}

#[test]
fn test_super_call_rejected() {
    let program = module(vec![expr_stmt(Expression::Call(CallExpression {
        callee: Box::new(Expression::Super(Position::default())),
        arguments: vec![],
        optional: false,
        pos: Position::default(),
    }))]);
    let err = compile_source(program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn test_constant_array_uses_literal_buffer() {
    let compiled = compile_ok(module(vec![expr_stmt(array(vec![num(1.0), string("a")]))]));
    let ops = opcodes(function(&compiled, "<main>"));
    let OpCode::CreateArrayWithBuffer(index) = ops[0] else {
        panic!("expected literal buffer, got {:?}", ops[0]);
    };
    assert_eq!(
        compiled.literal_buffer(index).unwrap().values,
        vec![LiteralValue::Integer(1), LiteralValue::String("a".into())]
    );
}

#[test]
fn test_array_with_expressions_stores_by_index() {
    let ops = main_ops(module(vec![expr_stmt(array(vec![ident("a"), num(1.0)]))]));
    assert_eq!(ops[0], OpCode::CreateEmptyArray);
    assert!(ops.contains(&OpCode::StOwnByIndex {
        obj: VReg(3),
        index: 1,
    }));
}

#[test]
fn test_compound_assignment_reads_member_once() {
    let ops = main_ops(module(vec![expr_stmt(assign_op(
        AssignmentOperator::AddAssign,
        member_pat(ident("o"), "p"),
        num(1.0),
    ))]));
    assert_eq!(count(&ops, |op| *op == OpCode::TryLdGlobalByName("o".into())), 1);
    assert_eq!(count(&ops, |op| matches!(op, OpCode::LdObjByName { .. })), 1);
    assert_eq!(count(&ops, |op| matches!(op, OpCode::StObjByName { .. })), 1);
}

#[test]
fn test_postfix_update_returns_old_value() {
    let ops = main_ops(module(vec![
        let_decl("i", Some(num(0.0))),
        expr_stmt(update(UpdateOperator::Increment, ident("i"), false)),
    ]));
    assert_eq!(
        &ops[2..],
        &[
            OpCode::Lda(VReg(3)),
            OpCode::ToNumeric,
            OpCode::Sta(VReg(4)),
            OpCode::Inc,
            OpCode::Sta(VReg(3)),
            OpCode::Lda(VReg(4)),
            OpCode::ReturnUndefined,
        ]
    );
}

#[test]
fn test_array_destructuring() {
    let ops = main_ops(module(vec![pattern_decl(
        VariableKind::Const,
        array_pat(
            vec![Some(element(pat("a"))), Some(element_with_default(pat("b"), num(5.0)))],
            None,
        ),
        ident("xs"),
    )]));
    assert!(ops.contains(&OpCode::GetIterator));
    assert_eq!(count(&ops, |op| matches!(op, OpCode::IteratorNext { .. })), 2);
    assert_eq!(count(&ops, |op| matches!(op, OpCode::Jnotundefined(_))), 1);
    // Normal completion and the close handler
    assert_eq!(count(&ops, |op| matches!(op, OpCode::CloseIterator { .. })), 2);
}

#[test]
fn test_array_destructuring_closes_on_throw() {
    // const [a = f()] = xs;
    let compiled = compile_ok(module(vec![pattern_decl(
        VariableKind::Const,
        array_pat(vec![Some(element_with_default(pat("a"), call(ident("f"), vec![])))], None),
        ident("xs"),
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);
    assert_eq!(main.catch_table.len(), 1);
    let entry = main.catch_table[0];
    let covered = |offset: usize| entry.try_begin <= offset as u32 && (offset as u32) < entry.try_end;

    // A throwing default is covered, the iterator is flagged done first
    let default = position(&ops, |op| matches!(op, OpCode::Call { .. }));
    assert!(covered(default));
    let next = position(&ops, |op| matches!(op, OpCode::IteratorNext { .. }));
    assert!(covered(next));
    assert_eq!(ops[next - 2], OpCode::LdaTrue);
    let OpCode::Sta(done) = ops[next - 1] else {
        panic!("expected the done flag before {:?}", ops[next]);
    };

    // The normal close is outside the region
    let normal_close = position(&ops, |op| matches!(op, OpCode::CloseIterator { .. }));
    assert!(!covered(normal_close));

    let handler = entry.handler as usize;
    assert!(matches!(ops[handler], OpCode::Sta(_)));
    assert_eq!(ops[handler + 1], OpCode::Lda(done));
    assert!(matches!(ops[handler + 2], OpCode::Jtrue(_)));
    assert!(matches!(ops[handler + 3], OpCode::CloseIterator { .. }));
    assert_eq!(ops[handler + 5], OpCode::Throw);
}

#[test]
fn test_destructuring_reference_is_reusable() {
    let mut program = module(vec![pattern_decl(
        VariableKind::Let,
        object_pat(vec![("a", element(pat("a")))], None),
        ident("o"),
    )]);
    let tree = bind(&mut program).unwrap();
    let ctx = CompilerContext::new(CompilerOptions::default());
    let Statement::VariableDeclaration(decl) = &program.body[0] else {
        unreachable!()
    };

    let mut cg = CodeGen::new(&ctx, &tree, program.scope);
    cg.regs.alloc_n(MANDATORY_PARAMS).unwrap();
    cg.alloc_scope_registers(program.scope).unwrap();
    let reference = LReference::create(&mut cg, &decl.declarations[0].id, true).unwrap();
    assert!(reference.is_destructuring());

    let first = cg.code.cursor() as usize;
    reference.set_value(&mut cg).unwrap();
    let second = cg.code.cursor() as usize;
    reference.set_value(&mut cg).unwrap();

    let ops: Vec<OpCode> = cg.code.instructions.iter().map(|insn| insn.opcode.clone()).collect();
    assert!(second > first);
    assert_eq!(ops[first..second], ops[second..]);

    let err = reference.get_value(&mut cg).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_object_destructuring_with_rest() {
    let ops = main_ops(module(vec![pattern_decl(
        VariableKind::Let,
        object_pat(vec![("a", element(pat("a")))], Some(pat("rest"))),
        ident("o"),
    )]));
    assert!(ops.contains(&OpCode::ThrowPatternNonCoercible));
    assert!(ops.iter().any(|op| matches!(op, OpCode::CreateObjectWithExcludedKeys { count: 1, .. })));
}

#[test]
fn test_destructuring_compound_assignment_rejected() {
    let program = module(vec![expr_stmt(assign_op(
        AssignmentOperator::AddAssign,
        array_pat(vec![], None),
        num(1.0),
    ))]);
    let err = compile_source(program).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Semantic);
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_parameters_follow_mandatory_registers() {
    let compiled = compile_ok(module(vec![function_decl(
        "add",
        vec!["a", "b"],
        vec![ret(Some(binary(BinaryOperator::Add, ident("a"), ident("b"))))],
    )]));
    let add = function(&compiled, "add");
    assert_eq!(add.param_count, 5);
    assert_eq!(
        opcodes(add),
        vec![
            OpCode::Lda(VReg(3)),
            OpCode::Sta(VReg(5)),
            OpCode::Lda(VReg(4)),
            OpCode::Binary {
                op: BinaryOperator::Add,
                lhs: VReg(5),
            },
            OpCode::Return,
        ]
    );
}

#[test]
fn test_arrow_expression_body_returns() {
    let compiled = compile_ok(module(vec![expr_stmt(arrow(vec!["x"], ident("x")))]));
    let arrow = function(&compiled, "<anonymous#1>");
    assert_eq!(opcodes(arrow), vec![OpCode::Lda(VReg(3)), OpCode::Return]);
}

#[test]
fn test_generator_suspends_at_start() {
    let compiled = compile_ok(module(vec![generator_decl(
        "g",
        vec![],
        vec![expr_stmt(yield_expr(Some(num(1.0))))],
    )]));
    let g = function(&compiled, "g");
    let ops = opcodes(g);
    assert_eq!(g.kind, FunctionKind::Generator);
    assert!(matches!(ops[0], OpCode::CreateGeneratorObj { func: VReg(0) }));
    // Start plus one yield
    assert_eq!(count(&ops, |op| matches!(op, OpCode::SuspendGenerator { .. })), 2);
    assert!(ops.iter().any(|op| matches!(op, OpCode::CreateIterResultObj { done: false, .. })));
    assert!(ops.iter().any(|op| matches!(op, OpCode::CreateIterResultObj { done: true, .. })));
    assert_eq!(g.catch_table.len(), 1);
}

#[test]
fn test_async_function_resolves_and_rejects() {
    let compiled = compile_ok(module(vec![async_decl(
        "f",
        vec![],
        vec![expr_stmt(await_expr(num(1.0)))],
    )]));
    let f = function(&compiled, "f");
    let ops = opcodes(f);
    assert_eq!(ops[0], OpCode::AsyncFunctionEnter);
    assert!(ops.iter().any(|op| matches!(op, OpCode::AsyncFunctionAwait { .. })));
    assert!(ops.iter().any(|op| matches!(op, OpCode::AsyncFunctionResolve { .. })));
    assert!(ops.iter().any(|op| matches!(op, OpCode::AsyncFunctionReject { .. })));
    assert_eq!(f.catch_table.len(), 1);
}

#[test]
fn test_async_generator_awaits_and_settles_requests() {
    let compiled = compile_ok(module(vec![async_generator_decl(
        "g",
        vec![],
        vec![
            expr_stmt(yield_expr(Some(num(1.0)))),
            expr_stmt(await_expr(num(2.0))),
        ],
    )]));
    let g = function(&compiled, "g");
    let ops = opcodes(g);
    assert_eq!(g.kind, FunctionKind::AsyncGenerator);
    assert!(matches!(ops[0], OpCode::CreateAsyncGeneratorObj { func: VReg(0) }));

    // Start, the yield operand, the yield and the await, plus the awaited
    // operand of return() after the start and after the yield
    assert_eq!(count(&ops, |op| matches!(op, OpCode::SuspendGenerator { .. })), 6);
    assert_eq!(count(&ops, |op| matches!(op, OpCode::AsyncFunctionAwait { .. })), 4);
    assert!(!ops.iter().any(|op| matches!(op, OpCode::CreateIterResultObj { .. })));

    let first_await = position(&ops, |op| matches!(op, OpCode::AsyncFunctionAwait { .. }));
    let yielded = position(&ops, |op| matches!(op, OpCode::AsyncGeneratorResolve { done: false, .. }));
    assert!(first_await < yielded);
    assert!(ops.iter().any(|op| matches!(op, OpCode::AsyncGeneratorResolve { done: true, .. })));

    // The body region rejects the pending request
    assert_eq!(g.catch_table.len(), 1);
    let handler = g.catch_table[0].handler as usize;
    assert!(matches!(ops[handler + 3], OpCode::AsyncGeneratorReject { .. }));
    assert_eq!(ops[handler + 4], OpCode::Return);
}

#[test]
fn test_async_generator_return_awaits_operand() {
    let compiled = compile_ok(module(vec![async_generator_decl(
        "g",
        vec![],
        vec![ret(Some(ident("p")))],
    )]));
    let ops = opcodes(function(&compiled, "g"));
    let load = position(&ops, |op| *op == OpCode::TryLdGlobalByName("p".into()));
    let await_op = load + position(&ops[load..], |op| matches!(op, OpCode::AsyncFunctionAwait { .. }));
    let settle = await_op + position(&ops[await_op..], |op| matches!(op, OpCode::AsyncGeneratorResolve { done: true, .. }));
    assert_eq!(ops[settle + 1], OpCode::Return);
}

#[test]
fn test_yield_outside_generator_is_internal() {
    let program = module(vec![function_decl("f", vec![], vec![expr_stmt(yield_expr(None))])]);
    let err = compile_source(program).unwrap_err();
    assert!(err.is_internal());
}

// ============================================================================
// Classes and tagged templates
// ============================================================================

#[test]
fn test_class_named_methods_use_literal_buffer() {
    let compiled = compile_ok(module(vec![class_decl(
        "C",
        None,
        None,
        vec![
            method("m", vec![], vec![]),
            static_method("s", vec!["a"], vec![]),
            accessor(MethodKind::Get, "x", vec![], vec![]),
            accessor(MethodKind::Set, "x", vec!["v"], vec![]),
            computed_method(ident("k"), vec![], vec![]),
        ],
    )]));
    let main = function(&compiled, "<main>");
    let ops = opcodes(main);

    assert_eq!(ops[0], OpCode::LdaHole);
    let OpCode::Sta(base) = ops[1] else {
        panic!("expected the base register, got {:?}", ops[1]);
    };
    let OpCode::DefineClassWithBuffer {
        constructor: None,
        ref name,
        length: 0,
        literal,
        base: class_base,
    } = ops[2]
    else {
        panic!("expected a class definition, got {:?}", ops[2]);
    };
    assert_eq!(name, "C");
    assert_eq!(class_base, base);
    assert_eq!(
        compiled.literal_buffer(literal).unwrap().values,
        vec![
            LiteralValue::String("m".into()),
            LiteralValue::Integer(1),
            LiteralValue::Integer(0),
            LiteralValue::Boolean(false),
            LiteralValue::String("s".into()),
            LiteralValue::Integer(2),
            LiteralValue::Integer(1),
            LiteralValue::Boolean(true),
        ]
    );

    // The accessor pair is defined once, the computed method by value
    assert_eq!(count(&ops, |op| matches!(op, OpCode::DefineGetterSetterByValue { .. })), 1);
    assert_eq!(count(&ops, |op| matches!(op, OpCode::DefineFunction { .. })), 3);
    assert_eq!(count(&ops, |op| matches!(op, OpCode::StOwnByValue { .. })), 1);
    let accessors = position(&ops, |op| matches!(op, OpCode::DefineGetterSetterByValue { .. }));
    assert_eq!(ops[accessors - 1], OpCode::LdaFalse);
}

#[test]
fn test_class_binding_has_dead_zone() {
    // function f() { return C; } class C {}
    let compiled = compile_ok(module(vec![
        function_decl("f", vec![], vec![ret(Some(ident("C")))]),
        class_decl("C", None, None, vec![]),
    ]));
    let main = opcodes(function(&compiled, "<main>"));
    assert_eq!(main[0], OpCode::NewLexEnv { slots: 1 });
    assert_eq!(main[1], OpCode::LdaHole);
    assert_eq!(main[2], OpCode::StLexVar { level: 0, slot: 0 });

    // The definition initializes the slot without a hole check
    let define = position(&main, |op| matches!(op, OpCode::DefineClassWithBuffer { .. }));
    assert!(main[define..].contains(&OpCode::StLexVar { level: 0, slot: 0 }));
    assert!(!main.iter().any(|op| matches!(op, OpCode::ThrowUndefinedIfHole(_))));

    let f = opcodes(function(&compiled, "f"));
    assert!(f.contains(&OpCode::ThrowUndefinedIfHole("C".into())));
}

#[test]
fn test_script_class_goes_to_global_record() {
    let ops = main_ops(script(vec![class_decl("C", Some(ident("B")), None, vec![])]));
    assert_eq!(ops[0], OpCode::TryLdGlobalByName("B".into()));
    assert!(ops.contains(&OpCode::StLetToGlobalRecord("C".into())));
}

#[test]
fn test_class_constructor_and_redeclaration() {
    let compiled = compile_ok(module(vec![class_decl(
        "C",
        None,
        Some(crate::ast::build::function(Some("constructor"), vec!["a", "b"], vec![])),
        vec![],
    )]));
    let ops = opcodes(function(&compiled, "<main>"));
    assert!(ops.iter().any(|op| matches!(
        op,
        OpCode::DefineClassWithBuffer {
            constructor: Some(FunctionId(1)),
            length: 2,
            ..
        }
    )));
    assert!(compiled.function("constructor").is_some());

    let err = compile_source(module(vec![let_decl("C", None), class_decl("C", None, None, vec![])])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Semantic);
}

#[test]
fn test_tagged_template_passes_template_object_first() {
    let compiled = compile_ok(module(vec![expr_stmt(tagged_template(
        ident("tag"),
        vec!["a", "b"],
        vec![ident("x")],
    ))]));
    let ops = opcodes(function(&compiled, "<main>"));
    assert_eq!(
        &ops[..7],
        &[
            OpCode::TryLdGlobalByName("tag".into()),
            OpCode::Sta(VReg(3)),
            OpCode::GetTemplateObject(0),
            OpCode::Sta(VReg(4)),
            OpCode::TryLdGlobalByName("x".into()),
            OpCode::Sta(VReg(5)),
            OpCode::Call {
                start: VReg(3),
                argc: 2,
            },
        ]
    );
    assert_eq!(
        compiled.literal_buffer(0).unwrap().values,
        vec![
            LiteralValue::Integer(2),
            LiteralValue::String("a".into()),
            LiteralValue::String("b".into()),
            LiteralValue::String("a".into()),
            LiteralValue::String("b".into()),
        ]
    );
}

#[test]
fn test_member_tag_is_called_as_method() {
    let ops = main_ops(module(vec![expr_stmt(tagged_template(
        member(ident("obj"), "t"),
        vec!["x"],
        vec![],
    ))]));
    assert!(ops.contains(&OpCode::CallThis {
        start: VReg(3),
        argc: 1,
    }));
    assert!(ops.contains(&OpCode::LdObjByName {
        obj: VReg(4),
        name: "t".into(),
    }));
}
