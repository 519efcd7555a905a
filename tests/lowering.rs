//! End-to-end tests over the full pipeline: parse tree in, textual IR out.

use rillc::ast::{
    BinaryOperatorKind, Expression, FieldAccessor, FunctionDef, Literal, Module, Mutability,
    Param, Root, Statement, Type, UnaryOperatorKind, ValueDecl,
};
use rillc::error::CompileError;
use rillc::middle::primitive::IntWidth;

fn int32(value: i64) -> Expression {
    Expression::Literal(Literal::Int {
        value,
        width: IntWidth::I32,
    })
}

fn ident(name: &str) -> Expression {
    Expression::Identifier(name.to_owned())
}

fn named(name: &str) -> Type {
    Type::Named(name.to_owned())
}

fn decl(mutability: Mutability, name: &str, ty: Option<Type>, value: Expression) -> Statement {
    Statement::Declaration(ValueDecl {
        mutability,
        name: name.to_owned(),
        ty,
        value,
    })
}

fn assign(lhs: Expression, rhs: Expression) -> Statement {
    Statement::Expression(Expression::Assignment {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn binary(lhs: Expression, operator: BinaryOperatorKind, rhs: Expression) -> Expression {
    Expression::Binary {
        lhs: Box::new(lhs),
        operator,
        rhs: Box::new(rhs),
    }
}

fn unary(operator: UnaryOperatorKind, operand: Expression) -> Expression {
    Expression::Unary {
        operator,
        operand: Box::new(operand),
    }
}

fn param(name: &str, ty: Type) -> Param {
    Param {
        name: name.to_owned(),
        ty,
    }
}

fn function(name: &str, params: Vec<Param>, return_type: Type, body: Vec<Statement>) -> Root {
    Root::FuncDecl {
        public: true,
        func: FunctionDef {
            name: name.to_owned(),
            params,
            return_type,
            body,
        },
    }
}

fn compile(roots: Vec<Root>) -> String {
    rillc::compile_module(&Module { roots }).expect("module should compile")
}

fn compile_err(roots: Vec<Root>) -> CompileError {
    rillc::compile_module(&Module { roots }).expect_err("module should be rejected")
}

/// The instruction lines of one emitted function, label lines included
fn function_body(ir: &str, name: &str) -> Vec<String> {
    let header = format!("@\"{name}\"(");
    let mut lines = ir.lines().skip_while(|line| !line.contains(&header));
    let first = lines.next().expect("function should be emitted");
    assert!(first.starts_with("define"));

    lines
        .take_while(|line| *line != "}")
        .map(|line| line.to_owned())
        .collect()
}

#[test]
fn scalar_declaration_and_assignment() {
    // var x: i32 = 3; x = x + 4;
    let ir = compile(vec![function(
        "f",
        vec![],
        named("void"),
        vec![
            decl(Mutability::Var, "x", Some(named("i32")), int32(3)),
            assign(ident("x"), binary(ident("x"), BinaryOperatorKind::Add, int32(4))),
        ],
    )]);

    assert!(ir.contains("%\"f.x\" = alloca i32"));
    assert!(ir.contains("store i32 3, i32* %\"f.x\""));
    assert!(ir.contains("%__tmp.0 = load i32, i32* %\"f.x\""));
    assert!(ir.contains("%__tmp.1 = add i32 %__tmp.0, 4"));
    assert!(ir.contains("store i32 %__tmp.1, i32* %\"f.x\""));
    assert!(ir.contains("ret void"));
}

#[test]
fn pointer_arithmetic_lowers_to_gep() {
    // p + 2 on a *i32 parameter
    let ir = compile(vec![function(
        "f",
        vec![param("p", Type::Pointer(Box::new(named("i32"))))],
        named("void"),
        vec![Statement::Expression(binary(
            ident("p"),
            BinaryOperatorKind::Add,
            int32(2),
        ))],
    )]);

    assert!(ir.contains("%__tmp.0 = load i32*, i32** %\"f.p\""));
    assert!(ir.contains("%__tmp.1 = getelementptr i32, i32* %__tmp.0, i32 2"));
    assert!(!ir.contains("add i32"));
}

#[test]
fn pointer_subtraction_negates_the_offset() {
    let ir = compile(vec![function(
        "f",
        vec![param("p", Type::Pointer(Box::new(named("i32"))))],
        named("void"),
        vec![Statement::Expression(binary(
            ident("p"),
            BinaryOperatorKind::Subtract,
            int32(1),
        ))],
    )]);

    assert!(ir.contains("%__tmp.1 = sub i32 0, 1"));
    assert!(ir.contains("%__tmp.2 = getelementptr i32, i32* %__tmp.0, i32 %__tmp.1"));
}

#[test]
fn if_else_labels_and_branches() {
    // if (x < 0) { return -x; } else { return x; }
    let ir = compile(vec![function(
        "f",
        vec![param("x", named("i32"))],
        named("i32"),
        vec![Statement::IfElse {
            condition: binary(ident("x"), BinaryOperatorKind::Less, int32(0)),
            positive: vec![Statement::Return(Some(unary(
                UnaryOperatorKind::Negate,
                ident("x"),
            )))],
            negative: Some(vec![Statement::Return(Some(ident("x")))]),
        }],
    )]);

    assert!(ir.contains("icmp slt i32"));
    assert!(ir.contains("br i1 %__tmp.1, label %\"f.0\", label %\"f.1\""));
    assert!(ir.contains("\"f.0\":"));
    assert!(ir.contains("\"f.1\":"));
    assert!(ir.contains("\"f.0_end\":"));

    // Each arm returns and then branches (unreachably) to the end label
    let body = function_body(&ir, "f");
    let rets: Vec<usize> = body
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim_start().starts_with("ret i32"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(rets.len(), 2);
    for index in rets {
        assert_eq!(body[index + 1].trim(), "br label %\"f.0_end\"");
    }
}

#[test]
fn for_loop_labels_and_loop_control() {
    // for (var i: i32 = 0; i < 10; i = i + 1) { if (i > 5) { break; } else { continue; } }
    let ir = compile(vec![function(
        "g",
        vec![],
        named("void"),
        vec![Statement::For {
            init: ValueDecl {
                mutability: Mutability::Var,
                name: "i".to_owned(),
                ty: Some(named("i32")),
                value: int32(0),
            },
            condition: binary(ident("i"), BinaryOperatorKind::Less, int32(10)),
            increment: Expression::Assignment {
                lhs: Box::new(ident("i")),
                rhs: Box::new(binary(ident("i"), BinaryOperatorKind::Add, int32(1))),
            },
            body: vec![Statement::IfElse {
                condition: binary(ident("i"), BinaryOperatorKind::Greater, int32(5)),
                positive: vec![Statement::Break],
                negative: Some(vec![Statement::Continue]),
            }],
        }],
    )]);

    // The induction variable lives in the loop's scope
    assert!(ir.contains("%\"g.0.i\" = alloca i32"));

    for label in ["\"g.0\":", "\"g.0_body\":", "\"g.0_inc\":", "\"g.0_end\":"] {
        assert!(ir.contains(label), "missing label {label}");
    }

    // Head: load, compare, conditional branch
    assert!(ir.contains("icmp slt i32"));
    assert!(ir.contains("br i1 %__tmp.1, label %\"g.0_body\", label %\"g.0_end\""));

    // break goes to the end label, continue to the increment label
    let body = function_body(&ir, "g");
    let break_block = body
        .iter()
        .position(|line| line == "\"g.0.0\":")
        .expect("then-arm label");
    assert_eq!(body[break_block + 1].trim(), "br label %\"g.0_end\"");
    let continue_block = body
        .iter()
        .position(|line| line == "\"g.0.1\":")
        .expect("else-arm label");
    assert_eq!(body[continue_block + 1].trim(), "br label %\"g.0_inc\"");
}

#[test]
fn while_loop_shape() {
    let ir = compile(vec![function(
        "h",
        vec![],
        named("void"),
        vec![
            decl(
                Mutability::Var,
                "t",
                Some(named("bool")),
                Expression::Literal(Literal::Bool(true)),
            ),
            Statement::While {
                condition: ident("t"),
                body: vec![assign(ident("t"), Expression::Literal(Literal::Bool(false)))],
            },
        ],
    )]);

    assert!(ir.contains("br label %\"h.0_cond\""));
    assert!(ir.contains("\"h.0_cond\":"));
    assert!(ir.contains("br i1 %__tmp.0, label %\"h.0_body\", label %\"h.0_end\""));
    assert!(ir.contains("\"h.0_body\":"));
    assert!(ir.contains("\"h.0_end\":"));
    assert!(ir.contains("store i1 false, i1* %\"h.t\""));
}

#[test]
fn string_static_splits_into_two_globals() {
    // val s = "hi";
    let ir = compile(vec![Root::ValDecl {
        public: true,
        decl: ValueDecl {
            mutability: Mutability::Val,
            name: "s".to_owned(),
            ty: None,
            value: Expression::Literal(Literal::Str("hi".to_owned())),
        },
    }]);

    assert!(ir.contains("@\"s.str\" = private global [3 x i8] c\"hi\\00\""));
    assert!(ir.contains("@\"s\" = global i8* bitcast ([3 x i8]* @\"s.str\" to i8*)"));
}

#[test]
fn struct_destructure_uses_the_scratch_temporary() {
    // type P = (i32, i32); { a, b } = p;
    let ir = compile(vec![
        Root::TypeDef {
            name: "P".to_owned(),
            ty: Type::Struct {
                packed: false,
                fields: vec![named("i32"), named("i32")],
            },
        },
        function(
            "f",
            vec![param("p", named("P"))],
            named("void"),
            vec![
                decl(Mutability::Var, "a", Some(named("i32")), int32(0)),
                decl(Mutability::Var, "b", Some(named("i32")), int32(0)),
                assign(
                    Expression::StructLiteral(vec![ident("a"), ident("b")]),
                    ident("p"),
                ),
            ],
        ),
    ]);

    assert!(ir.contains("%\"P\" = type { i32, i32 }"));

    // One load of the source struct, then per-field extract + store
    let body = function_body(&ir, "f");
    let load = body
        .iter()
        .position(|line| line.trim() == "%__tmp.0 = load %\"P\", %\"P\"* %\"f.p\"")
        .expect("struct load");
    assert!(body[load + 1].contains("extractvalue %\"P\" %__tmp.0, 0"));
    assert!(body[load + 2].contains("store i32 %__tmp.1, i32* %\"f.a\""));
    assert!(body[load + 3].contains("extractvalue %\"P\" %__tmp.0, 1"));
    assert!(body[load + 4].contains("store i32 %__tmp.2, i32* %\"f.b\""));
}

#[test]
fn named_struct_construction_chains_insertvalue() {
    let ir = compile(vec![
        Root::TypeDef {
            name: "P".to_owned(),
            ty: Type::Struct {
                packed: false,
                fields: vec![named("i32"), named("i32")],
            },
        },
        function(
            "f",
            vec![],
            named("void"),
            vec![decl(
                Mutability::Var,
                "p",
                Some(named("P")),
                Expression::FunctionCall {
                    target: Box::new(ident("P")),
                    arguments: vec![int32(1), int32(2)],
                },
            )],
        ),
    ]);

    assert!(ir.contains("%__tmp.0 = insertvalue %\"P\" undef, i32 1, 0"));
    assert!(ir.contains("%__tmp.1 = insertvalue %\"P\" %__tmp.0, i32 2, 1"));
    assert!(ir.contains("store %\"P\" %__tmp.1, %\"P\"* %\"f.p\""));
}

#[test]
fn labeled_struct_field_read_and_write() {
    let ir = compile(vec![
        Root::TypeDef {
            name: "Vec2".to_owned(),
            ty: Type::StructLabeled {
                packed: false,
                fields: vec![("x".to_owned(), named("f64")), ("y".to_owned(), named("f64"))],
            },
        },
        function(
            "f",
            vec![param("v", named("Vec2"))],
            named("f64"),
            vec![
                assign(
                    Expression::Field {
                        base: Box::new(ident("v")),
                        accessor: FieldAccessor::Named("x".to_owned()),
                    },
                    Expression::Literal(Literal::Float64(1.0)),
                ),
                Statement::Return(Some(Expression::Field {
                    base: Box::new(ident("v")),
                    accessor: FieldAccessor::Named("y".to_owned()),
                })),
            ],
        ),
    ]);

    // Writes go through a GEP at the field's address
    assert!(ir.contains("getelementptr %\"Vec2\", %\"Vec2\"* %\"f.v\", i32 0, i32 0"));
    assert!(ir.contains("store double 1.0, double* %__tmp.0"));

    // Reads extract from the loaded aggregate
    assert!(ir.contains("load %\"Vec2\", %\"Vec2\"* %\"f.v\""));
    assert!(ir.contains("extractvalue %\"Vec2\" %__tmp.1, 1"));
    assert!(ir.contains("ret double %__tmp.2"));
}

#[test]
fn array_literals_indexing_and_zero_init() {
    let array_ty = Type::Array {
        length: 2,
        element: Box::new(named("i32")),
    };
    let zeroed_ty = Type::Array {
        length: 4,
        element: Box::new(named("i32")),
    };

    let ir = compile(vec![function(
        "f",
        vec![],
        named("void"),
        vec![
            decl(
                Mutability::Var,
                "a",
                Some(array_ty),
                Expression::ArrayLiteral(vec![int32(1), int32(2)]),
            ),
            decl(
                Mutability::Var,
                "z",
                Some(zeroed_ty),
                Expression::ArrayLiteral(vec![]),
            ),
            assign(
                Expression::Index {
                    base: Box::new(ident("a")),
                    index: Box::new(int32(1)),
                },
                int32(5),
            ),
            decl(
                Mutability::Val,
                "y",
                Some(named("i32")),
                Expression::Index {
                    base: Box::new(ident("a")),
                    index: Box::new(int32(0)),
                },
            ),
        ],
    )]);

    assert!(ir.contains("insertvalue [2 x i32] undef, i32 1, 0"));
    assert!(ir.contains("store [4 x i32] zeroinitializer, [4 x i32]* %\"f.z\""));
    assert!(ir.contains("getelementptr [2 x i32], [2 x i32]* %\"f.a\", i32 0, i32 1"));

    // Element reads are a GEP followed by a load
    let body = function_body(&ir, "f");
    let gep = body
        .iter()
        .position(|line| line.contains("getelementptr [2 x i32], [2 x i32]* %\"f.a\", i32 0, i32 0"))
        .expect("read gep");
    assert!(body[gep + 1].contains("load i32, i32*"));
}

#[test]
fn inline_strings_are_stack_allocated() {
    let ir = compile(vec![function(
        "f",
        vec![],
        named("void"),
        vec![decl(
            Mutability::Val,
            "s",
            Some(Type::Pointer(Box::new(named("i8")))),
            Expression::Literal(Literal::Str("ok".to_owned())),
        )],
    )]);

    assert!(ir.contains("alloca [3 x i8]"));
    assert!(ir.contains("store [3 x i8] c\"ok\\00\", [3 x i8]*"));
    assert!(ir.contains("bitcast [3 x i8]* %__tmp.0 to i8*"));
}

#[test]
fn calls_and_forward_declarations() {
    let ir = compile(vec![
        Root::FuncFwdDecl {
            name: "puts".to_owned(),
            params: vec![param("s", Type::Pointer(Box::new(named("i8"))))],
            return_type: named("i32"),
            is_extern: true,
        },
        Root::FuncFwdDecl {
            name: "tick".to_owned(),
            params: vec![],
            return_type: named("void"),
            is_extern: false,
        },
        function(
            "f",
            vec![],
            named("void"),
            vec![
                Statement::Expression(Expression::FunctionCall {
                    target: Box::new(ident("puts")),
                    arguments: vec![Expression::Literal(Literal::Str("hi".to_owned()))],
                }),
                Statement::Expression(Expression::FunctionCall {
                    target: Box::new(ident("tick")),
                    arguments: vec![],
                }),
            ],
        ),
    ]);

    assert!(ir.contains("declare i32 @\"puts\"(i8*)"));
    assert!(ir.contains("declare void @\"tick\"()"));
    assert!(ir.contains("call i32 @\"puts\"(i8* %__tmp.1)"));
    // Void calls produce no result value
    assert!(ir.contains("  call void @\"tick\"()"));
    assert!(!ir.contains("= call void"));
}

#[test]
fn forward_declaration_with_definition_emits_only_the_define() {
    let ir = compile(vec![
        Root::FuncFwdDecl {
            name: "f".to_owned(),
            params: vec![],
            return_type: named("void"),
            is_extern: false,
        },
        function("f", vec![], named("void"), vec![]),
    ]);

    assert!(!ir.contains("declare"));
    assert!(ir.contains("define void @\"f\"()"));
}

#[test]
fn recursive_named_types_close_through_stubs() {
    let ir = compile(vec![
        Root::TypeFwdDef {
            name: "Node".to_owned(),
        },
        Root::TypeDef {
            name: "Node".to_owned(),
            ty: Type::Struct {
                packed: false,
                fields: vec![named("i64"), Type::Pointer(Box::new(named("Node")))],
            },
        },
    ]);

    assert!(ir.contains("%\"Node\" = type { i64, %\"Node\"* }"));
    assert!(!ir.contains("opaque"));
}

#[test]
fn unclosed_type_stubs_stay_opaque() {
    let ir = compile(vec![Root::TypeFwdDef {
        name: "Handle".to_owned(),
    }]);

    assert!(ir.contains("%\"Handle\" = type opaque"));
}

#[test]
fn explicit_casts_pick_the_narrow_operation() {
    let ir = compile(vec![function(
        "f",
        vec![param("x", named("i32"))],
        named("void"),
        vec![
            decl(
                Mutability::Val,
                "w",
                Some(named("i64")),
                Expression::Cast {
                    ty: named("i64"),
                    operand: Box::new(ident("x")),
                },
            ),
            decl(
                Mutability::Val,
                "n",
                Some(named("i8")),
                Expression::Cast {
                    ty: named("i8"),
                    operand: Box::new(ident("x")),
                },
            ),
            decl(
                Mutability::Val,
                "d",
                Some(named("f64")),
                Expression::Cast {
                    ty: named("f64"),
                    operand: Box::new(ident("x")),
                },
            ),
            decl(
                Mutability::Val,
                "b",
                Some(named("bool")),
                Expression::Cast {
                    ty: named("bool"),
                    operand: Box::new(ident("x")),
                },
            ),
        ],
    )]);

    assert!(ir.contains("sext i32"));
    assert!(ir.contains("trunc i32"));
    assert!(ir.contains("sitofp i32"));
    // bool casts expand to a comparison against zero, negated
    assert!(ir.contains("icmp eq i32"));
    assert!(ir.contains("xor i1"));
}

#[test]
fn cast_idempotence() {
    // cast(i64, cast(i64, x)) emits exactly one extension
    let ir = compile(vec![function(
        "f",
        vec![param("x", named("i32"))],
        named("void"),
        vec![decl(
            Mutability::Val,
            "w",
            Some(named("i64")),
            Expression::Cast {
                ty: named("i64"),
                operand: Box::new(Expression::Cast {
                    ty: named("i64"),
                    operand: Box::new(ident("x")),
                }),
            },
        )],
    )]);

    assert_eq!(ir.matches("sext").count(), 1);
}

#[test]
fn address_of_deref_cancels() {
    // &*p adds no instruction beyond evaluating p
    let ir = compile(vec![function(
        "f",
        vec![param("p", Type::Pointer(Box::new(named("i32"))))],
        named("void"),
        vec![decl(
            Mutability::Val,
            "q",
            Some(Type::Pointer(Box::new(named("i32")))),
            unary(
                UnaryOperatorKind::AddressOf,
                unary(UnaryOperatorKind::Deref, ident("p")),
            ),
        )],
    )]);

    assert!(!ir.contains("getelementptr"));
    // Just the parameter spill load and the store into q
    assert!(ir.contains("%__tmp.0 = load i32*, i32** %\"f.p\""));
    assert!(ir.contains("store i32* %__tmp.0, i32** %\"f.q\""));
}

#[test]
fn unsigned_types_drive_opcode_selection() {
    let ir = compile(vec![function(
        "f",
        vec![param("x", named("u32"))],
        named("void"),
        vec![
            decl(
                Mutability::Val,
                "d",
                Some(named("u32")),
                binary(ident("x"), BinaryOperatorKind::Divide, ident("x")),
            ),
            decl(
                Mutability::Val,
                "s",
                Some(named("u32")),
                binary(ident("x"), BinaryOperatorKind::ShiftRight, ident("x")),
            ),
            decl(
                Mutability::Val,
                "c",
                Some(named("bool")),
                binary(ident("x"), BinaryOperatorKind::Less, ident("x")),
            ),
        ],
    )]);

    assert!(ir.contains("udiv i32"));
    assert!(ir.contains("lshr i32"));
    assert!(ir.contains("icmp ult i32"));
}

#[test]
fn unary_operators() {
    let ir = compile(vec![function(
        "f",
        vec![param("x", named("i32")), param("d", named("f64"))],
        named("void"),
        vec![
            decl(
                Mutability::Val,
                "n",
                None,
                unary(UnaryOperatorKind::Negate, ident("x")),
            ),
            decl(
                Mutability::Val,
                "m",
                None,
                unary(UnaryOperatorKind::BitNot, ident("x")),
            ),
            decl(
                Mutability::Val,
                "g",
                None,
                unary(UnaryOperatorKind::Negate, ident("d")),
            ),
        ],
    )]);

    assert!(ir.contains("sub i32 0, %__tmp.0"));
    assert!(ir.contains("xor i32 %__tmp.2, -1"));
    assert!(ir.contains("fneg double"));
}

#[test]
fn logical_operators_lower_to_bitwise_on_i1() {
    let ir = compile(vec![function(
        "f",
        vec![param("a", named("bool")), param("b", named("bool"))],
        named("void"),
        vec![decl(
            Mutability::Val,
            "c",
            None,
            binary(ident("a"), BinaryOperatorKind::LogicalAnd, ident("b")),
        )],
    )]);

    assert!(ir.contains("and i1"));
}

#[test]
fn determinism() {
    let build = || {
        compile(vec![function(
            "f",
            vec![param("x", named("i32"))],
            named("i32"),
            vec![Statement::IfElse {
                condition: binary(ident("x"), BinaryOperatorKind::Less, int32(0)),
                positive: vec![Statement::Return(Some(int32(0)))],
                negative: Some(vec![Statement::Return(Some(ident("x")))]),
            }],
        )])
    };

    assert_eq!(build(), build());
}

#[test]
fn every_block_ends_with_a_terminator() {
    let ir = compile(vec![function(
        "g",
        vec![],
        named("void"),
        vec![
            decl(Mutability::Var, "i", Some(named("i32")), int32(0)),
            Statement::For {
                init: ValueDecl {
                    mutability: Mutability::Var,
                    name: "j".to_owned(),
                    ty: Some(named("i32")),
                    value: int32(0),
                },
                condition: binary(ident("j"), BinaryOperatorKind::Less, int32(3)),
                increment: Expression::Assignment {
                    lhs: Box::new(ident("j")),
                    rhs: Box::new(binary(ident("j"), BinaryOperatorKind::Add, int32(1))),
                },
                body: vec![Statement::Block(vec![assign(
                    ident("i"),
                    binary(ident("i"), BinaryOperatorKind::Add, ident("j")),
                )])],
            },
        ],
    )]);

    let body = function_body(&ir, "g");
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in &body {
        if line.ends_with("\":") {
            blocks.push(Vec::new());
        } else {
            blocks.last_mut().unwrap().push(line.trim());
        }
    }

    for block in blocks {
        let last = block.last().expect("no empty blocks");
        assert!(
            last.starts_with("br ") || last.starts_with("ret"),
            "block does not end in a terminator: {last}"
        );
    }
}

#[test]
fn temporaries_are_unique_and_monotone() {
    let ir = compile(vec![function(
        "f",
        vec![param("x", named("i32"))],
        named("i32"),
        vec![
            decl(
                Mutability::Var,
                "y",
                Some(named("i32")),
                binary(ident("x"), BinaryOperatorKind::Multiply, ident("x")),
            ),
            Statement::Return(Some(binary(
                ident("y"),
                BinaryOperatorKind::Add,
                ident("x"),
            ))),
        ],
    )]);

    let mut seen = Vec::new();
    for line in ir.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("%__tmp.") {
            if let Some((id, _)) = rest.split_once(" = ") {
                seen.push(id.parse::<u32>().expect("temporary id"));
            }
        }
    }

    let expected: Vec<u32> = (0..seen.len() as u32).collect();
    assert_eq!(seen, expected);
}

#[test]
fn declared_stack_slots_are_unique() {
    let ir = compile(vec![function(
        "f",
        vec![param("x", named("i32"))],
        named("void"),
        vec![
            decl(Mutability::Var, "a", Some(named("i32")), int32(1)),
            Statement::Block(vec![decl(Mutability::Var, "a", Some(named("i32")), int32(2))]),
        ],
    )]);

    let mut names = Vec::new();
    for line in ir.lines() {
        if let Some((name, _)) = line.trim().split_once(" = alloca") {
            names.push(name.to_owned());
        }
    }

    let mut deduped = names.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(names.len(), deduped.len(), "colliding stack slots: {names:?}");
    assert!(names.contains(&"%\"f.a\"".to_owned()));
    assert!(names.contains(&"%\"f.0.a\"".to_owned()));
}

#[test]
fn trailing_empty_statement_does_not_move_labels() {
    let body = |trailing_empty: bool| {
        let mut statements = vec![
            decl(
                Mutability::Var,
                "t",
                Some(named("bool")),
                Expression::Literal(Literal::Bool(true)),
            ),
            Statement::IfElse {
                condition: ident("t"),
                positive: vec![Statement::Return(None)],
                negative: Some(vec![]),
            },
        ];
        if trailing_empty {
            statements.push(Statement::Empty);
        }
        compile(vec![function("f", vec![], named("void"), statements)])
    };

    assert_eq!(body(false), body(true));
}

#[test]
fn undefined_names_and_bad_casts_are_rejected() {
    assert_eq!(
        compile_err(vec![function(
            "f",
            vec![],
            named("void"),
            vec![Statement::Expression(ident("ghost"))],
        )]),
        CompileError::UndefinedIdentifier("ghost".to_owned())
    );

    assert!(matches!(
        compile_err(vec![function(
            "f",
            vec![],
            named("void"),
            vec![decl(
                Mutability::Val,
                "x",
                None,
                Expression::Cast {
                    ty: named("f64"),
                    operand: Box::new(Expression::StructLiteral(vec![int32(1)])),
                },
            )],
        )]),
        CompileError::InvalidCast { .. }
    ));

    assert!(matches!(
        compile_err(vec![function(
            "f",
            vec![param("x", named("i32"))],
            named("void"),
            vec![Statement::Expression(Expression::FunctionCall {
                target: Box::new(ident("x")),
                arguments: vec![],
            })],
        )]),
        CompileError::NotAFunction(_)
    ));

    assert!(matches!(
        compile_err(vec![function(
            "f",
            vec![param("x", named("i32"))],
            named("void"),
            vec![Statement::Expression(Expression::Index {
                base: Box::new(ident("x")),
                index: Box::new(int32(0)),
            })],
        )]),
        CompileError::IndexOfNonArray(_)
    ));

    assert_eq!(
        compile_err(vec![
            function("f", vec![], named("void"), vec![]),
            function("f", vec![], named("void"), vec![]),
        ]),
        CompileError::DuplicateSymbol("f".to_owned())
    );
}

#[test]
fn pretty_printer_renders_linearized_functions() {
    let module = Module {
        roots: vec![function(
            "demo",
            vec![],
            named("void"),
            vec![decl(Mutability::Var, "x", Some(named("i32")), int32(7))],
        )],
    };

    let symtab = rillc::middle::type_check::construct_symtab(&module).unwrap();
    let roots = rillc::backend::tree_build::construct_ir_tree(&module, &symtab).unwrap();
    let ssa = rillc::backend::linearize::linearize_module(&roots).unwrap();

    let dump = rillc::backend::pretty_print::pretty_print_module(&ssa);
    assert!(dump.contains("demo"));
    assert!(dump.contains("alloca"));
}
