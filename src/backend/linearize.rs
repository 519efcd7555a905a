//! Flattens the mid-IR into linear SSA. Expression trees become ordered
//! instruction sequences with numbered temporaries, structured control flow
//! becomes labels plus explicit terminators, and `continue`/`break` thread
//! through the innermost loop's label pair. Every transition between blocks
//! is an explicit `br`; fall-through is never relied upon.

use log::debug;

use crate::{
    backend::{
        ssa::{BinOp, CmpOp, Inst, Item, SsaModule, Value},
        tree::{self, CastKind, Expr, ExprKind, Literal, Root, Stmt, Symbol, UnOp},
        ty::Type,
    },
    error::CompileError,
};

pub fn linearize_module(roots: &[Root]) -> Result<SsaModule, CompileError> {
    let mut items = Vec::with_capacity(roots.len());

    for root in roots {
        match root {
            Root::TypeDef { name, ty } => items.push(Item::TypeDef {
                name: name.clone(),
                ty: ty.clone(),
            }),
            Root::StaticDecl {
                ty,
                public,
                name,
                value,
            } => match value {
                // A string static becomes a private byte-array global plus
                // the public symbol pointing at its bitcast
                Literal::Str(text) => {
                    let companion = format!("{name}.str");
                    let len = text.len() + 1;

                    items.push(Item::Global {
                        name: companion.clone(),
                        public: false,
                        ty: Type::Array {
                            length: len,
                            element: Box::new(Type::Int(8)),
                        },
                        value: Literal::Str(text.clone()),
                    });
                    items.push(Item::Global {
                        name: name.clone(),
                        public: *public,
                        ty: ty.clone(),
                        value: Literal::GlobalStr {
                            name: companion,
                            len,
                        },
                    });
                }
                value => items.push(Item::Global {
                    name: name.clone(),
                    public: *public,
                    ty: ty.clone(),
                    value: value.clone(),
                }),
            },
            Root::FuncFwdDecl {
                return_type,
                name,
                params,
                is_extern: _,
            } => items.push(Item::Declare {
                name: name.clone(),
                return_type: return_type.clone(),
                params: params.clone(),
            }),
            Root::FuncDecl {
                return_type,
                public,
                name,
                params,
                body,
            } => {
                debug!("linearizing function `{name}`");

                let mut builder = FunctionBuilder::new();
                for statement in body {
                    builder.codegen_stmt(statement)?;
                }

                items.push(Item::Function {
                    name: name.clone(),
                    public: *public,
                    return_type: return_type.clone(),
                    params: params.clone(),
                    body: builder.insts,
                });
            }
        }
    }

    Ok(SsaModule { items })
}

struct FunctionBuilder {
    next_tmp: u32,
    insts: Vec<(Value, Inst)>,
    continue_label: Option<String>,
    break_label: Option<String>,
    /// The struct value a destructuring assignment is currently picking
    /// apart; referenced by `ExprKind::Temporary`
    scratch: Option<Value>,
}

impl FunctionBuilder {
    fn new() -> Self {
        Self {
            next_tmp: 0,
            insts: Vec::new(),
            continue_label: None,
            break_label: None,
            scratch: None,
        }
    }

    fn fresh_tmp(&mut self) -> Value {
        let id = self.next_tmp;
        self.next_tmp += 1;
        Value::Temporary(id)
    }

    /// Pushes an instruction with no result
    fn emit(&mut self, inst: Inst) {
        self.insts.push((Value::NoValue, inst));
    }

    /// Pushes a result-producing instruction, consuming one temporary id
    fn emit_value(&mut self, inst: Inst) -> Value {
        let value = self.fresh_tmp();
        self.insts.push((value.clone(), inst));
        value
    }

    fn codegen_stmt(&mut self, statement: &Stmt) -> Result<(), CompileError> {
        match statement {
            Stmt::Empty => Ok(()),
            Stmt::Decl { ty, name, value } => {
                let slot = Value::Named(Symbol::Local(name.clone()));
                self.insts.push((slot.clone(), Inst::Alloca(ty.clone())));

                let initializer = self.codegen_expr(value)?;
                self.emit(Inst::Store {
                    ty: ty.clone(),
                    value: initializer,
                    ptr: slot,
                });
                Ok(())
            }
            Stmt::Expr(expression) => self.codegen_expr(expression).map(|_| ()),
            Stmt::Block { label, body } => {
                let end = format!("{label}_end");

                self.emit(Inst::Br(label.clone()));
                self.emit(Inst::Label(label.clone()));
                for statement in body {
                    self.codegen_stmt(statement)?;
                }
                self.emit(Inst::Br(end.clone()));
                self.emit(Inst::Label(end));
                Ok(())
            }
            Stmt::IfElse {
                then_label,
                else_label,
                condition,
                positive,
                negative,
            } => {
                let end = format!("{then_label}_end");

                let condition = self.codegen_expr(condition)?;
                self.emit(Inst::BrCond {
                    condition,
                    then_label: then_label.clone(),
                    else_label: else_label.clone(),
                });

                self.emit(Inst::Label(then_label.clone()));
                for statement in positive {
                    self.codegen_stmt(statement)?;
                }
                self.emit(Inst::Br(end.clone()));

                self.emit(Inst::Label(else_label.clone()));
                for statement in negative {
                    self.codegen_stmt(statement)?;
                }
                self.emit(Inst::Br(end.clone()));

                self.emit(Inst::Label(end));
                Ok(())
            }
            Stmt::While {
                label,
                condition,
                body,
            } => {
                let cond = format!("{label}_cond");
                let body_label = format!("{label}_body");
                let end = format!("{label}_end");

                self.emit(Inst::Br(cond.clone()));
                self.emit(Inst::Label(cond.clone()));
                let condition = self.codegen_expr(condition)?;
                self.emit(Inst::BrCond {
                    condition,
                    then_label: body_label.clone(),
                    else_label: end.clone(),
                });

                self.emit(Inst::Label(body_label));
                self.codegen_loop_body(body, cond.clone(), end.clone())?;
                self.emit(Inst::Br(cond));

                self.emit(Inst::Label(end));
                Ok(())
            }
            Stmt::For {
                label,
                init,
                condition,
                increment,
                body,
            } => {
                let body_label = format!("{label}_body");
                let inc = format!("{label}_inc");
                let end = format!("{label}_end");

                self.codegen_stmt(init)?;

                self.emit(Inst::Br(label.clone()));
                self.emit(Inst::Label(label.clone()));
                let condition = self.codegen_expr(condition)?;
                self.emit(Inst::BrCond {
                    condition,
                    then_label: body_label.clone(),
                    else_label: end.clone(),
                });

                self.emit(Inst::Label(body_label));
                self.codegen_loop_body(body, inc.clone(), end.clone())?;
                self.emit(Inst::Br(inc.clone()));

                self.emit(Inst::Label(inc));
                self.codegen_expr(increment)?;
                self.emit(Inst::Br(label.clone()));

                self.emit(Inst::Label(end));
                Ok(())
            }
            Stmt::Continue => {
                let Some(label) = self.continue_label.clone() else {
                    return Err(CompileError::ContinueOutsideLoop);
                };
                self.emit(Inst::Br(label));
                Ok(())
            }
            Stmt::Break => {
                let Some(label) = self.break_label.clone() else {
                    return Err(CompileError::BreakOutsideLoop);
                };
                self.emit(Inst::Br(label));
                Ok(())
            }
            Stmt::Return(value) => {
                let returned = match value {
                    Some(expression) => {
                        let value = self.codegen_expr(expression)?;
                        Some((expression.ty.clone(), value))
                    }
                    None => None,
                };
                self.emit(Inst::Ret(returned));
                Ok(())
            }
        }
    }

    /// Runs a loop body with the continue/break labels swapped in, restoring
    /// the enclosing loop's labels afterwards
    fn codegen_loop_body(
        &mut self,
        body: &[Stmt],
        continue_to: String,
        break_to: String,
    ) -> Result<(), CompileError> {
        let saved_continue = self.continue_label.replace(continue_to);
        let saved_break = self.break_label.replace(break_to);

        let result = body
            .iter()
            .try_for_each(|statement| self.codegen_stmt(statement));

        self.continue_label = saved_continue;
        self.break_label = saved_break;
        result
    }

    fn codegen_expr(&mut self, expression: &Expr) -> Result<Value, CompileError> {
        match &expression.kind {
            ExprKind::Identifier(symbol) => {
                // Function names are values in their own right; everything
                // else lives in memory and reads through a load
                if matches!(expression.ty.resolve_alias(), Type::Fn { .. }) {
                    return Ok(Value::Named(symbol.clone()));
                }

                Ok(self.emit_value(Inst::Load {
                    ty: expression.ty.clone(),
                    ptr: Value::Named(symbol.clone()),
                }))
            }
            ExprKind::ParamIdentifier(name) => Ok(Value::Named(Symbol::Local(name.clone()))),
            ExprKind::Literal(Literal::Str(text)) => self.codegen_inline_str(text),
            ExprKind::Literal(literal) => Ok(Value::Literal(literal.clone())),
            ExprKind::StructLiteral(fields) => {
                let mut aggregate = Value::Undef;
                for (index, field) in fields.iter().enumerate() {
                    let value = self.codegen_expr(field)?;
                    aggregate = self.emit_value(Inst::InsertValue {
                        ty: expression.ty.clone(),
                        base: aggregate,
                        field_ty: field.ty.clone(),
                        value,
                        index,
                    });
                }
                Ok(aggregate)
            }
            ExprKind::ArrayElems(elements) => {
                let mut aggregate = Value::Undef;
                for (index, element) in elements.iter().enumerate() {
                    let value = self.codegen_expr(element)?;
                    aggregate = self.emit_value(Inst::InsertValue {
                        ty: expression.ty.clone(),
                        base: aggregate,
                        field_ty: element.ty.clone(),
                        value,
                        index,
                    });
                }
                Ok(aggregate)
            }
            ExprKind::ArrayInit => Ok(Value::ZeroInit),
            ExprKind::Assignment { target, value } => {
                let stored = self.codegen_expr(value)?;
                self.emit(Inst::Store {
                    ty: value.ty.clone(),
                    value: stored,
                    ptr: Value::Named(target.clone()),
                });
                Ok(Value::NoValue)
            }
            ExprKind::Write { ptr, value } => {
                let destination = self.codegen_expr(ptr)?;
                let stored = self.codegen_expr(value)?;
                self.emit(Inst::Store {
                    ty: value.ty.clone(),
                    value: stored,
                    ptr: destination,
                });
                Ok(Value::NoValue)
            }
            ExprKind::FunctionCall { callee, arguments } => {
                let target = self.codegen_expr(callee)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| {
                        Ok((argument.ty.clone(), self.codegen_expr(argument)?))
                    })
                    .collect::<Result<Vec<_>, CompileError>>()?;

                let call = Inst::Call {
                    return_type: expression.ty.clone(),
                    callee: target,
                    arguments,
                };

                if expression.ty == Type::Void {
                    self.emit(call);
                    Ok(Value::NoValue)
                } else {
                    Ok(self.emit_value(call))
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = lhs.ty.clone();
                let lhs = self.codegen_expr(lhs)?;
                let rhs = self.codegen_expr(rhs)?;

                let inst = match op {
                    tree::BinOp::Eq => Inst::Cmp {
                        op: CmpOp::Eq,
                        ty: lhs_ty,
                        lhs,
                        rhs,
                    },
                    tree::BinOp::Lt => Inst::Cmp {
                        op: CmpOp::Lt,
                        ty: lhs_ty,
                        lhs,
                        rhs,
                    },
                    tree::BinOp::Gt => Inst::Cmp {
                        op: CmpOp::Gt,
                        ty: lhs_ty,
                        lhs,
                        rhs,
                    },
                    other => Inst::Binary {
                        op: binary_op(*other),
                        ty: expression.ty.clone(),
                        lhs,
                        rhs,
                    },
                };

                Ok(self.emit_value(inst))
            }
            ExprKind::Unary { op, operand } => self.codegen_unary(expression, *op, operand),
            ExprKind::Cast { op, operand } => {
                let value = self.codegen_expr(operand)?;
                Ok(self.emit_value(Inst::Cast {
                    op: *op,
                    from: operand.ty.clone(),
                    to: expression.ty.clone(),
                    value,
                }))
            }
            ExprKind::StructAssign { base, fields } => {
                let aggregate = self.codegen_expr(base)?;

                let saved = self.scratch.replace(aggregate.clone());
                let result = fields
                    .iter()
                    .try_for_each(|field| self.codegen_expr(field).map(|_| ()));
                self.scratch = saved;
                result?;

                Ok(aggregate)
            }
            ExprKind::StructAccess { base, index } => {
                let aggregate_ty = base.ty.clone();
                let aggregate = self.codegen_expr(base)?;
                Ok(self.emit_value(Inst::ExtractValue {
                    ty: aggregate_ty,
                    base: aggregate,
                    index: *index,
                }))
            }
            ExprKind::GetElemPtr {
                pointee,
                base,
                indices,
            } => {
                let ptr = self.codegen_expr(base)?;
                let indices = indices
                    .iter()
                    .map(|index| Ok((index.ty.clone(), self.codegen_expr(index)?)))
                    .collect::<Result<Vec<_>, CompileError>>()?;

                Ok(self.emit_value(Inst::GetElementPtr {
                    pointee: pointee.clone(),
                    ptr,
                    indices,
                }))
            }
            ExprKind::Temporary => Ok(self
                .scratch
                .clone()
                .unwrap_or_else(|| unreachable!("scratch value outside a struct assignment"))),
        }
    }

    fn codegen_unary(
        &mut self,
        expression: &Expr,
        op: UnOp,
        operand: &Expr,
    ) -> Result<Value, CompileError> {
        match op {
            UnOp::Neg => {
                let value = self.codegen_expr(operand)?;
                if expression.ty.is_float() {
                    Ok(self.emit_value(Inst::FNeg {
                        ty: expression.ty.clone(),
                        value,
                    }))
                } else {
                    // Integer negation is a subtraction from zero
                    Ok(self.emit_value(Inst::Binary {
                        op: BinOp::Sub,
                        ty: expression.ty.clone(),
                        lhs: Value::Literal(Literal::Int(0)),
                        rhs: value,
                    }))
                }
            }
            UnOp::Not => {
                let value = self.codegen_expr(operand)?;
                Ok(self.emit_value(Inst::Binary {
                    op: BinOp::Xor,
                    ty: expression.ty.clone(),
                    lhs: value,
                    rhs: Value::Literal(Literal::Bool(true)),
                }))
            }
            UnOp::BitNot => {
                let value = self.codegen_expr(operand)?;
                Ok(self.emit_value(Inst::Binary {
                    op: BinOp::Xor,
                    ty: expression.ty.clone(),
                    lhs: value,
                    rhs: Value::Literal(Literal::Int(-1)),
                }))
            }
            UnOp::Deref => {
                let ptr = self.codegen_expr(operand)?;
                Ok(self.emit_value(Inst::Load {
                    ty: expression.ty.clone(),
                    ptr,
                }))
            }
            UnOp::AddressOf => self.codegen_addr(operand),
        }
    }

    /// The address of an lvalue expression. Identifiers are already pointers
    /// (stack slots or globals), `&*e` cancels, and field accesses become
    /// chains of GEPs rooted at the base's address.
    fn codegen_addr(&mut self, expression: &Expr) -> Result<Value, CompileError> {
        match &expression.kind {
            ExprKind::Identifier(symbol) => Ok(Value::Named(symbol.clone())),
            ExprKind::Unary {
                op: UnOp::Deref,
                operand,
            } => self.codegen_expr(operand),
            ExprKind::StructAccess { base, index } => {
                let base_addr = self.codegen_addr(base)?;
                let zero = (Type::Int(32), Value::Literal(Literal::Int(0)));
                let field = (
                    Type::Int(32),
                    Value::Literal(Literal::Int(*index as i64)),
                );

                Ok(self.emit_value(Inst::GetElementPtr {
                    pointee: base.ty.clone(),
                    ptr: base_addr,
                    indices: vec![zero, field],
                }))
            }
            ExprKind::GetElemPtr { .. } => self.codegen_expr(expression),
            _ => Err(CompileError::AddressOfTemporary),
        }
    }

    /// Inline string literals are materialized on the stack: an array
    /// alloca, a constant store, and a bitcast down to `i8*`
    fn codegen_inline_str(&mut self, text: &str) -> Result<Value, CompileError> {
        let array_ty = Type::Array {
            length: text.len() + 1,
            element: Box::new(Type::Int(8)),
        };

        let slot = self.emit_value(Inst::Alloca(array_ty.clone()));
        self.emit(Inst::Store {
            ty: array_ty.clone(),
            value: Value::Literal(Literal::Str(text.to_owned())),
            ptr: slot.clone(),
        });

        Ok(self.emit_value(Inst::Cast {
            op: CastKind::BitCast,
            from: array_ty.pointer_to(),
            to: Type::Int(8).pointer_to(),
            value: slot,
        }))
    }
}

fn binary_op(op: tree::BinOp) -> BinOp {
    match op {
        tree::BinOp::Add => BinOp::Add,
        tree::BinOp::Sub => BinOp::Sub,
        tree::BinOp::Mul => BinOp::Mul,
        tree::BinOp::Div => BinOp::Div,
        tree::BinOp::Rem => BinOp::Rem,
        tree::BinOp::And => BinOp::And,
        tree::BinOp::Or => BinOp::Or,
        tree::BinOp::Xor => BinOp::Xor,
        tree::BinOp::Shl => BinOp::Shl,
        tree::BinOp::Shr => BinOp::Shr,
        tree::BinOp::Eq | tree::BinOp::Lt | tree::BinOp::Gt => {
            unreachable!("comparisons lower to cmp instructions")
        }
    }
}
