//! Lowers the checked parse tree into the mid-level IR. The builder re-walks
//! statements with the same block ordinal counter the semantic pass used, so
//! scope paths (and with them mangled local names and block labels) come out
//! identical. Expression types are recovered by calling back into the type
//! checker against the finished scope tree.

use hashbrown::HashSet;
use log::debug;

use crate::{
    ast,
    backend::{
        tree::{BinOp, CastKind, Expr, ExprKind, Literal, Root, Stmt, Symbol, UnOp},
        ty::Type,
    },
    error::CompileError,
    middle::{
        symtab::{Binding, ScopeId, ScopeTree},
        ty::SourceType,
        type_check::{self, eval_expr_type},
    },
};

/// Lowers every top level declaration of a checked module
pub fn construct_ir_tree(
    module: &ast::Module,
    symtab: &ScopeTree,
) -> Result<Vec<Root>, CompileError> {
    let builder = TreeBuilder { symtab };

    // Forward declarations that are defined later in the module are dropped;
    // only the definition is emitted
    let defined: HashSet<&str> = module
        .roots
        .iter()
        .filter_map(|root| match root {
            ast::Root::FuncDecl { func, .. } => Some(func.name.as_str()),
            _ => None,
        })
        .collect();

    let mut roots = Vec::new();

    for root in &module.roots {
        match root {
            ast::Root::TypeDef { name, .. } => {
                let Some(Binding::Type(SourceType::Alias { ty, .. })) =
                    symtab.binding(symtab.root(), name)
                else {
                    return Err(CompileError::UndefinedType(name.clone()));
                };

                roots.push(Root::TypeDef {
                    name: name.clone(),
                    ty: lower_type(ty),
                });
            }
            ast::Root::TypeFwdDef { name } => {
                // Stubs closed by a later definition vanish; the rest stay
                // opaque named types
                if let Some(Binding::Type(SourceType::Stub(_))) =
                    symtab.binding(symtab.root(), name)
                {
                    roots.push(Root::TypeDef {
                        name: name.clone(),
                        ty: Type::Opaque(name.clone()),
                    });
                }
            }
            ast::Root::ValDecl { public, decl } => {
                let ast::Expression::Literal(literal) = &decl.value else {
                    return Err(CompileError::Unsupported(
                        "non-literal static initializers",
                    ));
                };

                let Some(Binding::Value(binding)) = symtab.binding(symtab.root(), &decl.name)
                else {
                    return Err(CompileError::UndefinedIdentifier(decl.name.clone()));
                };

                roots.push(Root::StaticDecl {
                    ty: lower_type(&binding.ty),
                    public: *public,
                    name: decl.name.clone(),
                    value: lower_literal(literal),
                });
            }
            ast::Root::FuncFwdDecl {
                name,
                params,
                return_type: _,
                is_extern,
            } => {
                if defined.contains(name.as_str()) {
                    continue;
                }

                let Some(Binding::Value(binding)) = symtab.binding(symtab.root(), name) else {
                    return Err(CompileError::UndefinedIdentifier(name.clone()));
                };
                let SourceType::Function {
                    parameters,
                    return_type,
                } = binding.ty.strip_alias()
                else {
                    return Err(CompileError::NotAFunction(binding.ty.clone()));
                };
                debug_assert_eq!(parameters.len(), params.len());

                roots.push(Root::FuncFwdDecl {
                    return_type: lower_type(return_type),
                    name: name.clone(),
                    params: parameters.iter().map(lower_type).collect(),
                    is_extern: *is_extern,
                });
            }
            ast::Root::FuncDecl { public, func } => {
                roots.push(builder.lower_function(func, *public)?);
            }
        }
    }

    Ok(roots)
}

struct TreeBuilder<'a> {
    symtab: &'a ScopeTree,
}

impl<'a> TreeBuilder<'a> {
    fn lower_function(&self, func: &ast::FunctionDef, public: bool) -> Result<Root, CompileError> {
        debug!("lowering function `{}` to mid-IR", func.name);

        let root = self.symtab.root();
        let Some(Binding::Value(binding)) = self.symtab.binding(root, &func.name) else {
            return Err(CompileError::UndefinedIdentifier(func.name.clone()));
        };
        let SourceType::Function {
            parameters,
            return_type,
        } = binding.ty.strip_alias()
        else {
            return Err(CompileError::NotAFunction(binding.ty.clone()));
        };
        let Some(scope) = binding.inner else {
            return Err(CompileError::UndefinedIdentifier(func.name.clone()));
        };

        let ret_ty = lower_type(return_type);

        let params: Vec<(Type, String)> = func
            .params
            .iter()
            .zip(parameters)
            .map(|(param, ty)| (lower_type(ty), param.name.clone()))
            .collect();

        // Parameters are spilled to stack slots on entry so that every later
        // read goes through memory, like any other local
        let mut body = Vec::with_capacity(params.len() + func.body.len());
        for (ty, name) in &params {
            body.push(Stmt::Decl {
                ty: ty.clone(),
                name: format!("{}.{}", func.name, name),
                value: Expr {
                    ty: ty.clone(),
                    kind: ExprKind::ParamIdentifier(name.clone()),
                },
            });
        }

        body.extend(self.map_statements(scope, &func.body)?);

        // Void bodies always flow into a `ret void`
        if ret_ty == Type::Void && !matches!(body.last(), Some(Stmt::Return(_))) {
            body.push(Stmt::Return(None));
        }

        Ok(Root::FuncDecl {
            return_type: ret_ty,
            public,
            name: func.name.clone(),
            params,
            body,
        })
    }

    fn map_statements(
        &self,
        scope: ScopeId,
        statements: &[ast::Statement],
    ) -> Result<Vec<Stmt>, CompileError> {
        let mut ordinal = 0usize;
        let mut out = Vec::with_capacity(statements.len());

        for statement in statements {
            out.push(self.map_stmt(scope, statement, &mut ordinal)?);
        }

        Ok(out)
    }

    fn map_stmt(
        &self,
        scope: ScopeId,
        statement: &ast::Statement,
        ordinal: &mut usize,
    ) -> Result<Stmt, CompileError> {
        match statement {
            ast::Statement::Empty => Ok(Stmt::Empty),
            ast::Statement::Declaration(decl) => self.map_local_decl(scope, decl),
            ast::Statement::Expression(expression) => {
                Ok(Stmt::Expr(self.map_expr(scope, expression)?))
            }
            ast::Statement::Block(statements) => {
                let child = self.block_scope(scope, ordinal)?;
                Ok(Stmt::Block {
                    label: self.symtab.path(child),
                    body: self.map_statements(child, statements)?,
                })
            }
            ast::Statement::IfElse {
                condition,
                positive,
                negative,
            } => {
                let condition = self.map_expr(scope, condition)?;
                let then_scope = self.block_scope(scope, ordinal)?;
                let else_scope = self.block_scope(scope, ordinal)?;

                Ok(Stmt::IfElse {
                    then_label: self.symtab.path(then_scope),
                    else_label: self.symtab.path(else_scope),
                    condition,
                    positive: self.map_statements(then_scope, positive)?,
                    negative: match negative {
                        Some(negative) => self.map_statements(else_scope, negative)?,
                        None => Vec::new(),
                    },
                })
            }
            ast::Statement::While { condition, body } => {
                let condition = self.map_expr(scope, condition)?;
                let child = self.block_scope(scope, ordinal)?;

                Ok(Stmt::While {
                    label: self.symtab.path(child),
                    condition,
                    body: self.map_statements(child, body)?,
                })
            }
            ast::Statement::For {
                init,
                condition,
                increment,
                body,
            } => {
                let child = self.block_scope(scope, ordinal)?;

                Ok(Stmt::For {
                    label: self.symtab.path(child),
                    init: Box::new(self.map_local_decl(child, init)?),
                    condition: self.map_expr(child, condition)?,
                    increment: self.map_expr(child, increment)?,
                    body: self.map_statements(child, body)?,
                })
            }
            ast::Statement::Continue => Ok(Stmt::Continue),
            ast::Statement::Break => Ok(Stmt::Break),
            ast::Statement::Return(value) => Ok(Stmt::Return(match value {
                Some(value) => Some(self.map_expr(scope, value)?),
                None => None,
            })),
        }
    }

    /// Re-enters the scope the semantic pass created for the next
    /// block-shaped statement
    fn block_scope(&self, scope: ScopeId, ordinal: &mut usize) -> Result<ScopeId, CompileError> {
        let key = ordinal.to_string();
        *ordinal += 1;

        self.symtab
            .child(scope, &key)
            .ok_or_else(|| CompileError::NotABlock(format!("{}.{}", self.symtab.path(scope), key)))
    }

    fn map_local_decl(&self, scope: ScopeId, decl: &ast::ValueDecl) -> Result<Stmt, CompileError> {
        let Some(Binding::Value(binding)) = self.symtab.binding(scope, &decl.name) else {
            return Err(CompileError::UndefinedIdentifier(decl.name.clone()));
        };
        let ty = lower_type(&binding.ty);

        let value = match &decl.value {
            ast::Expression::ArrayLiteral(elements) if elements.is_empty() => Expr {
                ty: ty.clone(),
                kind: ExprKind::ArrayInit,
            },
            value => self.map_expr(scope, value)?,
        };

        Ok(Stmt::Decl {
            ty,
            name: format!("{}.{}", self.symtab.path(scope), decl.name),
            value,
        })
    }

    fn map_expr(&self, scope: ScopeId, expression: &ast::Expression) -> Result<Expr, CompileError> {
        match expression {
            ast::Expression::Identifier(name) => self.map_identifier(scope, name),
            ast::Expression::Literal(literal) => Ok(Expr {
                ty: lower_type(&type_check::literal_type(literal)),
                kind: ExprKind::Literal(lower_literal(literal)),
            }),
            ast::Expression::StructLiteral(fields) => {
                let fields = fields
                    .iter()
                    .map(|f| self.map_expr(scope, f))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Expr {
                    ty: Type::Struct {
                        packed: false,
                        fields: fields.iter().map(|f| f.ty.clone()).collect(),
                    },
                    kind: ExprKind::StructLiteral(fields),
                })
            }
            ast::Expression::ArrayLiteral(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| self.map_expr(scope, e))
                    .collect::<Result<Vec<_>, _>>()?;
                let Some(first) = elements.first() else {
                    return Err(CompileError::CannotInfer("an empty array literal"));
                };

                Ok(Expr {
                    ty: Type::Array {
                        length: elements.len(),
                        element: Box::new(first.ty.clone()),
                    },
                    kind: ExprKind::ArrayElems(elements),
                })
            }
            ast::Expression::Binary { lhs, operator, rhs } => {
                self.map_binary(scope, lhs, *operator, rhs)
            }
            ast::Expression::Unary { operator, operand } => {
                self.map_unary(scope, *operator, operand)
            }
            ast::Expression::Assignment { lhs, rhs } => {
                let value = self.map_expr(scope, rhs)?;
                self.map_assign_to(scope, lhs, value)
            }
            ast::Expression::FunctionCall { target, arguments } => {
                self.map_call(scope, target, arguments)
            }
            ast::Expression::Index { base, index } => {
                let gep = self.index_addr(scope, base, index)?;
                let Type::Ptr(element) = &gep.ty else {
                    return Err(CompileError::IndexOfNonArray(eval_expr_type(
                        self.symtab,
                        scope,
                        base,
                    )?));
                };

                Ok(Expr {
                    ty: (**element).clone(),
                    kind: ExprKind::Unary {
                        op: UnOp::Deref,
                        operand: Box::new(gep),
                    },
                })
            }
            ast::Expression::Field { base, accessor } => {
                self.map_field_access(scope, base, accessor)
            }
            ast::Expression::Cast { ty, operand } => {
                let to = type_check::resolve_type(self.symtab, scope, ty)?;
                self.build_cast(scope, to, operand)
            }
            ast::Expression::TemplateInstance { .. } => Err(CompileError::Unsupported(
                "template instantiation must be resolved before lowering",
            )),
        }
    }

    fn map_identifier(&self, scope: ScopeId, name: &str) -> Result<Expr, CompileError> {
        let Some((def_scope, Binding::Value(binding))) = self.symtab.lookup(scope, name) else {
            return Err(CompileError::UndefinedIdentifier(name.to_owned()));
        };

        let symbol = if def_scope == self.symtab.root() {
            Symbol::Global(name.to_owned())
        } else {
            Symbol::Local(format!("{}.{}", self.symtab.path(def_scope), name))
        };

        Ok(Expr {
            ty: lower_type(&binding.ty),
            kind: ExprKind::Identifier(symbol),
        })
    }

    fn map_binary(
        &self,
        scope: ScopeId,
        lhs: &ast::Expression,
        operator: ast::BinaryOperatorKind,
        rhs: &ast::Expression,
    ) -> Result<Expr, CompileError> {
        use ast::BinaryOperatorKind as Ast;

        let lhs_src = eval_expr_type(self.symtab, scope, lhs)?;
        let rhs_src = eval_expr_type(self.symtab, scope, rhs)?;

        // Pointer arithmetic becomes an address computation, not an integer
        // add
        if matches!(operator, Ast::Add | Ast::Subtract) {
            let sides = if lhs_src.is_pointer() && rhs_src.is_integer() {
                Some((lhs, rhs, &lhs_src))
            } else if operator == Ast::Add && lhs_src.is_integer() && rhs_src.is_pointer() {
                Some((rhs, lhs, &rhs_src))
            } else {
                None
            };

            if let Some((pointer, offset, pointer_src)) = sides {
                let pointee =
                    pointer_src
                        .pointee()
                        .ok_or_else(|| CompileError::InvalidOperand {
                            operator: operator.to_string(),
                            ty: pointer_src.clone(),
                        })?;
                let pointee = lower_type(pointee);

                let base = self.map_expr(scope, pointer)?;
                let mut index = self.map_expr(scope, offset)?;
                if operator == Ast::Subtract {
                    index = Expr {
                        ty: index.ty.clone(),
                        kind: ExprKind::Unary {
                            op: UnOp::Neg,
                            operand: Box::new(index),
                        },
                    };
                }

                return Ok(Expr {
                    ty: lower_type(pointer_src),
                    kind: ExprKind::GetElemPtr {
                        pointee,
                        base: Box::new(base),
                        indices: vec![index],
                    },
                });
            }
        }

        let lhs = self.map_expr(scope, lhs)?;
        let rhs = self.map_expr(scope, rhs)?;

        let (op, ty) = match operator {
            Ast::Add => (BinOp::Add, lhs.ty.clone()),
            Ast::Subtract => (BinOp::Sub, lhs.ty.clone()),
            Ast::Multiply => (BinOp::Mul, lhs.ty.clone()),
            Ast::Divide => (BinOp::Div, lhs.ty.clone()),
            Ast::Remainder => (BinOp::Rem, lhs.ty.clone()),
            Ast::Equal => (BinOp::Eq, Type::UInt(1)),
            Ast::Less => (BinOp::Lt, Type::UInt(1)),
            Ast::Greater => (BinOp::Gt, Type::UInt(1)),
            Ast::LogicalAnd | Ast::BitAnd => (BinOp::And, lhs.ty.clone()),
            Ast::LogicalOr | Ast::BitOr => (BinOp::Or, lhs.ty.clone()),
            Ast::BitXor => (BinOp::Xor, lhs.ty.clone()),
            Ast::ShiftLeft => (BinOp::Shl, lhs.ty.clone()),
            Ast::ShiftRight => (BinOp::Shr, lhs.ty.clone()),
        };

        Ok(Expr {
            ty,
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        })
    }

    fn map_unary(
        &self,
        scope: ScopeId,
        operator: ast::UnaryOperatorKind,
        operand: &ast::Expression,
    ) -> Result<Expr, CompileError> {
        use ast::UnaryOperatorKind as Ast;

        let mapped = self.map_expr(scope, operand)?;

        let (op, ty) = match operator {
            Ast::Negate => (UnOp::Neg, mapped.ty.clone()),
            Ast::Not => (UnOp::Not, Type::UInt(1)),
            Ast::BitNot => (UnOp::BitNot, mapped.ty.clone()),
            Ast::Deref => {
                let Type::Ptr(pointee) = mapped.ty.resolve_alias() else {
                    return Err(CompileError::InvalidOperand {
                        operator: "*".to_owned(),
                        ty: eval_expr_type(self.symtab, scope, operand)?,
                    });
                };
                (UnOp::Deref, (**pointee).clone())
            }
            Ast::AddressOf => (UnOp::AddressOf, mapped.ty.clone().pointer_to()),
        };

        Ok(Expr {
            ty,
            kind: ExprKind::Unary {
                op,
                operand: Box::new(mapped),
            },
        })
    }

    /// Rewrites an assignment according to the shape of its left-hand side
    fn map_assign_to(
        &self,
        scope: ScopeId,
        lhs: &ast::Expression,
        value: Expr,
    ) -> Result<Expr, CompileError> {
        let void = |kind| Expr {
            ty: Type::Void,
            kind,
        };

        match lhs {
            ast::Expression::Identifier(name) => {
                let target = match self.map_identifier(scope, name)?.kind {
                    ExprKind::Identifier(symbol) => symbol,
                    _ => return Err(CompileError::InvalidLValue),
                };

                Ok(void(ExprKind::Assignment {
                    target,
                    value: Box::new(value),
                }))
            }
            ast::Expression::Unary {
                operator: ast::UnaryOperatorKind::Deref,
                operand,
            } => {
                let ptr = self.map_expr(scope, operand)?;
                Ok(void(ExprKind::Write {
                    ptr: Box::new(ptr),
                    value: Box::new(value),
                }))
            }
            ast::Expression::Index { base, index } => {
                let ptr = self.index_addr(scope, base, index)?;
                Ok(void(ExprKind::Write {
                    ptr: Box::new(ptr),
                    value: Box::new(value),
                }))
            }
            ast::Expression::Field { base, accessor } => {
                let field = self.map_field_access(scope, base, accessor)?;
                let ptr = Expr {
                    ty: field.ty.clone().pointer_to(),
                    kind: ExprKind::Unary {
                        op: UnOp::AddressOf,
                        operand: Box::new(field),
                    },
                };

                Ok(void(ExprKind::Write {
                    ptr: Box::new(ptr),
                    value: Box::new(value),
                }))
            }
            ast::Expression::StructLiteral(elements) => {
                // Destructure: bind the struct value once, then assign each
                // field through the scratch temporary
                let Some(field_tys) = value.ty.struct_fields() else {
                    return Err(CompileError::InvalidLValue);
                };
                let field_tys: Vec<Type> = field_tys.into_iter().cloned().collect();
                if field_tys.len() != elements.len() {
                    return Err(CompileError::ArityMismatch {
                        expected: field_tys.len(),
                        found: elements.len(),
                    });
                }

                let base_ty = value.ty.clone();
                let fields = elements
                    .iter()
                    .enumerate()
                    .map(|(index, element)| {
                        let field_value = Expr {
                            ty: field_tys[index].clone(),
                            kind: ExprKind::StructAccess {
                                base: Box::new(Expr {
                                    ty: base_ty.clone(),
                                    kind: ExprKind::Temporary,
                                }),
                                index,
                            },
                        };
                        self.map_assign_to(scope, element, field_value)
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Expr {
                    ty: base_ty,
                    kind: ExprKind::StructAssign {
                        base: Box::new(value),
                        fields,
                    },
                })
            }
            _ => Err(CompileError::InvalidLValue),
        }
    }

    fn map_call(
        &self,
        scope: ScopeId,
        target: &ast::Expression,
        arguments: &[ast::Expression],
    ) -> Result<Expr, CompileError> {
        // A callee that names a type is the construct/cast idiom
        if let ast::Expression::Identifier(name) = target {
            let named = if let Some(ty) = crate::middle::primitive::builtin_type(name) {
                Some(ty)
            } else if let Some((_, Binding::Type(ty))) = self.symtab.lookup(scope, name) {
                Some(ty.clone())
            } else {
                None
            };

            if let Some(named) = named {
                return match named.strip_alias() {
                    SourceType::Struct { .. } | SourceType::StructLabeled { .. } => {
                        let fields = arguments
                            .iter()
                            .map(|a| self.map_expr(scope, a))
                            .collect::<Result<Vec<_>, _>>()?;

                        Ok(Expr {
                            ty: lower_type(&named),
                            kind: ExprKind::StructLiteral(fields),
                        })
                    }
                    _ => {
                        let [argument] = arguments else {
                            return Err(CompileError::ArityMismatch {
                                expected: 1,
                                found: arguments.len(),
                            });
                        };
                        self.build_cast(scope, named, argument)
                    }
                };
            }
        }

        let callee = self.map_expr(scope, target)?;
        let Type::Fn { return_type, .. } = callee.ty.resolve_alias() else {
            return Err(CompileError::NotAFunction(eval_expr_type(
                self.symtab,
                scope,
                target,
            )?));
        };
        let return_type = (**return_type).clone();

        let arguments = arguments
            .iter()
            .map(|a| self.map_expr(scope, a))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Expr {
            ty: return_type,
            kind: ExprKind::FunctionCall {
                callee: Box::new(callee),
                arguments,
            },
        })
    }

    /// `&a[i]`: a GEP through the array's address with a leading zero index
    fn index_addr(
        &self,
        scope: ScopeId,
        base: &ast::Expression,
        index: &ast::Expression,
    ) -> Result<Expr, CompileError> {
        let base_src = eval_expr_type(self.symtab, scope, base)?;
        let SourceType::Array { element, .. } = base_src.strip_alias() else {
            return Err(CompileError::IndexOfNonArray(base_src));
        };
        let element_ty = lower_type(element);
        let array_ty = lower_type(base_src.strip_alias());

        let base = self.map_expr(scope, base)?;
        let base_addr = Expr {
            ty: base.ty.clone().pointer_to(),
            kind: ExprKind::Unary {
                op: UnOp::AddressOf,
                operand: Box::new(base),
            },
        };

        let zero = Expr {
            ty: Type::Int(32),
            kind: ExprKind::Literal(Literal::Int(0)),
        };
        let index = self.map_expr(scope, index)?;

        Ok(Expr {
            ty: element_ty.pointer_to(),
            kind: ExprKind::GetElemPtr {
                pointee: array_ty,
                base: Box::new(base_addr),
                indices: vec![zero, index],
            },
        })
    }

    fn map_field_access(
        &self,
        scope: ScopeId,
        base: &ast::Expression,
        accessor: &ast::FieldAccessor,
    ) -> Result<Expr, CompileError> {
        let base_src = eval_expr_type(self.symtab, scope, base)?;

        let index = match (base_src.strip_alias(), accessor) {
            (SourceType::StructLabeled { fields, .. }, ast::FieldAccessor::Named(name)) => fields
                .iter()
                .position(|(field, _)| field == name)
                .ok_or_else(|| CompileError::UnknownField {
                    field: name.clone(),
                    ty: base_src.clone(),
                })?,
            (
                SourceType::StructLabeled { .. } | SourceType::Struct { .. },
                ast::FieldAccessor::Position(index),
            ) => *index,
            (SourceType::Struct { .. }, ast::FieldAccessor::Named(_)) => {
                return Err(CompileError::FieldNameOnUnlabeledStruct(base_src));
            }
            _ => return Err(CompileError::MemberAccessOnNonStruct(base_src)),
        };

        let base = self.map_expr(scope, base)?;
        let Some(field_tys) = base.ty.struct_fields() else {
            return Err(CompileError::MemberAccessOnNonStruct(base_src));
        };
        let field_ty = field_tys
            .get(index)
            .cloned()
            .cloned()
            .ok_or_else(|| CompileError::UnknownField {
                field: index.to_string(),
                ty: base_src.clone(),
            })?;

        Ok(Expr {
            ty: field_ty,
            kind: ExprKind::StructAccess {
                base: Box::new(base),
                index,
            },
        })
    }

    /// Picks the narrow cast operation for a checked conversion. Casting a
    /// value to its own type emits nothing.
    fn build_cast(
        &self,
        scope: ScopeId,
        to_src: SourceType,
        operand: &ast::Expression,
    ) -> Result<Expr, CompileError> {
        let from_src = eval_expr_type(self.symtab, scope, operand)?;
        let mapped = self.map_expr(scope, operand)?;
        let to_ty = lower_type(&to_src);

        let from = from_src.strip_alias();
        let to = to_src.strip_alias();

        let retype = |mapped: Expr| Expr {
            ty: to_ty.clone(),
            kind: mapped.kind,
        };
        let cast = |op: CastKind, mapped: Expr| Expr {
            ty: to_ty.clone(),
            kind: ExprKind::Cast {
                op,
                operand: Box::new(mapped),
            },
        };

        if from == to {
            return Ok(retype(mapped));
        }

        let expr = if from.is_integer() && to.is_float() {
            cast(CastKind::IntToFloat, mapped)
        } else if from.is_float() && to.is_integer() {
            cast(CastKind::FloatToInt, mapped)
        } else if from.is_float() && to.is_float() {
            let (f, t) = (from.bit_width().unwrap(), to.bit_width().unwrap());
            cast(if t < f { CastKind::Trunc } else { CastKind::Ext }, mapped)
        } else if from.is_integer() && to.is_bool() {
            // `bool(e)` is `e != 0`
            let zero = Expr {
                ty: mapped.ty.clone(),
                kind: ExprKind::Literal(Literal::Int(0)),
            };
            let is_zero = Expr {
                ty: Type::UInt(1),
                kind: ExprKind::Binary {
                    op: BinOp::Eq,
                    lhs: Box::new(mapped),
                    rhs: Box::new(zero),
                },
            };
            Expr {
                ty: to_ty.clone(),
                kind: ExprKind::Unary {
                    op: UnOp::Not,
                    operand: Box::new(is_zero),
                },
            }
        } else if from.is_bool() && to.is_integer() {
            cast(CastKind::Ext, mapped)
        } else if from.is_integer() && to.is_integer() {
            let (f, t) = (from.bit_width().unwrap(), to.bit_width().unwrap());
            if t < f {
                cast(CastKind::Trunc, mapped)
            } else if t > f {
                cast(CastKind::Ext, mapped)
            } else {
                retype(mapped)
            }
        } else if from.is_integer() && to.is_pointer() {
            cast(CastKind::IntToPtr, mapped)
        } else if from.is_pointer() && to.is_integer() {
            cast(CastKind::PtrToInt, mapped)
        } else if from.is_pointer() && to.is_pointer() {
            let same_pointee = lower_type(from) == lower_type(to);
            if same_pointee {
                retype(mapped)
            } else {
                cast(CastKind::BitCast, mapped)
            }
        } else {
            return Err(CompileError::InvalidCast {
                from: from_src,
                to: to_src,
            });
        };

        Ok(expr)
    }
}

pub fn lower_type(ty: &SourceType) -> Type {
    match ty {
        SourceType::Int(w) => Type::Int(w.bits()),
        SourceType::UInt(w) => Type::UInt(w.bits()),
        SourceType::Float(w) => Type::Float(w.bits()),
        SourceType::Bool => Type::UInt(1),
        SourceType::Void => Type::Void,
        SourceType::Pointer(inner) | SourceType::MutPointer(inner) => {
            Type::Ptr(Box::new(lower_type(inner)))
        }
        SourceType::Array { length, element } => Type::Array {
            length: *length,
            element: Box::new(lower_type(element)),
        },
        SourceType::Struct { packed, fields } => Type::Struct {
            packed: *packed,
            fields: fields.iter().map(lower_type).collect(),
        },
        SourceType::StructLabeled { packed, fields } => Type::StructLabeled {
            packed: *packed,
            fields: fields
                .iter()
                .map(|(name, ty)| (name.clone(), lower_type(ty)))
                .collect(),
        },
        SourceType::Alias { name, ty } => Type::Alias {
            name: name.clone(),
            ty: Box::new(lower_type(ty)),
        },
        SourceType::Stub(name) => Type::Opaque(name.clone()),
        SourceType::Function {
            parameters,
            return_type,
        } => Type::Fn {
            parameters: parameters.iter().map(lower_type).collect(),
            return_type: Box::new(lower_type(return_type)),
        },
    }
}

pub fn lower_literal(literal: &ast::Literal) -> Literal {
    match literal {
        ast::Literal::Int { value, .. } => Literal::Int(*value),
        ast::Literal::Float32(value) => Literal::Float(f64::from(*value)),
        ast::Literal::Float64(value) => Literal::Float(*value),
        ast::Literal::Bool(value) => Literal::Bool(*value),
        ast::Literal::Str(value) => Literal::Str(value.clone()),
    }
}
