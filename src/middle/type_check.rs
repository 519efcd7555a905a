//! Semantic analysis.
//!
//! Building the symbol table and type checking are one walk over the parse
//! tree: a local binding's type can only be recorded once its initializer
//! has been typed, so the scope tree is constructed and validated together.
//! The walk has 2 main components:
//!
//!   1) a top level pass over named types, statics and function signatures
//!      to build up the global environment
//!   2) a descent into every function body that creates the nested block
//!      scopes, binds locals and checks every expression against the typing
//!      rules
//!
//! After this pass succeeds the input is guaranteed to be well formed and
//! the later passes no longer report user errors. The mid-IR builder
//! re-walks statements with the same block ordinal counter used here and
//! calls back into [`eval_expr_type`] to recover expression types.

use log::debug;

use crate::{
    ast,
    error::CompileError,
    middle::{
        primitive::{self, FloatWidth, IntWidth},
        symtab::{Binding, ScopeId, ScopeTree, ValueBinding},
        ty::SourceType,
    },
};

/// Builds the scope tree for a module, type checking everything on the way.
/// This is the first backend pass; its output drives the mid-IR builder.
pub fn construct_symtab(module: &ast::Module) -> Result<ScopeTree, CompileError> {
    debug!(
        "semantic analysis over {} top level declaration(s)",
        module.roots.len()
    );

    let mut analyzer = Analyzer {
        tree: ScopeTree::new(),
        loop_depth: 0,
    };

    analyzer.bind_named_types(module)?;
    analyzer.bind_top_level_values(module)?;

    Ok(analyzer.tree)
}

struct Analyzer {
    tree: ScopeTree,
    loop_depth: u32,
}

impl Analyzer {
    /// First top level pass: named types only, so later signatures can refer
    /// to them regardless of declaration order of values
    fn bind_named_types(&mut self, module: &ast::Module) -> Result<(), CompileError> {
        let root = self.tree.root();

        for decl in &module.roots {
            match decl {
                ast::Root::TypeFwdDef { name } => {
                    self.tree
                        .bind(root, name, Binding::Type(SourceType::Stub(name.clone())))?;
                }
                ast::Root::TypeDef { name, ty } => {
                    let body = self.resolve_type(root, ty)?;
                    let alias = SourceType::Alias {
                        name: name.clone(),
                        ty: Box::new(body),
                    };

                    match self.tree.binding(root, name) {
                        // A forward declaration is closed by its definition
                        Some(Binding::Type(SourceType::Stub(_))) => {
                            self.tree.rebind(root, name, Binding::Type(alias));
                        }
                        Some(_) => return Err(CompileError::DuplicateSymbol(name.clone())),
                        None => self.tree.bind(root, name, Binding::Type(alias))?,
                    }
                }
                ast::Root::ValDecl { .. }
                | ast::Root::FuncDecl { .. }
                | ast::Root::FuncFwdDecl { .. } => {}
            }
        }

        Ok(())
    }

    /// Second top level pass: statics, function declarations, and the
    /// descent into every function body
    fn bind_top_level_values(&mut self, module: &ast::Module) -> Result<(), CompileError> {
        let root = self.tree.root();

        for decl in &module.roots {
            match decl {
                ast::Root::TypeDef { .. } | ast::Root::TypeFwdDef { .. } => {}
                ast::Root::ValDecl { decl, .. } => self.check_static_decl(decl)?,
                ast::Root::FuncFwdDecl {
                    name,
                    params,
                    return_type,
                    ..
                } => {
                    let ty = self.function_type(root, params, return_type)?;
                    self.tree.bind(
                        root,
                        name,
                        Binding::Value(ValueBinding {
                            mutability: ast::Mutability::Val,
                            ty,
                            inner: None,
                        }),
                    )?;
                }
                ast::Root::FuncDecl { func, .. } => self.check_function(func)?,
            }
        }

        Ok(())
    }

    /// Static initializers must be plain literals; constant expressions are
    /// not folded by the backend
    fn check_static_decl(&mut self, decl: &ast::ValueDecl) -> Result<(), CompileError> {
        let root = self.tree.root();

        let literal_ty = match &decl.value {
            ast::Expression::Literal(literal) => literal_type(literal),
            ast::Expression::Binary { .. } => {
                return Err(CompileError::Unsupported(
                    "constant expressions in static initializers",
                ));
            }
            _ => {
                return Err(CompileError::Unsupported(
                    "non-literal static initializers",
                ));
            }
        };

        let ty = match &decl.ty {
            Some(annotated) => {
                let annotated = self.resolve_type(root, annotated)?;
                if annotated != literal_ty {
                    return Err(CompileError::TypeMismatch {
                        expected: annotated,
                        found: literal_ty,
                    });
                }
                annotated
            }
            None => literal_ty,
        };

        self.tree.bind(
            root,
            &decl.name,
            Binding::Value(ValueBinding {
                mutability: decl.mutability,
                ty,
                inner: None,
            }),
        )
    }

    fn check_function(&mut self, func: &ast::FunctionDef) -> Result<(), CompileError> {
        debug!("type checking function `{}`", func.name);

        let root = self.tree.root();
        let fn_ty = self.function_type(root, &func.params, &func.return_type)?;

        // A prior binding is only legal if it is a forward declaration with
        // a matching signature
        match self.tree.binding(root, &func.name) {
            None => {}
            Some(Binding::Value(prior)) if prior.inner.is_none() && prior.ty.is_function() => {
                if prior.ty != fn_ty {
                    return Err(CompileError::ForwardDeclMismatch(func.name.clone()));
                }
            }
            Some(_) => return Err(CompileError::DuplicateSymbol(func.name.clone())),
        }

        let scope = self.tree.new_scope(root, &func.name);
        self.tree.rebind(
            root,
            &func.name,
            Binding::Value(ValueBinding {
                mutability: ast::Mutability::Val,
                ty: fn_ty,
                inner: Some(scope),
            }),
        );

        for param in &func.params {
            let ty = self.resolve_type(scope, &param.ty)?;

            if self.tree.binding(scope, &param.name).is_some() {
                return Err(CompileError::DuplicateParameter(param.name.clone()));
            }

            self.tree.bind(
                scope,
                &param.name,
                Binding::Value(ValueBinding {
                    mutability: ast::Mutability::Val,
                    ty,
                    inner: None,
                }),
            )?;
        }

        self.check_statements(scope, &func.body)
    }

    fn function_type(
        &mut self,
        scope: ScopeId,
        params: &[ast::Param],
        return_type: &ast::Type,
    ) -> Result<SourceType, CompileError> {
        let parameters = params
            .iter()
            .map(|p| self.resolve_type(scope, &p.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = self.resolve_type(scope, return_type)?;

        Ok(SourceType::Function {
            parameters,
            return_type: Box::new(return_type),
        })
    }

    fn resolve_type(&self, scope: ScopeId, ty: &ast::Type) -> Result<SourceType, CompileError> {
        resolve_type(&self.tree, scope, ty)
    }

    /// Walks the statements of one block body. The ordinal counter is bumped
    /// for every block-shaped statement (if/else consumes two: one per arm);
    /// the resulting child scope keys are what the mid-IR builder
    /// reconstructs label names from.
    fn check_statements(
        &mut self,
        scope: ScopeId,
        statements: &[ast::Statement],
    ) -> Result<(), CompileError> {
        let mut ordinal = 0usize;

        for statement in statements {
            self.check_statement(scope, statement, &mut ordinal)?;
        }

        Ok(())
    }

    fn check_statement(
        &mut self,
        scope: ScopeId,
        statement: &ast::Statement,
        ordinal: &mut usize,
    ) -> Result<(), CompileError> {
        match statement {
            ast::Statement::Empty => Ok(()),
            ast::Statement::Declaration(decl) => self.check_local_decl(scope, decl),
            ast::Statement::Expression(expression) => {
                eval_expr_type(&self.tree, scope, expression).map(|_| ())
            }
            ast::Statement::Block(statements) => {
                let child = self.new_block_scope(scope, ordinal);
                self.check_statements(child, statements)
            }
            ast::Statement::IfElse {
                condition,
                positive,
                negative,
            } => {
                self.check_condition(scope, condition)?;

                // Both arms consume an ordinal even when the else is absent,
                // so that label names do not depend on arm presence
                let positive_scope = self.new_block_scope(scope, ordinal);
                let negative_scope = self.new_block_scope(scope, ordinal);

                self.check_statements(positive_scope, positive)?;
                if let Some(negative) = negative {
                    self.check_statements(negative_scope, negative)?;
                }

                Ok(())
            }
            ast::Statement::While { condition, body } => {
                self.check_condition(scope, condition)?;

                let child = self.new_block_scope(scope, ordinal);
                self.loop_depth += 1;
                let result = self.check_statements(child, body);
                self.loop_depth -= 1;
                result
            }
            ast::Statement::For {
                init,
                condition,
                increment,
                body,
            } => {
                // The induction variable lives in the loop's own scope and
                // is visible in the condition, increment and body
                let child = self.new_block_scope(scope, ordinal);
                self.check_local_decl(child, init)?;
                self.check_condition(child, condition)?;
                eval_expr_type(&self.tree, child, increment)?;

                self.loop_depth += 1;
                let result = self.check_statements(child, body);
                self.loop_depth -= 1;
                result
            }
            ast::Statement::Continue => {
                if self.loop_depth == 0 {
                    return Err(CompileError::ContinueOutsideLoop);
                }
                Ok(())
            }
            ast::Statement::Break => {
                if self.loop_depth == 0 {
                    return Err(CompileError::BreakOutsideLoop);
                }
                Ok(())
            }
            ast::Statement::Return(value) => {
                // The value's type is not checked against the enclosing
                // function's signature; the linearizer emits `ret` with the
                // expression's own type
                if let Some(value) = value {
                    eval_expr_type(&self.tree, scope, value)?;
                }
                Ok(())
            }
        }
    }

    fn new_block_scope(&mut self, parent: ScopeId, ordinal: &mut usize) -> ScopeId {
        let child = self.tree.new_scope(parent, &ordinal.to_string());
        *ordinal += 1;
        child
    }

    fn check_condition(
        &self,
        scope: ScopeId,
        condition: &ast::Expression,
    ) -> Result<(), CompileError> {
        let ty = eval_expr_type(&self.tree, scope, condition)?;
        if !ty.is_bool() {
            return Err(CompileError::NonBooleanCondition(ty));
        }
        Ok(())
    }

    fn check_local_decl(
        &mut self,
        scope: ScopeId,
        decl: &ast::ValueDecl,
    ) -> Result<(), CompileError> {
        let ty = match &decl.value {
            // Empty array literals zero-initialize and need the annotation
            ast::Expression::ArrayLiteral(elements) if elements.is_empty() => {
                let Some(annotated) = &decl.ty else {
                    return Err(CompileError::CannotInfer("an empty array literal"));
                };

                let annotated = self.resolve_type(scope, annotated)?;
                if !matches!(annotated.strip_alias(), SourceType::Array { .. }) {
                    return Err(CompileError::CannotInfer("an empty array literal"));
                }
                annotated
            }
            value => {
                let value_ty = eval_expr_type(&self.tree, scope, value)?;

                match &decl.ty {
                    Some(annotated) => {
                        let annotated = self.resolve_type(scope, annotated)?;
                        if annotated != value_ty {
                            return Err(CompileError::TypeMismatch {
                                expected: annotated,
                                found: value_ty,
                            });
                        }
                        annotated
                    }
                    None => value_ty,
                }
            }
        };

        self.tree.bind(
            scope,
            &decl.name,
            Binding::Value(ValueBinding {
                mutability: decl.mutability,
                ty,
                inner: None,
            }),
        )
    }
}

/// Assigns a source type to an expression, resolving identifiers through the
/// scope stack rooted at `scope`. Shared between the semantic pass and the
/// mid-IR builder.
pub fn eval_expr_type(
    tree: &ScopeTree,
    scope: ScopeId,
    expression: &ast::Expression,
) -> Result<SourceType, CompileError> {
    match expression {
        ast::Expression::Identifier(name) => {
            Ok(resolve_value(tree, scope, name)?.ty.clone())
        }
        ast::Expression::Literal(literal) => Ok(literal_type(literal)),
        ast::Expression::StructLiteral(fields) => Ok(SourceType::Struct {
            packed: false,
            fields: fields
                .iter()
                .map(|f| eval_expr_type(tree, scope, f))
                .collect::<Result<_, _>>()?,
        }),
        ast::Expression::ArrayLiteral(elements) => {
            let Some(first) = elements.first() else {
                return Err(CompileError::CannotInfer("an empty array literal"));
            };

            let element = eval_expr_type(tree, scope, first)?;
            for other in &elements[1..] {
                let other = eval_expr_type(tree, scope, other)?;
                if other != element {
                    return Err(CompileError::TypeMismatch {
                        expected: element,
                        found: other,
                    });
                }
            }

            Ok(SourceType::Array {
                length: elements.len(),
                element: Box::new(element),
            })
        }
        ast::Expression::Binary { lhs, operator, rhs } => {
            eval_binary_type(tree, scope, lhs, *operator, rhs)
        }
        ast::Expression::Unary { operator, operand } => {
            eval_unary_type(tree, scope, *operator, operand)
        }
        ast::Expression::Assignment { lhs, rhs } => {
            let rhs_ty = eval_expr_type(tree, scope, rhs)?;
            check_assign_target(tree, scope, lhs, &rhs_ty)?;
            Ok(SourceType::Void)
        }
        ast::Expression::FunctionCall { target, arguments } => {
            eval_call_type(tree, scope, target, arguments)
        }
        ast::Expression::Index { base, index } => {
            let base_ty = eval_expr_type(tree, scope, base)?;
            let SourceType::Array { element, .. } = base_ty.strip_alias() else {
                return Err(CompileError::IndexOfNonArray(base_ty));
            };
            let element = (**element).clone();

            let index_ty = eval_expr_type(tree, scope, index)?;
            if !index_ty.is_integer() {
                return Err(CompileError::InvalidOperand {
                    operator: "[]".to_owned(),
                    ty: index_ty,
                });
            }

            Ok(element)
        }
        ast::Expression::Field { base, accessor } => {
            let base_ty = eval_expr_type(tree, scope, base)?;
            field_type(&base_ty, accessor)
        }
        ast::Expression::Cast { ty, operand } => {
            let to = resolve_type(tree, scope, ty)?;
            let from = eval_expr_type(tree, scope, operand)?;

            if from == to || viable_cast(&from, &to) {
                Ok(to)
            } else {
                Err(CompileError::InvalidCast { from, to })
            }
        }
        ast::Expression::TemplateInstance { .. } => Err(CompileError::Unsupported(
            "template instantiation must be resolved before lowering",
        )),
    }
}

fn eval_binary_type(
    tree: &ScopeTree,
    scope: ScopeId,
    lhs: &ast::Expression,
    operator: ast::BinaryOperatorKind,
    rhs: &ast::Expression,
) -> Result<SourceType, CompileError> {
    use ast::BinaryOperatorKind::*;

    let lhs_ty = eval_expr_type(tree, scope, lhs)?;
    let rhs_ty = eval_expr_type(tree, scope, rhs)?;

    match operator {
        Add | Subtract => {
            // Pointer arithmetic: `ptr + n`, `n + ptr` and `ptr - n` keep
            // the pointer type and lower to address computations later
            if lhs_ty.is_pointer() && rhs_ty.is_integer() {
                return Ok(lhs_ty);
            }
            if operator == Add && lhs_ty.is_integer() && rhs_ty.is_pointer() {
                return Ok(rhs_ty);
            }

            arithmetic_type(operator, lhs_ty, rhs_ty)
        }
        Multiply | Divide | Remainder => arithmetic_type(operator, lhs_ty, rhs_ty),
        Equal => {
            if lhs_ty != rhs_ty {
                return Err(CompileError::TypeMismatch {
                    expected: lhs_ty,
                    found: rhs_ty,
                });
            }
            if !(lhs_ty.is_numeric() || lhs_ty.is_bool() || lhs_ty.is_pointer()) {
                return Err(CompileError::InvalidOperand {
                    operator: operator.to_string(),
                    ty: lhs_ty,
                });
            }
            Ok(SourceType::Bool)
        }
        Less | Greater => {
            if lhs_ty != rhs_ty {
                return Err(CompileError::TypeMismatch {
                    expected: lhs_ty,
                    found: rhs_ty,
                });
            }
            if !lhs_ty.is_numeric() {
                return Err(CompileError::InvalidOperand {
                    operator: operator.to_string(),
                    ty: lhs_ty,
                });
            }
            Ok(SourceType::Bool)
        }
        LogicalAnd | LogicalOr => {
            for ty in [&lhs_ty, &rhs_ty] {
                if !ty.is_bool() {
                    return Err(CompileError::InvalidOperand {
                        operator: operator.to_string(),
                        ty: ty.clone(),
                    });
                }
            }
            Ok(SourceType::Bool)
        }
        BitAnd | BitOr | BitXor | ShiftLeft | ShiftRight => {
            if lhs_ty != rhs_ty {
                return Err(CompileError::TypeMismatch {
                    expected: lhs_ty,
                    found: rhs_ty,
                });
            }
            if !lhs_ty.is_integer() {
                return Err(CompileError::InvalidOperand {
                    operator: operator.to_string(),
                    ty: lhs_ty,
                });
            }
            Ok(lhs_ty)
        }
    }
}

fn arithmetic_type(
    operator: ast::BinaryOperatorKind,
    lhs_ty: SourceType,
    rhs_ty: SourceType,
) -> Result<SourceType, CompileError> {
    if lhs_ty != rhs_ty {
        return Err(CompileError::TypeMismatch {
            expected: lhs_ty,
            found: rhs_ty,
        });
    }
    if !lhs_ty.is_numeric() {
        return Err(CompileError::InvalidOperand {
            operator: operator.to_string(),
            ty: lhs_ty,
        });
    }
    Ok(lhs_ty)
}

fn eval_unary_type(
    tree: &ScopeTree,
    scope: ScopeId,
    operator: ast::UnaryOperatorKind,
    operand: &ast::Expression,
) -> Result<SourceType, CompileError> {
    use ast::UnaryOperatorKind::*;

    let operand_ty = eval_expr_type(tree, scope, operand)?;

    let invalid = |ty: SourceType| CompileError::InvalidOperand {
        operator: operator.to_string(),
        ty,
    };

    match operator {
        Negate => {
            if !operand_ty.is_numeric() {
                return Err(invalid(operand_ty));
            }
            Ok(operand_ty)
        }
        Not => {
            if !operand_ty.is_bool() {
                return Err(invalid(operand_ty));
            }
            Ok(SourceType::Bool)
        }
        BitNot => {
            if !operand_ty.is_integer() {
                return Err(invalid(operand_ty));
            }
            Ok(operand_ty)
        }
        Deref => match operand_ty.pointee() {
            Some(pointee) => Ok(pointee.clone()),
            None => Err(invalid(operand_ty)),
        },
        AddressOf => Ok(SourceType::Pointer(Box::new(operand_ty))),
    }
}

/// Checks one assignment target against the type being stored into it.
/// Struct-literal targets destructure field-wise.
fn check_assign_target(
    tree: &ScopeTree,
    scope: ScopeId,
    lhs: &ast::Expression,
    rhs_ty: &SourceType,
) -> Result<(), CompileError> {
    match lhs {
        ast::Expression::Identifier(name) => {
            let binding = resolve_value(tree, scope, name)?;

            if binding.mutability != ast::Mutability::Var {
                return Err(CompileError::AssignToImmutable(name.clone()));
            }
            if &binding.ty != rhs_ty {
                return Err(CompileError::TypeMismatch {
                    expected: binding.ty.clone(),
                    found: rhs_ty.clone(),
                });
            }
            Ok(())
        }
        ast::Expression::Unary {
            operator: ast::UnaryOperatorKind::Deref,
            operand,
        } => {
            let pointer_ty = eval_expr_type(tree, scope, operand)?;
            let Some(pointee) = pointer_ty.pointee() else {
                return Err(CompileError::InvalidOperand {
                    operator: "*".to_owned(),
                    ty: pointer_ty,
                });
            };

            if pointee != rhs_ty {
                return Err(CompileError::TypeMismatch {
                    expected: pointee.clone(),
                    found: rhs_ty.clone(),
                });
            }
            Ok(())
        }
        ast::Expression::Index { .. } | ast::Expression::Field { .. } => {
            let slot_ty = eval_expr_type(tree, scope, lhs)?;
            if &slot_ty != rhs_ty {
                return Err(CompileError::TypeMismatch {
                    expected: slot_ty,
                    found: rhs_ty.clone(),
                });
            }
            Ok(())
        }
        ast::Expression::StructLiteral(elements) => {
            let fields = struct_field_types(rhs_ty)?;
            if fields.len() != elements.len() {
                return Err(CompileError::ArityMismatch {
                    expected: fields.len(),
                    found: elements.len(),
                });
            }

            for (element, field_ty) in elements.iter().zip(&fields) {
                check_assign_target(tree, scope, element, field_ty)?;
            }
            Ok(())
        }
        _ => Err(CompileError::InvalidLValue),
    }
}

fn eval_call_type(
    tree: &ScopeTree,
    scope: ScopeId,
    target: &ast::Expression,
    arguments: &[ast::Expression],
) -> Result<SourceType, CompileError> {
    // A call whose callee names a type is the construct/cast idiom:
    // `TypeName(x)` builds a struct or casts the single argument
    if let ast::Expression::Identifier(name) = target {
        if let Some(ty) = primitive::builtin_type(name) {
            return eval_construct_or_cast(tree, scope, ty, arguments);
        }
        if let Some((_, Binding::Type(ty))) = tree.lookup(scope, name) {
            let ty = ty.clone();
            return eval_construct_or_cast(tree, scope, ty, arguments);
        }
    }

    let target_ty = eval_expr_type(tree, scope, target)?;
    let SourceType::Function {
        parameters,
        return_type,
    } = target_ty.strip_alias()
    else {
        return Err(CompileError::NotAFunction(target_ty));
    };

    if parameters.len() != arguments.len() {
        return Err(CompileError::ArityMismatch {
            expected: parameters.len(),
            found: arguments.len(),
        });
    }

    for (argument, parameter) in arguments.iter().zip(parameters) {
        let argument_ty = eval_expr_type(tree, scope, argument)?;
        if &argument_ty != parameter {
            return Err(CompileError::TypeMismatch {
                expected: parameter.clone(),
                found: argument_ty,
            });
        }
    }

    Ok((**return_type).clone())
}

fn eval_construct_or_cast(
    tree: &ScopeTree,
    scope: ScopeId,
    ty: SourceType,
    arguments: &[ast::Expression],
) -> Result<SourceType, CompileError> {
    match ty.strip_alias() {
        SourceType::Struct { .. } | SourceType::StructLabeled { .. } => {
            let fields = struct_field_types(&ty)?;
            if fields.len() != arguments.len() {
                return Err(CompileError::ArityMismatch {
                    expected: fields.len(),
                    found: arguments.len(),
                });
            }

            for (argument, field_ty) in arguments.iter().zip(&fields) {
                let argument_ty = eval_expr_type(tree, scope, argument)?;
                if &argument_ty != field_ty {
                    return Err(CompileError::TypeMismatch {
                        expected: field_ty.clone(),
                        found: argument_ty,
                    });
                }
            }

            Ok(ty)
        }
        _ => {
            if arguments.len() != 1 {
                return Err(CompileError::ArityMismatch {
                    expected: 1,
                    found: arguments.len(),
                });
            }

            let from = eval_expr_type(tree, scope, &arguments[0])?;
            if from == ty || viable_cast(&from, &ty) {
                Ok(ty)
            } else {
                Err(CompileError::InvalidCast { from, to: ty })
            }
        }
    }
}

/// The field types of a struct, labeled or not
fn struct_field_types(ty: &SourceType) -> Result<Vec<SourceType>, CompileError> {
    match ty.strip_alias() {
        SourceType::Struct { fields, .. } => Ok(fields.clone()),
        SourceType::StructLabeled { fields, .. } => {
            Ok(fields.iter().map(|(_, ty)| ty.clone()).collect())
        }
        _ => Err(CompileError::MemberAccessOnNonStruct(ty.clone())),
    }
}

fn field_type(
    base_ty: &SourceType,
    accessor: &ast::FieldAccessor,
) -> Result<SourceType, CompileError> {
    match (base_ty.strip_alias(), accessor) {
        (SourceType::StructLabeled { fields, .. }, ast::FieldAccessor::Named(name)) => fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty.clone())
            .ok_or_else(|| CompileError::UnknownField {
                field: name.clone(),
                ty: base_ty.clone(),
            }),
        (SourceType::StructLabeled { fields, .. }, ast::FieldAccessor::Position(index)) => fields
            .get(*index)
            .map(|(_, ty)| ty.clone())
            .ok_or_else(|| CompileError::UnknownField {
                field: index.to_string(),
                ty: base_ty.clone(),
            }),
        (SourceType::Struct { fields, .. }, ast::FieldAccessor::Position(index)) => fields
            .get(*index)
            .cloned()
            .ok_or_else(|| CompileError::UnknownField {
                field: index.to_string(),
                ty: base_ty.clone(),
            }),
        (SourceType::Struct { .. }, ast::FieldAccessor::Named(_)) => {
            Err(CompileError::FieldNameOnUnlabeledStruct(base_ty.clone()))
        }
        _ => Err(CompileError::MemberAccessOnNonStruct(base_ty.clone())),
    }
}

/// The finite set of viable conversions. Everything else is rejected.
pub fn viable_cast(from: &SourceType, to: &SourceType) -> bool {
    let from = from.strip_alias();
    let to = to.strip_alias();

    if from.is_integer() {
        return to.is_integer() || to.is_float() || to.is_bool() || to.is_pointer();
    }
    if from.is_float() {
        return to.is_float() || to.is_integer();
    }
    if from.is_bool() {
        return to.is_integer() || to.is_bool();
    }
    if from.is_pointer() {
        return to.is_pointer() || to.is_integer();
    }

    false
}

fn resolve_value<'t>(
    tree: &'t ScopeTree,
    scope: ScopeId,
    name: &str,
) -> Result<&'t ValueBinding, CompileError> {
    match tree.lookup(scope, name) {
        Some((_, Binding::Value(binding))) => Ok(binding),
        Some((_, Binding::Type(_))) => Err(CompileError::ExpectedValue(name.to_owned())),
        None => Err(CompileError::UndefinedIdentifier(name.to_owned())),
    }
}

pub fn literal_type(literal: &ast::Literal) -> SourceType {
    match literal {
        ast::Literal::Int { width, .. } => SourceType::Int(*width),
        ast::Literal::Float32(_) => SourceType::Float(FloatWidth::F32),
        ast::Literal::Float64(_) => SourceType::Float(FloatWidth::F64),
        ast::Literal::Bool(_) => SourceType::Bool,
        // Strings are pointers to NUL-terminated bytes
        ast::Literal::Str(_) => {
            SourceType::Pointer(Box::new(SourceType::Int(IntWidth::I8)))
        }
    }
}

/// Resolves a type annotation against the scope stack rooted at `scope`.
/// Shared between the semantic pass (declarations, signatures) and cast
/// expressions.
pub fn resolve_type(
    tree: &ScopeTree,
    scope: ScopeId,
    ty: &ast::Type,
) -> Result<SourceType, CompileError> {
    match ty {
        ast::Type::Named(name) => {
            if let Some(primitive) = primitive::builtin_type(name) {
                return Ok(primitive);
            }

            match tree.lookup(scope, name) {
                Some((_, Binding::Type(ty))) => Ok(ty.clone()),
                Some((_, Binding::Value(_))) => Err(CompileError::ExpectedType(name.clone())),
                None => Err(CompileError::UndefinedType(name.clone())),
            }
        }
        ast::Type::Pointer(inner) => Ok(SourceType::Pointer(Box::new(resolve_type(
            tree, scope, inner,
        )?))),
        ast::Type::MutPointer(inner) => Ok(SourceType::MutPointer(Box::new(resolve_type(
            tree, scope, inner,
        )?))),
        ast::Type::Array { length, element } => Ok(SourceType::Array {
            length: *length,
            element: Box::new(resolve_type(tree, scope, element)?),
        }),
        ast::Type::Struct { packed, fields } => Ok(SourceType::Struct {
            packed: *packed,
            fields: fields
                .iter()
                .map(|f| resolve_type(tree, scope, f))
                .collect::<Result<_, _>>()?,
        }),
        ast::Type::StructLabeled { packed, fields } => Ok(SourceType::StructLabeled {
            packed: *packed,
            fields: fields
                .iter()
                .map(|(name, f)| Ok((name.clone(), resolve_type(tree, scope, f)?)))
                .collect::<Result<_, CompileError>>()?,
        }),
        ast::Type::Function {
            parameters,
            return_type,
        } => Ok(SourceType::Function {
            parameters: parameters
                .iter()
                .map(|f| resolve_type(tree, scope, f))
                .collect::<Result<_, _>>()?,
            return_type: Box::new(resolve_type(tree, scope, return_type)?),
        }),
    }
}
