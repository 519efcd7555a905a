//! Serialises a linearised module to the textual target IR. This is a pure
//! function of the SSA module: identifiers are double-quoted behind `@`/`%`
//! sigils, string constants are C-escaped with a `\00` terminator, and
//! signedness-dependent opcodes (`sdiv`/`udiv`, `ashr`/`lshr`, `sext`/`zext`,
//! `icmp slt`/`ult`, …) are selected from the operand types here.

use itertools::Itertools;

use crate::backend::{
    ssa::{BinOp, CmpOp, Inst, Item, SsaModule, Value},
    tree::{CastKind, Literal},
    ty::Type,
};

pub fn emit_module(module: &SsaModule) -> String {
    let mut chunks = Vec::with_capacity(module.items.len());

    for item in &module.items {
        match item {
            Item::TypeDef { name, ty } => {
                let body = match ty {
                    Type::Opaque(_) => "opaque".to_owned(),
                    other => other.to_string(),
                };
                chunks.push(format!("%\"{name}\" = type {body}"));
            }
            Item::Global {
                name,
                public,
                ty,
                value,
            } => chunks.push(emit_global(name, *public, ty, value)),
            Item::Declare {
                name,
                return_type,
                params,
            } => {
                let params = params.iter().map(|ty| ty.to_string()).join(", ");
                chunks.push(format!("declare {return_type} @\"{name}\"({params})"));
            }
            Item::Function {
                name,
                public,
                return_type,
                params,
                body,
            } => chunks.push(emit_function(name, *public, return_type, params, body)),
        }
    }

    let mut out = chunks.join("\n");
    out.push('\n');
    out
}

fn emit_global(name: &str, public: bool, ty: &Type, value: &Literal) -> String {
    let linkage = if public { "" } else { "private " };
    format!("@\"{name}\" = {linkage}global {ty} {}", render_literal(value))
}

fn emit_function(
    name: &str,
    public: bool,
    return_type: &Type,
    params: &[(Type, String)],
    body: &[(Value, Inst)],
) -> String {
    let linkage = if public { "" } else { "private " };
    let params = params
        .iter()
        .map(|(ty, name)| format!("{ty} %\"{name}\""))
        .join(", ");

    let mut out = format!("define {linkage}{return_type} @\"{name}\"({params}) {{\n");

    for (result, inst) in body {
        match inst {
            Inst::Label(label) => out.push_str(&format!("\"{label}\":\n")),
            inst => {
                out.push_str("  ");
                if !matches!(result, Value::NoValue) {
                    out.push_str(&format!("{} = ", render_value(result)));
                }
                out.push_str(&render_inst(inst));
                out.push('\n');
            }
        }
    }

    out.push('}');
    out
}

pub(crate) fn render_inst(inst: &Inst) -> String {
    match inst {
        Inst::Alloca(ty) => format!("alloca {ty}"),
        Inst::Load { ty, ptr } => format!("load {ty}, {ty}* {}", render_value(ptr)),
        Inst::Store { ty, value, ptr } => format!(
            "store {ty} {}, {ty}* {}",
            render_value(value),
            render_value(ptr)
        ),
        Inst::GetElementPtr {
            pointee,
            ptr,
            indices,
        } => {
            let indices = indices
                .iter()
                .map(|(ty, value)| format!("{ty} {}", render_value(value)))
                .join(", ");
            format!(
                "getelementptr {pointee}, {pointee}* {}, {indices}",
                render_value(ptr)
            )
        }
        Inst::InsertValue {
            ty,
            base,
            field_ty,
            value,
            index,
        } => format!(
            "insertvalue {ty} {}, {field_ty} {}, {index}",
            render_value(base),
            render_value(value)
        ),
        Inst::ExtractValue { ty, base, index } => {
            format!("extractvalue {ty} {}, {index}", render_value(base))
        }
        Inst::Call {
            return_type,
            callee,
            arguments,
        } => {
            let arguments = arguments
                .iter()
                .map(|(ty, value)| format!("{ty} {}", render_value(value)))
                .join(", ");
            format!("call {return_type} {}({arguments})", render_value(callee))
        }
        Inst::Ret(None) => "ret void".to_owned(),
        Inst::Ret(Some((ty, value))) => format!("ret {ty} {}", render_value(value)),
        Inst::Label(label) => format!("{label}:"),
        Inst::Br(label) => format!("br label %\"{label}\""),
        Inst::BrCond {
            condition,
            then_label,
            else_label,
        } => format!(
            "br i1 {}, label %\"{then_label}\", label %\"{else_label}\"",
            render_value(condition)
        ),
        Inst::Binary { op, ty, lhs, rhs } => format!(
            "{} {ty} {}, {}",
            binary_opcode(*op, ty),
            render_value(lhs),
            render_value(rhs)
        ),
        Inst::Cmp { op, ty, lhs, rhs } => format!(
            "{} {ty} {}, {}",
            cmp_opcode(*op, ty),
            render_value(lhs),
            render_value(rhs)
        ),
        Inst::FNeg { ty, value } => format!("fneg {ty} {}", render_value(value)),
        Inst::Cast {
            op,
            from,
            to,
            value,
        } => format!(
            "{} {from} {} to {to}",
            cast_opcode(*op, from, to),
            render_value(value)
        ),
    }
}

fn binary_opcode(op: BinOp, ty: &Type) -> &'static str {
    let float = ty.is_float();

    match op {
        BinOp::Add if float => "fadd",
        BinOp::Add => "add",
        BinOp::Sub if float => "fsub",
        BinOp::Sub => "sub",
        BinOp::Mul if float => "fmul",
        BinOp::Mul => "mul",
        BinOp::Div if float => "fdiv",
        BinOp::Div => {
            if ty.is_unsigned_int() {
                "udiv"
            } else {
                "sdiv"
            }
        }
        BinOp::Rem if float => "frem",
        BinOp::Rem => {
            if ty.is_unsigned_int() {
                "urem"
            } else {
                "srem"
            }
        }
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Xor => "xor",
        BinOp::Shl => "shl",
        BinOp::Shr => {
            if ty.is_signed_int() {
                "ashr"
            } else {
                "lshr"
            }
        }
    }
}

fn cmp_opcode(op: CmpOp, ty: &Type) -> &'static str {
    if ty.is_float() {
        return match op {
            CmpOp::Eq => "fcmp oeq",
            CmpOp::Lt => "fcmp olt",
            CmpOp::Gt => "fcmp ogt",
        };
    }

    // Pointers compare as unsigned addresses
    let signed = ty.is_signed_int();
    match op {
        CmpOp::Eq => "icmp eq",
        CmpOp::Lt if signed => "icmp slt",
        CmpOp::Lt => "icmp ult",
        CmpOp::Gt if signed => "icmp sgt",
        CmpOp::Gt => "icmp ugt",
    }
}

fn cast_opcode(op: CastKind, from: &Type, to: &Type) -> &'static str {
    match op {
        CastKind::IntToFloat => {
            if from.is_unsigned_int() {
                "uitofp"
            } else {
                "sitofp"
            }
        }
        CastKind::FloatToInt => {
            if to.is_unsigned_int() {
                "fptoui"
            } else {
                "fptosi"
            }
        }
        CastKind::Trunc => {
            if from.is_float() {
                "fptrunc"
            } else {
                "trunc"
            }
        }
        CastKind::Ext => {
            if from.is_float() {
                "fpext"
            } else if from.is_unsigned_int() {
                "zext"
            } else {
                "sext"
            }
        }
        CastKind::PtrToInt => "ptrtoint",
        CastKind::IntToPtr => "inttoptr",
        CastKind::BitCast => "bitcast",
    }
}

pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::Temporary(id) => format!("%__tmp.{id}"),
        Value::Named(symbol) => symbol.to_string(),
        Value::Literal(literal) => render_literal(literal),
        Value::ZeroInit => "zeroinitializer".to_owned(),
        Value::Undef => "undef".to_owned(),
        Value::NoValue => unreachable!("a no-value is never an operand"),
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Int(value) => value.to_string(),
        Literal::Float(value) => render_float(*value),
        Literal::Bool(value) => value.to_string(),
        Literal::Str(text) => {
            let (escaped, _) = escape_c_string(text);
            format!("c\"{escaped}\"")
        }
        Literal::GlobalStr { name, len } => {
            format!("bitcast ([{len} x i8]* @\"{name}\" to i8*)")
        }
    }
}

fn render_float(value: f64) -> String {
    // Always keep a decimal point so the constant reads as floating point
    let text = format!("{value:?}");
    if text.contains(|c: char| !c.is_ascii_digit() && c != '-') {
        text
    } else {
        format!("{text}.0")
    }
}

/// C-style escaping for string constants: printable ASCII passes through,
/// everything else becomes `\XX`, and a NUL terminator is appended. Returns
/// the escaped text and the byte length including the terminator.
fn escape_c_string(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len() + 3);

    for &byte in text.as_bytes() {
        match byte {
            b'\\' => out.push_str("\\5C"),
            b'"' => out.push_str("\\22"),
            0x20..=0x7E => out.push(byte as char),
            _ => out.push_str(&format!("\\{byte:02X}")),
        }
    }

    out.push_str("\\00");
    (out, text.len() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tree::Symbol;

    #[test]
    fn string_escaping_terminates_with_nul() {
        assert_eq!(escape_c_string("hi"), ("hi\\00".to_owned(), 3));
        assert_eq!(escape_c_string("a\nb"), ("a\\0Ab\\00".to_owned(), 4));
        assert_eq!(escape_c_string("\"\\"), ("\\22\\5C\\00".to_owned(), 3));
    }

    #[test]
    fn opcodes_follow_signedness() {
        assert_eq!(binary_opcode(BinOp::Div, &Type::Int(32)), "sdiv");
        assert_eq!(binary_opcode(BinOp::Div, &Type::UInt(32)), "udiv");
        assert_eq!(binary_opcode(BinOp::Div, &Type::Float(64)), "fdiv");
        assert_eq!(binary_opcode(BinOp::Shr, &Type::Int(8)), "ashr");
        assert_eq!(binary_opcode(BinOp::Shr, &Type::UInt(8)), "lshr");
        assert_eq!(cmp_opcode(CmpOp::Lt, &Type::Int(32)), "icmp slt");
        assert_eq!(cmp_opcode(CmpOp::Lt, &Type::UInt(32)), "icmp ult");
        assert_eq!(cmp_opcode(CmpOp::Eq, &Type::Float(32)), "fcmp oeq");
    }

    #[test]
    fn extension_picks_sign_from_source_type() {
        assert_eq!(
            cast_opcode(CastKind::Ext, &Type::Int(8), &Type::Int(32)),
            "sext"
        );
        assert_eq!(
            cast_opcode(CastKind::Ext, &Type::UInt(8), &Type::UInt(32)),
            "zext"
        );
        assert_eq!(
            cast_opcode(CastKind::Ext, &Type::Float(32), &Type::Float(64)),
            "fpext"
        );
    }

    #[test]
    fn values_render_with_their_sigils() {
        assert_eq!(render_value(&Value::Temporary(3)), "%__tmp.3");
        assert_eq!(
            render_value(&Value::Named(Symbol::Local("f.x".to_owned()))),
            "%\"f.x\""
        );
        assert_eq!(
            render_value(&Value::Named(Symbol::Global("g".to_owned()))),
            "@\"g\""
        );
        assert_eq!(render_value(&Value::ZeroInit), "zeroinitializer");
    }

    #[test]
    fn float_constants_keep_a_decimal_point() {
        assert_eq!(render_float(1.5), "1.5");
        assert_eq!(render_float(3.0), "3.0");
    }
}
