//! Colored rendering of linearised functions for interactive debugging.
//! This is for humans only; the plain serialisation the pipeline produces
//! lives in `emit`.

use colored::Colorize;
use itertools::Itertools;

use crate::backend::{
    emit,
    ssa::{Inst, Item, SsaModule, Value},
};

/// Renders every function in the module with syntax highlighting
pub fn pretty_print_module(module: &SsaModule) -> String {
    module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Function {
                name, params, body, ..
            } => Some(pretty_print_function(name, params.len(), body)),
            _ => None,
        })
        .join("\n")
}

fn pretty_print_function(name: &str, param_count: usize, body: &[(Value, Inst)]) -> String {
    let mut out = format!(
        "{} {}{}{}\n",
        "fn".magenta(),
        name.blue(),
        format!("/{param_count}").white(),
        " {".white()
    );

    for (result, inst) in body {
        match inst {
            Inst::Label(label) => {
                out.push_str(&format!("{}\n", format!("{label}:").bright_red()));
            }
            inst => {
                out.push_str("    ");
                if !matches!(result, Value::NoValue) {
                    out.push_str(&format!(
                        "{} {} ",
                        emit::render_value(result).yellow(),
                        "=".white()
                    ));
                }

                let text = emit::render_inst(inst);
                match text.split_once(' ') {
                    Some((opcode, rest)) => {
                        let opcode = if inst.is_terminator() {
                            opcode.red()
                        } else {
                            opcode.cyan()
                        };
                        out.push_str(&format!("{opcode} {rest}\n"));
                    }
                    None => out.push_str(&format!("{}\n", text.cyan())),
                }
            }
        }
    }

    out.push_str(&format!("{}\n", "}".white()));
    out
}
