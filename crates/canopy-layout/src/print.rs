//! Single-line label printing for layout nodes (spec.md §4.11). Prefix
//! notation, matching the spec's own example (`< .Health 30`), not the
//! infix surface syntax C14 reconstructs and not C11's `ir-*` s-expression
//! form.

use canopy_ast::ast::{BinaryOp, LiteralValue, LogicOp};
use canopy_ir::{IrArg, IrExpr, IrUnaryOp, MemberRef};

fn member_path(member: &MemberRef) -> String {
    member.segments.join(".")
}

fn binary_op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::Le => "<=",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
    }
}

fn logic_op_symbol(op: LogicOp) -> &'static str {
    match op {
        LogicOp::And => "&&",
        LogicOp::Or => "||",
    }
}

fn literal_label(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Int(n) => n.to_string(),
        LiteralValue::Float(f) => f.to_string(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Str(s) => format!("\"{s}\""),
        LiteralValue::Null => "null".to_string(),
        LiteralValue::Enum(ty, member) => format!("{ty}.{member}"),
    }
}

fn arg_label(arg: &IrArg) -> String {
    let value = format_expr(&arg.value);
    match &arg.name {
        Some(name) => format!("{name}: {value}"),
        None => value,
    }
}

/// Renders `expr` as a single-line, prefix-notation label.
#[must_use]
pub fn format_expr(expr: &IrExpr) -> String {
    match expr {
        IrExpr::MemberLoad(n) => format!(".{}", member_path(&n.member)),
        IrExpr::BlackboardLoad(n) => format!("${}", member_path(&n.member)),
        IrExpr::Literal(n) => literal_label(&n.value),
        IrExpr::BinaryOp(n) => format!(
            "{} {} {}",
            binary_op_symbol(n.op),
            format_expr(&n.lhs),
            format_expr(&n.rhs)
        ),
        IrExpr::UnaryOp(n) => match n.op {
            IrUnaryOp::Not => format!("! {}", format_expr(&n.operand)),
            IrUnaryOp::Negate => format!("- {}", format_expr(&n.operand)),
        },
        IrExpr::LogicOp(n) => {
            let sym = logic_op_symbol(n.op);
            let rendered: Vec<String> = n.operands.iter().map(format_expr).collect();
            format!("{sym} {}", rendered.join(" "))
        }
        IrExpr::Call(n) => {
            let args: Vec<String> = n.args.iter().map(arg_label).collect();
            format!("{}({})", n.method.name, args.join(", "))
        }
        IrExpr::Convert(n) => format_expr(&n.operand),
    }
}

/// Renders an action's call signature, e.g. `Attack(.Target)`.
#[must_use]
pub fn format_action_label(method_name: &str, args: &[IrArg]) -> String {
    let rendered: Vec<String> = args.iter().map(arg_label).collect();
    format!("{method_name}({})", rendered.join(", "))
}
