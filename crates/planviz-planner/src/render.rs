//! Expression trees to readable text.
//!
//! Evaluated post-order over an explicit stack, so arbitrarily deep
//! predicates cannot overflow the call stack.

use planviz_core::expr::Expr;

enum Frame<'a> {
    Visit(&'a Expr),
    Emit(&'a Expr),
}

/// Rendered child text plus the precedence of the binary operator that
/// produced it, if any.
struct Rendered {
    text: String,
    precedence: Option<u8>,
}

pub fn render_expr(root: &Expr) -> String {
    let mut frames = vec![Frame::Visit(root)];
    let mut out: Vec<Rendered> = Vec::new();

    while let Some(frame) = frames.pop() {
        match frame {
            Frame::Visit(e) => {
                frames.push(Frame::Emit(e));
                // Reverse so the first child is rendered first.
                for child in e.children().into_iter().rev() {
                    frames.push(Frame::Visit(child));
                }
            }
            Frame::Emit(e) => {
                let arity = e.children().len();
                let args = out.split_off(out.len().saturating_sub(arity));
                out.push(emit(e, args));
            }
        }
    }

    out.pop().map(|r| r.text).unwrap_or_default()
}

fn emit(e: &Expr, args: Vec<Rendered>) -> Rendered {
    let plain = |text: String| Rendered {
        text,
        precedence: None,
    };
    match e {
        Expr::Constant { value } => plain(value.clone().unwrap_or_else(|| "null".into())),
        Expr::Project { alias, column } => plain(match alias {
            Some(a) => a.clone(),
            None => format!("${column}"),
        }),
        Expr::Opaque { alias } => plain(alias.clone().unwrap_or_else(|| "?".into())),
        Expr::Binary { op, .. } => {
            let parent = op.precedence();
            let parts: Vec<String> = args
                .into_iter()
                .map(|a| match a.precedence {
                    Some(child) if child < parent => format!("({})", a.text),
                    _ => a.text,
                })
                .collect();
            Rendered {
                text: parts.join(op.symbol()),
                precedence: Some(parent),
            }
        }
        Expr::BinCond { .. } => {
            let t: Vec<String> = args.into_iter().map(|a| a.text).collect();
            match t.as_slice() {
                [c, l, r] => plain(format!("({c} ? {l} : {r})")),
                _ => plain("?".into()),
            }
        }
        Expr::UserFunc { class_name, .. } => {
            let short = class_name.rsplit('.').next().unwrap_or(class_name);
            plain(format!("{short}({})", join(args)))
        }
        Expr::MapLookup { key, .. } => plain(
            args.into_iter()
                .map(|a| format!("{}#'{key}'", a.text))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Expr::Cast { .. } => plain(
            args.into_iter()
                .next()
                .map(|a| a.text)
                .unwrap_or_else(|| "?".into()),
        ),
        Expr::Call { name, .. } => plain(format!("{name}({})", join(args))),
    }
}

fn join(args: Vec<Rendered>) -> String {
    args.into_iter()
        .map(|a| a.text)
        .collect::<Vec<_>>()
        .join(", ")
}
