use crate::decode::DecodedPlan;
use crate::lang::{Plan, Term};
use anyhow::{Context, Result};
use std::io::Write;

/// Renders a decoded partial-order plan.
///
/// The output lists the operators with their parameters, the reduced
/// ordering sorted by operator name pair, and the full variable-to-constant
/// binding in step order.
pub fn write_pop(plan: &Plan, decoded: &DecodedPlan, writer: &mut dyn Write) -> Result<()> {
    let context = "while writing a partial-order plan";
    writeln!(writer, "** Operators").context(context)?;
    for op in plan.steps() {
        writeln!(writer, "{}", op.format_parameters()).context(context)?;
    }

    writeln!(writer, "** Ordering").context(context)?;
    let mut edges: Vec<(&str, &str)> = decoded
        .order
        .iter_edges()
        .map(|(f, s)| (plan.step(*f).name(), plan.step(*s).name()))
        .collect();
    edges.sort();
    for (first, second) in edges {
        writeln!(writer, "{} < {}", first, second).context(context)?;
    }

    writeln!(writer, "** Binding").context(context)?;
    for op in plan.steps() {
        for v in op.parameters() {
            let value = decoded
                .bindings
                .get(v)
                .map(Term::name)
                .unwrap_or("?");
            writeln!(writer, "{}={}", v.name(), value).context(context)?;
        }
    }
    writer.flush().context(context)
}
