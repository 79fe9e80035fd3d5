use crate::compute::{CacheKey, ComputationError, Simulation, Slot, Value};
use crate::periods::Period;
use std::collections::HashMap;
use std::fmt::Write;

/// Evaluates `variable` for `period`, then prints the tree of everything it read.
///
/// Each line shows the variable, its period and a summary of its column; a key
/// already printed higher in the tree is shown as a reference to its level.
pub fn format_trace(simulation: &mut Simulation, variable: &str, period: Period) -> Result<String, ComputationError> {
    // An evaluation error still leaves a partial graph worth printing.
    let outcome = simulation.calculate(variable, period);
    let target = simulation.key_of(variable, period)?;

    let mut tracer = Tracer { simulation: &*simulation, visited_at_level: HashMap::new(), output: String::new() };
    let _ = writeln!(tracer.output, "AUDIT TRACE for '{}' at {}:", variable, period);
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    tracer.trace_node(target, 1, "");
    if let Err(error) = outcome {
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        let _ = writeln!(tracer.output, "Error: {}", error);
    }
    Ok(tracer.output)
}

struct Tracer<'a> {
    simulation: &'a Simulation,
    visited_at_level: HashMap<CacheKey, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, key: CacheKey, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&key) {
            let _ = writeln!(self.output, "{}-> {} (Ref to L{})", prefix, self.label(key), first_seen);
            return;
        }
        self.visited_at_level.insert(key, level);

        let line_header = format!("[L{}] {}{}", level, self.label(key), self.format_value(key));
        let dependencies = self.simulation.dependency_graph().dependencies_of(&key);

        if dependencies.is_empty() {
            let origin = if self.simulation.input(self.name(key), key.1).is_some() { "Input" } else { "Leaf" };
            let _ = writeln!(self.output, "{}{} -> {}", prefix, line_header, origin);
            return;
        }

        let names: Vec<String> = dependencies.iter().map(|&d| self.label(d)).collect();
        let _ = writeln!(self.output, "{}{} = f({})", prefix, line_header, names.join(", "));

        let stem = build_child_stem(prefix);
        for (i, &child) in dependencies.iter().enumerate() {
            let connector = if i == dependencies.len() - 1 { "`--" } else { "|--" };
            self.trace_node(child, level + 1, &format!("{}{}", stem, connector));
        }
    }

    fn name(&self, key: CacheKey) -> &'a str {
        self.simulation.variable_name(key.0).unwrap_or("?")
    }

    fn label(&self, key: CacheKey) -> String {
        format!("{}<{}>", self.name(key), key.1)
    }

    fn format_value(&self, key: CacheKey) -> String {
        match self.simulation.ledger().get(&key) {
            Some(Slot::Computed(value)) => summarize(value),
            Some(Slot::Failed(error)) => format!(" [Err: {}]", error.root_cause()),
            Some(Slot::InProgress) => " [in progress]".to_string(),
            None => " [?]".to_string(),
        }
    }
}

fn summarize(value: &Value) -> String {
    let numbers = value.to_f64();
    match numbers.len() {
        0 => " [empty]".to_string(),
        1 => format!(" [{:.3}]", numbers[0]),
        n => {
            let total: f64 = numbers.iter().sum();
            format!(" [{:.3}, ... n={}, sum={:.3}]", numbers[0], n, total)
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}
