//! Writes rewritten functions back into the JSON document they were read
//! from, so untouched functions and instructions keep their exact keys and
//! key order.

use brilspec_ir::{Instruction, Program};
use serde_json::Value;

/// Rewrites only replace instruction lists; everything else in `source` is
/// kept as read.
pub(crate) fn merge_rewrites(
    source: &Value,
    original: &Program,
    rewritten: &Program,
) -> Result<Value, serde_json::Error> {
    let mut merged = source.clone();
    let Some(functions) = merged.get_mut("functions").and_then(Value::as_array_mut) else {
        return serde_json::to_value(rewritten);
    };
    let pairs = original.functions.iter().zip(&rewritten.functions);
    for (slot, (before, after)) in functions.iter_mut().zip(pairs) {
        if before == after {
            continue;
        }
        let Some(raw) = slot.get_mut("instrs") else {
            *slot = serde_json::to_value(after)?;
            continue;
        };
        let instrs = merge_instrs(
            raw.as_array().map(Vec::as_slice).unwrap_or(&[]),
            &before.instrs,
            &after.instrs,
        )?;
        *raw = Value::Array(instrs);
    }
    Ok(merged)
}

/// Rewritten instructions that equal an original one reuse its source JSON.
/// Originals survive in order, so a cursor matches them first.
fn merge_instrs(
    raw: &[Value],
    before: &[Instruction],
    after: &[Instruction],
) -> Result<Vec<Value>, serde_json::Error> {
    let mut cursor = 0;
    after
        .iter()
        .map(|instr| {
            let idx = if before.get(cursor) == Some(instr) {
                cursor += 1;
                Some(cursor - 1)
            } else {
                before.iter().position(|orig| orig == instr)
            };
            match idx.and_then(|idx| raw.get(idx)) {
                Some(value) => Ok(value.clone()),
                None => serde_json::to_value(instr),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn unchanged_program_is_returned_as_read() {
        let source = json!({
            "functions": [{
                "instrs": [{ "value": 1, "type": "int", "op": "const", "dest": "v" }],
                "name": "main"
            }],
            "meta": { "z": 1, "a": 2 }
        });
        let program: Program = serde_json::from_value(source.clone()).expect("program");
        let merged = merge_rewrites(&source, &program, &program).expect("merge");
        assert_eq!(merged.to_string(), source.to_string());
    }

    #[test]
    fn rewritten_body_keeps_source_form_of_original_instructions() {
        let source = json!({
            "functions": [{
                "instrs": [
                    { "value": 1, "type": "int", "op": "const", "dest": "v" },
                    { "op": "print", "args": ["v"] }
                ],
                "name": "main"
            }]
        });
        let original: Program = serde_json::from_value(source.clone()).expect("program");
        let mut rewritten = original.clone();
        let print = rewritten.functions[0].instrs[1].clone();
        rewritten.functions[0]
            .instrs
            .insert(1, Instruction::label("fresh"));
        rewritten.functions[0].instrs.insert(0, print);

        let merged = merge_rewrites(&source, &original, &rewritten).expect("merge");
        let func = &merged["functions"][0];
        assert_eq!(keys(func), ["instrs", "name"]);
        let instrs = func["instrs"].as_array().expect("instrs");
        assert_eq!(instrs.len(), 4);
        assert_eq!(keys(&instrs[0]), ["op", "args"]);
        assert_eq!(keys(&instrs[1]), ["value", "type", "op", "dest"]);
        assert_eq!(instrs[2], json!({ "label": "fresh" }));
        assert_eq!(keys(&instrs[3]), ["op", "args"]);
    }
}
