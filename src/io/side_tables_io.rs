use crate::decode::SideTables;
use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, BufReader, Read, Write};

/// Writes side tables as a line-oriented text file: one
/// `prec <id> <first> <second>` line per precedence entry and one
/// `bind <id> <first> <second>` line per equality entry.
///
/// Names must be whitespace-free for the format to round-trip; plan symbols
/// are, by construction of the plan reader.
pub fn write_side_tables(tables: &SideTables, writer: &mut dyn Write) -> Result<()> {
    let context = "while writing side tables";
    fn check(name: &String) -> Result<&String> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            Err(anyhow!(r#"name "{}" is not serializable"#, name))
        } else {
            Ok(name)
        }
    }
    for (prop, (first, second)) in tables.iter_precedence() {
        writeln!(writer, "prec {} {} {}", prop, check(first)?, check(second)?)
            .context(context)?;
    }
    for (prop, (first, second)) in tables.iter_equality() {
        writeln!(writer, "bind {} {} {}", prop, check(first)?, check(second)?)
            .context(context)?;
    }
    writer.flush().context(context)
}

/// Reads side tables written by [`write_side_tables`].
pub fn read_side_tables(reader: &mut dyn Read) -> Result<SideTables> {
    let mut tables = SideTables::default();
    for (i, line) in BufReader::new(reader).lines().enumerate() {
        let context = || format!("while reading line {} of a side table file", i + 1);
        let line = line.with_context(context)?;
        if line.trim().is_empty() {
            continue;
        }
        let words: Vec<&str> = line.split_ascii_whitespace().collect();
        let [kind, prop, first, second] = words.as_slice() else {
            return Err(anyhow!(r#"malformed entry "{}""#, line)).with_context(context);
        };
        let prop = prop
            .parse::<usize>()
            .map_err(|_| anyhow!(r#""{}" is not a proposition id"#, prop))
            .with_context(context)?;
        match *kind {
            "prec" => tables.add_precedence(prop, first.to_string(), second.to_string()),
            "bind" => tables.add_equality(prop, first.to_string(), second.to_string()),
            _ => {
                return Err(anyhow!(r#"unknown entry kind "{}""#, kind)).with_context(context);
            }
        }
    }
    Ok(tables)
}
