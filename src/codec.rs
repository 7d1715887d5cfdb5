//! Plain-text weights file codec. One forest per `Time stamp` block; one
//! `# Decision Tree` block per tree; one `weight=...` line per leaf. This
//! mirrors `Forest::ReadForests`/`DecisionTree::Write` byte for byte in
//! spirit, though not in exact whitespace.

use std::io::Write as _;

use chrono::Utc;

use crate::config::Config;
use crate::cut::Cut;
use crate::ensemble::Ensemble;
use crate::error::ReweighterError;
use crate::forest::Forest;
use crate::tree::{DecisionTree, ParsedLeaf};
use crate::variable::VariableRegistry;

pub fn write_weights_file(
    out: &mut impl std::io::Write,
    ensemble: &Ensemble,
    registry: &VariableRegistry,
    config: &Config,
) -> std::io::Result<()> {
    for forest in &ensemble.forests {
        let now = Utc::now();
        writeln!(out, "Time stamp : {}", now.format("%a, %d %b %y %H:%M:%S %z"))?;
        writeln!(out)?;
        write!(out, "Variables  : ")?;
        for name in registry.names() {
            write!(out, "{},", name)?;
        }
        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "ConfigFile : ")?;
        for line in config.raw_lines() {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        for (i, tree) in forest.trees().iter().enumerate() {
            writeln!(out, "# Decision Tree : {}", i + 1)?;
            let mut buf = String::new();
            tree.write_text(&mut buf).expect("String fmt::Write is infallible");
            out.write_all(buf.as_bytes())?;
            writeln!(out)?;
        }
    }
    writeln!(out, "# End")?;
    Ok(())
}

pub fn read_forests(text: &str) -> Result<Vec<Forest>, ReweighterError> {
    let mut forests = Vec::new();
    let mut trees: Vec<DecisionTree> = Vec::new();
    let mut current: Vec<ParsedLeaf> = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let lineno = i + 1;
        if line.starts_with("Time stamp") {
            flush_tree(&mut current, &mut trees)?;
            if !trees.is_empty() {
                forests.push(Forest::from_trees(std::mem::take(&mut trees)));
            }
            continue;
        }
        if line.starts_with("# Decision Tree") || line.starts_with("# End") {
            flush_tree(&mut current, &mut trees)?;
            continue;
        }
        if let Some(rest) = line.strip_prefix("weight=") {
            current.push(parse_weight_line(rest, lineno)?);
        }
    }

    flush_tree(&mut current, &mut trees)?;
    if !trees.is_empty() {
        forests.push(Forest::from_trees(trees));
    }

    Ok(forests)
}

fn flush_tree(current: &mut Vec<ParsedLeaf>, trees: &mut Vec<DecisionTree>) -> Result<(), ReweighterError> {
    if current.is_empty() {
        return Ok(());
    }
    trees.push(DecisionTree::from_final_nodes(current)?);
    current.clear();
    Ok(())
}

/// Parses every `weight=...` line out of a standalone block of text into
/// the leaves of one tree. Exposed for tests that round-trip a single
/// `DecisionTree::write_text` block without a full weights file around it.
pub fn parse_tree_block(text: &str, start_lineno: usize) -> Result<Vec<ParsedLeaf>, ReweighterError> {
    let mut leaves = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(rest) = line.strip_prefix("weight=") {
            leaves.push(parse_weight_line(rest, start_lineno + i + 1)?);
        }
    }
    Ok(leaves)
}

fn parse_weight_line(rest: &str, lineno: usize) -> Result<ParsedLeaf, ReweighterError> {
    let mut parts = rest.splitn(2, ':');
    let weight_str = parts.next().ok_or_else(|| codec_err(lineno, "missing weight"))?;
    let weight: f64 = weight_str
        .parse()
        .map_err(|_| codec_err(lineno, "invalid weight value"))?;

    let remainder = parts.next().ok_or_else(|| codec_err(lineno, "missing sums field"))?;
    let mut parts2 = remainder.splitn(2, ':');
    let sums_part = parts2.next().ok_or_else(|| codec_err(lineno, "missing sums field"))?;
    let cuts_part = parts2.next().unwrap_or("");

    let (sum_target, sum_source) = parse_sums(sums_part, lineno)?;
    let cuts = parse_cuts(cuts_part, lineno)?;

    Ok(ParsedLeaf {
        weight,
        sum_target,
        sum_source,
        cuts,
    })
}

/// `sums_part` looks like `SumTarget/SumSource=120.5/100.2=1.202`.
fn parse_sums(sums_part: &str, lineno: usize) -> Result<(f64, f64), ReweighterError> {
    let eq_pos = sums_part
        .find('=')
        .ok_or_else(|| codec_err(lineno, "malformed sums field"))?;
    let ratio_part = &sums_part[eq_pos + 1..];
    let slash_pos = ratio_part
        .find('/')
        .ok_or_else(|| codec_err(lineno, "malformed sums field"))?;
    let sum_target: f64 = ratio_part[..slash_pos]
        .parse()
        .map_err(|_| codec_err(lineno, "invalid SumTarget"))?;
    let after_slash = &ratio_part[slash_pos + 1..];
    let eq2 = after_slash
        .find('=')
        .ok_or_else(|| codec_err(lineno, "malformed sums field"))?;
    let sum_source: f64 = after_slash[..eq2]
        .parse()
        .map_err(|_| codec_err(lineno, "invalid SumSource"))?;
    Ok((sum_target, sum_source))
}

/// `cuts_part` is `|`-delimited, leaf-to-root order; the returned list is
/// reversed to root-to-leaf order for `DecisionTree::from_final_nodes`.
fn parse_cuts(cuts_part: &str, lineno: usize) -> Result<Vec<Cut>, ReweighterError> {
    let mut cuts = Vec::new();
    for token in cuts_part.split('|') {
        if token.is_empty() {
            continue;
        }
        if let Some(idx) = token.find('<') {
            let (name, rest) = token.split_at(idx);
            let threshold: f64 = rest[1..]
                .parse()
                .map_err(|_| codec_err(lineno, "invalid cut threshold"))?;
            cuts.push(Cut::Less {
                variable: name.to_string(),
                threshold,
            });
        } else if let Some(idx) = token.find('>') {
            let (name, rest) = token.split_at(idx);
            let threshold: f64 = rest[1..]
                .parse()
                .map_err(|_| codec_err(lineno, "invalid cut threshold"))?;
            cuts.push(Cut::GreaterEq {
                variable: name.to_string(),
                threshold,
            });
        } else {
            return Err(codec_err(lineno, "cut token missing an operator"));
        }
    }
    cuts.reverse();
    Ok(cuts)
}

fn codec_err(line: usize, message: &str) -> ReweighterError {
    ReweighterError::Codec {
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_leaf_line() {
        let line = "weight=1.25:SumTarget/SumSource=120/100=1.2:x>0.5|y<1.5|";
        let leaf = parse_weight_line(&line["weight=".len()..], 1).unwrap();
        assert_eq!(leaf.weight, 1.25);
        assert_eq!(leaf.sum_target, 120.0);
        assert_eq!(leaf.sum_source, 100.0);
        // reversed to root-to-leaf: y<1.5 was nearer the leaf, so it reads last on the wire
        assert_eq!(leaf.cuts.len(), 2);
        assert_eq!(leaf.cuts[0].variable(), "y");
        assert_eq!(leaf.cuts[1].variable(), "x");
    }

    #[test]
    fn rejects_malformed_weight_line() {
        let line = "weight=notanumber:SumTarget/SumSource=1/1=1:";
        assert!(parse_weight_line(&line["weight=".len()..], 1).is_err());
    }
}
