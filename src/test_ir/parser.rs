//! TCF (Test CFG) parser implementation.

use super::{Block, Function, Inst, Terminator, TestCfg};
use std::collections::HashMap;

pub fn parse_cfg(text: &str) -> Result<TestCfg, String> {
    let parser = Parser::new(text);
    parser.parse()
}

/// Instruction with block operands still unresolved.
enum PendingInst {
    Text(String),
    Phi {
        result: String,
        incomings: Vec<(String, String)>,
    },
    Br {
        dest: String,
    },
    CondBr {
        cond: String,
        then_dest: String,
        else_dest: String,
    },
    Ret,
}

struct PendingBlock {
    name: String,
    insts: Vec<(usize, PendingInst)>,
}

struct Parser<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        // Strip comments and blank lines up front; the format is line-oriented.
        let lines = text
            .lines()
            .enumerate()
            .map(|(no, line)| (no + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with(';'))
            .collect();
        Self { lines, pos: 0 }
    }

    fn parse(mut self) -> Result<TestCfg, String> {
        let mut functions = Vec::new();
        while self.pos < self.lines.len() {
            functions.push(self.parse_function()?);
        }
        Ok(TestCfg { functions })
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let line = self.lines.get(self.pos).copied();
        self.pos += 1;
        line
    }

    fn parse_function(&mut self) -> Result<Function, String> {
        let (line_no, header) = self.next_line().ok_or("expected function header")?;
        let name = header
            .strip_suffix('{')
            .map(str::trim)
            .and_then(|h| h.strip_suffix("()"))
            .ok_or_else(|| format!("line {line_no}: expected `name() {{`, found `{header}`"))?
            .trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(format!("line {line_no}: invalid function name `{name}`"));
        }

        let mut blocks: Vec<PendingBlock> = Vec::new();
        loop {
            let (line_no, line) = self
                .next_line()
                .ok_or_else(|| format!("function `{name}` is missing a closing `}}`"))?;
            if line == "}" {
                break;
            }
            if let Some(label) = line.strip_suffix(':') {
                let label = label.trim();
                if label.chars().all(|c| c.is_alphanumeric() || c == '_') && !label.is_empty() {
                    blocks.push(PendingBlock {
                        name: label.to_string(),
                        insts: Vec::new(),
                    });
                    continue;
                }
            }
            let block = blocks
                .last_mut()
                .ok_or_else(|| format!("line {line_no}: instruction before any block label"))?;
            block.insts.push((line_no, parse_inst(line_no, line)?));
        }
        if blocks.is_empty() {
            return Err(format!("function `{name}` has no blocks"));
        }

        self.resolve(name, blocks)
    }

    /// Second phase: map block names in terminators and phis to indices.
    fn resolve(&self, name: &str, pending: Vec<PendingBlock>) -> Result<Function, String> {
        let mut index_of: HashMap<&str, u32> = HashMap::new();
        for (idx, block) in pending.iter().enumerate() {
            if index_of.insert(block.name.as_str(), idx as u32).is_some() {
                return Err(format!(
                    "function `{name}`: duplicate block label `{}`",
                    block.name
                ));
            }
        }
        let lookup = |line_no: usize, label: &str| {
            index_of
                .get(label)
                .copied()
                .ok_or_else(|| format!("line {line_no}: unknown block `^{label}`"))
        };

        let mut blocks = Vec::with_capacity(pending.len());
        for block in &pending {
            let mut insts = Vec::with_capacity(block.insts.len());
            for (line_no, inst) in &block.insts {
                insts.push(match inst {
                    PendingInst::Text(text) => Inst::Text(text.clone()),
                    PendingInst::Phi { result, incomings } => Inst::Phi {
                        result: result.clone(),
                        incomings: incomings
                            .iter()
                            .map(|(val, label)| Ok((val.clone(), lookup(*line_no, label)?)))
                            .collect::<Result<_, String>>()?,
                    },
                    PendingInst::Br { dest } => Inst::Term(Terminator::Br {
                        dest: lookup(*line_no, dest)?,
                    }),
                    PendingInst::CondBr {
                        cond,
                        then_dest,
                        else_dest,
                    } => Inst::Term(Terminator::CondBr {
                        cond: cond.clone(),
                        then_dest: lookup(*line_no, then_dest)?,
                        else_dest: lookup(*line_no, else_dest)?,
                    }),
                    PendingInst::Ret => Inst::Term(Terminator::Ret),
                });
            }
            blocks.push(Block {
                name: block.name.clone(),
                insts,
                synthetic: false,
            });
        }
        Ok(Function {
            name: name.to_string(),
            blocks,
        })
    }
}

fn parse_inst(line_no: usize, line: &str) -> Result<PendingInst, String> {
    if line == "ret" || line == "terminate" {
        return Ok(PendingInst::Ret);
    }
    if let Some(rest) = line.strip_prefix("br ") {
        return Ok(PendingInst::Br {
            dest: read_block_operand(line_no, rest.trim())?,
        });
    }
    if let Some(rest) = line.strip_prefix("condbr ") {
        let mut parts = rest.split(',').map(str::trim);
        let cond = parts
            .next()
            .and_then(|p| p.strip_prefix('%'))
            .ok_or_else(|| format!("line {line_no}: condbr needs a %condition"))?;
        let then_dest = parts
            .next()
            .ok_or_else(|| format!("line {line_no}: condbr needs two targets"))
            .and_then(|p| read_block_operand(line_no, p))?;
        let else_dest = parts
            .next()
            .ok_or_else(|| format!("line {line_no}: condbr needs two targets"))
            .and_then(|p| read_block_operand(line_no, p))?;
        if parts.next().is_some() {
            return Err(format!("line {line_no}: condbr takes exactly two targets"));
        }
        return Ok(PendingInst::CondBr {
            cond: cond.to_string(),
            then_dest,
            else_dest,
        });
    }
    if let Some((lhs, rhs)) = line.split_once("= phi ") {
        let result = lhs
            .trim()
            .strip_prefix('%')
            .ok_or_else(|| format!("line {line_no}: phi result must be a %value"))?;
        let mut incomings = Vec::new();
        for arm in rhs.split("],") {
            let arm = arm.trim().trim_start_matches('[').trim_end_matches(']');
            let (val, label) = arm
                .split_once(',')
                .ok_or_else(|| format!("line {line_no}: malformed phi arm `{arm}`"))?;
            let val = val
                .trim()
                .strip_prefix('%')
                .ok_or_else(|| format!("line {line_no}: phi value must be a %value"))?;
            let label = read_block_operand(line_no, label.trim())?;
            incomings.push((val.to_string(), label));
        }
        if incomings.is_empty() {
            return Err(format!("line {line_no}: phi needs at least one arm"));
        }
        return Ok(PendingInst::Phi {
            result: result.to_string(),
            incomings,
        });
    }
    Ok(PendingInst::Text(line.to_string()))
}

fn read_block_operand(line_no: usize, text: &str) -> Result<String, String> {
    text.strip_prefix('^')
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("line {line_no}: expected `^block`, found `{text}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blocks_and_terminators() {
        let cfg = parse_cfg(
            "; a loop\n\
             count() {\n\
             entry:\n\
             \x20   %n = input\n\
             \x20   br ^loop\n\
             loop:\n\
             \x20   %i = phi [%n, ^entry], [%next, ^loop]\n\
             \x20   %next = add %i, 1\n\
             \x20   condbr %next, ^loop, ^done\n\
             done:\n\
             \x20   ret\n\
             }\n",
        )
        .unwrap();
        assert_eq!(cfg.functions.len(), 1);
        let func = &cfg.functions[0];
        assert_eq!(func.name, "count");
        assert_eq!(func.blocks.len(), 3);
        assert_eq!(func.succs(0), vec![1]);
        assert_eq!(func.succs(1), vec![1, 2]);
        assert_eq!(func.succs(2), Vec::<u32>::new());
        match &func.blocks[1].insts[0] {
            Inst::Phi { result, incomings } => {
                assert_eq!(result, "i");
                assert_eq!(
                    incomings,
                    &vec![("n".to_string(), 0), ("next".to_string(), 1)]
                );
            }
            other => panic!("expected phi, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_target() {
        let err = parse_cfg("f() {\na:\n    br ^nowhere\n}").unwrap_err();
        assert!(err.contains("unknown block"), "{err}");
    }

    #[test]
    fn rejects_duplicate_label() {
        let err = parse_cfg("f() {\na:\n    br ^a\na:\n    ret\n}").unwrap_err();
        assert!(err.contains("duplicate block label"), "{err}");
    }

    #[test]
    fn parses_two_functions() {
        let cfg = parse_cfg("f() {\na:\n    ret\n}\ng() {\nb:\n    terminate\n}").unwrap();
        assert_eq!(cfg.functions.len(), 2);
        assert_eq!(cfg.functions[1].name, "g");
    }
}
