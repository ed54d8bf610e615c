//! Line-oriented task scripts.
//!
//! ```text
//! # comment
//! $0.8;0.5;0.9$ (-->,bird,animal). %1.0;0.9%
//! (^believe,sky)!
//! robin?
//! 10
//! ```
//!
//! A line is a task (optional budget, term, punctuation, optional truth) or
//! a bare count of cycles to run at that point.

use std::sync::LazyLock;

use nars_core::{Budget, NarsError, Punctuation, Task, Term, Truth};
use regex::Regex;

static TASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<budget>\$[^$]*\$)\s*)?(?P<term>[^\s%$]+?)\s*(?P<punct>[.?!])\s*(?:%(?P<f>[0-9.]+)\s*;\s*(?P<c>[0-9.]+)%)?$",
    )
    .unwrap()
});

#[derive(Debug)]
pub enum Step {
    Input(Task),
    Run(usize),
}

/// Parse a whole script. Errors carry the 1-based line number.
pub fn parse_script(text: &str) -> Result<Vec<Step>, NarsError> {
    let mut steps = Vec::new();
    for (i, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(step)) => steps.push(step),
            Ok(None) => {}
            Err(NarsError::Parse(msg)) | Err(NarsError::InvalidBudget(msg)) => {
                return Err(NarsError::Parse(format!("line {}: {msg}", i + 1)));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(steps)
}

/// `None` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Step>, NarsError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if let Ok(cycles) = line.parse::<usize>() {
        return Ok(Some(Step::Run(cycles)));
    }

    let caps = TASK_RE
        .captures(line)
        .ok_or_else(|| NarsError::Parse(format!("not a task: {line:?}")))?;
    let term = parse_term(&caps["term"])?;
    let punctuation = caps["punct"]
        .chars()
        .next()
        .and_then(Punctuation::from_symbol)
        .ok_or_else(|| NarsError::Parse(format!("bad punctuation in {line:?}")))?;

    let truth = match (caps.name("f"), caps.name("c")) {
        (Some(f), Some(c)) => Some(Truth::new(number(f.as_str())?, number(c.as_str())?)?),
        _ => None,
    };
    let truth = match (punctuation, truth) {
        (Punctuation::Question, Some(_)) => {
            return Err(NarsError::Parse("a question carries no truth value".into()));
        }
        (Punctuation::Question, None) => None,
        (_, truth) => Some(truth.unwrap_or_default()),
    };
    let budget = match caps.name("budget") {
        Some(b) => b.as_str().parse::<Budget>()?,
        None => punctuation.default_budget(),
    };
    Ok(Some(Step::Input(Task::new(term, punctuation, truth, budget))))
}

fn number(s: &str) -> Result<f32, NarsError> {
    s.parse::<f32>()
        .map_err(|e| NarsError::Parse(format!("{s:?}: {e}")))
}

/// `atom`, `(connector,a,b)` or `(^op,a,b)`, nested freely.
pub fn parse_term(s: &str) -> Result<Term, NarsError> {
    let mut parser = TermParser { src: s, pos: 0 };
    let term = parser.term()?;
    if parser.pos != s.len() {
        return Err(NarsError::Parse(format!("trailing input after term in {s:?}")));
    }
    Ok(term)
}

struct TermParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TermParser<'a> {
    fn term(&mut self) -> Result<Term, NarsError> {
        if self.eat('(') {
            let head = self.word()?;
            let mut parts = Vec::new();
            while self.eat(',') {
                parts.push(self.term()?);
            }
            if !self.eat(')') {
                return Err(NarsError::Parse(format!(
                    "expected ')' at {} in {:?}",
                    self.pos, self.src
                )));
            }
            if head.starts_with('^') {
                Ok(Term::operation(head, parts))
            } else if parts.is_empty() {
                Err(NarsError::Parse(format!("compound {head:?} has no components")))
            } else {
                Ok(Term::compound(head, parts))
            }
        } else {
            Ok(Term::atom(self.word()?))
        }
    }

    fn word(&mut self) -> Result<&'a str, NarsError> {
        let src = self.src;
        let rest = &src[self.pos..];
        let len = rest
            .find(|c: char| matches!(c, '(' | ')' | ','))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(NarsError::Parse(format!(
                "expected a name at {} in {:?}",
                self.pos, self.src
            )));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn eat(&mut self, c: char) -> bool {
        if self.src[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }
}
