use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical content of a task. Structure only; building terms from text and
/// deriving new terms belong to the grammar and inference layers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Atom(String),
    Compound {
        connector: String,
        components: Vec<Term>,
    },
    /// An executable operation: `(^op,arg1,arg2)`. The operator name keeps
    /// its `^` prefix.
    Operation { operator: String, args: Vec<Term> },
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn compound(connector: impl Into<String>, components: Vec<Term>) -> Self {
        Term::Compound {
            connector: connector.into(),
            components,
        }
    }

    /// Build an operation, adding the `^` prefix if it is missing.
    pub fn operation(operator: &str, args: Vec<Term>) -> Self {
        Term::Operation {
            operator: operator_name(operator),
            args,
        }
    }

    /// `(operator, args)` when this term is an operation.
    pub fn as_operation(&self) -> Option<(&str, &[Term])> {
        match self {
            Term::Operation { operator, args } => Some((operator, args)),
            _ => None,
        }
    }

    /// Number of atoms and connectors in the term.
    pub fn complexity(&self) -> usize {
        match self {
            Term::Atom(_) => 1,
            Term::Compound { components, .. } => {
                1 + components.iter().map(Term::complexity).sum::<usize>()
            }
            Term::Operation { args, .. } => 1 + args.iter().map(Term::complexity).sum::<usize>(),
        }
    }
}

/// Canonical operator name, always `^`-prefixed.
pub fn operator_name(name: &str) -> String {
    if name.starts_with('^') {
        name.to_string()
    } else {
        format!("^{name}")
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, parts) = match self {
            Term::Atom(name) => return f.write_str(name),
            Term::Compound {
                connector,
                components,
            } => (connector, components),
            Term::Operation { operator, args } => (operator, args),
        };
        write!(f, "({head}")?;
        for part in parts {
            write!(f, ",{part}")?;
        }
        f.write_str(")")
    }
}
