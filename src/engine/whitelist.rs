// src/engine/whitelist.rs
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

use crate::error::ScriptError;

lazy_static! {
    static ref FUNCTION_CALL: Regex =
        Regex::new(r"([A-Za-z.][A-Za-z0-9._]*(?:::)?[A-Za-z0-9._]*)\s*\(").unwrap();
    static ref STRING_LITERAL: Regex = Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#).unwrap();
    static ref COMMENT: Regex = Regex::new(r"#[^\n]*").unwrap();
    static ref ALLOWED: HashSet<&'static str> = ALLOWED_FUNCTIONS.iter().copied().collect();
}

const ALLOWED_FUNCTIONS: &[&str] = &[
    "abs", "all", "any", "as.character", "as.factor", "as.integer", "as.logical",
    "as.numeric", "c", "cbind", "ceiling", "colMeans", "colnames", "colSums", "cor",
    "cos", "cumprod", "cumsum", "diff", "exp", "factor", "floor", "function", "if",
    "ifelse", "is.logical", "is.na", "is.numeric", "length", "levels", "list", "log",
    "log10", "log2", "matrix", "max", "mean", "median", "min", "names", "ncol",
    "nrow", "paste", "paste0", "prod", "qnorm", "quantile", "range", "rank", "rbind",
    "rep", "return", "rev", "rnorm", "round", "rowMeans", "rownames", "rowSums",
    "runif", "sample", "sd", "seq", "seq_along", "seq_len", "sin", "sort", "sqrt",
    "sum", "tan", "unique", "var", "which", "while", "for",
];

const FORBIDDEN_CONSTRUCTS: &[&str] = &[":::", "`", "<<-", "->>"];

/// Checks free-form R code against the function whitelist. String literals
/// and comments are ignored.
pub fn script_is_safe(script: &str) -> Result<(), ScriptError> {
    if script.trim().is_empty() {
        return Err(ScriptError::Empty);
    }

    let code = STRING_LITERAL.replace_all(script, "\"\"");
    let code = COMMENT.replace_all(&code, "");

    if let Some(construct) = FORBIDDEN_CONSTRUCTS.iter().find(|c| code.contains(*c)) {
        return Err(ScriptError::ForbiddenConstruct(construct.to_string()));
    }

    let forbidden: BTreeSet<&str> = FUNCTION_CALL
        .captures_iter(&code)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !ALLOWED.contains(name))
        .collect();

    if forbidden.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::ForbiddenFunctions(
            forbidden.into_iter().collect::<Vec<_>>().join(", "),
        ))
    }
}
