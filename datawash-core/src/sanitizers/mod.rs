//! Rule compilation, ordered rule application and the post-rule policy.
//!
//! `compiler` turns `CleaningRule`s into cached regexes, `rules` folds them
//! over a string, and `policy` applies whitespace normalization and length
//! bounds to the result.

pub mod compiler;
pub mod policy;
pub mod rules;
