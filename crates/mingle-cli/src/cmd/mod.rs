pub mod assign;
pub mod completions;
