//! Generator compilation and execution.
//!
//! `ir` defines the instruction list, `builder` compiles lowered bodies into
//! it, and `machine` is the stepwise interpreter that implements
//! pause/resume for `yield`, `yield*`, and `await`.

pub(crate) mod builder;
pub(crate) mod ir;
pub(crate) mod machine;
