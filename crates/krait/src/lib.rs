#![doc = include_str!("../../../README.md")]
#![expect(dead_code, reason = "IR and host surfaces keep some currently-unused entry points")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing follows JS ToInt semantics")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts mirror ToUint32")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors JS bitwise ops")]
#![expect(clippy::unnecessary_wraps, reason = "dispatch signatures are uniform")]
#![expect(clippy::needless_pass_by_value, reason = "call APIs pass values consistently")]
#![expect(clippy::too_many_arguments, reason = "evaluator plumbing carries explicit context")]
#![expect(clippy::struct_excessive_bools, reason = "parser flags mirror grammar context")]
#![expect(clippy::float_cmp, reason = "JS equality requires exact float comparison")]
#![expect(clippy::match_wildcard_for_single_variants, reason = "payload matches stay open-ended")]
#![expect(clippy::return_self_not_must_use, reason = "builder-style APIs are internal")]

mod analyze;
mod ast;
mod builtins;
mod error;
mod eval;
mod event_loop;
mod fold;
mod r#gen;
mod heap;
mod host;
mod intern;
mod io;
mod lexer;
mod lower;
mod modules;
mod parse;
mod run;
mod scope;
mod types;
mod value;

pub use crate::{
    error::{EngineError, ErrorKind, ParseError, RuntimeError, StackFrame},
    host::HostValue,
    io::{CollectConsole, ConsoleStream, ConsoleWriter, NoConsole, StdConsole},
    run::{Engine, check_syntax},
};
