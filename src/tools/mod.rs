//! Built-in tools available to the generation loop.
//!
//! Tools are external capabilities the model can request via
//! `<tool_call>` markers in its output. The [`registry`] module handles
//! registration and dispatch; [`calculator`] and [`datetime`] are the
//! built-ins.

pub mod calculator;
pub mod datetime;
pub mod registry;

pub use registry::{Tool, ToolRegistry};
