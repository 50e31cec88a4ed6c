// Core primitives shared by the parser and header layers.

pub mod newlines;

pub use newlines::*;
