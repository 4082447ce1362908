//! Implementation of the template language.
//!
//! Includes the parser and runtime.
pub mod expression;
pub mod function;
pub mod op;
pub mod program;
pub mod script;
pub mod statement;
pub mod term;

pub use expression::{Evaluate, Expression};
pub use function::Function;
pub use op::Op;
pub use program::Program;
pub use script::Script;
pub use statement::{Rendered, Statement};
pub use term::Term;
