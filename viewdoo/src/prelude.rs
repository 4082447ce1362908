//! Types and functions needed to work with views.
//!
//! ```
//! use viewdoo::prelude::*;
//! ```
pub use crate::config::Config;
pub use crate::logging::Logger;
pub use crate::view::scheduler::{self, Discipline};
pub use crate::view::{
    compile, Document, Function, Node, Props, Scope, State, Surface, Template, ToValue, Value,
    View,
};
pub use serde::{Deserialize, Serialize};
