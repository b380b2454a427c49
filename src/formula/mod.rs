//! Everything between an expression string and displayable math markup.

pub mod bounds;
pub mod formatter;
pub mod renderer;
pub mod typeset;

pub use bounds::{format_bound_latex, format_bound_text};
pub use formatter::{definite_integral, format_expression, integral_notation};
pub use renderer::{FormulaRenderer, RenderScope, SharedNode};
pub use typeset::{
  EngineHandle, MarkupEngine, MathNode, RenderOptions, TypesetEngine,
  TypesetError,
};
