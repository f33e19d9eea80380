mod path;
mod section;

pub use path::{FieldPath, IntoFieldPath, Segment};
pub use section::{FieldClass, Section};
