pub mod selection;
pub mod surface;
