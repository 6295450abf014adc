pub mod attribute;
pub mod list;
