pub mod bom_line;
pub mod item;
