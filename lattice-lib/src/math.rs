pub mod axis;
pub mod bounds;
pub mod vector;
