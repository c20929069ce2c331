pub mod distance;
pub mod nurbs;
pub mod point;
pub mod tfi;
pub mod vector;
