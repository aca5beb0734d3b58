pub mod series;
pub mod table;
pub mod threads;
