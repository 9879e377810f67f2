pub mod company;
pub mod section;
pub mod table;
