pub mod coach;
pub mod health;
pub mod quota;
pub mod records;
