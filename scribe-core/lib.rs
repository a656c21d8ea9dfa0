pub mod chars;
pub mod link;
