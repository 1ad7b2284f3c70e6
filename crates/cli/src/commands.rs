pub mod buy;
pub mod feed;
pub mod me;
pub mod shop;
pub mod top;
