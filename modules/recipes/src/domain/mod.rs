pub mod error;
pub mod image;
pub mod password;
pub mod ports;
pub mod repo;
pub mod service;
pub mod shopping_list;
