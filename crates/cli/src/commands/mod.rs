pub mod migrate;
pub mod password;
