pub mod hybrid;
pub mod keys;
pub mod password;
pub mod session;
