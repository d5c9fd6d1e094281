pub mod access;

pub use access::{FORBIDDEN_BODY, JwtHandler, JwtLayer, USER_HEADER};
