pub mod http;
pub mod lock;
pub mod path;
