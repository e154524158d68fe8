pub mod credentials;
pub mod http;
