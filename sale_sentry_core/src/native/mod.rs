// Native implementations

pub mod http;
pub mod rpc_impl;
pub mod twitter;

pub use http::NativeHttpClient;
pub use rpc_impl::NativeRpcClient;
pub use twitter::{TwitterClient, TwitterCredentials};
