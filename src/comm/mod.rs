/// 通用组件
pub mod client_ip;
pub mod json_body;

pub use client_ip::{ClientIp, ClientIpResolver};
pub use json_body::JsonBody;
