/// 通用接口
pub mod health;
