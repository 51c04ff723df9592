//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 配送订单（患者下单、配送员接单）
//! - [`deliveries`] - 配送单生命周期、位置上报与实时订阅、签收
//! - [`loyalty`] - 积分概览、计划与奖励、兑换

pub mod deliveries;
pub mod health;
pub mod loyalty;
pub mod orders;
