// ==========================================
// 仓储管理系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单优先级 (Priority)
// ==========================================
// 顺序: Low < Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,    // 低
    Medium, // 中
    High,   // 高
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

impl Priority {
    /// 从字符串解析优先级
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LOW" => Priority::Low,
            "MEDIUM" => Priority::Medium,
            "HIGH" => Priority::High,
            _ => Priority::Low, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

// ==========================================
// 订单类型 (Order Type)
// ==========================================
// INPUT = 入库单 (收货), OUTPUT = 出库单 (拣货)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Input,  // 入库
    Output, // 出库
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Input => write!(f, "INPUT"),
            OrderType::Output => write!(f, "OUTPUT"),
        }
    }
}

impl OrderType {
    /// 从字符串解析订单类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INPUT" => Some(OrderType::Input),
            "OUTPUT" => Some(OrderType::Output),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderType::Input => "INPUT",
            OrderType::Output => "OUTPUT",
        }
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 由双百分比派生: 完成率 100 → Completed, 分配率 100 → Allocated, 否则 Waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Waiting,   // 等待分配
    Allocated, // 已分配
    Completed, // 已完成
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Waiting
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Waiting => write!(f, "WAITING"),
            OrderStatus::Allocated => write!(f, "ALLOCATED"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl OrderStatus {
    /// 从字符串解析订单状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "WAITING" => OrderStatus::Waiting,
            "ALLOCATED" => OrderStatus::Allocated,
            "COMPLETED" => OrderStatus::Completed,
            _ => OrderStatus::Waiting, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Waiting => "WAITING",
            OrderStatus::Allocated => "ALLOCATED",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
// 单向流转: Created → Allocated → Completed, 不可跳级不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Created,   // 已生成
    Allocated, // 已下达 (库存预约生效)
    Completed, // 已完成 (库存结算完毕)
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Created => write!(f, "CREATED"),
            BatchStatus::Allocated => write!(f, "ALLOCATED"),
            BatchStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl BatchStatus {
    /// 从字符串解析批次状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CREATED" => BatchStatus::Created,
            "ALLOCATED" => BatchStatus::Allocated,
            "COMPLETED" => BatchStatus::Completed,
            _ => BatchStatus::Created, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchStatus::Created => "CREATED",
            BatchStatus::Allocated => "ALLOCATED",
            BatchStatus::Completed => "COMPLETED",
        }
    }
}
