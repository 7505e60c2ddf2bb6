// ==========================================
// 仓储管理系统 - 订单领域模型
// ==========================================
// 职责: 订单聚合与双百分比状态机
// 规则: 可编辑性/可删除性/守卫 setter 全部返回 bool, 不抛错
// ==========================================

use crate::domain::material::Material;
use crate::domain::types::{OrderStatus, OrderType, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// OrderRow - 订单行
// ==========================================
// 一行 = 一种物料 + 数量 + 分配/完成标志
// 对齐: wms_order_row 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: u64,            // 行 ID（0 = 未持久化，由数据库赋号）
    pub order_id: u64,      // 所属订单 ID
    pub material: Material, // 物料（持有快照，非回指引用）
    pub quantity: u32,      // 数量
    pub allocated: bool,    // 库存已分配
    pub completed: bool,    // 作业已完成
}

impl OrderRow {
    /// 创建订单行
    pub fn new(order_id: u64, material: Material, quantity: u32) -> Self {
        Self {
            id: 0,
            order_id,
            material,
            quantity,
            allocated: false,
            completed: false,
        }
    }

    /// 行数据是否齐全: 物料已赋码且数量为正
    pub fn is_data_complete(&self) -> bool {
        self.material.has_valid_code() && self.quantity > 0
    }
}

// ==========================================
// Order - 订单聚合
// ==========================================
// 双百分比为派生值: 每次行集变化后急算, 不做惰性缓存
// 状态由百分比派生: 完成率 100 → Completed(盖 done_date),
// 分配率 100 → Allocated, 否则 Waiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,                              // 订单号（0 = 未赋号，应用层赋号）
    pub emission_date: Option<DateTime<Utc>>, // 下达日期
    pub priority: Priority,                   // 优先级
    pub order_type: OrderType,                // 入库/出库
    pub order_status: OrderStatus,            // 派生状态
    pub allocation_percentual: f32,           // 分配率（0-100）
    pub complete_percentual: f32,             // 完成率（0-100）
    pub done_date: Option<DateTime<Utc>>,     // 完成时间（首次到达 100% 时盖章）
    rows: Vec<OrderRow>,                      // 订单行（聚合独占所有权）
}

impl Order {
    /// 创建订单
    ///
    /// # 参数
    /// - `id`: 订单号，0 表示尚未赋号
    /// - `emission_date`: 下达日期
    /// - `priority`: 优先级
    /// - `order_type`: 入库/出库
    pub fn new(
        id: u64,
        emission_date: Option<DateTime<Utc>>,
        priority: Priority,
        order_type: OrderType,
    ) -> Self {
        Self {
            id,
            emission_date,
            priority,
            order_type,
            order_status: OrderStatus::Waiting,
            allocation_percentual: 0.0,
            complete_percentual: 0.0,
            done_date: None,
            rows: Vec::new(),
        }
    }

    /// 从持久化数据重建订单（仓储层使用）
    ///
    /// # 说明
    /// 行集装载完成后必须调用双百分比重算，保证派生值与行标志一致
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: u64,
        emission_date: Option<DateTime<Utc>>,
        priority: Priority,
        order_type: OrderType,
        order_status: OrderStatus,
        done_date: Option<DateTime<Utc>>,
        rows: Vec<OrderRow>,
    ) -> Self {
        let mut order = Self {
            id,
            emission_date,
            priority,
            order_type,
            order_status,
            allocation_percentual: 0.0,
            complete_percentual: 0.0,
            done_date,
            rows,
        };
        order.update_allocated_percentual();
        order.update_completed_percentual();
        order
    }

    // ==========================================
    // 行集操作
    // ==========================================

    /// 添加订单行
    ///
    /// # 返回
    /// - `true`: 添加成功，双百分比已重算
    /// - `false`: 订单不可编辑或行数据不齐全，行集不变
    pub fn add_material(&mut self, row: OrderRow) -> bool {
        if !self.is_editable() || !row.is_data_complete() {
            return false;
        }
        self.rows.push(row);
        self.update_allocated_percentual();
        self.update_completed_percentual();
        true
    }

    /// 移除订单行
    ///
    /// # 返回
    /// - `true`: 移除成功，双百分比已重算
    /// - `false`: 订单不可编辑或目标行不存在
    pub fn remove_material(&mut self, row_id: u64) -> bool {
        if !self.is_editable() {
            return false;
        }
        let before = self.rows.len();
        self.rows.retain(|r| r.id != row_id);
        if self.rows.len() == before {
            return false;
        }
        self.update_allocated_percentual();
        self.update_completed_percentual();
        true
    }

    /// 将首个匹配物料的行标记为已分配
    ///
    /// # 说明
    /// 首行命中语义: 同一物料多行时只命中第一行（即使已置位），不继续向后找；
    /// 无匹配行则不触发重算
    pub fn set_material_as_allocated(&mut self, material_code: u64) -> bool {
        match self.rows.iter_mut().find(|r| r.material.code == material_code) {
            Some(row) => {
                row.allocated = true;
                self.update_allocated_percentual();
                true
            }
            None => false,
        }
    }

    /// 将首个匹配物料的行标记为已完成
    pub fn set_material_as_completed(&mut self, material_code: u64) -> bool {
        match self.rows.iter_mut().find(|r| r.material.code == material_code) {
            Some(row) => {
                row.completed = true;
                self.update_completed_percentual();
                true
            }
            None => false,
        }
    }

    // ==========================================
    // 派生值重算
    // ==========================================

    /// 重算分配率并刷新派生状态
    ///
    /// 分配率 = 已分配行数 / 总行数 × 100, 空订单为 0.0
    pub fn update_allocated_percentual(&mut self) {
        self.allocation_percentual = Self::percentual_of(&self.rows, |r| r.allocated);
        self.refresh_status();
    }

    /// 重算完成率并刷新派生状态
    pub fn update_completed_percentual(&mut self) {
        self.complete_percentual = Self::percentual_of(&self.rows, |r| r.completed);
        self.refresh_status();
    }

    fn percentual_of(rows: &[OrderRow], flag: impl Fn(&OrderRow) -> bool) -> f32 {
        if rows.is_empty() {
            return 0.0;
        }
        let hit = rows.iter().filter(|r| flag(r)).count() as f32;
        hit / rows.len() as f32 * 100.0
    }

    /// 按双百分比刷新订单状态
    ///
    /// done_date 只在首次到达完成态时盖章，之后不再改写
    fn refresh_status(&mut self) {
        if self.complete_percentual >= 100.0 {
            self.order_status = OrderStatus::Completed;
            if self.done_date.is_none() {
                self.done_date = Some(Utc::now());
            }
        } else if self.allocation_percentual >= 100.0 {
            self.order_status = OrderStatus::Allocated;
        } else {
            self.order_status = OrderStatus::Waiting;
        }
    }

    // ==========================================
    // 编辑性与守卫 setter
    // ==========================================

    /// 订单是否可编辑: 两个百分比都未到 100
    pub fn is_editable(&self) -> bool {
        self.allocation_percentual < 100.0 && self.complete_percentual < 100.0
    }

    /// 订单是否可删除: 分配率为 0 或 完成率为 0
    ///
    /// 与 is_editable 的 AND 不对称是既定业务口径（OR 语义），
    /// 唯一依赖点在 OrderApi::delete_order
    pub fn can_delete(&self) -> bool {
        self.allocation_percentual <= 0.0 || self.complete_percentual <= 0.0
    }

    /// 赋订单号: 仅未赋号（当前 id 为 0）时生效
    pub fn set_id(&mut self, id: u64) -> bool {
        if self.id != 0 {
            return false;
        }
        self.id = id;
        true
    }

    /// 修改下达日期: 仅可编辑时生效
    pub fn set_emission_date(&mut self, date: DateTime<Utc>) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.emission_date = Some(date);
        true
    }

    /// 修改优先级: 仅可编辑时生效
    pub fn set_priority(&mut self, priority: Priority) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.priority = priority;
        true
    }

    /// 订单头数据是否齐全: 已赋号且有下达日期
    pub fn is_data_complete(&self) -> bool {
        self.id != 0 && self.emission_date.is_some()
    }

    // ==========================================
    // 只读访问
    // ==========================================

    /// 订单行只读视图
    pub fn rows(&self) -> &[OrderRow] {
        &self.rows
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
