// ==========================================
// 仓储管理系统 - 控制台主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单与批次作业中心
// 行为: 初始化库并打印运行快照, 业务操作走库 API
// ==========================================

use std::error::Error;

use warehouse_ops::app::{get_default_db_path, AppState};

fn main() -> Result<(), Box<dyn Error>> {
    // 初始化日志系统
    warehouse_ops::logging::init();
    warehouse_ops::i18n::set_locale("zh-CN");

    tracing::info!("==================================================");
    tracing::info!("仓储管理系统 - 订单与批次作业中心");
    tracing::info!("系统版本: {}", warehouse_ops::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState
    let state = AppState::new(db_path)?;
    tracing::info!("AppState初始化成功");

    print_status(&state)?;

    Ok(())
}

/// 打印运行快照与最近操作
fn print_status(state: &AppState) -> Result<(), Box<dyn Error>> {
    let snapshot = state.dashboard_api.get_dashboard()?;

    println!("==================================================");
    println!(
        "仓储运行快照  {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==================================================");
    println!(
        "订单: 等待 {}  已分配 {}  已完成 {}  合计 {}",
        snapshot.orders.waiting,
        snapshot.orders.allocated,
        snapshot.orders.completed,
        snapshot.orders.total
    );
    println!(
        "批次: 已生成 {}  已下达 {}  已完成 {}  合计 {}",
        snapshot.batches.created,
        snapshot.batches.allocated,
        snapshot.batches.completed,
        snapshot.batches.total
    );
    println!("物料: 建档 {} 种", snapshot.material_count);
    println!(
        "库存: 在库 {}  预约 {}  存放物料 {} 种",
        snapshot.stock.total_quantity,
        snapshot.stock.total_reserved,
        snapshot.stock.material_kinds
    );
    println!();

    let recent = state.dashboard_api.recent_activity(10)?;
    if recent.is_empty() {
        println!("暂无操作记录");
    } else {
        println!("最近操作:");
        for log in recent {
            let entity = match (&log.entity_type, &log.entity_id) {
                (Some(t), Some(id)) => format!("{}#{}", t, id),
                _ => String::from("-"),
            };
            println!(
                "  {}  {:<18} {}",
                log.action_ts.format("%m-%d %H:%M:%S"),
                log.action_type,
                entity
            );
        }
    }

    Ok(())
}
