// ==========================================
// 仓储管理系统 - 演示数据种子工具
// ==========================================
// 用途: 重置数据库并通过公开 API 构造演示场景
// 场景: 8 种物料, 2 巷道 16 库位（12 个有货）, 5 张订单
//       其中一张订单的物料无库存, 用于演示生成期跳过报告
// 运行: cargo run --bin seed_demo_data [db_path]
// ==========================================

use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};

use warehouse_ops::api::order_api::{CreateOrderRequest, NewOrderRowRequest};
use warehouse_ops::api::warehouse_api::CreateCellRequest;
use warehouse_ops::api::CommandResult;
use warehouse_ops::app::{get_default_db_path, AppState};
use warehouse_ops::config::config_keys;
use warehouse_ops::db::open_sqlite_connection;
use warehouse_ops::{OrderType, Priority};

fn main() -> Result<(), Box<dyn Error>> {
    warehouse_ops::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;

    seed_materials(&state)?;
    seed_topology(&state)?;
    seed_orders(&state)?;

    // 批次行数上限调小, 便于演示批次切分
    ensure_ok(
        state
            .config_api
            .set_config(config_keys::BATCH_MAX_ROWS_PER_BATCH, "5")?,
        "写入批次配置",
    )?;

    print_quick_counts(&db_path)?;

    eprintln!("演示数据已就绪: {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    // WAL 残留一并清理
    let _ = fs::remove_file(format!("{}-wal", db_path));
    let _ = fs::remove_file(format!("{}-shm", db_path));

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_materials(state: &AppState) -> Result<(), Box<dyn Error>> {
    let materials: [(u64, &str); 8] = [
        (1001, "冷轧钢卷 1.0mm"),
        (1002, "冷轧钢卷 1.5mm"),
        (1003, "热镀锌板 0.8mm"),
        (1004, "热镀锌板 1.2mm"),
        (1005, "不锈钢带 304"),
        (1006, "不锈钢带 316L"),
        (1007, "铝板 5052"),
        (1008, "紫铜带 T2"),
    ];

    for (code, description) in materials {
        ensure_ok(
            state.material_api.create_material(code, description)?,
            "物料建档",
        )?;
    }

    Ok(())
}

fn seed_topology(state: &AppState) -> Result<(), Box<dyn Error>> {
    // 库位按创建顺序对应的初始库存, 末尾 4 个留空
    let stock_plan: [Option<(u64, u32)>; 16] = [
        Some((1001, 120)),
        Some((1001, 80)),
        Some((1002, 60)),
        Some((1002, 100)),
        Some((1003, 90)),
        Some((1003, 50)),
        Some((1004, 75)),
        Some((1004, 45)),
        Some((1005, 200)),
        Some((1005, 30)),
        Some((1006, 110)),
        Some((1006, 65)),
        None,
        None,
        None,
        None,
    ];

    let mut slot = 0usize;
    for line_code in ["A", "B"] {
        let line_result =
            ensure_ok(state.warehouse_api.create_line(line_code)?, "创建巷道")?;
        let line_id = extract_id(&line_result, "line_id")?;

        for shelf_code in 1..=2u32 {
            let shelf_result = ensure_ok(
                state.warehouse_api.create_shelf(line_id, shelf_code)?,
                "创建货架",
            )?;
            let shelf_id = extract_id(&shelf_result, "shelf_id")?;

            for cell_code in 1..=4u32 {
                let stock = stock_plan[slot];
                slot += 1;

                ensure_ok(
                    state.warehouse_api.create_cell(CreateCellRequest {
                        shelf_id,
                        code: cell_code,
                        public_id: format!("{}-{:02}-{:02}", line_code, shelf_code, cell_code),
                        material_code: stock.map(|(code, _)| code),
                        quantity: stock.map(|(_, qty)| qty).unwrap_or(0),
                    })?,
                    "创建库位",
                )?;
            }
        }
    }

    Ok(())
}

fn seed_orders(state: &AppState) -> Result<(), Box<dyn Error>> {
    let yesterday = Utc::now() - Duration::days(1);

    let orders = [
        (
            5001u64,
            OrderType::Output,
            Priority::High,
            vec![(1001u64, 150u32), (1002, 120)],
        ),
        (
            5002,
            OrderType::Output,
            Priority::Medium,
            vec![(1003, 100), (1005, 180)],
        ),
        (
            5003,
            OrderType::Output,
            Priority::Low,
            vec![(1004, 60), (1006, 90), (1002, 30)],
        ),
        (5004, OrderType::Input, Priority::Medium, vec![(1001, 40)]),
        // 物料 1007 无库存: 生成时该行会进入跳过报告
        (5005, OrderType::Output, Priority::High, vec![(1007, 25)]),
    ];

    for (order_id, order_type, priority, rows) in orders {
        let rows = rows
            .into_iter()
            .map(|(material_code, quantity)| NewOrderRowRequest {
                material_code,
                quantity,
            })
            .collect();

        ensure_ok(
            state.order_api.create_order(CreateOrderRequest {
                order_id,
                order_type,
                priority,
                emission_date: Some(yesterday),
                rows,
            })?,
            "创建订单",
        )?;
    }

    Ok(())
}

fn print_quick_counts(db_path: &str) -> Result<(), Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;

    let tables = [
        "wms_material",
        "wms_warehouse_line",
        "wms_warehouse_shelf",
        "wms_warehouse_cell",
        "wms_order",
        "wms_order_row",
        "wms_batch",
        "wms_batch_row",
        "action_log",
        "config_kv",
    ];

    eprintln!("Row counts:");
    for t in tables {
        let sql = format!("SELECT COUNT(*) FROM {}", t);
        let c: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        eprintln!("  {:<24} {}", t, c);
    }
    Ok(())
}

fn ensure_ok(result: CommandResult, context: &str) -> Result<CommandResult, Box<dyn Error>> {
    if !result.success {
        return Err(format!("{}: {}", context, result.message).into());
    }
    Ok(result)
}

fn extract_id(result: &CommandResult, key: &str) -> Result<u64, Box<dyn Error>> {
    result
        .details
        .as_ref()
        .and_then(|d| d.get(key))
        .and_then(|v| v.as_u64())
        .ok_or_else(|| format!("返回结果缺少 {}", key).into())
}
