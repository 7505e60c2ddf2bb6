// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 多仓储共用同一文件库连接时的跨表行为
// 1. 外键与 CHECK 约束在文件库上生效
// 2. is_referenced 跨订单行/库位两处判定
// 3. 在途批次行集对完成批次的排除
// ==========================================


use std::sync::{Arc, Mutex};

use warehouse_ops::db::open_sqlite_connection;
use warehouse_ops::domain::batch::{Batch, BatchRow};
use warehouse_ops::domain::material::Material;
use warehouse_ops::domain::order::{Order, OrderRow};
use warehouse_ops::domain::types::{BatchStatus, OrderType, Priority};
use warehouse_ops::domain::warehouse::WarehouseCell;
use warehouse_ops::repository::{
    BatchRepository, MaterialRepository, OrderRepository, RepositoryError, WarehouseRepository,
};

/// 共享连接的仓储组
struct Repos {
    material: MaterialRepository,
    order: OrderRepository,
    batch: BatchRepository,
    warehouse: WarehouseRepository,
}

fn open_repos(db_path: &str) -> Repos {
    let conn = Arc::new(Mutex::new(
        open_sqlite_connection(db_path).expect("无法打开数据库"),
    ));
    Repos {
        material: MaterialRepository::from_connection(conn.clone()),
        order: OrderRepository::from_connection(conn.clone()),
        batch: BatchRepository::from_connection(conn.clone()),
        warehouse: WarehouseRepository::from_connection(conn),
    }
}

fn seed_cell(repos: &Repos, material_code: u64, quantity: u32) -> u64 {
    let line_id = repos.warehouse.insert_line("A").expect("插入巷道失败");
    let shelf_id = repos
        .warehouse
        .insert_shelf(line_id, 1)
        .expect("插入货架失败");
    repos
        .warehouse
        .insert_cell(&WarehouseCell {
            id: 0,
            shelf_id,
            code: 1,
            public_id: "A-01-01".to_string(),
            material_code: Some(material_code),
            quantity,
            reserved_quantity: 0,
        })
        .expect("插入库位失败")
}

fn seed_order(repos: &Repos, order_id: u64, material_code: u64, quantity: u32) -> Order {
    let mut order = Order::new(order_id, None, Priority::Medium, OrderType::Output);
    assert!(order.add_material(OrderRow::new(
        order_id,
        Material::new(material_code, "测试物料"),
        quantity,
    )));
    repos.order.save(&order).expect("保存订单失败");
    repos
        .order
        .find_by_id(order_id)
        .expect("读取订单失败")
        .expect("订单应存在")
}

fn batch_row(order_id: u64, order_row_id: u64, quantity: u32, cell_id: u64) -> BatchRow {
    BatchRow {
        id: 0,
        batch_id: 0,
        order_id,
        order_row_id,
        material_code: 1001,
        quantity,
        cell_id,
        cell_public_id: "A-01-01".to_string(),
    }
}

#[test]
fn test_订单行外键_未建档物料被拒() {
    let (_tmp, db_path) = test_helpers::create_test_db().expect("无法创建测试数据库");
    let repos = open_repos(&db_path);

    let mut order = Order::new(5001, None, Priority::Low, OrderType::Output);
    assert!(order.add_material(OrderRow::new(5001, Material::new(4242, "幽灵物料"), 10)));

    let err = repos.order.save(&order).unwrap_err();
    assert!(
        matches!(err, RepositoryError::ForeignKeyViolation(_)),
        "实际错误: {}",
        err
    );
}

#[test]
fn test_is_referenced_订单行与库位两处判定() {
    let (_tmp, db_path) = test_helpers::create_test_db().expect("无法创建测试数据库");
    let repos = open_repos(&db_path);

    for code in [1001, 1002, 1003] {
        repos
            .material
            .insert(&Material::new(code, "测试物料"))
            .expect("建档失败");
    }

    // 1001 被订单行引用, 1002 被库位引用, 1003 无引用
    seed_order(&repos, 5001, 1001, 10);
    seed_cell(&repos, 1002, 50);

    assert!(repos.material.is_referenced(1001).expect("判定失败"));
    assert!(repos.material.is_referenced(1002).expect("判定失败"));
    assert!(!repos.material.is_referenced(1003).expect("判定失败"));
}

#[test]
fn test_库存CHECK约束_预约超在库量被拒() {
    let (_tmp, db_path) = test_helpers::create_test_db().expect("无法创建测试数据库");
    let repos = open_repos(&db_path);

    repos
        .material
        .insert(&Material::new(1001, "冷轧钢卷"))
        .expect("建档失败");
    let cell_id = seed_cell(&repos, 1001, 30);

    assert!(repos.warehouse.update_cell_stock(cell_id, 30, 31).is_err());

    // 约束失败不落任何变更
    let cell = repos
        .warehouse
        .get_cell(cell_id)
        .expect("读取失败")
        .expect("库位应存在");
    assert_eq!(cell.quantity, 30);
    assert_eq!(cell.reserved_quantity, 0);
}

#[test]
fn test_在途行集_完成批次释放订单行() {
    let (_tmp, db_path) = test_helpers::create_test_db().expect("无法创建测试数据库");
    let repos = open_repos(&db_path);

    repos
        .material
        .insert(&Material::new(1001, "冷轧钢卷"))
        .expect("建档失败");
    let cell_id = seed_cell(&repos, 1001, 100);
    let order = seed_order(&repos, 5001, 1001, 40);
    let row_id = order.rows()[0].id;

    let mut batch = Batch::new();
    batch.push_row(batch_row(5001, row_id, 40, cell_id));
    let batch_id = repos.batch.insert(&batch).expect("插入批次失败");

    let live = repos.batch.list_live_order_row_ids().expect("查询失败");
    assert_eq!(live, vec![row_id], "CREATED 批次覆盖的行在途");

    assert!(repos
        .batch
        .update_status(batch_id, BatchStatus::Allocated)
        .expect("更新失败"));
    let live = repos.batch.list_live_order_row_ids().expect("查询失败");
    assert_eq!(live, vec![row_id], "ALLOCATED 批次覆盖的行仍在途");

    assert!(repos
        .batch
        .update_status(batch_id, BatchStatus::Completed)
        .expect("更新失败"));
    let live = repos.batch.list_live_order_row_ids().expect("查询失败");
    assert!(live.is_empty(), "COMPLETED 批次不再占用订单行");
}

#[test]
fn test_批次行外键_订单行不存在被拒() {
    let (_tmp, db_path) = test_helpers::create_test_db().expect("无法创建测试数据库");
    let repos = open_repos(&db_path);

    repos
        .material
        .insert(&Material::new(1001, "冷轧钢卷"))
        .expect("建档失败");
    let cell_id = seed_cell(&repos, 1001, 100);

    let mut batch = Batch::new();
    batch.push_row(batch_row(5001, 9999, 10, cell_id));

    let err = repos.batch.insert(&batch).unwrap_err();
    assert!(
        matches!(err, RepositoryError::ForeignKeyViolation(_)),
        "实际错误: {}",
        err
    );
}

#[test]
fn test_删除订单_在途批次行外键拦截() {
    let (_tmp, db_path) = test_helpers::create_test_db().expect("无法创建测试数据库");
    let repos = open_repos(&db_path);

    repos
        .material
        .insert(&Material::new(1001, "冷轧钢卷"))
        .expect("建档失败");
    let cell_id = seed_cell(&repos, 1001, 100);
    let order = seed_order(&repos, 5001, 1001, 40);

    let mut batch = Batch::new();
    batch.push_row(batch_row(5001, order.rows()[0].id, 40, cell_id));
    repos.batch.insert(&batch).expect("插入批次失败");

    // 订单行被批次行引用且不级联, 直接删除应报外键冲突
    let err = repos.order.delete(5001).unwrap_err();
    assert!(
        matches!(err, RepositoryError::ForeignKeyViolation(_)),
        "实际错误: {}",
        err
    );
}
