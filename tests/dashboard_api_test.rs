// ==========================================
// DashboardApi 集成测试
// ==========================================
// 测试范围:
// 1. 聚合快照: get_dashboard 的订单/批次/物料/库存口径
// 2. 操作日志: recent_activity, activity_by_type
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use warehouse_ops::api::ApiError;
use warehouse_ops::domain::types::{OrderType, Priority};

#[test]
fn test_get_dashboard_空库全零() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let snapshot = env.dashboard_api.get_dashboard().expect("查询失败");
    assert_eq!(snapshot.orders.total, 0);
    assert_eq!(snapshot.batches.total, 0);
    assert_eq!(snapshot.material_count, 0);
    assert_eq!(snapshot.stock.total_quantity, 0);
    assert_eq!(snapshot.stock.material_kinds, 0);
}

#[test]
fn test_get_dashboard_聚合口径() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_materials(&[(1001, "冷轧钢卷"), (1002, "热镀锌板")]);
    let shelf_id = env.seed_shelf("A");
    env.seed_stocked_cell(shelf_id, 1, "A-01-01", 1001, 100);
    env.seed_stocked_cell(shelf_id, 2, "A-01-02", 1002, 60);
    env.seed_order(5001, OrderType::Output, Priority::High, &[(1001, 80)]);
    env.seed_order(5002, OrderType::Output, Priority::Low, &[(1002, 10)]);

    // 一个批次走到下达, 让订单/批次分布非平凡
    assert!(env.batch_api.generate_batches().expect("生成失败").success);
    let batches = env.batch_api.list_batches(None).expect("查询失败");
    let batch_id = batches[0].id;
    assert!(env.batch_api.allocate_batch(batch_id).expect("下达失败").success);

    let snapshot = env.dashboard_api.get_dashboard().expect("查询失败");

    assert_eq!(snapshot.orders.total, 2);
    assert_eq!(snapshot.orders.waiting, 0, "两张订单都已全额分配");
    assert_eq!(snapshot.orders.allocated, 2);

    assert_eq!(snapshot.batches.total, 1);
    assert_eq!(snapshot.batches.allocated, 1);

    assert_eq!(snapshot.material_count, 2);
    assert_eq!(snapshot.stock.total_quantity, 160);
    assert_eq!(snapshot.stock.total_reserved, 90, "80 + 10 预约在途");
    assert_eq!(snapshot.stock.material_kinds, 2);
}

#[test]
fn test_recent_activity_倒序返回() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_materials(&[(1001, "冷轧钢卷")]);
    env.material_api.delete_material(1001).expect("删除失败");

    let recent = env.dashboard_api.recent_activity(10).expect("查询失败");
    assert!(recent.len() >= 2, "建档与删除都应有记录");
    assert_eq!(recent[0].action_type, "DeleteMaterial", "最新操作应排在最前");
}

#[test]
fn test_recent_activity_限制非法报参数错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    assert!(matches!(
        env.dashboard_api.recent_activity(0).unwrap_err(),
        ApiError::InvalidInput(_)
    ));
    assert!(matches!(
        env.dashboard_api.recent_activity(1001).unwrap_err(),
        ApiError::InvalidInput(_)
    ));
}

#[test]
fn test_activity_by_type_过滤() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_materials(&[(1001, "冷轧钢卷"), (1002, "热镀锌板")]);
    env.material_api.delete_material(1002).expect("删除失败");

    let creates = env
        .dashboard_api
        .activity_by_type("CreateMaterial", 10)
        .expect("查询失败");
    assert_eq!(creates.len(), 2);
    assert!(creates.iter().all(|l| l.action_type == "CreateMaterial"));

    let deletes = env
        .dashboard_api
        .activity_by_type("DeleteMaterial", 10)
        .expect("查询失败");
    assert_eq!(deletes.len(), 1);
}
