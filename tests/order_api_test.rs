// ==========================================
// OrderApi 集成测试
// ==========================================
// 测试范围:
// 1. 创建: create_order 参数与业务校验
// 2. 行集维护: add_order_row, remove_order_row
// 3. 守卫修改与删除: update_order, delete_order
// 4. 查询: list_orders, get_order_detail
// ==========================================

mod helpers;

use chrono::{Duration, Utc};
use helpers::api_test_helper::*;
use warehouse_ops::api::order_api::{CreateOrderRequest, NewOrderRowRequest};
use warehouse_ops::api::ApiError;
use warehouse_ops::domain::types::{OrderStatus, OrderType, Priority};

fn demo_materials(env: &ApiTestEnv) {
    env.seed_materials(&[(1001, "冷轧钢卷"), (1002, "热镀锌板"), (1003, "不锈钢带")]);
}

// ==========================================
// 创建测试
// ==========================================

#[test]
fn test_create_order_带行创建() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);

    let result = env
        .order_api
        .create_order(CreateOrderRequest {
            order_id: 5001,
            order_type: OrderType::Output,
            priority: Priority::High,
            emission_date: Some(Utc::now()),
            rows: vec![
                NewOrderRowRequest {
                    material_code: 1001,
                    quantity: 30,
                },
                NewOrderRowRequest {
                    material_code: 1002,
                    quantity: 20,
                },
            ],
        })
        .expect("创建失败");
    assert!(result.success, "创建应成功: {}", result.message);

    let detail = env
        .order_api
        .get_order_detail(5001)
        .expect("查询失败")
        .expect("订单应存在");
    assert_eq!(detail.order_status, OrderStatus::Waiting);
    assert_eq!(detail.rows.len(), 2);
    assert_eq!(detail.allocation_percentual, 0.0);
    assert!(detail.is_editable, "新订单应可编辑");
    assert!(detail.can_delete, "新订单应可删除");
}

#[test]
fn test_create_order_订单号为零报参数错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .order_api
        .create_order(CreateOrderRequest {
            order_id: 0,
            order_type: OrderType::Output,
            priority: Priority::Low,
            emission_date: None,
            rows: vec![],
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_create_order_重复订单号被拒() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(5001, OrderType::Output, Priority::Low, &[(1001, 10)]);

    let result = env
        .order_api
        .create_order(CreateOrderRequest {
            order_id: 5001,
            order_type: OrderType::Input,
            priority: Priority::High,
            emission_date: Some(Utc::now()),
            rows: vec![],
        })
        .expect("调用失败");
    assert!(!result.success, "重复订单号应被拒绝");
    assert!(
        result.message.contains("已存在"),
        "消息应说明原因: {}",
        result.message
    );
}

#[test]
fn test_create_order_物料未建档被拒() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let result = env
        .order_api
        .create_order(CreateOrderRequest {
            order_id: 5001,
            order_type: OrderType::Output,
            priority: Priority::Low,
            emission_date: Some(Utc::now()),
            rows: vec![NewOrderRowRequest {
                material_code: 8888,
                quantity: 5,
            }],
        })
        .expect("调用失败");
    assert!(!result.success, "未建档物料应被拒绝");
}

// ==========================================
// 行集维护测试
// ==========================================

#[test]
fn test_add_order_row_正常追加() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(5001, OrderType::Output, Priority::Medium, &[(1001, 10)]);

    let result = env
        .order_api
        .add_order_row(5001, 1002, 15)
        .expect("追加失败");
    assert!(result.success, "追加应成功: {}", result.message);

    let detail = env
        .order_api
        .get_order_detail(5001)
        .expect("查询失败")
        .expect("订单应存在");
    assert_eq!(detail.rows.len(), 2);
    assert!(detail.rows.iter().any(|r| r.material_code == 1002 && r.quantity == 15));
}

#[test]
fn test_add_order_row_订单不存在被拒() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);

    let result = env
        .order_api
        .add_order_row(7777, 1001, 5)
        .expect("调用失败");
    assert!(!result.success);
}

#[test]
fn test_remove_order_row_正常移除() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(
        5001,
        OrderType::Output,
        Priority::Medium,
        &[(1001, 10), (1002, 20)],
    );

    let detail = env
        .order_api
        .get_order_detail(5001)
        .expect("查询失败")
        .expect("订单应存在");
    let row_id = detail
        .rows
        .iter()
        .find(|r| r.material_code == 1002)
        .expect("应有 1002 行")
        .id;

    let result = env
        .order_api
        .remove_order_row(5001, row_id)
        .expect("移除失败");
    assert!(result.success, "移除应成功: {}", result.message);

    let detail = env
        .order_api
        .get_order_detail(5001)
        .expect("查询失败")
        .expect("订单应存在");
    assert_eq!(detail.rows.len(), 1);
    assert_eq!(detail.rows[0].material_code, 1001);
}

#[test]
fn test_remove_order_row_行不属于订单被拒() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(5001, OrderType::Output, Priority::Medium, &[(1001, 10)]);

    let result = env
        .order_api
        .remove_order_row(5001, 424242)
        .expect("调用失败");
    assert!(!result.success, "未知行应被拒绝");
}

// ==========================================
// 守卫修改与删除测试
// ==========================================

#[test]
fn test_update_order_修改优先级与日期() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(5001, OrderType::Output, Priority::Low, &[(1001, 10)]);

    let new_date = Utc::now() - Duration::days(3);
    let result = env
        .order_api
        .update_order(5001, Some(new_date), Some(Priority::High))
        .expect("修改失败");
    assert!(result.success, "修改应成功: {}", result.message);

    let detail = env
        .order_api
        .get_order_detail(5001)
        .expect("查询失败")
        .expect("订单应存在");
    assert_eq!(detail.priority, Priority::High);
    let emission = detail.emission_date.expect("下达日期应存在");
    assert!((emission - new_date).num_seconds().abs() < 2);
}

#[test]
fn test_update_order_无修改字段报参数错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(5001, OrderType::Output, Priority::Low, &[(1001, 10)]);

    let err = env.order_api.update_order(5001, None, None).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_delete_order_等待态可删除() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(5001, OrderType::Output, Priority::Low, &[(1001, 10)]);

    let result = env.order_api.delete_order(5001).expect("删除失败");
    assert!(result.success, "等待态订单应可删除: {}", result.message);

    let found = env.order_api.get_order_detail(5001).expect("查询失败");
    assert!(found.is_none(), "删除后应查不到");
}

#[test]
fn test_delete_order_不存在被拒() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let result = env.order_api.delete_order(7777).expect("调用失败");
    assert!(!result.success);
}

// ==========================================
// 查询测试
// ==========================================

#[test]
fn test_list_orders_按状态过滤() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    demo_materials(&env);
    env.seed_order(5001, OrderType::Output, Priority::Low, &[(1001, 10)]);
    env.seed_order(5002, OrderType::Input, Priority::High, &[(1002, 20)]);

    let all = env.order_api.list_orders(None).expect("查询失败");
    assert_eq!(all.len(), 2);

    let waiting = env
        .order_api
        .list_orders(Some(OrderStatus::Waiting))
        .expect("查询失败");
    assert_eq!(waiting.len(), 2, "两张订单都应在等待态");

    let completed = env
        .order_api
        .list_orders(Some(OrderStatus::Completed))
        .expect("查询失败");
    assert!(completed.is_empty());
}
