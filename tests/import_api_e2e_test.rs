// ==========================================
// 导入 API 端到端测试
// ==========================================
// 测试范围:
// 1. CSV 导入: 新编码入库、已有编码跳过、非法行拒绝
// 2. 报告统计: 各行去向计数与行号定位
// 3. 入口校验: 空路径、不支持的扩展名
// ==========================================

mod helpers;

use std::io::Write;

use helpers::api_test_helper::*;
use tempfile::NamedTempFile;
use warehouse_ops::api::ApiError;

/// 写一个带表头的临时 CSV 文件
fn temp_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("无法创建临时文件");
    for line in lines {
        writeln!(file, "{}", line).expect("写入失败");
    }
    file.flush().expect("刷新失败");
    file
}

#[tokio::test]
async fn test_import_materials_全新编码全部入库() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = temp_csv(&[
        "material_code,description",
        "1001,冷轧钢卷 1.0mm",
        "1002,热镀锌板 0.8mm",
        "1003,不锈钢带 304",
    ]);

    let report = env
        .import_api
        .import_materials(file.path().to_str().expect("路径非法"))
        .await
        .expect("导入失败");

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.imported, 3);
    assert_eq!(report.skipped_existing, 0);
    assert_eq!(report.rejected, 0);

    let materials = env.material_api.list_materials().expect("查询失败");
    assert_eq!(materials.len(), 3);
    assert!(materials.iter().any(|m| m.code == 1002 && m.description == "热镀锌板 0.8mm"));
}

#[tokio::test]
async fn test_import_materials_已有编码跳过且保留原描述() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.seed_materials(&[(1001, "已有物料")]);

    let file = temp_csv(&[
        "material_code,description",
        "1001,新描述不应覆盖",
        "1002,新物料",
    ]);

    let report = env
        .import_api
        .import_materials(file.path().to_str().expect("路径非法"))
        .await
        .expect("导入失败");

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped_existing, 1);
    assert_eq!(report.skipped_codes, vec![1001]);

    let material = env
        .material_api
        .get_material(1001)
        .expect("查询失败")
        .expect("物料应存在");
    assert_eq!(material.description, "已有物料", "导入不覆盖已有描述");
}

#[tokio::test]
async fn test_import_materials_非法行带行号拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = temp_csv(&[
        "material_code,description",
        "abc,编码非数字",
        "0,编码为零",
        "1001,",
        "1002,正常物料",
    ]);

    let report = env
        .import_api
        .import_materials(file.path().to_str().expect("路径非法"))
        .await
        .expect("导入失败");

    assert_eq!(report.total_rows, 4);
    assert_eq!(report.imported, 1);
    assert_eq!(report.rejected, 3);

    // 行号从 2 起算（首行为表头）
    let row_numbers: Vec<usize> = report.violations.iter().map(|v| v.row_number).collect();
    assert_eq!(row_numbers, vec![2, 3, 4]);
}

#[tokio::test]
async fn test_import_materials_文件内重复编码只入首行() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = temp_csv(&[
        "material_code,description",
        "1001,首行描述",
        "1001,重复行",
    ]);

    let report = env
        .import_api
        .import_materials(file.path().to_str().expect("路径非法"))
        .await
        .expect("导入失败");

    assert_eq!(report.imported, 1);
    assert_eq!(report.rejected, 1);

    let material = env
        .material_api
        .get_material(1001)
        .expect("查询失败")
        .expect("物料应存在");
    assert_eq!(material.description, "首行描述");
}

#[tokio::test]
async fn test_import_materials_审计日志带统计() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = temp_csv(&["material_code,description", "1001,冷轧钢卷"]);

    env.import_api
        .import_materials(file.path().to_str().expect("路径非法"))
        .await
        .expect("导入失败");

    let recent = env.dashboard_api.recent_activity(10).expect("查询日志失败");
    let entry = recent
        .iter()
        .find(|l| l.action_type == "ImportMaterials")
        .expect("应有导入审计记录");
    let payload = entry.payload_json.as_ref().expect("应有统计载荷");
    assert_eq!(payload["imported"].as_u64(), Some(1));
}

#[tokio::test]
async fn test_import_materials_空路径报参数错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env.import_api.import_materials("   ").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_import_materials_不支持的扩展名报参数错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let mut file = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .expect("无法创建临时文件");
    writeln!(file, "material_code,description").expect("写入失败");

    let err = env
        .import_api
        .import_materials(file.path().to_str().expect("路径非法"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ApiError::InvalidInput(_)),
        "不支持的扩展名应映射为参数错误: {}",
        err
    );
}
