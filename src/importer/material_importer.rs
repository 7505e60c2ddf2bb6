// ==========================================
// 仓储管理系统 - 物料主数据导入器
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 映射校验 → 去重 → 落库 → 报告
// 输入: Excel (.xlsx/.xls) / CSV (.csv)，列: material_code, description
// 输出: wms_material + MaterialImportReport
// ==========================================

use crate::domain::material::Material;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::repository::MaterialRepository;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

// ==========================================
// MaterialImport Trait - 导入接口
// ==========================================
// 用途: API 层与导入实现之间的接缝
// 实现者: MaterialImporter
#[async_trait]
pub trait MaterialImport: Send + Sync {
    /// 从文件导入物料主数据
    ///
    /// # 参数
    /// - file_path: 文件路径（.csv / .xlsx / .xls）
    ///
    /// # 返回
    /// - Ok(MaterialImportReport): 逐行结果统计
    /// - Err: 文件读取错误、数据库错误
    async fn import_from_file(&self, file_path: &Path) -> ImportResult<MaterialImportReport>;
}

// ==========================================
// MaterialImportReport - 导入结果报告
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct MaterialImportReport {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped_existing: usize,
    pub rejected: usize,
    pub skipped_codes: Vec<u64>,
    pub violations: Vec<ImportViolation>,
    pub elapsed_ms: u64,
}

/// 单行拒绝记录（行号从 2 起算，第 1 行为表头）
#[derive(Debug, Clone, Serialize)]
pub struct ImportViolation {
    pub row_number: usize,
    pub reason: String,
}

// ==========================================
// MaterialImporter - 物料主数据导入器
// ==========================================
pub struct MaterialImporter {
    material_repo: Arc<MaterialRepository>,
}

impl MaterialImporter {
    /// 创建新的 MaterialImporter 实例
    ///
    /// # 参数
    /// - material_repo: 物料主数据仓储
    pub fn new(material_repo: Arc<MaterialRepository>) -> Self {
        Self { material_repo }
    }

    /// 同步执行完整导入流程（在 spawn_blocking 中调用）
    fn run_import(repo: &MaterialRepository, path: &Path) -> ImportResult<MaterialImportReport> {
        let start_time = Instant::now();

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let parser = UniversalFileParser;
        let raw_rows = parser.parse(path)?;
        let total_rows = raw_rows.len();
        info!(total_rows = total_rows, "文件解析完成");

        // === 步骤 2: 字段映射与校验 ===
        debug!("步骤 2: 字段映射");
        let mut candidates: Vec<Material> = Vec::new();
        let mut violations: Vec<ImportViolation> = Vec::new();
        let mut seen_codes: HashSet<u64> = HashSet::new();

        for (idx, row) in raw_rows.into_iter().enumerate() {
            // 行号按文件行计: 表头占第 1 行
            let row_number = idx + 2;

            match Self::map_row(&row) {
                Ok(material) => {
                    if !seen_codes.insert(material.code) {
                        violations.push(ImportViolation {
                            row_number,
                            reason: format!("物料编码 {} 在文件内重复", material.code),
                        });
                        continue;
                    }
                    candidates.push(material);
                }
                Err(reason) => violations.push(ImportViolation { row_number, reason }),
            }
        }
        info!(
            mapped = candidates.len(),
            rejected = violations.len(),
            "字段映射完成"
        );

        // === 步骤 3: 跳过库中已有编码（物料不可变更，不做覆盖） ===
        debug!("步骤 3: 去重");
        let codes: Vec<u64> = candidates.iter().map(|m| m.code).collect();
        let existing: HashSet<u64> = repo.batch_check_exists(&codes)?.into_iter().collect();

        // === 步骤 4: 落库 ===
        debug!("步骤 4: 落库");
        let mut imported = 0usize;
        let mut skipped_codes: Vec<u64> = Vec::new();

        for material in candidates {
            if existing.contains(&material.code) {
                skipped_codes.push(material.code);
                continue;
            }
            repo.insert(&material)?;
            imported += 1;
        }

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            imported = imported,
            skipped = skipped_codes.len(),
            rejected = violations.len(),
            elapsed_ms = elapsed_ms,
            "物料导入完成"
        );

        Ok(MaterialImportReport {
            total_rows,
            imported,
            skipped_existing: skipped_codes.len(),
            rejected: violations.len(),
            skipped_codes,
            violations,
            elapsed_ms,
        })
    }

    /// 将原始行映射为 Material
    ///
    /// # 返回
    /// - Err(String): 拒绝原因（进入报告，不中断导入）
    fn map_row(row: &HashMap<String, String>) -> Result<Material, String> {
        let code_raw = Self::get_field(row, "material_code")
            .ok_or_else(|| "material_code 列缺失或为空".to_string())?;

        let code: u64 = code_raw
            .parse()
            .map_err(|_| format!("物料编码 {} 无法解析为正整数", code_raw))?;

        if code == 0 {
            return Err("物料编码不能为 0".to_string());
        }

        let description = Self::get_field(row, "description")
            .ok_or_else(|| "description 列缺失或为空".to_string())?;

        Ok(Material::new(code, description))
    }

    /// 列名不区分大小写取值，空串视为缺失
    fn get_field(row: &HashMap<String, String>, name: &str) -> Option<String> {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl MaterialImport for MaterialImporter {
    /// 从文件导入物料主数据
    ///
    /// # 说明
    /// 文件解析与落库为阻塞操作，整体通过 spawn_blocking 下放，
    /// 数据库写入仍为同步串行。
    #[instrument(skip(self, file_path))]
    async fn import_from_file(&self, file_path: &Path) -> ImportResult<MaterialImportReport> {
        let repo = Arc::clone(&self.material_repo);
        let path = file_path.to_path_buf();

        info!(file_path = %path.display(), "开始导入物料主数据");

        tokio::task::spawn_blocking(move || Self::run_import(&repo, &path))
            .await
            .map_err(|e| ImportError::InternalError(format!("导入任务执行失败: {}", e)))?
    }
}
