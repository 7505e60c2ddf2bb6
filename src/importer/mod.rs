// ==========================================
// 仓储管理系统 - 导入层
// ==========================================
// 职责: 外部物料主数据导入
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod file_parser;
pub mod material_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use material_importer::{
    ImportViolation, MaterialImport, MaterialImportReport, MaterialImporter,
};
