mod parser;
mod scanner;
mod types;

#[cfg(test)]
mod tests;

// 重新导出公共接口
pub use parser::{parse_table, parse_table_with_timeout};
pub use types::{DefaultKind, TableColumn, TableDefinition};
