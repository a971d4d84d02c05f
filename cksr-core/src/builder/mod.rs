//! 生成迁移与回退所需的 SQL
mod add_column;
mod boundary;
mod statements;
mod view;

pub use add_column::{AddColumnBuilder, alias_expression};
pub use boundary::{Boundary, default_max_literal, fetch_boundary, parse_explicit_value, render_min_value};
pub use statements::{
    create_catalog_sql, drop_catalog_sql, drop_column_sql, drop_view_sql, on_cluster_clause,
    quote_ident, quote_literal, rename_table_sql,
};
pub use view::{ViewBuilder, ViewProjection, ViewSqlKind};
