//! 字段类型判定与影子列转换
mod classify;
mod converter;

pub use classify::{
    is_array, is_array_ipv4, is_array_ipv6, is_ipv4, is_ipv6, is_string_array, needs_shim,
    normalize_type, reformat, type_check,
};
pub use converter::{FieldConverter, is_shim_column, new_converters};
