use crate::error::{CksrError, Result};

const WRAPPERS: [&str; 2] = ["nullable(", "lowcardinality("];

pub fn is_array(data_type: &str) -> bool {
    data_type.trim().to_ascii_lowercase().starts_with("array(")
}

pub fn is_string_array(data_type: &str) -> bool {
    data_type.trim().eq_ignore_ascii_case("array(string)")
}

pub fn is_ipv4(data_type: &str) -> bool {
    data_type.trim().eq_ignore_ascii_case("ipv4")
}

pub fn is_ipv6(data_type: &str) -> bool {
    data_type.trim().eq_ignore_ascii_case("ipv6")
}

pub fn is_array_ipv4(data_type: &str) -> bool {
    data_type.trim().eq_ignore_ascii_case("array(ipv4)")
}

pub fn is_array_ipv6(data_type: &str) -> bool {
    data_type.trim().eq_ignore_ascii_case("array(ipv6)")
}

/// 数组与 IP 类型需要影子列
pub fn needs_shim(data_type: &str) -> bool {
    is_array(data_type) || is_ipv4(data_type) || is_ipv6(data_type)
}

/// 剥掉 Nullable/LowCardinality 包装，提取最内层类型
///
/// `Array(X)` 保持数组形式，只剥 X 的包装；嵌套数组返回空串表示不支持。
pub fn reformat(data_type: &str) -> String {
    let inner = unwrap_wrappers(data_type.trim());
    if is_array(inner) && inner.ends_with(')') {
        let element = unwrap_wrappers(inner["array(".len()..inner.len() - 1].trim());
        if is_array(element) {
            return String::new();
        }
        return format!("Array({element})");
    }
    inner.to_string()
}

fn unwrap_wrappers(mut data_type: &str) -> &str {
    'outer: loop {
        let lower = data_type.to_ascii_lowercase();
        for wrapper in WRAPPERS {
            if lower.starts_with(wrapper) && lower.ends_with(')') {
                data_type = data_type[wrapper.len()..data_type.len() - 1].trim();
                continue 'outer;
            }
        }
        return data_type;
    }
}

/// 检查已规整的类型是否可迁移，失败时返回不支持的类型名
pub fn type_check(data_type: &str) -> std::result::Result<(), String> {
    let lower = data_type.trim().to_ascii_lowercase();
    if let Some(element) = lower.strip_prefix("array(").and_then(|t| t.strip_suffix(')')) {
        return if is_supported_scalar(element.trim()) {
            Ok(())
        } else {
            Err(data_type.to_string())
        };
    }
    if is_supported_scalar(&lower) {
        Ok(())
    } else {
        Err(data_type.to_string())
    }
}

fn is_supported_scalar(lower: &str) -> bool {
    if let Some(bits) = lower.strip_prefix("uint").or_else(|| lower.strip_prefix("int")) {
        return bits.chars().all(|c| c.is_ascii_digit());
    }
    matches!(
        lower,
        "float32" | "float64" | "string" | "datetime" | "ipv4" | "ipv6" | "bool"
    )
}

/// reformat + type_check，返回规整后的类型
pub fn normalize_type(field: &str, data_type: &str) -> Result<String> {
    let normalized = reformat(data_type);
    if normalized.is_empty() {
        return Err(CksrError::UnsupportedType {
            field: field.to_string(),
            type_name: data_type.to_string(),
        });
    }
    type_check(&normalized).map_err(|type_name| CksrError::UnsupportedType {
        field: field.to_string(),
        type_name,
    })?;
    Ok(normalized)
}
