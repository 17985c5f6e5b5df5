use std::collections::BTreeSet;

/// 解析逗号分隔的分类/标签 ID 列表
///
/// 空白、空项、带符号或非数字的项以及 0 都会被丢弃，前导零被规范化。
pub fn parse_id_list(raw: Option<&str>) -> BTreeSet<u64> {
    let Some(raw) = raw else {
        return BTreeSet::new();
    };

    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse::<u64>().ok())
        .filter(|id| *id > 0)
        .collect()
}

/// 清洗 ID 列表并重新拼接为逗号分隔字符串（升序、去重）
///
/// 没有有效 ID 时返回空字符串。结果可以再次传入本函数而保持不变。
pub fn sanitize_id_list(raw: Option<&str>) -> String {
    join_ids(&parse_id_list(raw))
}

pub fn join_ids(ids: &BTreeSet<u64>) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
