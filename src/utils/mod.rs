use chrono::{DateTime, Utc};
use url::Url;

/// 解析相对地址时使用的占位主机
const PLACEHOLDER_ORIGIN: &str = "http://turbo-blog.local";

/// 确保路径以斜杠开头
pub fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// 确保路径以斜杠结尾
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// 在地址上设置查询参数（同名参数先被移除）
pub fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let keys: Vec<&str> = params.iter().map(|(key, _)| *key).collect();
    rewrite_query(base, &keys, params)
}

/// 从地址上移除查询参数
pub fn without_query(base: &str, keys: &[&str]) -> String {
    rewrite_query(base, keys, &[])
}

fn rewrite_query(base: &str, remove: &[&str], add: &[(&str, &str)]) -> String {
    let (mut url, relative) = match Url::parse(base) {
        Ok(url) => (url, false),
        Err(_) => match Url::parse(PLACEHOLDER_ORIGIN).and_then(|origin| origin.join(&ensure_leading_slash(base))) {
            Ok(url) => (url, true),
            Err(_) => return base.to_string(),
        },
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !remove.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() && add.is_empty() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        for (key, value) in add {
            pairs.append_pair(key, value);
        }
    }

    if relative {
        match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        }
    } else {
        url.to_string()
    }
}

/// 文章日期的显示格式，例如 "March 5, 2024"
pub fn display_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_with_query_replaces_existing() {
        assert_eq!(with_query("/blog/?page=2&x=1", &[("page", "3")]), "/blog/?x=1&page=3");
        assert_eq!(with_query("/", &[("filter", "7")]), "/?filter=7");
    }

    #[test]
    fn test_without_query() {
        assert_eq!(
            without_query("/?meta_filter=5&meta_type=tag&page=2&filter=3", &["meta_filter", "meta_type", "page"]),
            "/?filter=3"
        );
        assert_eq!(without_query("/blog?page=2", &["page"]), "/blog");
    }

    #[test]
    fn test_absolute_urls_keep_origin() {
        assert_eq!(
            with_query("https://example.com/news", &[("page", "2")]),
            "https://example.com/news?page=2"
        );
    }

    #[test]
    fn test_query_values_are_encoded() {
        assert_eq!(with_query("/", &[("meta_name", "Tips & Tricks")]), "/?meta_name=Tips+%26+Tricks");
    }

    #[test]
    fn test_display_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        assert_eq!(display_date(&date), "March 5, 2024");
    }
}
