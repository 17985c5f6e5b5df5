use serde::{Deserialize, Serialize};

use crate::models::types::{MetaFilter, RequestState, TermKind};

/// 页码参数
pub const PAGE_PARAM: &str = "page";
/// 导航筛选参数
pub const FILTER_PARAM: &str = "filter";
/// 点击筛选参数
pub const META_FILTER_PARAM: &str = "meta_filter";
pub const META_TYPE_PARAM: &str = "meta_type";
pub const META_NAME_PARAM: &str = "meta_name";

/// 所有点击筛选参数，清除筛选时一并去掉
pub const META_PARAMS: [&str; 3] = [META_FILTER_PARAM, META_TYPE_PARAM, META_NAME_PARAM];

/// 前端页面的原始查询参数
///
/// 所有字段都按字符串接收，无效值在转换时静默忽略。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestParams {
    pub page: Option<String>,
    pub filter: Option<String>,
    pub meta_filter: Option<String>,
    pub meta_type: Option<String>,
    pub meta_name: Option<String>,
}

impl RequestParams {
    pub fn into_state(self) -> RequestState {
        let current_page = self
            .page
            .as_deref()
            .and_then(parse_positive)
            .unwrap_or(1);

        // "all" 或无效值都表示 View all
        let selected_filter = self.filter.as_deref().and_then(parse_positive).map(|id| id as u64);

        let meta_filter = match (
            self.meta_filter.as_deref().and_then(parse_positive),
            self.meta_type.as_deref().and_then(TermKind::parse),
        ) {
            (Some(id), Some(kind)) => Some(MetaFilter {
                kind,
                id: id as u64,
                name: self
                    .meta_name
                    .map(|name| name.trim().to_string())
                    .unwrap_or_default(),
            }),
            _ => None,
        };

        RequestState {
            current_page,
            selected_filter,
            meta_filter,
        }
    }
}

impl From<RequestParams> for RequestState {
    fn from(params: RequestParams) -> Self {
        params.into_state()
    }
}

fn parse_positive(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        let mut params = RequestParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "page" => params.page = value,
                "filter" => params.filter = value,
                "meta_filter" => params.meta_filter = value,
                "meta_type" => params.meta_type = value,
                "meta_name" => params.meta_name = value,
                _ => {}
            }
        }
        params
    }

    #[test]
    fn test_defaults() {
        let state = RequestParams::default().into_state();
        assert_eq!(state, RequestState::default());
    }

    #[test]
    fn test_invalid_page_becomes_first_page() {
        for raw in ["0", "-3", "abc", ""] {
            assert_eq!(params(&[("page", raw)]).into_state().current_page, 1);
        }
        assert_eq!(params(&[("page", "4")]).into_state().current_page, 4);
    }

    #[test]
    fn test_filter_all_is_view_all() {
        assert_eq!(params(&[("filter", "all")]).into_state().selected_filter, None);
        assert_eq!(params(&[("filter", "12")]).into_state().selected_filter, Some(12));
    }

    #[test]
    fn test_meta_filter_requires_id_and_kind() {
        let state = params(&[("meta_filter", "5"), ("meta_type", "tag"), ("meta_name", " Rust ")]).into_state();
        assert_eq!(
            state.meta_filter,
            Some(MetaFilter {
                kind: TermKind::Tag,
                id: 5,
                name: "Rust".to_string(),
            })
        );

        let state = params(&[("meta_filter", "5"), ("meta_type", "author")]).into_state();
        assert_eq!(state.meta_filter, None);
        let state = params(&[("meta_type", "category")]).into_state();
        assert_eq!(state.meta_filter, None);
    }
}
