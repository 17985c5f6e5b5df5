use crate::core::filter::{background_query, resolve};
use crate::core::sanitize::join_ids;
use crate::models::rest::MAX_PER_PAGE;
use crate::models::{EffectiveQuery, ListingConfig, RequestState, TermKind};

/// 显示分页时一次取回的页数
pub const PREVIEW_WINDOW_PAGES: usize = 5;

/// 预览一次取回的文章数量
pub fn preview_window(config: &ListingConfig, show_pagination: bool) -> usize {
    let window = if show_pagination {
        config.posts_per_page * PREVIEW_WINDOW_PAGES
    } else {
        config.posts_per_page
    };
    window.clamp(1, MAX_PER_PAGE)
}

/// 把筛选优先级规则翻译成 REST 集合路由，例如
/// `/wp/v2/posts?context=view&per_page=30&_embed&order=desc&categories=3`
pub fn preview_query(config: &ListingConfig, show_pagination: bool, selection: &RequestState) -> String {
    let query = resolve(config, selection);
    collection_route(&query, preview_window(config, show_pagination), config.post_offset)
}

/// 推导筛选候选项所需的背景文章路由，候选项直接来自配置时为 `None`
///
/// REST 单次最多返回 `MAX_PER_PAGE` 篇，候选项只从这些文章中推导。
pub fn background_route(config: &ListingConfig) -> Option<String> {
    background_query(config).map(|query| collection_route(&query, MAX_PER_PAGE, 0))
}

fn collection_route(query: &EffectiveQuery, per_page: usize, offset: usize) -> String {
    let mut params = vec![
        "context=view".to_string(),
        format!("per_page={}", per_page),
        "_embed".to_string(),
        format!("order={}", query.order.as_str()),
    ];
    if offset > 0 {
        params.push(format!("offset={}", offset));
    }
    for kind in [TermKind::Category, TermKind::Tag] {
        if let Some(ids) = query.constraint(kind) {
            params.push(format!("{}={}", kind.rest_param(), join_ids(ids)));
        }
    }

    format!("/wp/v2/{}?{}", query.post_type.rest_base(), params.join("&"))
}

/// 筛选候选项的 REST 路由
pub fn terms_query(kind: TermKind) -> String {
    format!("/wp/v2/{}?per_page={}&hide_empty=true", kind.rest_param(), MAX_PER_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilterType, PostType, SortOrder};
    use std::collections::BTreeSet;

    #[test]
    fn test_bulk_window_when_paginated() {
        let config = ListingConfig::default();
        assert_eq!(
            preview_query(&config, true, &RequestState::default()),
            "/wp/v2/posts?context=view&per_page=30&_embed&order=desc"
        );
        assert_eq!(
            preview_query(&config, false, &RequestState::default()),
            "/wp/v2/posts?context=view&per_page=6&_embed&order=desc"
        );
    }

    #[test]
    fn test_window_is_capped() {
        let config = ListingConfig {
            posts_per_page: 40,
            ..ListingConfig::default()
        };
        assert_eq!(preview_window(&config, true), 100);
    }

    #[test]
    fn test_configured_terms_and_offset() {
        let config = ListingConfig {
            posts_per_page: 3,
            post_type: PostType::Page,
            categories: BTreeSet::from([7, 3]),
            tags: BTreeSet::from([12]),
            sort_order: SortOrder::Asc,
            post_offset: 2,
            ..ListingConfig::default()
        };
        assert_eq!(
            preview_query(&config, false, &RequestState::default()),
            "/wp/v2/pages?context=view&per_page=3&_embed&order=asc&offset=2&categories=3,7&tags=12"
        );
    }

    #[test]
    fn test_nav_selection_replaces_configured_taxonomy() {
        let config = ListingConfig {
            categories: BTreeSet::from([3, 7]),
            tags: BTreeSet::from([12]),
            show_filter: true,
            ..ListingConfig::default()
        };
        let selection = RequestState::default().with_filter(9);
        assert_eq!(
            preview_query(&config, false, &selection),
            "/wp/v2/posts?context=view&per_page=6&_embed&order=desc&categories=9&tags=12"
        );

        let tag_config = ListingConfig {
            filter_type: FilterType::Tags,
            ..config
        };
        assert_eq!(
            preview_query(&tag_config, false, &selection),
            "/wp/v2/posts?context=view&per_page=6&_embed&order=desc&categories=3,7&tags=9"
        );
    }

    #[test]
    fn test_selection_ignored_without_filter_ui() {
        let config = ListingConfig::default();
        let selection = RequestState::default().with_filter(9);
        assert!(!preview_query(&config, false, &selection).contains("categories"));
    }

    #[test]
    fn test_background_route_keeps_other_taxonomy() {
        let config = ListingConfig {
            tags: BTreeSet::from([12]),
            post_offset: 3,
            show_filter: true,
            ..ListingConfig::default()
        };
        assert_eq!(
            background_route(&config).as_deref(),
            Some("/wp/v2/posts?context=view&per_page=100&_embed&order=desc&tags=12")
        );

        let configured = ListingConfig {
            categories: BTreeSet::from([4]),
            ..config
        };
        assert_eq!(background_route(&configured), None);
    }

    #[test]
    fn test_terms_query() {
        assert_eq!(terms_query(TermKind::Tag), "/wp/v2/tags?per_page=100&hide_empty=true");
    }
}
