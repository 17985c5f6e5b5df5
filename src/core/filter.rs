use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::models::{EffectiveQuery, FilterMode, ListingConfig, Post, PostType, RequestState, Term, TermKind};

/// 根据配置和请求状态解析最终查询条件
///
/// 优先级（从高到低）：
/// 1. 点击筛选（meta filter）：按其分类法项筛选，另一分类法的配置项作为背景限制；
/// 2. 导航筛选：`show_filter` 开启且选中了某一项时，按 `filter_type` 对应的分类法筛选，
///    另一分类法的配置项作为背景限制；
/// 3. 其余情况（"View all" 或未开启筛选）：直接使用配置的分类和标签。
///
/// 计数和取页都从这里的结果派生，两者的筛选逻辑不会分叉。
pub fn resolve(config: &ListingConfig, state: &RequestState) -> EffectiveQuery {
    let mut query = EffectiveQuery {
        post_type: config.post_type.clone(),
        mode: FilterMode::Unconstrained,
        category_in: None,
        tag_in: None,
        order: config.sort_order,
        limit: None,
        offset: 0,
    };

    if let Some(meta) = &state.meta_filter {
        constrain_with_background(&mut query, config, meta.kind, meta.id);
        query.mode = FilterMode::Meta;
    } else if let Some(selected) = state.selected_filter.filter(|_| config.show_filter) {
        constrain_with_background(&mut query, config, config.filter_type.term_kind(), selected);
        query.mode = FilterMode::Nav;
    } else {
        query.category_in = non_empty(&config.categories);
        query.tag_in = non_empty(&config.tags);
        if !query.is_unconstrained() {
            query.mode = FilterMode::Configured;
        }
    }

    debug!(
        "resolved listing query: mode={:?} categories={:?} tags={:?}",
        query.mode, query.category_in, query.tag_in
    );
    query
}

/// 按 `kind`/`id` 筛选，并把另一分类法的配置项作为背景限制
fn constrain_with_background(
    query: &mut EffectiveQuery,
    config: &ListingConfig,
    kind: TermKind,
    id: u64,
) {
    let selected = Some(BTreeSet::from([id]));
    match kind {
        TermKind::Category => {
            query.category_in = selected;
            query.tag_in = non_empty(&config.tags);
        }
        TermKind::Tag => {
            query.tag_in = selected;
            query.category_in = non_empty(&config.categories);
        }
    }
}

/// 配置集合中属于 `kind` 分类法的部分
pub fn configured_terms(config: &ListingConfig, kind: TermKind) -> &BTreeSet<u64> {
    match kind {
        TermKind::Category => &config.categories,
        TermKind::Tag => &config.tags,
    }
}

/// 是否显示导航筛选 UI（只有普通文章列表才有）
pub fn shows_nav_filter(config: &ListingConfig) -> bool {
    config.show_filter && config.post_type == PostType::Post
}

/// 筛选候选项需要从文章推导时使用的背景查询，`None` 表示直接用配置项
///
/// 背景查询只保留另一分类法的配置项，不分页。
pub fn background_query(config: &ListingConfig) -> Option<EffectiveQuery> {
    let kind = config.filter_type.term_kind();
    if !configured_terms(config, kind).is_empty() {
        return None;
    }
    let background = ListingConfig {
        show_filter: false,
        ..config.clone()
    };
    Some(resolve(&background, &RequestState::default()).for_count())
}

/// 导航筛选的候选项
///
/// 配置了筛选分类法的项时只提供这些项；否则取 `background_posts` 上出现过的项。
/// 只保留 `known` 中存在的项，按名称排序。
pub fn filter_candidates(config: &ListingConfig, known: Vec<Term>, background_posts: &[Post]) -> Vec<Term> {
    let kind = config.filter_type.term_kind();
    let configured = configured_terms(config, kind);
    let ids: BTreeSet<u64> = if configured.is_empty() {
        background_posts
            .iter()
            .flat_map(|post| post.term_ids(kind).iter().copied())
            .collect()
    } else {
        configured.clone()
    };

    let mut known: BTreeMap<u64, Term> = known.into_iter().map(|term| (term.id, term)).collect();
    let mut terms: Vec<Term> = ids
        .into_iter()
        .filter_map(|id| {
            let term = known.remove(&id);
            if term.is_none() {
                debug!("filter term {} not found in {:?} list", id, kind);
            }
            term
        })
        .collect();
    terms.sort_by(|a, b| a.name.cmp(&b.name));
    terms
}

fn non_empty(ids: &BTreeSet<u64>) -> Option<BTreeSet<u64>> {
    if ids.is_empty() {
        None
    } else {
        Some(ids.clone())
    }
}
