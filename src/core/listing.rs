use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::error::ListingResult;
use crate::core::filter::{background_query, filter_candidates, resolve, shows_nav_filter};
use crate::core::pagination::{pagination_model, total_pages};
use crate::core::repository::PostRepository;
use crate::models::{
    EffectiveQuery, FilterModel, ListingConfig, ListingPage, PageResult, RequestState, Term,
    TermKind,
};

/// 分类法项 id 到显示名称的映射
pub type TermNames = HashMap<(TermKind, u64), String>;

/// 列表编排器：解析筛选、计数、取页，并构建分页和筛选 UI 模型
pub struct ListingEngine<R: PostRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: PostRepository + ?Sized> Clone for ListingEngine<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: PostRepository + ?Sized> ListingEngine<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// 构建一页列表
    ///
    /// 页码超出范围时返回空列表而不是错误；数据源出错时记录警告并按
    /// "没有文章" 处理。
    pub fn build_page(&self, config: &ListingConfig, state: &RequestState) -> ListingPage {
        let current_page = state.current_page.max(1);
        let query = resolve(config, state);

        let page = match self.load_page(config, &query, current_page) {
            Ok(page) => page,
            Err(e) => {
                warn!("文章查询失败，按无结果处理: {}", e);
                PageResult::empty()
            }
        };

        info!(
            "Listing page {}/{}: {} of {} posts",
            current_page,
            page.total_pages,
            page.items.len(),
            page.total_count
        );

        let filter = if shows_nav_filter(config) {
            Some(self.filter_model(config, state))
        } else {
            None
        };

        ListingPage {
            pagination: pagination_model(current_page, page.total_pages),
            query: query.for_page(config.posts_per_page, page_offset(config, current_page)),
            page,
            filter,
        }
    }

    fn load_page(
        &self,
        config: &ListingConfig,
        query: &EffectiveQuery,
        current_page: usize,
    ) -> ListingResult<PageResult> {
        let total_count = self.repository.count(&query.for_count())?;
        let total_pages = total_pages(total_count, config.posts_per_page);

        let page_query = query.for_page(config.posts_per_page, page_offset(config, current_page));
        let mut items = self.repository.fetch(&page_query)?;
        items.truncate(config.posts_per_page);

        Ok(PageResult {
            total_count,
            total_pages,
            items,
        })
    }

    /// 筛选 UI 模型，候选项规则见 [`filter_candidates`]
    pub fn filter_model(&self, config: &ListingConfig, state: &RequestState) -> FilterModel {
        let kind = config.filter_type.term_kind();
        let terms = match self.candidate_terms(config, kind) {
            Ok(terms) => terms,
            Err(e) => {
                warn!("获取筛选项失败: {}", e);
                Vec::new()
            }
        };

        FilterModel {
            kind,
            terms,
            active: state.selected_filter.filter(|_| state.meta_filter.is_none()),
            meta: state.meta_filter.clone(),
        }
    }

    /// 文章标签展示用的名称表，获取失败时为空
    pub fn term_names(&self) -> TermNames {
        let mut names = TermNames::new();
        for kind in [TermKind::Category, TermKind::Tag] {
            match self.repository.terms(kind, false) {
                Ok(terms) => names.extend(terms.into_iter().map(|term| ((kind, term.id), term.name))),
                Err(e) => warn!("获取 {} 名称失败: {}", kind.as_str(), e),
            }
        }
        names
    }

    fn candidate_terms(&self, config: &ListingConfig, kind: TermKind) -> ListingResult<Vec<Term>> {
        let known = self.repository.terms(kind, true)?;
        let background = match background_query(config) {
            Some(query) => self.repository.fetch(&query)?,
            None => Vec::new(),
        };
        Ok(filter_candidates(config, known, &background))
    }
}

/// offset = 配置的偏移 + (页码 - 1) * 每页数量
///
/// 溢出时饱和到 `usize::MAX`，超大页码因此落在结果末尾之后得到空页。
pub fn page_offset(config: &ListingConfig, current_page: usize) -> usize {
    current_page
        .saturating_sub(1)
        .saturating_mul(config.posts_per_page)
        .saturating_add(config.post_offset)
}
