use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::error::ListingResult;
use crate::core::filter::{filter_candidates, shows_nav_filter};
use crate::core::pagination::{pagination_model, total_pages};
use crate::models::{ListingConfig, PaginationModel, Post, RequestState, Term};
use crate::preview::client::PostFetcher;
use crate::preview::query::{background_route, preview_query};

/// 预览的加载状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum PreviewState {
    Idle,
    Loading,
    Ready,
    Empty,
    Failed(String),
}

#[derive(Debug)]
struct Snapshot {
    state: PreviewState,
    posts: Vec<Post>,
}

/// 编辑器预览会话
///
/// 每次 [`refresh`](Self::refresh) 都会取消尚未完成的请求，只有最后发起的
/// 请求结果会被应用。分页在本地对取回的文章切片，不再请求网络。
pub struct PreviewSession<F: PostFetcher> {
    fetcher: Arc<F>,
    config: ListingConfig,
    show_pagination: bool,
    selection: Option<u64>,
    current_page: usize,
    generation: Arc<AtomicU64>,
    snapshot: Arc<Mutex<Snapshot>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<F: PostFetcher> PreviewSession<F> {
    pub fn new(fetcher: Arc<F>, config: ListingConfig, show_pagination: bool) -> Self {
        Self {
            fetcher,
            config,
            show_pagination,
            selection: None,
            current_page: 1,
            generation: Arc::new(AtomicU64::new(0)),
            snapshot: Arc::new(Mutex::new(Snapshot {
                state: PreviewState::Idle,
                posts: Vec::new(),
            })),
            in_flight: None,
        }
    }

    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 按新的筛选选择重新取数
    ///
    /// 选择变化时页码回到第 1 页。
    pub fn refresh(&mut self, selection: Option<u64>) {
        if selection != self.selection {
            self.selection = selection;
            self.current_page = 1;
        }

        if let Some(handle) = self.in_flight.take() {
            debug!("aborting in-flight preview request");
            handle.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.snapshot().state = PreviewState::Loading;

        let state = RequestState {
            selected_filter: selection,
            ..RequestState::default()
        };
        let route = preview_query(&self.config, self.show_pagination, &state);
        info!("Preview request #{}: {}", generation, route);

        let fetcher = Arc::clone(&self.fetcher);
        let latest = Arc::clone(&self.generation);
        let snapshot = Arc::clone(&self.snapshot);
        self.in_flight = Some(tokio::spawn(async move {
            let result = fetcher.fetch_posts(&route).await;

            // 较早的请求晚到时直接丢弃
            if latest.load(Ordering::SeqCst) != generation {
                debug!("discarding stale preview response #{}", generation);
                return;
            }

            let mut snapshot = snapshot.lock().unwrap_or_else(PoisonError::into_inner);
            match result {
                Ok(posts) if posts.is_empty() => {
                    snapshot.posts.clear();
                    snapshot.state = PreviewState::Empty;
                }
                Ok(posts) => {
                    snapshot.posts = posts;
                    snapshot.state = PreviewState::Ready;
                }
                Err(e) => {
                    warn!("预览请求失败: {}", e);
                    snapshot.posts.clear();
                    snapshot.state = PreviewState::Failed(e.to_string());
                }
            }
        }));
    }

    /// 等待当前请求完成
    pub async fn settle(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                debug!("preview task ended early: {}", e);
            }
        }
    }

    pub fn state(&self) -> PreviewState {
        self.snapshot().state.clone()
    }

    pub fn selection(&self) -> Option<u64> {
        self.selection
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.snapshot().posts.len(), self.config.posts_per_page)
    }

    /// 切换到第 `page` 页（超出范围时取最近的有效页），不发起请求
    pub fn set_page(&mut self, page: usize) -> Vec<Post> {
        self.current_page = page.clamp(1, self.total_pages().max(1));
        self.current_posts()
    }

    /// 当前页的文章
    pub fn current_posts(&self) -> Vec<Post> {
        let per_page = self.config.posts_per_page;
        self.snapshot()
            .posts
            .iter()
            .skip((self.current_page - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect()
    }

    pub fn pagination(&self) -> PaginationModel {
        pagination_model(self.current_page, self.total_pages())
    }

    /// 筛选 UI 的候选项，和服务端使用同一条规则（仅在显示筛选时请求）
    pub async fn load_terms(&self) -> ListingResult<Vec<Term>> {
        if !shows_nav_filter(&self.config) {
            return Ok(Vec::new());
        }
        let known = self.fetcher.fetch_terms(self.config.filter_type.term_kind()).await?;
        let background = match background_route(&self.config) {
            Some(route) => self.fetcher.fetch_posts(&route).await?,
            None => Vec::new(),
        };
        Ok(filter_candidates(&self.config, known, &background))
    }
}

impl<F: PostFetcher> Drop for PreviewSession<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ListingError;
    use crate::models::{PageItem, PostType, TermKind};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn post(id: u64) -> Post {
        Post {
            id,
            title: format!("Post {}", id),
            permalink: format!("/post-{}/", id),
            author: String::new(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(id as i64),
            post_type: PostType::Post,
            featured_image: None,
            excerpt: String::new(),
            content: String::new(),
            legacy_content: None,
            categories: vec![id % 2 + 1],
            tags: Vec::new(),
        }
    }

    fn term(id: u64, name: &str, kind: TermKind) -> Term {
        Term {
            id,
            name: name.to_string(),
            kind,
            count: 3,
        }
    }

    /// 按路由返回固定结果；带 `categories=1` 的请求故意变慢
    #[derive(Default)]
    struct FakeFetcher {
        routes: Mutex<Vec<String>>,
        fail: bool,
        empty: bool,
    }

    impl FakeFetcher {
        fn routes(&self) -> Vec<String> {
            self.routes.lock().unwrap().clone()
        }
    }

    impl PostFetcher for FakeFetcher {
        async fn fetch_posts(&self, route: &str) -> ListingResult<Vec<Post>> {
            self.routes.lock().unwrap().push(route.to_string());
            if route.contains("categories=1") {
                tokio::time::sleep(Duration::from_millis(200)).await;
                return Ok(vec![post(100)]);
            }
            if self.fail {
                return Err(ListingError::FetchError {
                    message: "503 Service Unavailable".to_string(),
                });
            }
            if self.empty {
                return Ok(Vec::new());
            }
            Ok((1..=12).map(post).collect())
        }

        async fn fetch_terms(&self, kind: TermKind) -> ListingResult<Vec<Term>> {
            Ok(vec![term(1, "News", kind), term(2, "Guides", kind), term(3, "Events", kind)])
        }
    }

    fn config() -> ListingConfig {
        ListingConfig {
            posts_per_page: 5,
            show_filter: true,
            ..ListingConfig::default()
        }
    }

    fn ids(posts: &[Post]) -> Vec<u64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_local_pagination_without_refetch() {
        let fetcher = Arc::new(FakeFetcher::default());
        let mut session = PreviewSession::new(Arc::clone(&fetcher), config(), true);
        assert_eq!(session.state(), PreviewState::Idle);

        session.refresh(None);
        session.settle().await;
        assert_eq!(session.state(), PreviewState::Ready);
        assert_eq!(session.total_pages(), 3);
        assert_eq!(ids(&session.current_posts()), vec![1, 2, 3, 4, 5]);

        assert_eq!(ids(&session.set_page(3)), vec![11, 12]);
        assert_eq!(session.set_page(9).len(), 2);
        assert_eq!(session.current_page(), 3);
        assert_eq!(
            session.pagination().items,
            vec![PageItem::Number(1), PageItem::Number(2), PageItem::Number(3)]
        );

        assert_eq!(fetcher.routes().len(), 1);
        assert!(fetcher.routes()[0].contains("per_page=25"));
    }

    #[tokio::test]
    async fn test_last_started_request_wins() {
        let fetcher = Arc::new(FakeFetcher::default());
        let mut session = PreviewSession::new(Arc::clone(&fetcher), config(), false);

        session.refresh(Some(1));
        tokio::task::yield_now().await;
        session.refresh(None);
        session.settle().await;

        // 等慢请求的时间窗口过去，确认它没有覆盖结果
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(session.state(), PreviewState::Ready);
        assert_eq!(session.selection(), None);
        assert_eq!(ids(&session.current_posts()), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_selection_change_resets_page() {
        let fetcher = Arc::new(FakeFetcher::default());
        let mut session = PreviewSession::new(fetcher, config(), true);

        session.refresh(None);
        session.settle().await;
        session.set_page(2);
        assert_eq!(session.current_page(), 2);

        session.refresh(None);
        assert_eq!(session.current_page(), 2);

        session.refresh(Some(4));
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.state(), PreviewState::Loading);
        session.settle().await;
        assert_eq!(session.state(), PreviewState::Ready);
    }

    #[tokio::test]
    async fn test_failure_is_reported_without_retry() {
        let fetcher = Arc::new(FakeFetcher {
            fail: true,
            ..FakeFetcher::default()
        });
        let mut session = PreviewSession::new(Arc::clone(&fetcher), config(), true);

        session.refresh(None);
        session.settle().await;
        assert_eq!(
            session.state(),
            PreviewState::Failed("请求失败: 503 Service Unavailable".to_string())
        );
        assert!(session.current_posts().is_empty());
        assert_eq!(fetcher.routes().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let fetcher = Arc::new(FakeFetcher {
            empty: true,
            ..FakeFetcher::default()
        });
        let mut session = PreviewSession::new(fetcher, config(), true);
        session.refresh(None);
        session.settle().await;
        assert_eq!(session.state(), PreviewState::Empty);
        assert_eq!(session.total_pages(), 0);
        assert!(session.pagination().items.is_empty());
    }

    #[tokio::test]
    async fn test_terms_only_with_filter_ui() {
        let fetcher = Arc::new(FakeFetcher::default());
        let session = PreviewSession::new(Arc::clone(&fetcher), config(), true);
        let names: Vec<String> = session.load_terms().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Guides", "News"]);
        assert!(fetcher.routes()[0].contains("per_page=100"));

        let plain = PreviewSession::new(
            Arc::clone(&fetcher),
            ListingConfig {
                show_filter: false,
                ..config()
            },
            true,
        );
        assert!(plain.load_terms().await.unwrap().is_empty());

        let pages = PreviewSession::new(
            fetcher,
            ListingConfig {
                post_type: PostType::Page,
                ..config()
            },
            true,
        );
        assert!(pages.load_terms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_terms_limited_to_configured_categories() {
        let fetcher = Arc::new(FakeFetcher::default());
        let session = PreviewSession::new(
            Arc::clone(&fetcher),
            ListingConfig {
                categories: BTreeSet::from([1, 3]),
                ..config()
            },
            true,
        );
        let names: Vec<String> = session.load_terms().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Events", "News"]);
        assert!(fetcher.routes().is_empty());
    }
}
