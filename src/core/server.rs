use anyhow::Result;
use axum::{
    extract::{OriginalUri, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::core::error::ListingError;
use crate::core::listing::ListingEngine;
use crate::core::pagination::total_pages;
use crate::core::repository::PostRepository;
use crate::core::sanitize::parse_id_list;
use crate::models::rest::{MAX_PER_PAGE, TOTAL_HEADER, TOTAL_PAGES_HEADER};
use crate::models::{
    Config, DisplayOptions, EffectiveQuery, FilterMode, ListingConfig, ListingPage, PostType, RequestParams,
    RestPost, RestTerm, SortOrder, TermKind,
};
use crate::theme::{ListingRenderer, RenderOptions};

/// REST 集合默认每页数量
const DEFAULT_PER_PAGE: usize = 10;

/// 处理器共享的状态
#[derive(Clone)]
pub struct AppState {
    engine: ListingEngine<dyn PostRepository>,
    renderer: Arc<ListingRenderer>,
    listing: Arc<ListingConfig>,
    display: Arc<DisplayOptions>,
    title: Arc<str>,
}

/// HTTP 服务器
pub struct Server {
    state: AppState,
    /// 监听地址
    host: String,
    /// 端口
    port: u16,
}

impl Server {
    /// 创建新的服务器
    pub fn new(config: &Config, repository: Arc<dyn PostRepository>) -> Result<Self> {
        let state = AppState {
            engine: ListingEngine::new(repository),
            renderer: Arc::new(ListingRenderer::new()?),
            listing: Arc::new(config.module.listing_config()),
            display: Arc::new(config.module.display_options()),
            title: Arc::from(config.title.as_str()),
        };

        Ok(Self {
            state,
            host: config.server.host.clone(),
            port: config.server.port,
        })
    }

    /// 覆盖配置文件中的端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/api/listing", get(api_listing))
            .route("/wp/v2/posts", get(rest_posts))
            .route("/wp/v2/pages", get(rest_pages))
            .route("/wp/v2/categories", get(rest_categories))
            .route("/wp/v2/tags", get(rest_tags))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;
        info!("Server started at http://localhost:{}", self.port);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("无法监听退出信号: {}", e);
    }
}

/// 处理器错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, message: String },
    Internal(ListingError),
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest { code, message } => {
                warn!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, code, message)
            }
            ApiError::Internal(e) => {
                error!("请求处理失败: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string())
            }
        };
        (status, Json(json!({ "code": code, "message": message }))).into_response()
    }
}

async fn index(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<RequestParams>,
) -> Result<Html<String>, ApiError> {
    let request = params.into_state();
    let page = state.engine.build_page(&state.listing, &request);
    let term_names = state.engine.term_names();

    let current_url = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let options = RenderOptions {
        display: &state.display,
        excerpt_length: state.listing.excerpt_length,
        current_url,
        term_names: &term_names,
    };

    let fragment = state.renderer.render(&page, &request, &options)?;
    Ok(Html(state.renderer.render_document(&state.title, &fragment)?))
}

async fn api_listing(State(state): State<AppState>, Query(params): Query<RequestParams>) -> Json<ListingPage> {
    Json(state.engine.build_page(&state.listing, &params.into_state()))
}

/// REST 文章集合的查询参数，未知参数（`context`、`_embed` 等）忽略
#[derive(Debug, Default, Deserialize)]
pub struct CollectionParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub offset: Option<usize>,
    pub order: Option<String>,
    pub categories: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TermParams {
    pub per_page: Option<usize>,
    pub hide_empty: Option<bool>,
}

async fn rest_posts(state: State<AppState>, params: Query<CollectionParams>) -> Result<Response, ApiError> {
    collection(state, params, PostType::Post)
}

async fn rest_pages(state: State<AppState>, params: Query<CollectionParams>) -> Result<Response, ApiError> {
    collection(state, params, PostType::Page)
}

async fn rest_categories(state: State<AppState>, params: Query<TermParams>) -> Result<Response, ApiError> {
    term_collection(state, params, TermKind::Category)
}

async fn rest_tags(state: State<AppState>, params: Query<TermParams>) -> Result<Response, ApiError> {
    term_collection(state, params, TermKind::Tag)
}

fn per_page(value: Option<usize>) -> Result<usize, ApiError> {
    match value.unwrap_or(DEFAULT_PER_PAGE) {
        n if (1..=MAX_PER_PAGE).contains(&n) => Ok(n),
        n => Err(ApiError::BadRequest {
            code: "rest_invalid_param",
            message: format!("per_page must be between 1 and {}, got {}", MAX_PER_PAGE, n),
        }),
    }
}

fn collection(
    State(state): State<AppState>,
    Query(params): Query<CollectionParams>,
    post_type: PostType,
) -> Result<Response, ApiError> {
    let per_page = per_page(params.per_page)?;
    let page = params.page.unwrap_or(1).max(1);

    let categories = parse_id_list(params.categories.as_deref());
    let tags = parse_id_list(params.tags.as_deref());
    let query = EffectiveQuery {
        post_type,
        mode: if categories.is_empty() && tags.is_empty() {
            FilterMode::Unconstrained
        } else {
            FilterMode::Configured
        },
        category_in: (!categories.is_empty()).then_some(categories),
        tag_in: (!tags.is_empty()).then_some(tags),
        order: params.order.as_deref().map_or(SortOrder::Desc, SortOrder::parse),
        limit: None,
        offset: 0,
    };

    let repository = state.engine.repository();
    let total = repository.count(&query)?;
    let pages = total_pages(total, per_page);
    if total > 0 && page > pages {
        return Err(ApiError::BadRequest {
            code: "rest_post_invalid_page_number",
            message: format!("page {} is larger than the number of pages ({})", page, pages),
        });
    }

    // offset 优先于 page
    let offset = match params.offset {
        Some(offset) => offset,
        None => (page - 1).checked_mul(per_page).ok_or_else(|| ApiError::BadRequest {
            code: "rest_post_invalid_page_number",
            message: format!("page {} is out of range", page),
        })?,
    };
    let posts: Vec<RestPost> = repository
        .fetch(&query.for_page(per_page, offset))?
        .iter()
        .map(RestPost::from)
        .collect();

    Ok((
        [(TOTAL_HEADER, total.to_string()), (TOTAL_PAGES_HEADER, pages.to_string())],
        Json(posts),
    )
        .into_response())
}

fn term_collection(
    State(state): State<AppState>,
    Query(params): Query<TermParams>,
    kind: TermKind,
) -> Result<Response, ApiError> {
    let per_page = per_page(params.per_page)?;
    let terms = state
        .engine
        .repository()
        .terms(kind, params.hide_empty.unwrap_or(false))?;
    let total = terms.len();

    let body: Vec<RestTerm> = terms.iter().take(per_page).map(RestTerm::from).collect();
    Ok((
        [
            (TOTAL_HEADER, total.to_string()),
            (TOTAL_PAGES_HEADER, total_pages(total, per_page).to_string()),
        ],
        Json(body),
    )
        .into_response())
}
