use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 文章类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum PostType {
    #[default]
    Post,
    Page,
    Other(String),
}

impl From<String> for PostType {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "post" => PostType::Post,
            "page" => PostType::Page,
            other => PostType::Other(other.to_string()),
        }
    }
}

impl From<PostType> for String {
    fn from(value: PostType) -> Self {
        value.as_str().to_string()
    }
}

impl PostType {
    pub fn as_str(&self) -> &str {
        match self {
            PostType::Post => "post",
            PostType::Page => "page",
            PostType::Other(name) => name,
        }
    }

    /// REST 集合名称（`/wp/v2/{rest_base}`）
    pub fn rest_base(&self) -> &str {
        match self {
            PostType::Page => "pages",
            _ => "posts",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 排序方式（按日期）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// 无法识别的值一律视为降序
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// 分类法类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "category" | "categories" => Some(TermKind::Category),
            "tag" | "tags" | "post_tag" => Some(TermKind::Tag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TermKind::Category => "category",
            TermKind::Tag => "tag",
        }
    }

    /// REST 查询参数名
    pub fn rest_param(&self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Tag => "tags",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            TermKind::Category => TermKind::Tag,
            TermKind::Tag => TermKind::Category,
        }
    }
}

/// 导航筛选器使用的分类法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    Categories,
    Tags,
}

impl FilterType {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "tags" | "tag" => FilterType::Tags,
            _ => FilterType::Categories,
        }
    }

    pub fn term_kind(&self) -> TermKind {
        match self {
            FilterType::Categories => TermKind::Category,
            FilterType::Tags => TermKind::Tag,
        }
    }
}

/// 博客文章（只读外部实体）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub author: String,
    pub date: DateTime<Utc>,
    #[serde(default, alias = "type")]
    pub post_type: PostType,
    /// 特色图片地址
    #[serde(default)]
    pub featured_image: Option<String>,
    /// 手动摘要
    #[serde(default)]
    pub excerpt: String,
    /// 正文（可能包含区块注释或短代码）
    #[serde(default)]
    pub content: String,
    /// 构建器保存的旧版正文，正文为空时作为回退
    #[serde(default)]
    pub legacy_content: Option<String>,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
}

impl Post {
    pub fn term_ids(&self, kind: TermKind) -> &[u64] {
        match kind {
            TermKind::Category => &self.categories,
            TermKind::Tag => &self.tags,
        }
    }
}

/// 分类或标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_term_kind")]
    pub kind: TermKind,
    /// 该分类法项下的文章数量
    #[serde(default)]
    pub count: usize,
}

fn default_term_kind() -> TermKind {
    TermKind::Category
}

/// 点击文章上的分类/标签标签后激活的筛选
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFilter {
    pub kind: TermKind,
    pub id: u64,
    /// 显示名称
    pub name: String,
}

/// 单次请求的瞬时输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestState {
    pub current_page: usize,
    /// 导航筛选选中的分类法项，`None` 表示 "View all"
    pub selected_filter: Option<u64>,
    pub meta_filter: Option<MetaFilter>,
}

impl Default for RequestState {
    fn default() -> Self {
        Self {
            current_page: 1,
            selected_filter: None,
            meta_filter: None,
        }
    }
}

impl RequestState {
    pub fn page(current_page: usize) -> Self {
        Self {
            current_page: current_page.max(1),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, term_id: u64) -> Self {
        self.selected_filter = Some(term_id);
        self
    }

    pub fn with_meta_filter(mut self, kind: TermKind, id: u64, name: impl Into<String>) -> Self {
        self.meta_filter = Some(MetaFilter {
            kind,
            id,
            name: name.into(),
        });
        self
    }
}

/// 哪一种筛选模式生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Meta,
    Nav,
    Configured,
    Unconstrained,
}

/// 解析完所有优先级规则后的最终查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveQuery {
    pub post_type: PostType,
    pub mode: FilterMode,
    /// 文章属于其中任意一个分类即匹配
    pub category_in: Option<BTreeSet<u64>>,
    /// 文章带有其中任意一个标签即匹配
    pub tag_in: Option<BTreeSet<u64>>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl EffectiveQuery {
    pub fn constraint(&self, kind: TermKind) -> Option<&BTreeSet<u64>> {
        match kind {
            TermKind::Category => self.category_in.as_ref(),
            TermKind::Tag => self.tag_in.as_ref(),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.category_in.is_none() && self.tag_in.is_none()
    }

    /// 计数查询：同一筛选条件，不分页
    pub fn for_count(&self) -> Self {
        Self {
            limit: None,
            offset: 0,
            ..self.clone()
        }
    }

    /// 当前页查询：同一筛选条件，加上 limit/offset
    pub fn for_page(&self, limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
            ..self.clone()
        }
    }
}

/// 一页结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub total_count: usize,
    pub total_pages: usize,
    pub items: Vec<Post>,
}

impl PageResult {
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            total_pages: 0,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 分页序列中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Number(usize),
    Ellipsis,
}

impl Serialize for PageItem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageItem::Number(n) => serializer.serialize_u64(*n as u64),
            PageItem::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageItem::Number(n) => write!(f, "{}", n),
            PageItem::Ellipsis => f.write_str("..."),
        }
    }
}

/// 分页 UI 模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationModel {
    pub current: usize,
    pub total_pages: usize,
    pub items: Vec<PageItem>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// 筛选 UI 模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterModel {
    pub kind: TermKind,
    /// 可选的分类法项
    pub terms: Vec<Term>,
    /// 当前激活的导航筛选，`None` 表示 "View all"
    pub active: Option<u64>,
    pub meta: Option<MetaFilter>,
}

/// 编排器的输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub query: EffectiveQuery,
    pub page: PageResult,
    pub pagination: PaginationModel,
    pub filter: Option<FilterModel>,
}
