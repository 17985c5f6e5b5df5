use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::core::error::{ListingError, ListingResult};
use crate::models::{EffectiveQuery, Post, SortOrder, Term, TermKind};

/// 文章数据来源
///
/// 计数和取页必须使用同一个 [`EffectiveQuery`]，实现方只负责执行。
pub trait PostRepository: Send + Sync {
    /// 满足查询条件的文章总数（忽略 limit/offset）
    fn count(&self, query: &EffectiveQuery) -> ListingResult<usize>;

    /// 按查询条件取出文章（应用排序、offset 和 limit）
    fn fetch(&self, query: &EffectiveQuery) -> ListingResult<Vec<Post>>;

    /// 某个分类法下的项，按名称排序；`hide_empty` 时去掉没有文章的项
    fn terms(&self, kind: TermKind, hide_empty: bool) -> ListingResult<Vec<Term>>;
}

/// 数据文件格式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteData {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub categories: Vec<Term>,
    #[serde(default)]
    pub tags: Vec<Term>,
}

/// 内存中的文章仓库
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    posts: Vec<Post>,
    categories: Vec<Term>,
    tags: Vec<Term>,
}

impl InMemoryRepository {
    pub fn new(data: SiteData) -> Self {
        let mut categories = data.categories;
        let mut tags = data.tags;
        categories.iter_mut().for_each(|term| term.kind = TermKind::Category);
        tags.iter_mut().for_each(|term| term.kind = TermKind::Tag);

        let mut repo = Self {
            posts: data.posts,
            categories,
            tags,
        };
        repo.recount_terms();
        repo
    }

    /// 从 YAML 或 JSON 数据文件加载（按扩展名判断）
    pub fn from_file(path: &Path) -> ListingResult<Self> {
        info!("Loading posts from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| ListingError::DataLoadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let data: SiteData = if is_json {
            serde_json::from_str(&content).map_err(|e| ListingError::DataLoadError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| ListingError::DataLoadError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        };

        info!(
            "加载完成: {} 篇文章, {} 个分类, {} 个标签",
            data.posts.len(),
            data.categories.len(),
            data.tags.len()
        );
        Ok(Self::new(data))
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// 查找分类法项（不区分是否有文章）
    pub fn term(&self, kind: TermKind, id: u64) -> Option<&Term> {
        self.all_terms(kind).iter().find(|term| term.id == id)
    }

    fn all_terms(&self, kind: TermKind) -> &[Term] {
        match kind {
            TermKind::Category => &self.categories,
            TermKind::Tag => &self.tags,
        }
    }

    /// 根据文章数据重新统计每个分类法项的文章数
    fn recount_terms(&mut self) {
        let posts = &self.posts;
        for (kind, terms) in [
            (TermKind::Category, &mut self.categories),
            (TermKind::Tag, &mut self.tags),
        ] {
            for term in terms.iter_mut() {
                term.count = posts
                    .iter()
                    .filter(|post| post.term_ids(kind).contains(&term.id))
                    .count();
            }
        }
    }

    /// 按筛选条件匹配并排序，尚未应用 offset/limit
    fn matching(&self, query: &EffectiveQuery) -> Vec<&Post> {
        let mut matched: Vec<&Post> = self
            .posts
            .iter()
            .filter(|post| post.post_type == query.post_type)
            .filter(|post| matches_any(post.term_ids(TermKind::Category), query.category_in.as_ref()))
            .filter(|post| matches_any(post.term_ids(TermKind::Tag), query.tag_in.as_ref()))
            .collect();

        matched.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        if query.order == SortOrder::Desc {
            matched.reverse();
        }
        matched
    }
}

fn matches_any(ids: &[u64], wanted: Option<&BTreeSet<u64>>) -> bool {
    match wanted {
        Some(wanted) => ids.iter().any(|id| wanted.contains(id)),
        None => true,
    }
}

impl PostRepository for InMemoryRepository {
    fn count(&self, query: &EffectiveQuery) -> ListingResult<usize> {
        let count = self.matching(query).len();
        debug!("count query matched {} posts", count);
        Ok(count)
    }

    fn fetch(&self, query: &EffectiveQuery) -> ListingResult<Vec<Post>> {
        let matched = self.matching(query).into_iter().skip(query.offset);
        let posts: Vec<Post> = match query.limit {
            Some(limit) => matched.take(limit).cloned().collect(),
            None => matched.cloned().collect(),
        };
        debug!(
            "fetch query offset={} limit={:?} returned {} posts",
            query.offset,
            query.limit,
            posts.len()
        );
        Ok(posts)
    }

    fn terms(&self, kind: TermKind, hide_empty: bool) -> ListingResult<Vec<Term>> {
        let mut terms: Vec<Term> = self
            .all_terms(kind)
            .iter()
            .filter(|term| !hide_empty || term.count > 0)
            .cloned()
            .collect();
        terms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilterMode, PostType};
    use chrono::{TimeZone, Utc};

    fn post(id: u64, day: u32, categories: &[u64], tags: &[u64]) -> Post {
        Post {
            id,
            title: format!("Post {}", id),
            permalink: format!("/post-{}", id),
            author: "admin".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
            post_type: PostType::Post,
            featured_image: None,
            excerpt: String::new(),
            content: String::new(),
            legacy_content: None,
            categories: categories.to_vec(),
            tags: tags.to_vec(),
        }
    }

    fn term(id: u64, name: &str) -> Term {
        Term {
            id,
            name: name.to_string(),
            kind: TermKind::Category,
            count: 0,
        }
    }

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new(SiteData {
            posts: vec![
                post(1, 1, &[1], &[10]),
                post(2, 2, &[2], &[10, 11]),
                post(3, 3, &[1, 2], &[]),
                post(4, 4, &[3], &[11]),
            ],
            categories: vec![term(1, "News"), term(2, "Guides"), term(3, "Events"), term(4, "Empty")],
            tags: vec![term(10, "rust"), term(11, "web")],
        })
    }

    fn query() -> EffectiveQuery {
        EffectiveQuery {
            post_type: PostType::Post,
            mode: FilterMode::Unconstrained,
            category_in: None,
            tag_in: None,
            order: SortOrder::Desc,
            limit: None,
            offset: 0,
        }
    }

    fn ids(posts: &[Post]) -> Vec<u64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_order_offset_limit() {
        let repo = repo();
        assert_eq!(ids(&repo.fetch(&query()).unwrap()), vec![4, 3, 2, 1]);

        let mut asc = query();
        asc.order = SortOrder::Asc;
        assert_eq!(ids(&repo.fetch(&asc.for_page(2, 1)).unwrap()), vec![2, 3]);
        assert_eq!(repo.fetch(&asc.for_page(2, 10)).unwrap(), vec![]);
    }

    #[test]
    fn test_category_and_tag_intersection() {
        let repo = repo();
        let mut q = query();
        q.category_in = Some(BTreeSet::from([1, 2]));
        assert_eq!(repo.count(&q).unwrap(), 3);

        q.tag_in = Some(BTreeSet::from([11]));
        assert_eq!(ids(&repo.fetch(&q).unwrap()), vec![2]);
    }

    #[test]
    fn test_post_type_match() {
        let repo = repo();
        let mut q = query();
        q.post_type = PostType::Page;
        assert_eq!(repo.count(&q).unwrap(), 0);
    }

    #[test]
    fn test_terms_hide_empty_sorted_by_name() {
        let repo = repo();
        let names: Vec<String> = repo
            .terms(TermKind::Category, true)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Events", "Guides", "News"]);

        assert_eq!(repo.terms(TermKind::Category, false).unwrap().len(), 4);

        let tags = repo.terms(TermKind::Tag, true).unwrap();
        assert!(tags.iter().all(|t| t.kind == TermKind::Tag));
        assert_eq!(tags.iter().find(|t| t.id == 10).map(|t| t.count), Some(2));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.yml");
        fs::write(
            &path,
            "posts:\n  - id: 1\n    title: Hello\n    date: 2024-01-01T00:00:00Z\n    categories: [1]\ncategories:\n  - id: 1\n    name: News\n",
        )
        .unwrap();

        let repo = InMemoryRepository::from_file(&path).unwrap();
        assert_eq!(repo.posts().len(), 1);
        assert_eq!(repo.term(TermKind::Category, 1).map(|t| t.count), Some(1));
    }

    #[test]
    fn test_rest_style_type_key_in_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        fs::write(
            &path,
            r#"{"posts": [
                {"id": 1, "title": "Post", "date": "2024-01-01T00:00:00Z"},
                {"id": 2, "title": "About", "date": "2024-01-02T00:00:00Z", "type": "page"}
            ]}"#,
        )
        .unwrap();

        let repo = InMemoryRepository::from_file(&path).unwrap();
        assert_eq!(repo.posts()[1].post_type, PostType::Page);
        assert_eq!(ids(&repo.fetch(&query()).unwrap()), vec![1]);

        let mut pages = query();
        pages.post_type = PostType::Page;
        assert_eq!(ids(&repo.fetch(&pages).unwrap()), vec![2]);
    }

    #[test]
    fn test_missing_file_is_data_error() {
        let err = InMemoryRepository::from_file(Path::new("/nonexistent/posts.yml")).unwrap_err();
        assert!(matches!(err, ListingError::DataLoadError { .. }));
    }
}
