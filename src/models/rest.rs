use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::types::{Post, PostType, Term, TermKind};

/// 总数响应头
pub const TOTAL_HEADER: &str = "X-WP-Total";
/// 总页数响应头
pub const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";
/// REST 集合单页上限
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    pub rendered: String,
}

impl From<&str> for Rendered {
    fn from(value: &str) -> Self {
        Self {
            rendered: value.to_string(),
        }
    }
}

/// `/wp/v2/posts` 集合中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestPost {
    pub id: u64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "type", default)]
    pub post_type: PostType,
    pub title: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_content: Option<String>,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
}

impl From<&Post> for RestPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            date: post.date,
            link: post.permalink.clone(),
            post_type: post.post_type.clone(),
            title: post.title.as_str().into(),
            excerpt: post.excerpt.as_str().into(),
            content: post.content.as_str().into(),
            legacy_content: post.legacy_content.clone(),
            author_name: post.author.clone(),
            featured_image: post.featured_image.clone(),
            categories: post.categories.clone(),
            tags: post.tags.clone(),
        }
    }
}

impl From<RestPost> for Post {
    fn from(post: RestPost) -> Self {
        Self {
            id: post.id,
            title: post.title.rendered,
            permalink: post.link,
            author: post.author_name,
            date: post.date,
            post_type: post.post_type,
            featured_image: post.featured_image,
            excerpt: post.excerpt.rendered,
            content: post.content.rendered,
            legacy_content: post.legacy_content,
            categories: post.categories,
            tags: post.tags,
        }
    }
}

/// `/wp/v2/categories` 与 `/wp/v2/tags` 中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestTerm {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub count: usize,
    /// `category` 或 `post_tag`
    pub taxonomy: String,
}

impl From<&Term> for RestTerm {
    fn from(term: &Term) -> Self {
        Self {
            id: term.id,
            name: term.name.clone(),
            count: term.count,
            taxonomy: match term.kind {
                TermKind::Category => "category".to_string(),
                TermKind::Tag => "post_tag".to_string(),
            },
        }
    }
}

impl From<RestTerm> for Term {
    fn from(term: RestTerm) -> Self {
        Self {
            id: term.id,
            name: term.name,
            kind: TermKind::parse(&term.taxonomy).unwrap_or(TermKind::Category),
            count: term.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_wire_format() {
        let json = r#"{
            "id": 7,
            "date": "2024-05-01T08:00:00Z",
            "link": "/hello/",
            "type": "post",
            "title": {"rendered": "Hello"},
            "content": {"rendered": "<p>Body</p>"},
            "categories": [3],
            "tags": []
        }"#;
        let post: Post = serde_json::from_str::<RestPost>(json).unwrap().into();
        assert_eq!(post.id, 7);
        assert_eq!(post.title, "Hello");
        assert_eq!(post.permalink, "/hello/");
        assert_eq!(post.content, "<p>Body</p>");
        assert!(post.excerpt.is_empty());
        assert_eq!(post.categories, vec![3]);
    }

    #[test]
    fn test_term_taxonomy_names() {
        let term = Term {
            id: 4,
            name: "rust".to_string(),
            kind: TermKind::Tag,
            count: 2,
        };
        let rest = RestTerm::from(&term);
        assert_eq!(rest.taxonomy, "post_tag");
        assert_eq!(Term::from(rest), term);
    }
}
