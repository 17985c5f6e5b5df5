use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::core::error::{ListingError, ListingResult};
use crate::models::{Post, RestPost, RestTerm, Term, TermKind};
use crate::preview::query::terms_query;
use crate::utils::ensure_trailing_slash;

/// 预览使用的数据来源
pub trait PostFetcher: Send + Sync + 'static {
    /// 按 REST 路由取回文章
    fn fetch_posts(&self, route: &str) -> impl Future<Output = ListingResult<Vec<Post>>> + Send;

    /// 取回某个分类法下有文章的项
    fn fetch_terms(&self, kind: TermKind) -> impl Future<Output = ListingResult<Vec<Term>>> + Send;
}

/// 基于 reqwest 的 REST 客户端
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl RestClient {
    pub fn new(endpoint: &str) -> ListingResult<Self> {
        let endpoint = Url::parse(&ensure_trailing_slash(endpoint)).map_err(|e| ListingError::ConfigError {
            message: format!("无效的 REST 地址 {}: {}", endpoint, e),
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("turbo-blog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!("Preview endpoint: {}", endpoint);
        Ok(Self { client, endpoint })
    }

    fn url(&self, route: &str) -> ListingResult<Url> {
        self.endpoint
            .join(route.trim_start_matches('/'))
            .map_err(|e| ListingError::FetchError {
                message: format!("无效的路由 {}: {}", route, e),
            })
    }
}

impl PostFetcher for RestClient {
    async fn fetch_posts(&self, route: &str) -> ListingResult<Vec<Post>> {
        let url = self.url(route)?;
        debug!("GET {}", url);

        let posts: Vec<RestPost> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(posts.into_iter().map(Post::from).collect())
    }

    async fn fetch_terms(&self, kind: TermKind) -> ListingResult<Vec<Term>> {
        let url = self.url(&terms_query(kind))?;
        debug!("GET {}", url);

        let terms: Vec<RestTerm> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(terms
            .into_iter()
            .map(Term::from)
            .map(|term| Term { kind, ..term })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_join_onto_endpoint_path() {
        let client = RestClient::new("http://localhost:4000/wp-json").unwrap();
        assert_eq!(
            client.url("/wp/v2/posts?per_page=6").unwrap().as_str(),
            "http://localhost:4000/wp-json/wp/v2/posts?per_page=6"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let err = RestClient::new("not a url").unwrap_err();
        assert!(matches!(err, ListingError::ConfigError { .. }));
    }
}
