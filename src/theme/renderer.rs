use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};
use tracing::{debug, error};

use crate::core::error::ListingResult;
use crate::core::excerpt::extract_excerpt;
use crate::core::listing::TermNames;
use crate::models::request::{FILTER_PARAM, META_FILTER_PARAM, META_NAME_PARAM, META_PARAMS, META_TYPE_PARAM, PAGE_PARAM};
use crate::models::{
    DisplayOptions, FilterModel, ListingPage, PageItem, PaginationModel, Post, PostType, ReadMoreStyle,
    RequestState, TermKind,
};
use crate::utils::{display_date, with_query, without_query};

const LISTING_TEMPLATE_NAME: &str = "listing.html";
const DOCUMENT_TEMPLATE_NAME: &str = "document.html";

const DOCUMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{ title }}</title>
</head>
<body>
<main class="turbo_blog_wl">
{%- if title %}
<h1 class="turbo_blog_wl__title">{{ title }}</h1>
{%- endif %}
{{ body | safe }}
</main>
</body>
</html>
"#;

const LISTING_TEMPLATE: &str = r#"<div class="turbo_blog_wl__content-wrapper turbo_blog_wl__content-wrapper--{{ filter_position }}">
{%- if filter %}
<nav class="turbo_blog_wl__filter turbo_blog_wl__filter--{{ filter_position }}" role="navigation" aria-label="{{ filter.aria_label }}">
<div class="turbo_blog_wl__filter-inner">
{%- for item in filter.items %}
<a href="{{ item.href | attr | safe }}" class="turbo_blog_wl__filter-item{% if item.active %} turbo_blog_wl__filter-item--active{% endif %}"{% if item.active %} aria-current="true"{% endif %}>{{ item.label }}</a>
{%- endfor %}
</div>
</nav>
{%- endif %}
<section class="turbo_blog_wl__posts-wrapper">
{%- if meta_banner %}
<div class="turbo_blog_wl__meta-filter">
<span class="turbo_blog_wl__meta-filter-label">{{ meta_banner.label }}</span>
<a href="{{ meta_banner.clear_href | attr | safe }}" class="turbo_blog_wl__meta-filter-clear">Clear filter</a>
</div>
{%- endif %}
{%- if posts %}
<div class="turbo_blog_wl__post-items turbo_blog_wl__post-items--{% if grid_layout %}grid{% else %}fullwidth{% endif %}">
{%- for post in posts %}
<div class="turbo_blog_wl__post-item{% if post.full_width %} turbo_blog_wl__post-item--full-width{% endif %}">
<div class="turbo_blog_wl__post-inner turbo_blog_wl__post-inner--{{ post.image_position }}">
{%- if post.image and post.image_leads %}
<div class="turbo_blog_wl__post-featured-image"><img src="{{ post.image | attr | safe }}" alt="{{ post.title }}" class="turbo_blog_wl__post-featured-image-img"></div>
{%- endif %}
<div class="turbo_blog_wl__post-content-wrapper">
<{{ heading }} class="turbo_blog_wl__post-item-title{% if read_more_arrow %} turbo_blog_wl__post-item-title--with-arrow{% endif %}"><a href="{{ post.permalink | attr | safe }}">{{ post.title }}
{%- if read_more_arrow %}<span class="turbo_blog_wl__read-more-arrow turbo_blog_wl__read-more-arrow--{{ post.image_position }}"><svg width="24" height="24" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M7 17L17 7M17 7H7M17 7V17" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg></span>{% endif -%}
</a></{{ heading }}>
{%- if not meta_below and post.has_meta %}
<div class="turbo_blog_wl__post-meta turbo_blog_wl__post-meta--above">
{%- if post.author %}<span class="turbo_blog_wl__post-author">By {{ post.author }}</span>{% endif %}
{%- if post.date %} <span class="turbo_blog_wl__post-date">{{ post.date }}</span>{% endif %}
{%- if post.categories %} <span class="turbo_blog_wl__post-categories">Categories: {% for label in post.categories %}<a href="{{ label.href | attr | safe }}" class="turbo_blog_wl__post-term">{{ label.label }}</a>{% if not loop.last %}, {% endif %}{% endfor %}</span>{% endif %}
{%- if post.tags %} <span class="turbo_blog_wl__post-tags">Tags: {% for label in post.tags %}<a href="{{ label.href | attr | safe }}" class="turbo_blog_wl__post-term">{{ label.label }}</a>{% if not loop.last %}, {% endif %}{% endfor %}</span>{% endif %}
</div>
{%- endif %}
<div class="turbo_blog_wl__post-item-content">{{ post.excerpt }}</div>
{%- if read_more_link %}
<a href="{{ post.permalink | attr | safe }}" class="turbo_blog_wl__read-more-link">{{ read_more_text }}</a>
{%- endif %}
{%- if meta_below and post.has_meta %}
<div class="turbo_blog_wl__post-meta turbo_blog_wl__post-meta--below">
{%- if post.categories or post.tags %}
<div class="turbo_blog_wl__post-taxonomy">
{%- for label in post.categories %}<a href="{{ label.href | attr | safe }}" class="turbo_blog_wl__post-term">{{ label.label }}</a>{% if not loop.last %}, {% endif %}{% endfor %}
{%- if post.categories and post.tags %} | {% endif %}
{%- for label in post.tags %}<a href="{{ label.href | attr | safe }}" class="turbo_blog_wl__post-term">{{ label.label }}</a>{% if not loop.last %}, {% endif %}{% endfor -%}
</div>
{%- endif %}
{%- if post.author or post.date %}
<div class="turbo_blog_wl__post-author-info">
{%- if post.author %}<div class="turbo_blog_wl__post-author-name">{{ post.author }}</div>{% endif %}
{%- if post.date %}<div class="turbo_blog_wl__post-date">{{ post.date }}</div>{% endif -%}
</div>
{%- endif %}
</div>
{%- endif %}
</div>
{%- if post.image and not post.image_leads %}
<div class="turbo_blog_wl__post-featured-image"><img src="{{ post.image | attr | safe }}" alt="{{ post.title }}" class="turbo_blog_wl__post-featured-image-img"></div>
{%- endif %}
</div>
</div>
{%- endfor %}
</div>
{%- else %}
<div class="turbo_blog_wl__no-posts">No post found.
{%- if clear_href %} <a href="{{ clear_href | attr | safe }}" class="turbo_blog_wl__no-posts-clear">Clear filter</a>{% endif -%}
</div>
{%- endif %}
{%- if pagination %}
<nav class="turbo_blog_wl__pagination" role="navigation" aria-label="Pagination">
{%- if pagination.prev_href %}
<a href="{{ pagination.prev_href | attr | safe }}" class="turbo_blog_wl__pagination-prev">&larr; PREVIOUS</a>
{%- else %}
<span class="turbo_blog_wl__pagination-prev turbo_blog_wl__pagination-disabled">&larr; PREVIOUS</span>
{%- endif %}
<div class="turbo_blog_wl__pagination-numbers">
{%- for item in pagination.items %}
{%- if item.ellipsis %}<span class="turbo_blog_wl__pagination-ellipsis">...</span>
{%- elif item.current %}<span class="turbo_blog_wl__pagination-number turbo_blog_wl__pagination-current" aria-current="page">{{ item.label }}</span>
{%- else %}<a href="{{ item.href | attr | safe }}" class="turbo_blog_wl__pagination-number">{{ item.label }}</a>
{%- endif %}
{%- endfor %}
</div>
{%- if pagination.next_href %}
<a href="{{ pagination.next_href | attr | safe }}" class="turbo_blog_wl__pagination-next">NEXT &rarr;</a>
{%- else %}
<span class="turbo_blog_wl__pagination-next turbo_blog_wl__pagination-disabled">NEXT &rarr;</span>
{%- endif %}
</nav>
{%- endif %}
</section>
</div>
"#;

/// 渲染一次列表所需的展示参数
pub struct RenderOptions<'a> {
    pub display: &'a DisplayOptions,
    pub excerpt_length: usize,
    /// 当前请求的地址（路径加查询串），所有链接都在它的基础上生成
    pub current_url: &'a str,
    pub term_names: &'a TermNames,
}

#[derive(Debug, Serialize)]
struct LinkView {
    label: String,
    href: String,
    active: bool,
}

#[derive(Debug, Serialize)]
struct FilterView {
    aria_label: &'static str,
    items: Vec<LinkView>,
}

#[derive(Debug, Serialize)]
struct MetaBannerView {
    label: String,
    clear_href: String,
}

#[derive(Debug, Serialize)]
struct PostView {
    title: String,
    permalink: String,
    excerpt: String,
    image: Option<String>,
    image_position: &'static str,
    image_leads: bool,
    full_width: bool,
    author: Option<String>,
    date: Option<String>,
    categories: Vec<LinkView>,
    tags: Vec<LinkView>,
    has_meta: bool,
}

#[derive(Debug, Serialize)]
struct PageLinkView {
    label: String,
    href: Option<String>,
    current: bool,
    ellipsis: bool,
}

#[derive(Debug, Serialize)]
struct PaginationView {
    prev_href: Option<String>,
    next_href: Option<String>,
    items: Vec<PageLinkView>,
}

/// 把 [`ListingPage`] 渲染成 HTML 片段
#[derive(Clone)]
pub struct ListingRenderer {
    tera: Tera,
}

impl ListingRenderer {
    pub fn new() -> ListingResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (LISTING_TEMPLATE_NAME, LISTING_TEMPLATE),
            (DOCUMENT_TEMPLATE_NAME, DOCUMENT_TEMPLATE),
        ])?;
        Self::register_filters(&mut tera);
        Ok(Self { tera })
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        // 属性值转义，保留 URL 中的斜杠
        tera.register_filter("attr", Self::attr_filter);
    }

    pub fn render(&self, page: &ListingPage, state: &RequestState, options: &RenderOptions<'_>) -> ListingResult<String> {
        let display = options.display;
        let mut context = Context::new();

        context.insert("filter_position", &display.filter_position);
        context.insert("heading", &display.heading_level);
        context.insert("grid_layout", &display.grid_layout);
        context.insert("meta_below", &display.meta_below);
        context.insert(
            "read_more_arrow",
            &(display.show_read_more && display.read_more_style == ReadMoreStyle::Arrow),
        );
        context.insert(
            "read_more_link",
            &(display.show_read_more && display.read_more_style == ReadMoreStyle::Link),
        );
        context.insert("read_more_text", &display.read_more_text);

        context.insert("filter", &page.filter.as_ref().and_then(|filter| filter_view(filter, options.current_url)));
        context.insert("meta_banner", &meta_banner(state, options.current_url));

        let posts: Vec<PostView> = page
            .page
            .items
            .iter()
            .enumerate()
            .map(|(index, post)| post_view(index, post, options))
            .collect();
        context.insert("posts", &posts);

        let filtered = state.meta_filter.is_some() || state.selected_filter.is_some();
        let clear_href = filtered.then(|| without_query(options.current_url, &clearing_params()));
        context.insert("clear_href", &clear_href);

        let pagination = (display.show_pagination && page.pagination.total_pages > 1)
            .then(|| pagination_view(&page.pagination, options.current_url));
        context.insert("pagination", &pagination);

        debug!("Rendering {} posts with template {}", posts.len(), LISTING_TEMPLATE_NAME);
        match self.tera.render(LISTING_TEMPLATE_NAME, &context) {
            Ok(html) => Ok(html),
            Err(e) => {
                error!("模板渲染失败: {}", e);
                Err(e.into())
            }
        }
    }

    /// 把列表片段包进完整的 HTML 页面
    pub fn render_document(&self, title: &str, body: &str) -> ListingResult<String> {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("body", body);
        Ok(self.tera.render(DOCUMENT_TEMPLATE_NAME, &context)?)
    }

    fn attr_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        match value.as_str() {
            Some(text) => Ok(tera::Value::String(escape_attr(text))),
            None => Ok(value.clone()),
        }
    }
}

/// 属性值转义，保留 `/` 不转义，链接地址保持可读
fn escape_attr(text: &str) -> String {
    tera::escape_html(text).replace("&#x2F;", "/")
}

/// 清除所有筛选时需要去掉的参数
fn clearing_params() -> Vec<&'static str> {
    let mut params = vec![FILTER_PARAM, PAGE_PARAM];
    params.extend(META_PARAMS);
    params
}

fn filter_view(filter: &FilterModel, current_url: &str) -> Option<FilterView> {
    if filter.terms.is_empty() {
        return None;
    }

    let base = without_query(current_url, &clearing_params());
    let mut items = vec![LinkView {
        label: "View all".to_string(),
        href: base.clone(),
        active: filter.active.is_none() && filter.meta.is_none(),
    }];
    items.extend(filter.terms.iter().map(|term| LinkView {
        label: term.name.clone(),
        href: with_query(&base, &[(FILTER_PARAM, term.id.to_string().as_str())]),
        active: filter.active == Some(term.id),
    }));

    Some(FilterView {
        aria_label: match filter.kind {
            TermKind::Category => "Filter posts by category",
            TermKind::Tag => "Filter posts by tag",
        },
        items,
    })
}

fn meta_banner(state: &RequestState, current_url: &str) -> Option<MetaBannerView> {
    let meta = state.meta_filter.as_ref()?;
    let kind_label = match meta.kind {
        TermKind::Category => "Category",
        TermKind::Tag => "Tag",
    };
    let mut remove = vec![PAGE_PARAM];
    remove.extend(META_PARAMS);

    Some(MetaBannerView {
        label: if meta.name.is_empty() {
            format!("{} #{}", kind_label, meta.id)
        } else {
            format!("{}: {}", kind_label, meta.name)
        },
        clear_href: without_query(current_url, &remove),
    })
}

fn post_view(index: usize, post: &Post, options: &RenderOptions<'_>) -> PostView {
    let display = options.display;
    let position = display.image_position_for(index);
    // 分类和标签只对文章类型有意义
    let with_terms = post.post_type == PostType::Post;

    let categories = if display.show_categories && with_terms {
        term_links(post, TermKind::Category, options)
    } else {
        Vec::new()
    };
    let tags = if display.show_tags && with_terms {
        term_links(post, TermKind::Tag, options)
    } else {
        Vec::new()
    };
    let author = (display.show_author && !post.author.is_empty()).then(|| post.author.clone());
    let date = display.show_date.then(|| display_date(&post.date));

    PostView {
        title: post.title.clone(),
        permalink: post.permalink.clone(),
        excerpt: extract_excerpt(post, options.excerpt_length),
        image: post.featured_image.clone().filter(|_| display.shows_image(index)),
        image_position: position.as_str(),
        image_leads: position.leads(),
        full_width: display.is_full_width(index),
        has_meta: author.is_some() || date.is_some() || !categories.is_empty() || !tags.is_empty(),
        author,
        date,
        categories,
        tags,
    }
}

fn term_links(post: &Post, kind: TermKind, options: &RenderOptions<'_>) -> Vec<LinkView> {
    let base = without_query(options.current_url, &[PAGE_PARAM, FILTER_PARAM]);
    post.term_ids(kind)
        .iter()
        .filter_map(|id| {
            let name = options.term_names.get(&(kind, *id))?;
            Some(LinkView {
                label: name.clone(),
                href: with_query(
                    &base,
                    &[
                        (META_FILTER_PARAM, id.to_string().as_str()),
                        (META_TYPE_PARAM, kind.as_str()),
                        (META_NAME_PARAM, name.as_str()),
                    ],
                ),
                active: false,
            })
        })
        .collect()
}

fn pagination_view(model: &PaginationModel, current_url: &str) -> PaginationView {
    let page_href = |page: usize| with_query(current_url, &[(PAGE_PARAM, page.to_string().as_str())]);

    PaginationView {
        prev_href: model.prev.map(page_href),
        next_href: model.next.map(page_href),
        items: model
            .items
            .iter()
            .map(|item| match item {
                PageItem::Ellipsis => PageLinkView {
                    label: item.to_string(),
                    href: None,
                    current: false,
                    ellipsis: true,
                },
                PageItem::Number(n) => PageLinkView {
                    label: n.to_string(),
                    href: (*n != model.current).then(|| page_href(*n)),
                    current: *n == model.current,
                    ellipsis: false,
                },
            })
            .collect(),
    }
}
