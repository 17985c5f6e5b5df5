use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::sanitize::parse_id_list;
use crate::models::types::{FilterType, PostType, SortOrder};

/// 每页文章数的默认值，配置无效时使用
pub const DEFAULT_POSTS_PER_PAGE: usize = 6;
/// 摘要长度（字符）的默认值
pub const DEFAULT_EXCERPT_LENGTH: usize = 270;

/// 模块实例的原始属性集合
///
/// 值来自构建器保存的配置，可能是字符串、数字或布尔值，
/// 统一在读取时转换为字符串再解析。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleAttrs {
    values: BTreeMap<String, Value>,
}

impl ModuleAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置属性（链式调用）
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), Value::String(value.into()));
    }

    /// 读取属性的字符串形式
    pub fn get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::Null => None,
            Value::Bool(b) => Some(if *b { "on".to_string() } else { "off".to_string() }),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Sequence(items) => Some(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Number(n) => Some(n.to_string()),
                        Value::String(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => None,
        }
    }

    fn text_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// "on"/"off" 开关
    fn toggle(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => true,
                "off" | "false" | "no" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }

    /// 正整数，无效时使用默认值
    fn positive(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    }

    /// 非负整数，无效时为 0
    fn non_negative(&self, key: &str) -> usize {
        self.get(key)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0)
    }

    pub fn listing_config(&self) -> ListingConfig {
        ListingConfig::from_attrs(self)
    }

    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions::from_attrs(self)
    }
}

/// 从模块属性解析出的列表配置，每次渲染构建一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingConfig {
    pub posts_per_page: usize,
    pub post_type: PostType,
    pub categories: BTreeSet<u64>,
    pub tags: BTreeSet<u64>,
    pub sort_order: SortOrder,
    pub post_offset: usize,
    pub excerpt_length: usize,
    pub show_filter: bool,
    pub filter_type: FilterType,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            post_type: PostType::Post,
            categories: BTreeSet::new(),
            tags: BTreeSet::new(),
            sort_order: SortOrder::Desc,
            post_offset: 0,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            show_filter: false,
            filter_type: FilterType::Categories,
        }
    }
}

impl ListingConfig {
    pub fn from_attrs(attrs: &ModuleAttrs) -> Self {
        Self {
            posts_per_page: attrs.positive("postsNumber", DEFAULT_POSTS_PER_PAGE),
            post_type: PostType::from(attrs.text_or("postType", "post")),
            categories: parse_id_list(attrs.get("categories").as_deref()),
            tags: parse_id_list(attrs.get("tags").as_deref()),
            sort_order: SortOrder::parse(&attrs.text_or("sortOrder", "desc")),
            post_offset: attrs.non_negative("postOffset"),
            excerpt_length: attrs.positive("excerptLength", DEFAULT_EXCERPT_LENGTH),
            show_filter: attrs.toggle("showFilter", false),
            filter_type: FilterType::parse(&attrs.text_or("filterType", "categories")),
        }
    }
}

/// 特色图片位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    Above,
    Below,
    Left,
    Right,
}

impl ImagePosition {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "below" => ImagePosition::Below,
            "left" => ImagePosition::Left,
            "right" => ImagePosition::Right,
            _ => ImagePosition::Above,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePosition::Above => "above",
            ImagePosition::Below => "below",
            ImagePosition::Left => "left",
            ImagePosition::Right => "right",
        }
    }

    /// 图片是否排在内容之前
    pub fn leads(&self) -> bool {
        matches!(self, ImagePosition::Above | ImagePosition::Left)
    }

    fn mirrored(&self) -> Self {
        match self {
            ImagePosition::Left => ImagePosition::Right,
            ImagePosition::Right => ImagePosition::Left,
            other => *other,
        }
    }
}

/// "阅读更多" 样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMoreStyle {
    Arrow,
    Link,
}

/// 仅影响渲染的显示选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayOptions {
    pub show_featured_image: bool,
    pub show_author: bool,
    pub show_date: bool,
    pub show_categories: bool,
    pub show_tags: bool,
    /// metaPosition = on 时元信息显示在内容下方
    pub meta_below: bool,
    /// layoutType = on 时使用网格布局
    pub grid_layout: bool,
    pub image_position: ImagePosition,
    pub alternate_image_position: bool,
    pub first_post_full_width: bool,
    pub first_post_show_image: bool,
    pub show_read_more: bool,
    pub read_more_style: ReadMoreStyle,
    pub read_more_text: String,
    pub show_pagination: bool,
    pub filter_position: String,
    pub heading_level: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::from_attrs(&ModuleAttrs::default())
    }
}

impl DisplayOptions {
    pub fn from_attrs(attrs: &ModuleAttrs) -> Self {
        let heading_level = attrs.text_or("headingLevel", "h2").to_ascii_lowercase();
        let heading_level = match heading_level.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => heading_level,
            _ => "h2".to_string(),
        };
        let read_more_style = if attrs.text_or("readMoreStyle", "arrow") == "link" {
            ReadMoreStyle::Link
        } else {
            ReadMoreStyle::Arrow
        };

        Self {
            show_featured_image: attrs.toggle("showFeaturedImage", true),
            show_author: attrs.toggle("showAuthor", true),
            show_date: attrs.toggle("showDate", true),
            show_categories: attrs.toggle("showCategories", true),
            show_tags: attrs.toggle("showTags", true),
            meta_below: attrs.toggle("metaPosition", false),
            grid_layout: attrs.toggle("layoutType", false),
            image_position: ImagePosition::parse(&attrs.text_or("imagePosition", "above")),
            alternate_image_position: attrs.toggle("alternateImagePosition", false),
            first_post_full_width: attrs.toggle("firstPostFullWidth", false),
            first_post_show_image: attrs.toggle("firstPostShowImage", true),
            show_read_more: attrs.toggle("showReadMore", true),
            read_more_style,
            read_more_text: attrs.text_or("readMoreText", "Read More"),
            show_pagination: attrs.toggle("showPagination", true),
            filter_position: attrs.text_or("filterPosition", "left"),
            heading_level,
        }
    }

    /// 第 `index` 篇文章的图片位置（左右交替时奇数项镜像）
    pub fn image_position_for(&self, index: usize) -> ImagePosition {
        if self.alternate_image_position && index % 2 == 1 {
            self.image_position.mirrored()
        } else {
            self.image_position
        }
    }

    /// 第一篇文章是否通栏显示
    pub fn is_full_width(&self, index: usize) -> bool {
        index == 0 && self.first_post_full_width && self.grid_layout
    }

    pub fn shows_image(&self, index: usize) -> bool {
        if self.is_full_width(index) {
            self.first_post_show_image
        } else {
            self.show_featured_image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_attrs_missing() {
        let config = ModuleAttrs::new().listing_config();
        assert_eq!(config, ListingConfig::default());

        let display = ModuleAttrs::new().display_options();
        assert!(display.show_read_more);
        assert_eq!(display.read_more_style, ReadMoreStyle::Arrow);
        assert_eq!(display.read_more_text, "Read More");
        assert_eq!(display.heading_level, "h2");
        assert_eq!(display.filter_position, "left");
    }

    #[test]
    fn test_invalid_posts_number_falls_back() {
        for raw in ["abc", "0", "-4", "", "2.5"] {
            let config = ModuleAttrs::new().with("postsNumber", raw).listing_config();
            assert_eq!(config.posts_per_page, DEFAULT_POSTS_PER_PAGE, "input {:?}", raw);
        }
        let config = ModuleAttrs::new().with("postsNumber", " 9 ").listing_config();
        assert_eq!(config.posts_per_page, 9);
    }

    #[test]
    fn test_id_lists_are_sanitized() {
        let config = ModuleAttrs::new()
            .with("categories", ",,3,, 3,abc,-1,007,")
            .with("tags", "5")
            .listing_config();
        assert_eq!(config.categories, BTreeSet::from([3, 7]));
        assert_eq!(config.tags, BTreeSet::from([5]));
    }

    #[test]
    fn test_yaml_values_of_any_scalar_type() {
        let attrs: ModuleAttrs = serde_yaml::from_str(
            "postsNumber: 4\nshowFilter: true\ncategories: [1, 2]\nsortOrder: ASC\nfilterType: tags\n",
        )
        .unwrap();
        let config = attrs.listing_config();
        assert_eq!(config.posts_per_page, 4);
        assert!(config.show_filter);
        assert_eq!(config.categories, BTreeSet::from([1, 2]));
        assert_eq!(config.sort_order, SortOrder::Asc);
        assert_eq!(config.filter_type, FilterType::Tags);
    }

    #[test]
    fn test_image_alternation_and_first_post() {
        let display = ModuleAttrs::new()
            .with("imagePosition", "left")
            .with("alternateImagePosition", "on")
            .with("layoutType", "on")
            .with("firstPostFullWidth", "on")
            .with("firstPostShowImage", "off")
            .display_options();

        assert_eq!(display.image_position_for(0), ImagePosition::Left);
        assert_eq!(display.image_position_for(1), ImagePosition::Right);
        assert_eq!(display.image_position_for(2), ImagePosition::Left);
        assert!(display.is_full_width(0));
        assert!(!display.shows_image(0));
        assert!(display.shows_image(1));
    }

    #[test]
    fn test_heading_level_is_validated() {
        let display = ModuleAttrs::new().with("headingLevel", "script").display_options();
        assert_eq!(display.heading_level, "h2");
        let display = ModuleAttrs::new().with("headingLevel", "H3").display_options();
        assert_eq!(display.heading_level, "h3");
    }
}
