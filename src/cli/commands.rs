use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::core::{extract_excerpt, InMemoryRepository, ListingEngine, Server};
use crate::models::request::{FILTER_PARAM, META_FILTER_PARAM, META_NAME_PARAM, META_TYPE_PARAM, PAGE_PARAM};
use crate::models::{Config, PageItem, RequestParams};
use crate::preview::{PreviewSession, PreviewState, RestClient};
use crate::theme::{ListingRenderer, RenderOptions};
use crate::utils::with_query;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "turbo-blog.yml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 创建配置文件和示例数据
    Init(InitArgs),

    /// 渲染列表页面（HTML）
    Render(RenderArgs),

    /// 输出列表查询结果（JSON）
    Query(ListingArgs),

    /// 启动 HTTP 服务器
    Serve(ServeArgs),

    /// 通过 REST 接口预览列表
    Preview(PreviewArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点标题
    #[arg(short, long, default_value = "Turbo Blog")]
    pub title: String,

    /// 覆盖已有文件
    #[arg(short, long)]
    pub force: bool,
}

/// 与页面查询参数对应的请求状态
#[derive(Args, Default)]
pub struct ListingArgs {
    /// 页码
    #[arg(short, long)]
    pub page: Option<String>,

    /// 导航筛选的分类法项 id（all 表示全部）
    #[arg(short, long)]
    pub filter: Option<String>,

    /// 点击筛选的分类法项 id
    #[arg(long)]
    pub meta_filter: Option<String>,

    /// 点击筛选的分类法（category 或 tag）
    #[arg(long)]
    pub meta_type: Option<String>,

    /// 点击筛选的显示名称
    #[arg(long)]
    pub meta_name: Option<String>,
}

impl ListingArgs {
    fn params(&self) -> RequestParams {
        RequestParams {
            page: self.page.clone(),
            filter: self.filter.clone(),
            meta_filter: self.meta_filter.clone(),
            meta_type: self.meta_type.clone(),
            meta_name: self.meta_name.clone(),
        }
    }
}

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub listing: ListingArgs,

    /// 输出文件，默认写到标准输出
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// 服务器端口（默认使用配置文件中的端口）
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args)]
pub struct PreviewArgs {
    /// REST 根地址（默认使用配置文件中的地址）
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// 导航筛选的分类法项 id
    #[arg(short, long)]
    pub filter: Option<u64>,

    /// 预览的页码
    #[arg(short, long, default_value = "1")]
    pub page: usize,
}

// 嵌入的默认配置模板
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# 站点信息
title: '{title}'

# 文章数据（YAML 或 JSON）
data_file: posts.yml
# 列表页面的根路径
base_url: /

server:
  host: 0.0.0.0
  port: 4000

# 预览使用的 REST 根地址
preview:
  endpoint: http://localhost:4000

# 列表模块属性，开关使用 on / off
module:
  postsNumber: 6
  postType: post
  categories: ''
  tags: ''
  sortOrder: desc
  postOffset: 0
  excerptLength: 270
  showFilter: 'on'
  filterType: categories
  filterPosition: left
  showPagination: 'on'
  showReadMore: 'on'
  readMoreStyle: arrow
  readMoreText: Read More
  showFeaturedImage: 'on'
  showAuthor: 'on'
  showDate: 'on'
  showCategories: 'on'
  showTags: 'on'
  metaPosition: 'off'
  layoutType: 'off'
  imagePosition: above
  alternateImagePosition: 'off'
  firstPostFullWidth: 'off'
  firstPostShowImage: 'on'
  headingLevel: h2
"#;

// 嵌入的示例数据
const SAMPLE_DATA: &str = r#"categories:
  - id: 1
    name: News
  - id: 2
    name: Guides
tags:
  - id: 10
    name: rust
  - id: 11
    name: web

posts:
  - id: 1
    title: Hello World
    permalink: /hello-world/
    author: admin
    date: 2024-01-05T09:00:00Z
    content: |
      <!-- wp:paragraph -->
      <p>Welcome to the blog. This first post was written with the block editor.</p>
      <!-- /wp:paragraph -->
    categories: [1]
    tags: [10]
  - id: 2
    title: Getting Started
    permalink: /getting-started/
    author: admin
    date: 2024-01-12T09:00:00Z
    excerpt: A short tour of the listing features, from filters to pagination.
    categories: [2]
    tags: [10, 11]
  - id: 3
    title: Release Notes
    permalink: /release-notes/
    author: editor
    date: 2024-02-01T09:00:00Z
    content: '[et_pb_section][et_pb_text]Faster pages and a cleaner filter bar.[/et_pb_text][/et_pb_section]'
    categories: [1]
    tags: [11]
"#;

fn write_if_allowed(path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("{} {} (use --force to overwrite)", "Skipped".yellow(), path.display());
        return Ok(());
    }
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, content).with_context(|| format!("无法写入 {}", path.display()))?;
    println!("{} {}", "Created".green(), path.display());
    Ok(())
}

/// 加载配置和文章数据
fn load(config_path: &Path) -> Result<(Config, InMemoryRepository)> {
    let config = Config::load(config_path)
        .with_context(|| format!("无法读取配置文件 {}", config_path.display()))?;
    let data_path = config.data_path(config_path);
    let repository = InMemoryRepository::from_file(&data_path)?;
    Ok((config, repository))
}

/// 根据请求参数还原页面地址，用作生成链接的基础
fn request_url(base_url: &str, params: &RequestParams) -> String {
    let pairs: Vec<(&str, &str)> = [
        (PAGE_PARAM, &params.page),
        (FILTER_PARAM, &params.filter),
        (META_FILTER_PARAM, &params.meta_filter),
        (META_TYPE_PARAM, &params.meta_type),
        (META_NAME_PARAM, &params.meta_name),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_deref().map(|value| (key, value)))
    .collect();

    if pairs.is_empty() {
        base_url.to_string()
    } else {
        with_query(base_url, &pairs)
    }
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Init(args) => {
            let title = args.title.replace('\'', "''");
            write_if_allowed(&config_path, &DEFAULT_CONFIG_TEMPLATE.replace("{title}", &title), args.force)?;

            let config = Config::load(&config_path)?;
            write_if_allowed(&config.data_path(&config_path), SAMPLE_DATA, args.force)?;
            info!("Initialized site config at: {}", config_path.display());
        }
        Commands::Render(args) => {
            let (config, repository) = load(&config_path)?;
            let engine = ListingEngine::new(Arc::new(repository));
            let listing = config.module.listing_config();
            let display = config.module.display_options();

            let params = args.listing.params();
            let current_url = request_url(&config.base_url, &params);
            let request = params.into_state();

            let page = engine.build_page(&listing, &request);
            let term_names = engine.term_names();
            let options = RenderOptions {
                display: &display,
                excerpt_length: listing.excerpt_length,
                current_url: &current_url,
                term_names: &term_names,
            };

            let renderer = ListingRenderer::new()?;
            let fragment = renderer.render(&page, &request, &options)?;
            let html = renderer.render_document(&config.title, &fragment)?;

            match args.output {
                Some(path) => {
                    fs::write(&path, html).with_context(|| format!("无法写入 {}", path.display()))?;
                    info!("Rendered listing page {} to {}", request.current_page, path.display());
                }
                None => println!("{}", html),
            }
        }
        Commands::Query(args) => {
            let (config, repository) = load(&config_path)?;
            let engine = ListingEngine::new(Arc::new(repository));
            let page = engine.build_page(&config.module.listing_config(), &args.params().into_state());
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Serve(args) => {
            let (config, repository) = load(&config_path)?;
            let mut server = Server::new(&config, Arc::new(repository))?;
            if let Some(port) = args.port {
                server = server.with_port(port);
            }
            server.start().await?;
        }
        Commands::Preview(args) => {
            let config = Config::load(&config_path)?;
            let endpoint = match args.endpoint.or(config.preview.endpoint.clone()) {
                Some(endpoint) => endpoint,
                None => bail!("没有配置预览地址，请使用 --endpoint 或在配置文件中设置 preview.endpoint"),
            };
            preview(&config, &endpoint, args.filter, args.page).await?;
        }
    }

    Ok(())
}

async fn preview(config: &Config, endpoint: &str, filter: Option<u64>, page: usize) -> Result<()> {
    let client = RestClient::new(endpoint)?;
    let listing = config.module.listing_config();
    let display = config.module.display_options();
    let excerpt_length = listing.excerpt_length;

    let mut session = PreviewSession::new(Arc::new(client), listing, display.show_pagination);

    let terms = session.load_terms().await?;
    if !terms.is_empty() {
        let names: Vec<String> = terms
            .iter()
            .map(|term| {
                if Some(term.id) == filter {
                    format!("[{}]", term.name).bright_green().to_string()
                } else {
                    term.name.clone()
                }
            })
            .collect();
        println!("{} {}", "Filter:".bright_white(), names.join(" | "));
    }

    session.refresh(filter);
    session.settle().await;

    match session.state() {
        PreviewState::Failed(message) => bail!("预览失败: {}", message),
        PreviewState::Empty => {
            println!("{}", "No post found.".yellow());
            return Ok(());
        }
        _ => {}
    }

    for post in session.set_page(page) {
        println!("{} {}", format!("#{}", post.id).bright_cyan(), post.title.bold());
        println!("   {}", extract_excerpt(&post, excerpt_length));
    }

    let pagination = session.pagination();
    if display.show_pagination && pagination.total_pages > 1 {
        let items: Vec<String> = pagination
            .items
            .iter()
            .map(|item| match item {
                PageItem::Number(n) if *n == pagination.current => format!("[{}]", n),
                other => other.to_string(),
            })
            .collect();
        println!("{} {}", "Pages:".bright_white(), items.join(" "));
    }

    Ok(())
}
