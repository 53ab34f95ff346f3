//! End-to-end tests for Folio.
//!
//! These tests build a small site in a temporary directory and run it
//! through the whole pipeline.

use std::{fs, path::Path};

use folio_core::{ConfigSet, ExtensionTable};
use folio_generator::{
    Builder, DocumentRepository, Filter, GroupBy, Helpers, PageRenderer, PaginateOptions,
    RssFeed, TemplateRegistry, group, order, paginate, sort_keys,
};
use folio_parser::{DocumentParser, ParseOptions};
use serde_json::json;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn sample_site() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    let root = dir.path();

    write(
        root,
        "config/base.yaml",
        r#"
title: Field Notes
base_url: https://notes.example.com
build:
  cut: "<!-- more -->"
  collections:
    - source_path_prefix: index
      url_prefix: /
      documents_per_page: 2
      layout: home
      filter:
        layout: post
      order: ["-date"]
    - source_path_prefix: feed
      url_prefix: /feed
      documents_per_page: 10
      layout: rss
      filter:
        layout: post
      order: ["-date"]
"#,
    );
    write(root, "config/de.toml", "title = \"Notizen\"\n");
    write(root, "config/en.json", "{}");

    write(
        root,
        "templates/post.html",
        r#"<html lang="{{ lang }}"><h1>{{ title }}</h1><time>{{ date date "%d.%m.%Y" }}</time>{{ content }}</html>"#,
    );
    write(
        root,
        "templates/page.html",
        "<h1>{{ title }}</h1>{{ content }}{{ footer? }}",
    );
    write(
        root,
        "templates/home.html",
        concat!(
            "<h1>{{ config.title }}</h1>",
            "{{#each documents}}<a href=\"{{ url }}\">{{ title }}</a>{{ excerpt? }}{{/each}}",
            "{{#if next_url}}<a rel=\"next\" href=\"{{ next_url }}\">more</a>{{/if}}",
            "<p>{{ documents_total }} posts</p>",
        ),
    );

    write(
        root,
        "content/posts/first.md",
        "---\ntitle: First\nlayout: post\ndate: 2024-01-10\ntags: [rust]\n---\nHello\n\n<!-- more -->\n\nRest of first",
    );
    write(
        root,
        "content/posts/second.md",
        "---\ntitle: Second\nlayout: post\ndate: 2024-02-20\ntags: [rust, web]\n---\nSecond body",
    );
    write(
        root,
        "content/posts/third/index.md",
        "+++\ntitle = \"Third\"\nlayout = \"post\"\ndate = 2024-03-30\n+++\nThird body",
    );
    write(
        root,
        "content/about.md",
        "---\ntitle: About\nlayout: page\n---\nAbout *us*",
    );

    dir
}

#[test]
fn test_sample_site_config_loads() {
    let site = sample_site();
    let configs = ConfigSet::load(&site.path().join("config")).expect("config should load");

    assert!(configs.is_multilingual());
    assert_eq!(configs.languages(), vec!["de", "en"]);
    assert_eq!(configs.get("de").expect("de")["title"], json!("Notizen"));
    assert_eq!(configs.get("en").expect("en")["title"], json!("Field Notes"));
    assert_eq!(
        configs.get("de").expect("de")["build"]["cut"],
        json!("<!-- more -->")
    );
}

#[test]
fn test_pipeline_by_hand() {
    let site = sample_site();
    let configs = ConfigSet::load(&site.path().join("config")).expect("config");
    let config = configs.get("en").expect("en config");

    let repository = DocumentRepository::new(DocumentParser::new(
        ParseOptions::with_default_renderers().cut("<!-- more -->"),
    ));
    let documents = repository
        .load_all(&site.path().join("content"), &["md".to_string()])
        .expect("load");
    assert_eq!(documents.len(), 4);

    let first = documents
        .iter()
        .find(|d| d.source_path() == "posts/first.md")
        .expect("first post");
    assert_eq!(first.excerpt(), Some("<p>Hello</p>"));
    assert_eq!(first.more(), Some("<p>Rest of first</p>"));

    let posts = folio_generator::filter(&documents, &Filter::new().eq("layout", "post"));
    let newest_first = order(posts, &sort_keys(&["-date"]));
    let titles: Vec<_> = newest_first.iter().map(|d| d.get("title")).collect();
    assert_eq!(
        titles,
        vec![Some(&json!("Third")), Some(&json!("Second")), Some(&json!("First"))]
    );

    let tags = group(newest_first.iter().copied(), &GroupBy::from("tags"));
    assert_eq!(tags.keys().collect::<Vec<_>>(), vec!["rust", "web"]);
    assert_eq!(tags["rust"].len(), 2);

    let pages = paginate(
        tags["rust"].iter().copied(),
        &PaginateOptions::new("tags/rust", "/tags/rust", 1, "home").with_index(true),
    )
    .expect("paginate");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].source_path, "tags/rust/index");
    assert_eq!(pages[1].previous_url.as_deref(), Some("/tags/rust"));

    let templates = TemplateRegistry::load(&site.path().join("templates")).expect("templates");
    let renderer = PageRenderer::new(
        ExtensionTable::new().with("html", templates.into_template_fn()),
    )
    .with_helpers(Helpers::with_defaults())
    .with_feed(RssFeed::new().into_feed_fn());

    let rendered = renderer.render(&pages[0], config).expect("render");
    assert_eq!(rendered.output_path, "tags/rust/index.html");
    assert!(rendered.content.contains("<a href=\"/posts/second\">Second</a>"));
    assert!(rendered.content.contains("rel=\"next\""));
    assert!(rendered.content.contains("<p>2 posts</p>"));
}

#[test]
fn test_full_build() {
    let site = sample_site();
    let configs = ConfigSet::load(&site.path().join("config")).expect("config");
    let output = TempDir::new().expect("create temp dir");

    let stats = Builder::new(configs, site.path())
        .with_output_dir(output.path())
        .build()
        .expect("build");

    assert_eq!(stats.languages, 2);
    assert_eq!(stats.documents, 8);
    assert_eq!(stats.pages, 8);
    // home: 2 pages, feed: 1 page, per language
    assert_eq!(stats.collection_pages, 6);

    let read = |relative: &str| {
        fs::read_to_string(output.path().join(relative))
            .unwrap_or_else(|e| panic!("{relative}: {e}"))
    };

    let post = read("de/posts/first.html");
    assert!(post.starts_with("<html lang=\"de\">"));
    assert!(post.contains("<time>10.01.2024</time>"));
    assert!(post.contains("<!-- more -->"));

    let third = read("en/posts/third/index.html");
    assert!(third.contains("<h1>Third</h1>"));
    assert!(third.contains("<time>30.03.2024</time>"));

    let about = read("en/about.html");
    assert_eq!(about, "<h1>About</h1><p>About <em>us</em></p>");

    let home = read("de/index.html");
    assert!(home.starts_with("<h1>Notizen</h1>"));
    assert!(home.contains("<a href=\"/posts/third\">Third</a>"));
    assert!(home.contains("<a rel=\"next\" href=\"/page/2\">more</a>"));
    assert!(home.contains("<p>3 posts</p>"));

    let second_page = read("en/index/page/2.html");
    assert!(second_page.contains("<a href=\"/posts/first\">First</a><p>Hello</p>"));
    assert!(!second_page.contains("rel=\"next\""));

    let feed = read("en/feed.xml");
    assert!(feed.contains("<title>Field Notes</title>"));
    assert!(feed.contains("<link>https://notes.example.com/posts/third</link>"));
    assert!(feed.contains("<language>en</language>"));
    assert!(feed.contains("<pubDate>Sat, 30 Mar 2024 00:00:00 +0000</pubDate>"));
}

#[test]
fn test_build_without_languages() {
    let site = sample_site();
    fs::remove_file(site.path().join("config/de.toml")).expect("remove");
    fs::remove_file(site.path().join("config/en.json")).expect("remove");
    let configs = ConfigSet::load(&site.path().join("config")).expect("config");

    let stats = Builder::new(configs, site.path()).build().expect("build");

    assert_eq!(stats.languages, 1);
    let public = site.path().join("public");
    assert!(public.join("index.html").exists());
    assert!(public.join("posts/second.html").exists());
    assert!(!public.join("en").exists());
}
