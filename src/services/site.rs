// src/services/site.rs

//! Toolkit website parser.
//!
//! Turns the home page and the topic pages of the toolkit site into
//! resource nodes. Parsing is kept apart from fetching so that every page
//! shape can be exercised from fixture HTML.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Link, ResourceNode, SiteConfig, Topic};
use crate::utils::http::Page;
use crate::utils::{normalize_text, resolve_url};

/// A topic tile found on the home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTile {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// What the home page links to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartPage {
    /// Brochure links from the intro block, already turned into link nodes
    pub brochures: Vec<Link>,
    pub tiles: Vec<TopicTile>,
}

/// Parser for the toolkit site's page layout.
pub struct ToolkitSite<'a> {
    config: &'a SiteConfig,
    box_link_marker: &'a str,
}

impl<'a> ToolkitSite<'a> {
    pub fn new(config: &'a SiteConfig, box_link_marker: &'a str) -> Self {
        Self {
            config,
            box_link_marker,
        }
    }

    /// Extract brochure links and topic tiles from the home page.
    pub fn parse_start_page(&self, page: &Page) -> Result<StartPage> {
        let document = Html::parse_document(&page.html);
        let base = Url::parse(&page.url)?;

        let intro_sel = parse_selector("div.ts-large-intro")?;
        let anchor_sel = parse_selector("a")?;
        let tile_sel = parse_selector("a.c-tile")?;
        let tile_title_sel = parse_selector("header h2")?;
        let tile_content_sel = parse_selector("div.c-tile__content")?;

        let mut start = StartPage::default();

        match document.select(&intro_sel).next() {
            Some(intro) => {
                for anchor in intro.select(&anchor_sel) {
                    let Some(href) = anchor.value().attr("href") else {
                        continue;
                    };
                    if href.contains(self.box_link_marker) {
                        start.brochures.push(Link::remote(
                            &self.config.brochure_title,
                            resolve_url(&base, href),
                        ));
                    }
                }
            }
            None => log::warn!("No intro block on {}; brochure skipped", page.url),
        }

        for tile in document.select(&tile_sel) {
            let href = tile
                .value()
                .attr("href")
                .ok_or_else(|| AppError::crawl(&page.url, "topic tile without href"))?;
            if href.contains(&self.config.excluded_tile_marker) {
                log::debug!("Skipping tile {}", href);
                continue;
            }
            let title = tile
                .select(&tile_title_sel)
                .next()
                .map(element_text)
                .ok_or_else(|| AppError::crawl(href, "topic tile without header title"))?;
            let description = tile
                .select(&tile_content_sel)
                .next()
                .map(element_text)
                .unwrap_or_default();

            start.tiles.push(TopicTile {
                title,
                description,
                url: resolve_url(&base, href),
            });
        }

        Ok(start)
    }

    /// Extract the section nodes of a topic page, in page order.
    pub fn parse_topic_page(&self, page: &Page) -> Result<Vec<ResourceNode>> {
        let document = Html::parse_document(&page.html);
        let base = Url::parse(&page.url)?;

        let item_sel = parse_selector("li.c-document-list__item")?;
        let thumb_sel = parse_selector("aside img")?;
        let column_sel = parse_selector("div.o-column")?;
        let h1_sel = parse_selector("h1")?;
        let content_sel = parse_selector("div.c-document-list__content")?;
        let downloads_sel = parse_selector("div.c-document-list__downloads")?;
        let heading_sel = parse_selector("h4.ts-heading-4")?;
        let button_sel = parse_selector("a.c-button")?;

        let mut sections = Vec::new();

        for item in document.select(&item_sel) {
            let thumbnail = item
                .select(&thumb_sel)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(|src| resolve_url(&base, src));
            let column = item
                .select(&column_sel)
                .next()
                .ok_or_else(|| AppError::crawl(&page.url, "document item without column"))?;
            let title = column
                .select(&h1_sel)
                .next()
                .map(element_text)
                .ok_or_else(|| AppError::crawl(&page.url, "document item without title"))?;
            let description = column
                .select(&content_sel)
                .next()
                .map(element_text)
                .filter(|d| !d.is_empty());

            log::info!("    section: {}", title);
            let mut section = Topic {
                title,
                description,
                thumbnail,
                ..Topic::default()
            };

            for downloads in column.select(&downloads_sel) {
                let heading = downloads
                    .select(&heading_sel)
                    .next()
                    .map(element_text)
                    .unwrap_or_default();
                let language = self.config.language_code(&heading);

                let links = downloads
                    .select(&button_sel)
                    .filter_map(|anchor| self.link_from_anchor(anchor, &base, language.clone()))
                    .map(ResourceNode::Link)
                    .collect();

                log::info!("      language: {}", heading);
                section.children.push(ResourceNode::Language(Topic {
                    title: heading,
                    language,
                    children: links,
                    ..Topic::default()
                }));
            }

            if let Some(extras) = self.parse_extras(column, &base)? {
                section.children.push(extras);
            }

            sections.push(ResourceNode::Section(section));
        }

        Ok(sections)
    }

    /// The optional trailing heading of a column and the list that follows it.
    fn parse_extras(&self, column: ElementRef<'_>, base: &Url) -> Result<Option<ResourceNode>> {
        let Some(heading) = column
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "h4")
        else {
            return Ok(None);
        };

        let title = element_text(heading);
        log::info!("      extras: {}", title);

        let li_sel = parse_selector("li")?;
        let anchor_sel = parse_selector("a")?;

        let children = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "ul")
            .map(|list| {
                list.select(&li_sel)
                    .filter_map(|li| li.select(&anchor_sel).next())
                    .filter_map(|anchor| self.link_from_anchor(anchor, base, None))
                    .map(ResourceNode::Link)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(ResourceNode::Extras(Topic {
            title,
            children,
            ..Topic::default()
        })))
    }

    fn link_from_anchor(
        &self,
        anchor: ElementRef<'_>,
        base: &Url,
        language: Option<String>,
    ) -> Option<Link> {
        let title = text_without_spans(anchor);
        let Some(href) = anchor.value().attr("href") else {
            log::warn!("Link '{}' has no href; skipped", title);
            return None;
        };
        log::debug!("        doc = {}", title);
        Some(Link {
            language,
            ..Link::remote(title, resolve_url(base, href))
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Normalized text content of an element.
fn element_text(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

/// Text content of an element, leaving out anything inside a `span`.
///
/// Buttons on the site decorate their label with spans (icons, file sizes).
fn text_without_spans(element: ElementRef<'_>) -> String {
    let text: String = element
        .descendants()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            let in_span = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != element.id())
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| el.name() == "span")
                });
            (!in_span).then_some(text)
        })
        .collect();
    normalize_text(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOME: &str = r#"
        <html><body>
          <div class="ts-large-intro">
            <p>Intro <a href="https://rescue.box.com/s/brochure">Download brochure</a></p>
            <a href="/about">About</a>
          </div>
          <a class="c-tile" href="/healing/">
            <header><h2>Healing Classroom</h2></header>
            <div class="c-tile__content"> Tools for teachers </div>
          </a>
          <a class="c-tile" href="/printing-guide/">
            <header><h2>Printing Guide</h2></header>
          </a>
          <a class="c-tile" href="http://shls.rescue.org/safety/">
            <header><h2>Safety</h2></header>
          </a>
        </body></html>
    "#;

    const TOPIC: &str = r#"
        <html><body><ul>
          <li class="c-document-list__item">
            <aside><img src="/img/thumb.png"></aside>
            <div class="o-column">
              <h1> Session Guide </h1>
              <div class="c-document-list__content">First line
              second line</div>
              <div class="c-document-list__downloads">
                <h4 class="ts-heading-4">English</h4>
                <a class="c-button" href="https://rescue.box.com/s/a">Guide for web<span> PDF 2MB</span></a>
                <a class="c-button" href="https://rescue.box.com/s/b"><span class="icon"></span>Guide for print</a>
              </div>
              <div class="c-document-list__downloads">
                <h4 class="ts-heading-4">Arabic</h4>
                <a class="c-button" href="https://vimeo.com/album/1">Videos_ARABIC</a>
              </div>
              <h4>Additional resources</h4>
              <ul>
                <li><a href="https://rescue.box.com/s/c">Poster <span>(zip)</span></a></li>
                <li><a href="https://example.org/other">Other</a></li>
              </ul>
            </div>
          </li>
          <li class="c-document-list__item">
            <aside><img src="https://cdn.example.org/t2.png"></aside>
            <div class="o-column">
              <h1>Second</h1>
            </div>
          </li>
        </ul></body></html>
    "#;

    fn page(url: &str, html: &str) -> Page {
        Page {
            url: url.to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn test_parse_start_page() {
        let config = SiteConfig::default();
        let site = ToolkitSite::new(&config, "rescue.box.com");
        let start = site
            .parse_start_page(&page("http://shls.rescue.org/", HOME))
            .unwrap();

        assert_eq!(start.brochures.len(), 1);
        assert_eq!(start.brochures[0].title, "IRC SHLS Toolkit Brochure");
        assert_eq!(
            start.brochures[0].url.as_deref(),
            Some("https://rescue.box.com/s/brochure")
        );

        assert_eq!(
            start.tiles,
            vec![
                TopicTile {
                    title: "Healing Classroom".to_string(),
                    description: "Tools for teachers".to_string(),
                    url: "http://shls.rescue.org/healing/".to_string(),
                },
                TopicTile {
                    title: "Safety".to_string(),
                    description: String::new(),
                    url: "http://shls.rescue.org/safety/".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_tile_without_title_is_an_error() {
        let config = SiteConfig::default();
        let site = ToolkitSite::new(&config, "rescue.box.com");
        let html = r#"<a class="c-tile" href="/x/"><div>no header</div></a>"#;
        let err = site
            .parse_start_page(&page("http://shls.rescue.org/", html))
            .unwrap_err();
        assert!(matches!(err, AppError::Crawl { .. }));
    }

    #[test]
    fn test_parse_topic_page() {
        let config = SiteConfig::default();
        let site = ToolkitSite::new(&config, "rescue.box.com");
        let sections = site
            .parse_topic_page(&page("http://shls.rescue.org/healing/", TOPIC))
            .unwrap();

        assert_eq!(sections.len(), 2);
        let ResourceNode::Section(first) = &sections[0] else {
            panic!("expected a section");
        };
        assert_eq!(first.title, "Session Guide");
        let description = first.description.as_deref().unwrap();
        assert!(description.starts_with("First line "));
        assert!(description.ends_with(" second line"));
        assert!(!description.contains('\n'));
        assert_eq!(
            first.thumbnail.as_deref(),
            Some("http://shls.rescue.org/img/thumb.png")
        );

        let kinds: Vec<_> = first.children.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec!["language", "language", "extras"]);

        let ResourceNode::Language(english) = &first.children[0] else {
            panic!("expected a language group");
        };
        assert_eq!(english.language.as_deref(), Some("en"));
        let titles: Vec<_> = english.children.iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["Guide for web", "Guide for print"]);
        assert_eq!(english.children[0], ResourceNode::Link(Link {
            language: Some("en".into()),
            ..Link::remote("Guide for web", "https://rescue.box.com/s/a")
        }));

        let extras = &first.children[2];
        assert_eq!(extras.title(), "Additional resources");
        let titles: Vec<_> = extras.children().iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["Poster", "Other"]);

        assert!(sections[1].children().is_empty());
    }

    #[test]
    fn test_text_without_spans() {
        let html = Html::parse_fragment(
            r#"<a>Report <span>PDF</span>for <span><b>x</b></span>web</a>"#,
        );
        let sel = Selector::parse("a").unwrap();
        let anchor = html.select(&sel).next().unwrap();
        assert_eq!(text_without_spans(anchor), "Report for web");
    }
}
