//! Reader for the legacy XML content export: a channel/item document
//! carrying the same fields as the SQL dump (authors, categories, content
//! items). Event-based parse, no DOM.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlAuthor {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlCategory {
    pub nicename: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlItem {
    pub id: i64,
    pub title: String,
    pub creator: String,
    pub content: String,
    pub excerpt: String,
    pub date: String,
    pub status: String,
    pub slug: String,
    pub post_type: String,
    pub categories: Vec<XmlCategory>,
}

#[derive(Debug, Default)]
pub struct XmlExport {
    pub authors: Vec<XmlAuthor>,
    pub items: Vec<XmlItem>,
}

/// Parses the whole export document. Structural XML errors are fatal;
/// missing fields on individual items are left empty for the pipeline's
/// row-level validation to deal with.
pub fn parse_export(text: &str) -> Result<XmlExport> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut export = XmlExport::default();
    let mut author: Option<XmlAuthor> = None;
    let mut item: Option<XmlItem> = None;
    let mut category: Option<XmlCategory> = None;
    let mut tag = String::new();

    loop {
        match reader.read_event().context("Failed to parse XML export")? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "wp:author" => author = Some(XmlAuthor::default()),
                    "item" => item = Some(XmlItem::default()),
                    "category" if item.is_some() => {
                        let mut domain = String::new();
                        let mut nicename = String::new();
                        for attr in e.attributes() {
                            let attr = attr.context("Bad category attribute")?;
                            let value = attr
                                .unescape_value()
                                .context("Bad category attribute value")?
                                .into_owned();
                            match attr.key.as_ref() {
                                b"domain" => domain = value,
                                b"nicename" => nicename = value,
                                _ => {}
                            }
                        }
                        // Tags and other taxonomies share the element name;
                        // only the category domain is imported.
                        if domain == "category" {
                            category = Some(XmlCategory {
                                nicename,
                                name: String::new(),
                            });
                        }
                    }
                    _ => tag = name,
                }
            }
            Event::Text(t) => {
                let text = t.unescape().context("Bad text content")?.into_owned();
                record_text(&mut author, &mut item, &mut category, &tag, &text);
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                record_text(&mut author, &mut item, &mut category, &tag, &text);
            }
            Event::End(e) => {
                match e.name().as_ref() {
                    b"wp:author" => {
                        if let Some(a) = author.take() {
                            export.authors.push(a);
                        }
                    }
                    b"item" => {
                        if let Some(i) = item.take() {
                            export.items.push(i);
                        }
                    }
                    b"category" => {
                        if let (Some(c), Some(i)) = (category.take(), item.as_mut()) {
                            i.categories.push(c);
                        }
                    }
                    _ => {}
                }
                tag.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(export)
}

fn record_text(
    author: &mut Option<XmlAuthor>,
    item: &mut Option<XmlItem>,
    category: &mut Option<XmlCategory>,
    tag: &str,
    text: &str,
) {
    if let Some(cat) = category {
        cat.name.push_str(text);
        return;
    }
    if let Some(a) = author {
        match tag {
            "wp:author_id" => a.id = text.trim().parse().unwrap_or(0),
            "wp:author_login" => a.login.push_str(text),
            "wp:author_email" => a.email.push_str(text),
            "wp:author_display_name" => a.display_name.push_str(text),
            _ => {}
        }
        return;
    }
    if let Some(i) = item {
        match tag {
            "title" => i.title.push_str(text),
            "dc:creator" => i.creator.push_str(text),
            "content:encoded" => i.content.push_str(text),
            "excerpt:encoded" => i.excerpt.push_str(text),
            "wp:post_id" => i.id = text.trim().parse().unwrap_or(0),
            "wp:post_date" => i.date.push_str(text),
            "wp:status" => i.status.push_str(text),
            "wp:post_name" => i.slug.push_str(text),
            "wp:post_type" => i.post_type.push_str(text),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_export() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
    <title>Example Site</title>
    <wp:author>
        <wp:author_id>2</wp:author_id>
        <wp:author_login>jdoe</wp:author_login>
        <wp:author_email>jdoe@example.com</wp:author_email>
        <wp:author_display_name><![CDATA[John Doe]]></wp:author_display_name>
    </wp:author>
    <item>
        <title>Hi</title>
        <dc:creator><![CDATA[jdoe]]></dc:creator>
        <category domain="category" nicename="news"><![CDATA[News]]></category>
        <category domain="post_tag" nicename="misc"><![CDATA[Misc]]></category>
        <content:encoded><![CDATA[<p>Hello &amp; welcome</p>]]></content:encoded>
        <excerpt:encoded><![CDATA[]]></excerpt:encoded>
        <wp:post_id>1</wp:post_id>
        <wp:post_date>2020-01-01 00:00:00</wp:post_date>
        <wp:status>publish</wp:status>
        <wp:post_name>hi</wp:post_name>
        <wp:post_type>post</wp:post_type>
    </item>
</channel>
</rss>"#
    }

    #[test]
    fn parses_authors() {
        let export = parse_export(sample_export()).unwrap();
        assert_eq!(export.authors.len(), 1);
        let a = &export.authors[0];
        assert_eq!(a.id, 2);
        assert_eq!(a.login, "jdoe");
        assert_eq!(a.email, "jdoe@example.com");
        assert_eq!(a.display_name, "John Doe");
    }

    #[test]
    fn parses_items_with_cdata_content() {
        let export = parse_export(sample_export()).unwrap();
        assert_eq!(export.items.len(), 1);
        let item = &export.items[0];
        assert_eq!(item.id, 1);
        assert_eq!(item.title, "Hi");
        assert_eq!(item.creator, "jdoe");
        assert_eq!(item.content, "<p>Hello &amp; welcome</p>");
        assert_eq!(item.excerpt, "");
        assert_eq!(item.status, "publish");
        assert_eq!(item.slug, "hi");
        assert_eq!(item.post_type, "post");
    }

    #[test]
    fn only_category_domain_is_kept() {
        let export = parse_export(sample_export()).unwrap();
        let cats = &export.items[0].categories;
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].nicename, "news");
        assert_eq!(cats[0].name, "News");
    }

    #[test]
    fn xml_entities_in_text_are_decoded() {
        let xml = r#"<rss><channel><item><title>A &amp; B</title></item></channel></rss>"#;
        let export = parse_export(xml).unwrap();
        assert_eq!(export.items[0].title, "A & B");
    }

    #[test]
    fn empty_document_yields_empty_export() {
        let export = parse_export("<rss><channel></channel></rss>").unwrap();
        assert!(export.authors.is_empty());
        assert!(export.items.is_empty());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        assert!(parse_export("<rss><channel></item></rss>").is_err());
    }
}
