use anyhow::{anyhow, Context};
use pulldown_cmark::{Event, HeadingLevel, Tag};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, fs, path::Path, str::FromStr};

use crate::{
    cmark::{CMarkParser, InlineEventsExt},
    error::{Error, Result},
};

pub const CATALOG_FILE: &str = "CATALOG.md";

/// The optional `CATALOG.md` index of a content root. It fixes the order courses are listed in
/// and groups them under category headings:
///
/// ```markdown
/// # Geometry
/// * [Circles and Pi](circles)
/// * [Triangles](triangles)
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CatalogItem {
    /// An H1 heading; applies to every course listed after it.
    Category(String),
    Course(CourseLink),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseLink {
    pub title: String,
    pub id: String,
}

/// A course listed in the catalog together with the category it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry<'a> {
    pub link: &'a CourseLink,
    pub category: Option<&'a str>,
}

impl Catalog {
    /// Loads `CATALOG.md` from `root`, or returns `None` when the root has no catalog.
    pub fn load(root: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = root.as_ref().join(CATALOG_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let catalog = source
            .parse()
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(catalog))
    }

    pub fn entries(&self) -> Vec<CatalogEntry<'_>> {
        let mut category = None;
        let mut entries = Vec::new();

        for item in &self.items {
            match item {
                CatalogItem::Category(title) => category = Some(title.as_str()),
                CatalogItem::Course(link) => entries.push(CatalogEntry { link, category }),
            }
        }

        entries
    }
}

impl FromStr for Catalog {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let items = CatalogParser::new(source).parse()?;

        Ok(Self { items })
    }
}

struct CatalogParser<'a> {
    parser: CMarkParser<'a>,
}

impl<'a> CatalogParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            parser: CMarkParser::new(source),
        }
    }

    fn parse(mut self) -> Result<Vec<CatalogItem>> {
        let mut items = Vec::new();

        while let Some(event) = self.parser.next_event() {
            match event {
                Event::Start(Tag::Heading(HeadingLevel::H1, ..)) => {
                    let title = self
                        .parser
                        .iter_until_and_consume(|event| {
                            matches!(event, Event::End(Tag::Heading(HeadingLevel::H1, ..)))
                        })
                        .to_inline_markdown()?;

                    items.push(CatalogItem::Category(title));
                }
                Event::Start(Tag::List(_)) => self.parse_list(&mut items)?,
                // Paragraphs, lower headings and anything else between lists carry no entries.
                Event::Start(other) => self.parser.skip_block(other),
                _ => (),
            }
        }

        Ok(items)
    }

    /// Nested lists are flattened into the surrounding category.
    fn parse_list(&mut self, items: &mut Vec<CatalogItem>) -> Result<()> {
        loop {
            match self.parser.next_event() {
                Some(Event::Start(Tag::Item)) => self.parse_item(items)?,
                Some(Event::End(Tag::List(_))) | None => return Ok(()),
                Some(_) => (),
            }
        }
    }

    fn parse_item(&mut self, items: &mut Vec<CatalogItem>) -> Result<()> {
        let mut linked = false;

        loop {
            match self.parser.next_event() {
                Some(Event::Start(Tag::Paragraph) | Event::End(Tag::Paragraph)) => (),
                Some(Event::Start(Tag::Link(_, href, _))) if !linked => {
                    let link = self.parse_link(&href)?;
                    items.push(CatalogItem::Course(link));
                    linked = true;
                }
                Some(Event::Start(Tag::List(_))) => self.parse_list(items)?,
                Some(Event::End(Tag::Item)) | None => break,
                // Text after the link is a free-form blurb.
                Some(_) if linked => (),
                Some(_) => return Err(self.parse_error("catalog entries must start with a course link")),
            }
        }

        if !linked {
            return Err(self.parse_error("catalog entry has no course link"));
        }

        Ok(())
    }

    fn parse_link(&mut self, href: &str) -> Result<CourseLink> {
        let title = self
            .parser
            .iter_until_and_consume(|event| matches!(event, Event::End(Tag::Link(..))))
            .to_inline_markdown()?;

        let id = href
            .trim()
            .trim_start_matches("./")
            .trim_end_matches("/content.md")
            .trim_end_matches('/')
            .to_string();

        if id.is_empty() {
            return Err(self.parse_error(format!(
                "catalog entry '{title}' does not name a course"
            )));
        }

        Ok(CourseLink { title, id })
    }

    fn parse_error(&self, message: impl Display) -> Error {
        anyhow!(
            "failed to parse {CATALOG_FILE} at {}: {}",
            self.parser.position(),
            message
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Vec<CatalogItem> {
        source
            .parse::<Catalog>()
            .expect("catalog failed to parse")
            .items
    }

    fn course(title: &str, id: &str) -> CatalogItem {
        CatalogItem::Course(CourseLink {
            title: String::from(title),
            id: String::from(id),
        })
    }

    #[test]
    fn lists_courses_under_categories() {
        let input = r#"
# Geometry
* [Circles and Pi](circles)
* [Triangles](triangles/)

# Algebra
* [Sequences](./sequences)
"#;

        let expected = vec![
            CatalogItem::Category(String::from("Geometry")),
            course("Circles and Pi", "circles"),
            course("Triangles", "triangles"),
            CatalogItem::Category(String::from("Algebra")),
            course("Sequences", "sequences"),
        ];

        assert_eq!(expected, parse(input));
    }

    #[test]
    fn skips_comments_paragraphs_and_lower_headings() {
        let input = r#"<!-- # Not a category -->
Some introduction.

## Also ignored
* [Circles](circles)
"#;

        assert_eq!(vec![course("Circles", "circles")], parse(input));
    }

    #[test]
    fn flattens_nested_lists() {
        let input = r#"
* [Circles](circles)
  * [Circle Theorems](circle-theorems)
* [Triangles](triangles)
"#;

        let expected = vec![
            course("Circles", "circles"),
            course("Circle Theorems", "circle-theorems"),
            course("Triangles", "triangles"),
        ];

        assert_eq!(expected, parse(input));
    }

    #[test]
    fn link_titles_with_breaks_are_converted_to_spaces() {
        let input = "* [Circles\nand Pi](circles) - start here";

        assert_eq!(vec![course("Circles and Pi", "circles")], parse(input));
    }

    #[test]
    fn reports_position_of_entries_without_links() {
        let input = "# Geometry\n\n* [Circles](circles)\n* Triangles\n";

        let error = input.parse::<Catalog>().expect_err("should reject plain items");

        assert!(error.to_string().contains("line 4"), "{error}");
    }

    #[test]
    fn entries_carry_their_category() {
        let catalog: Catalog = "* [Intro](intro)\n\n# Geometry\n* [Circles](circles)\n"
            .parse()
            .expect("should parse");

        let entries: Vec<_> = catalog
            .entries()
            .into_iter()
            .map(|entry| (entry.link.id.as_str(), entry.category))
            .collect();

        assert_eq!(vec![("intro", None), ("circles", Some("Geometry"))], entries);
    }
}
