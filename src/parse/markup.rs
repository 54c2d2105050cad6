//! Rendering of section bodies from the course markdown dialect to HTML.
//!
//! A body passes through [`RULES`] in order, each rule rewriting the output of the one before.
//! The order is load-bearing:
//!
//! - headings run before paragraph wrapping, which leaves lines that already open a block-level
//!   tag alone;
//! - the typed link forms (`gloss:`, `bio:`, `pill:`, `action:`, `->`) run before the plain
//!   link form, whose pattern would otherwise swallow them;
//! - `[[...]]` fields are never read as links: the link rules skip a `[` that directly follows
//!   another `[`;
//! - slider expressions run before bare variable expressions, and both before attributed
//!   paragraphs, so `{...}` left at the start of a line is always an attribute list;
//! - emphasis runs first but never inside code spans, `{...}` expressions, `[[...]]` fields or
//!   link targets, and emoji never inside tags or rendered code and math.
//!
//! No rule fails on malformed input. Text a rule does not match flows through unchanged.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use regex::{Captures, Regex};
use std::{borrow::Cow, sync::LazyLock};

/// One named rewrite step.
pub struct Rule {
    pub name: &'static str,
    rewrite: Rewrite,
}

enum Rewrite {
    Pattern {
        regex: Regex,
        replace: fn(&Captures<'_>) -> String,
        /// Matches directly preceded by a character this accepts are left untouched.
        not_after: fn(char) -> bool,
        /// Spans copied through verbatim. Only the text between them is rewritten.
        shield: Option<&'static Regex>,
    },
    Lines(fn(&str) -> String),
}

impl Rule {
    fn pattern(name: &'static str, pattern: &str, replace: fn(&Captures<'_>) -> String) -> Self {
        Self::guarded(name, pattern, replace, |_| false)
    }

    fn guarded(
        name: &'static str,
        pattern: &str,
        replace: fn(&Captures<'_>) -> String,
        not_after: fn(char) -> bool,
    ) -> Self {
        let regex = Regex::new(pattern).expect("markup patterns are valid");

        Self {
            name,
            rewrite: Rewrite::Pattern {
                regex,
                replace,
                not_after,
                shield: None,
            },
        }
    }

    /// Leaves every span `spans` matches untouched.
    fn outside(mut self, spans: &'static Regex) -> Self {
        if let Rewrite::Pattern { shield, .. } = &mut self.rewrite {
            *shield = Some(spans);
        }
        self
    }

    fn lines(name: &'static str, rewrite: fn(&str) -> String) -> Self {
        Self {
            name,
            rewrite: Rewrite::Lines(rewrite),
        }
    }

    pub fn apply<'t>(&self, input: &'t str) -> Cow<'t, str> {
        match self.rewritten(input) {
            Some(output) => Cow::Owned(output),
            None => Cow::Borrowed(input),
        }
    }

    /// The rewritten text, or `None` when nothing matched.
    fn rewritten(&self, input: &str) -> Option<String> {
        let (regex, replace, not_after, shield) = match &self.rewrite {
            Rewrite::Pattern {
                regex,
                replace,
                not_after,
                shield,
            } => (regex, *replace, *not_after, shield),
            Rewrite::Lines(rewrite) => return Some(rewrite(input)),
        };

        let Some(shield) = shield else {
            return replace_matches(regex, replace, not_after, input);
        };

        let mut output = String::with_capacity(input.len());
        let mut copied = 0;
        let mut matched = false;
        let spans = shield
            .find_iter(input)
            .map(|span| span.range())
            .chain(std::iter::once(input.len()..input.len()));

        for span in spans {
            let gap = &input[copied..span.start];

            match replace_matches(regex, replace, not_after, gap) {
                Some(rewritten) => {
                    output.push_str(&rewritten);
                    matched = true;
                }
                None => output.push_str(gap),
            }

            output.push_str(&input[span.clone()]);
            copied = span.end;
        }

        matched.then_some(output)
    }
}

fn replace_matches(
    regex: &Regex,
    replace: fn(&Captures<'_>) -> String,
    not_after: fn(char) -> bool,
    input: &str,
) -> Option<String> {
    let mut output = String::new();
    let mut copied = 0;
    let mut matched = false;

    for captures in regex.captures_iter(input) {
        let Some(whole) = captures.get(0) else {
            continue;
        };

        if input[..whole.start()].chars().next_back().is_some_and(not_after) {
            continue;
        }

        output.push_str(&input[copied..whole.start()]);
        output.push_str(&replace(&captures));
        copied = whole.end();
        matched = true;
    }

    if !matched {
        return None;
    }

    output.push_str(&input[copied..]);
    Some(output)
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Code spans, `{...}` and `${...}` expressions, `[[...]]` fields and link targets.
static MARKDOWN_SPANS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`[^`\n]*`|\$?\{[^}\n]*\}|\[\[[^\]\n]*\]\]|\]\([^)\s]*\)")
        .expect("span pattern is valid")
});

/// Rendered code and math, and the inside of any tag.
static HTML_SPANS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<code[^>]*>.*?</code>|<span class="math">[^<]*</span>|<[^>]*>"#)
        .expect("span pattern is valid")
});

/// The rewrite rules in the order they are applied.
pub static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::pattern("headings", r"(?m)^(#{1,3})[ \t]+(.+?)[ \t]*$", heading),
        Rule::pattern("strong", r"\*\*(.+?)\*\*", |c| format!("<strong>{}</strong>", &c[1]))
            .outside(&MARKDOWN_SPANS),
        Rule::pattern("emphasis", r"\*([^*\n]+?)\*", |c| format!("<em>{}</em>", &c[1]))
            .outside(&MARKDOWN_SPANS),
        Rule::pattern("underscore-emphasis", r"\b_([^_\n]+?)_\b", |c| {
            format!("<em>{}</em>", &c[1])
        })
        .outside(&MARKDOWN_SPANS),
        Rule::pattern("media", r"\[(vimeo|youtube):([\w-]+)\]", media),
        Rule::guarded("gloss-link", &link_pattern("gloss:"), gloss_link, after_bracket),
        Rule::guarded("bio-link", &link_pattern("bio:"), bio_link, after_bracket),
        Rule::guarded("pill-link", &link_pattern("pill:"), pill_link, after_bracket),
        Rule::guarded("action-link", &link_pattern("action:"), action_link, after_bracket),
        Rule::guarded("target-link", &link_pattern("->"), target_link, after_bracket),
        Rule::guarded("link", &link_pattern(""), plain_link, after_bracket),
        Rule::pattern("code", r"`\{(py|js|latex)\}([^`]*)`", |c| {
            format!(r#"<code class="language-{}">{}</code>"#, &c[1], text(&c[2]))
        }),
        Rule::pattern("math", r"`([^`\n]+)`", |c| {
            format!(r#"<span class="math">{}</span>"#, text(&c[1]))
        }),
        Rule::pattern("field", r"\[\[([^\]\n]*)\]\]", |c| interactive_field(&c[1])),
        Rule::pattern("slider", r"\$\{([^}\n]*)\}\{([^}\n]*)\}", slider),
        Rule::pattern("variable", r"\$\{([^}\n]*)\}", |c| {
            format!(r#"<span class="var" data-expr="{}"></span>"#, attr(c[1].trim()))
        }),
        Rule::lines("blocks", block_containers),
        Rule::pattern("attributes", r"(?m)^\{([^}\n]*)\}[ \t]*(.*?)[ \t]*$", |c| {
            format!("<p{}>{}</p>", Attributes::parse(&c[1]), &c[2])
        }),
        Rule::lines("paragraphs", wrap_paragraphs),
        Rule::guarded("emoji", r":([a-z][a-z0-9_+-]*):", emoji, |c| {
            c.is_alphanumeric() || matches!(c, ':' | '/' | '"' | '=')
        })
        .outside(&HTML_SPANS),
    ]
});

/// Looks a rule up by name.
pub fn rule(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.name == name)
}

/// Renders a section body to HTML.
pub fn transform(body: &str) -> String {
    let mut html = body.to_string();

    for rule in RULES.iter() {
        if let Some(rewritten) = rule.rewritten(&html) {
            html = rewritten;
        }
    }

    html
}

fn heading(captures: &Captures<'_>) -> String {
    let level = captures[1].len();

    format!("<h{level}>{}</h{level}>", &captures[2])
}

fn media(captures: &Captures<'_>) -> String {
    let id = attr(&captures[2]);
    let src = match &captures[1] {
        "vimeo" => format!("https://player.vimeo.com/video/{id}"),
        _ => format!("https://www.youtube.com/embed/{id}"),
    };

    format!(
        r#"<div class="video-embed"><iframe src="{src}" frameborder="0" allow="autoplay; fullscreen" allowfullscreen></iframe></div>"#
    )
}

fn link_pattern(scheme: &str) -> String {
    format!(r"\[([^\[\]\n]+)\]\({}([^)\s]*)\)", regex::escape(scheme))
}

fn after_bracket(previous: char) -> bool {
    previous == '['
}

fn gloss_link(captures: &Captures<'_>) -> String {
    format!(
        r#"<span class="glossary" data-term="{}">{}</span>"#,
        attr(&captures[2]),
        &captures[1]
    )
}

fn bio_link(captures: &Captures<'_>) -> String {
    format!(
        r#"<span class="bio" data-person="{}">{}</span>"#,
        attr(&captures[2]),
        &captures[1]
    )
}

fn pill_link(captures: &Captures<'_>) -> String {
    format!(
        r#"<span class="pill" data-kind="{}">{}</span>"#,
        attr(&captures[2]),
        &captures[1]
    )
}

fn action_link(captures: &Captures<'_>) -> String {
    format!(
        r#"<button class="action" data-action="{}">{}</button>"#,
        attr(&captures[2]),
        &captures[1]
    )
}

fn target_link(captures: &Captures<'_>) -> String {
    format!(
        r#"<a class="target" data-target="{}">{}</a>"#,
        attr(&captures[2]),
        &captures[1]
    )
}

fn plain_link(captures: &Captures<'_>) -> String {
    format!(r#"<a href="{}">{}</a>"#, attr(&captures[2]), &captures[1])
}

static HINTED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((.*)\)$").expect("hint pattern is valid"));

/// Renders the inside of a `[[...]]` field. The forms are tried in priority order: choices,
/// then a ranged answer, then a hinted answer, then a plain blank.
fn interactive_field(content: &str) -> String {
    let content = content.trim();

    if content.contains('|') {
        let choices: Vec<_> = content.split('|').map(str::trim).collect();

        return format!(
            r#"<span class="choice" data-choices="{}">{}</span>"#,
            attr(&choices.join(",")),
            text(choices[0])
        );
    }

    if let Some((value, range)) = content.split_once('±') {
        let range = match range.trim() {
            "" => "0",
            range => range,
        };

        return format!(
            r#"<span class="input-field" data-value="{}" data-range="{}"></span>"#,
            attr(value.trim()),
            attr(range)
        );
    }

    if let Some(hinted) = HINTED_VALUE.captures(content) {
        return format!(
            r#"<span class="input-field" data-value="{}" data-hint="{}"></span>"#,
            attr(&hinted[1]),
            attr(hinted[2].trim())
        );
    }

    if content.is_empty() {
        tracing::debug!("empty interactive field");
    }

    format!(
        r#"<span class="input-field" data-value="{}"></span>"#,
        attr(content)
    )
}

/// `${expr}{name|initial|min,max,step}`. A missing name falls back to the expression.
fn slider(captures: &Captures<'_>) -> String {
    let expr = captures[1].trim();
    let mut parts = captures[2].split('|').map(str::trim);

    let name = parts.next().filter(|name| !name.is_empty()).unwrap_or(expr);
    let value = parts.next().unwrap_or_default();
    let range = parts.next().unwrap_or_default();

    format!(
        r#"<span class="slider" data-var="{}" data-value="{}" data-range="{}">{}</span>"#,
        attr(name),
        attr(value),
        attr(range),
        text(value)
    )
}

fn emoji(captures: &Captures<'_>) -> String {
    format!(r#"<span class="emoji">{}</span>"#, &captures[1])
}

/// Turns `::: .class#id` ... `:::` pairs into `<div>`s. Containers nest; a container left open
/// at the end of the body is closed there.
fn block_containers(body: &str) -> String {
    let mut lines = Vec::new();
    let mut open = 0usize;

    for line in body.lines() {
        let Some(spec) = line.trim().strip_prefix(":::") else {
            lines.push(line.to_string());
            continue;
        };

        match spec.trim() {
            "" if open > 0 => {
                lines.push(String::from("</div>"));
                open -= 1;
            }
            "" => lines.push(line.to_string()),
            spec => {
                lines.push(format!("<div{}>", Attributes::parse(spec)));
                open += 1;
            }
        }
    }

    if open > 0 {
        tracing::debug!(open, "closing unterminated block containers");
        lines.extend((0..open).map(|_| String::from("</div>")));
    }

    lines.join("\n")
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "iframe", "li", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

fn opens_block(line: &str) -> bool {
    let Some(tag) = line.strip_prefix('<') else {
        return false;
    };

    if tag.starts_with("!--") {
        return true;
    }

    let name: String = tag
        .trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    BLOCK_TAGS.contains(&name.as_str())
}

/// Wraps every non-blank line that does not already open a block-level tag in `<p>`.
fn wrap_paragraphs(body: &str) -> String {
    body.lines()
        .map(|line| {
            let trimmed = line.trim();

            if trimmed.is_empty() || opens_block(trimmed) {
                line.to_string()
            } else {
                format!("<p>{trimmed}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classes, id and extra attributes written as `.class#id(key=value)`. Bare words count as
/// classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl Attributes {
    pub fn parse(spec: &str) -> Self {
        enum Token {
            Class,
            Id,
        }

        fn finish(current: &mut Option<(Token, String)>, attributes: &mut Attributes) {
            match current.take() {
                Some((_, name)) if name.is_empty() => (),
                Some((Token::Class, name)) => attributes.classes.push(name),
                Some((Token::Id, name)) => attributes.id = Some(name),
                None => (),
            }
        }

        let mut attributes = Self::default();
        let mut current: Option<(Token, String)> = None;
        let mut chars = spec.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    finish(&mut current, &mut attributes);
                    current = Some((Token::Class, String::new()));
                }
                '#' => {
                    finish(&mut current, &mut attributes);
                    current = Some((Token::Id, String::new()));
                }
                '(' => {
                    finish(&mut current, &mut attributes);
                    let inner: String = chars.by_ref().take_while(|c| *c != ')').collect();
                    attributes.extra.extend(parse_pairs(&inner));
                }
                c if c.is_whitespace() => finish(&mut current, &mut attributes),
                c => {
                    if let Some((_, name)) = current.as_mut() {
                        name.push(c);
                    } else {
                        current = Some((Token::Class, String::from(c)));
                    }
                }
            }
        }
        finish(&mut current, &mut attributes);

        attributes
    }
}

fn parse_pairs(inner: &str) -> Vec<(String, String)> {
    inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (
                key.trim().to_string(),
                value.trim().trim_matches(&['"', '\''][..]).to_string(),
            ),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

impl std::fmt::Display for Attributes {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.classes.is_empty() {
            write!(formatter, r#" class="{}""#, attr(&self.classes.join(" ")))?;
        }

        if let Some(id) = &self.id {
            write!(formatter, r#" id="{}""#, attr(id))?;
        }

        for (key, value) in &self.extra {
            write!(formatter, r#" {}="{}""#, attr(key), attr(value))?;
        }

        Ok(())
    }
}
