use crate::common::{read_course, wrapper_ids};
use kha_mark::parse::parse_document;
use pretty_assertions::assert_eq;

mod common;

#[test]
fn it_parses_course_metadata_in_source_order() {
    let document = parse_document(&read_course("circles"));

    let keys: Vec<_> = document.metadata.keys().map(String::as_str).collect();

    assert_eq!(vec!["title", "description", "level", "color"], keys);
    assert_eq!(Some("Circles and Pi"), document.title());
}

#[test]
fn it_splits_sections_with_their_own_metadata() {
    let document = parse_document(&read_course("circles"));

    let sections: Vec<_> = document
        .sections
        .iter()
        .map(|section| (section.id.as_str(), section.title.as_str()))
        .collect();

    assert_eq!(
        vec![
            ("intro", "Introduction"),
            ("radius", "Radius and Diameter"),
            ("pi", "Section 3"),
        ],
        sections
    );
    assert_eq!("blank-0", document.sections[0].metadata["goals"]);
    assert!(!document.metadata.contains_key("goals"));
}

#[test]
fn it_keeps_sections_and_wrappers_in_step() {
    for id in ["circles", "triangles"] {
        let document = parse_document(&read_course(id));
        let ids: Vec<_> = document.sections.iter().map(|s| s.id.clone()).collect();

        assert_eq!(ids, wrapper_ids(&document.html), "{id}");
    }
}

#[test]
fn it_renders_interactive_markup() {
    let document = parse_document(&read_course("circles"));
    let intro = &document.section("intro").expect("intro section").content;
    let radius = &document.section("radius").expect("radius section").content;
    let pi = &document.section("pi").expect("pi section").content;

    for expected in [
        "<h1>Welcome</h1>",
        r#"<span class="choice" data-choices="circle,square,triangle">circle</span>"#,
        r#"<span class="glossary" data-term="circle-radius">radius</span>"#,
        r#"<span class="bio" data-person="euclid">Euclid</span>"#,
    ] {
        assert!(intro.contains(expected), "missing {expected} in {intro}");
    }

    for expected in [
        "<h2>Twice as long</h2>",
        r#"<div class="box blue" id="diameter-note">"#,
        r#"<p>The diameter is <strong>twice</strong> the radius: <span class="math">d = 2r</span>.</p>"#,
        r#"<p class="reveal" when="blank-0">Now try it yourself"#,
        r#"<span class="slider" data-var="r" data-value="3" data-range="1,10,1">3</span>"#,
        r#"<span class="var" data-expr="2*r"></span>"#,
        r#"<span class="input-field" data-value="6" data-range="0.1"></span>"#,
        r#"<span class="emoji">tada</span>"#,
        r#"<p><button class="action" data-action="next">Continue</button></p>"#,
    ] {
        assert!(radius.contains(expected), "missing {expected} in {radius}");
    }

    for expected in [
        "<h3>Pi</h3>",
        r#"<span class="input-field" data-value="3.14" data-hint="roughly three"></span>"#,
        "https://www.youtube.com/embed/dQw4w9WgXcQ",
        r#"<code class="language-py">print(math.pi)</code>"#,
    ] {
        assert!(pi.contains(expected), "missing {expected} in {pi}");
    }
}

#[test]
fn it_treats_undelimited_courses_as_one_section() {
    let document = parse_document(&read_course("triangles"));

    assert_eq!("Geometry", document.metadata["category"]);
    assert_eq!(1, document.sections.len());
    assert_eq!("section-0", document.sections[0].id);
    assert_eq!(
        "<h1>Triangles</h1>\n\n<p>A triangle has <em>three</em> sides and <em>three</em> angles.</p>",
        document.sections[0].content
    );
}

#[test]
fn it_parses_identically_every_time() {
    let source = read_course("circles");

    assert_eq!(parse_document(&source), parse_document(&source));
}
