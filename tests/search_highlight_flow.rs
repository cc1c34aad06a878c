use search_highlight::{Error, HighlightConfig, Page, SessionFactory};

const ARTICLE_HTML: &str = r##"<!DOCTYPE html>
<html>
  <head>
    <title>Handbook</title>
  </head>
  <body>
    <nav id="toc"><a href="#one">Setup</a> <a href="#two">Usage</a></nav>
    <article id="content">
      <h1>Setup &amp; usage</h1>
      <p>Run the setup script, then re-run <code>setup --check</code>.</p>
      <ul>
        <li>First setup</li>
        <li>Second <strong>set</strong>up</li>
      </ul>
    </article>
  </body>
</html>
"##;

#[test]
fn search_highlights_and_clear_restores_document() -> search_highlight::Result<()> {
    let mut page = Page::from_html(ARTICLE_HTML)?;
    let factory = SessionFactory::new();
    let mut session = factory.create_default(&mut page)?;
    let before = page.html();

    let count = session.search(&mut page, "setup", Some(&["#content"]))?;
    assert_eq!(count, Some(4));
    assert_eq!(
        page.query_all_with_class(session.highlight_class()).len(),
        20
    );

    session.clear_search_data(&mut page)?;
    assert_eq!(page.html(), before);
    Ok(())
}

#[test]
fn style_block_is_registered_in_head() -> search_highlight::Result<()> {
    let mut page = Page::from_html(ARTICLE_HTML)?;
    let factory = SessionFactory::new();
    let config = HighlightConfig::default()
        .highlight_color("yellow")
        .current_color("orange")
        .class_prefix("find");
    let session = factory.create(&mut page, config)?;

    assert_eq!(session.highlight_class(), "find-highlight-1");
    assert_eq!(session.current_class(), "find-current-1");
    let css = page.text_content("head > style[type='text/css']")?;
    assert_eq!(
        css,
        ".find-highlight-1 { background-color: yellow; } \
         .find-current-1 { background-color: orange; }"
    );
    Ok(())
}

#[test]
fn match_spanning_elements_highlights_every_piece() -> search_highlight::Result<()> {
    let mut page = Page::from_html(ARTICLE_HTML)?;
    let mut session = SessionFactory::new().create_default(&mut page)?;

    session.search(&mut page, "Secondsetup", Some(&["#content li:last-child"]))?;
    assert_eq!(session.match_count(), 1);
    session.set_current(&mut page, 0)?;

    let current = page.query_all_with_class(session.current_class());
    let text = current
        .iter()
        .map(|node| page.node_text(*node))
        .collect::<String>();
    assert_eq!(text, "Secondsetup");
    page.assert_text("#content li:last-child strong", "set")?;
    Ok(())
}

#[test]
fn navigation_spans_all_containers() -> search_highlight::Result<()> {
    let mut page = Page::from_html(ARTICLE_HTML)?;
    let mut session = SessionFactory::new().create_default(&mut page)?;

    let count = session.search(&mut page, "Setup", Some(&["#toc", "#content h1"]))?;
    assert_eq!(count, Some(2));

    let mut visited = Vec::new();
    for _ in 0..count.unwrap_or_default() {
        let index = session.search_next(&mut page)?;
        let selector = index.map(|i| session.results()[i].selector().to_string());
        visited.push(selector);
    }
    assert_eq!(
        visited,
        vec![Some("#toc".to_string()), Some("#content h1".to_string())]
    );
    assert_eq!(session.search_next(&mut page)?, Some(0));
    Ok(())
}

#[test]
fn container_without_head_gets_one() -> search_highlight::Result<()> {
    let mut page = Page::from_html("<html><body><p id='p'>text</p></body></html>")?;
    let session = SessionFactory::new().create_default(&mut page)?;
    page.assert_exists("html > head > style")?;
    assert!(page.is_connected(session.style_node()));
    Ok(())
}

#[test]
fn rejected_config_reports_invalid_config() -> search_highlight::Result<()> {
    let mut page = Page::from_html("<p>x</p>")?;
    let err = SessionFactory::new()
        .create(&mut page, HighlightConfig::default().class_prefix("1st"))
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    Ok(())
}
