use super::*;

/// Resolves CSS backslash escapes (`\"`, `\31 `, `\.`) in selector strings.
pub(super) fn unescape_string(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            let Some(digit) = chars.next_if(char::is_ascii_hexdigit) else {
                break;
            };
            hex.push(digit);
        }
        if hex.is_empty() {
            out.push(chars.next().unwrap_or('\\'));
            continue;
        }
        let decoded = u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}');
        out.push(decoded);
        chars.next_if(char::is_ascii_whitespace);
    }
    out
}

/// Expands `&name;`, `&#65;` and `&#x41;`. Unknown references stay literal
/// and the trailing `;` is optional.
fn decode_html_character_references(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let name_len = tail
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '#'))
            .unwrap_or(tail.len());
        let (name, after) = tail.split_at(name_len);
        match resolve_reference(name) {
            Some(ch) => {
                out.push(ch);
                rest = after.strip_prefix(';').unwrap_or(after);
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_reference(name: &str) -> Option<char> {
    let Some(number) = name.strip_prefix('#') else {
        return named_reference(name);
    };
    let codepoint = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse::<u32>().ok()?,
    };
    char::from_u32(codepoint)
}

fn named_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        "ensp" => Some('\u{2002}'),
        "emsp" => Some('\u{2003}'),
        "thinsp" => Some('\u{2009}'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "trade" => Some('™'),
        "euro" => Some('€'),
        "pound" => Some('£'),
        "yen" => Some('¥'),
        "laquo" => Some('«'),
        "raquo" => Some('»'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "hellip" => Some('…'),
        "middot" => Some('·'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "deg" => Some('°'),
        "times" => Some('×'),
        "divide" => Some('÷'),
        _ => None,
    }
}

pub(super) fn escape_html_text_for_serialization(value: &str) -> String {
    escape_for_serialization(value, false)
}

pub(super) fn escape_html_attr_for_serialization(value: &str) -> String {
    escape_for_serialization(value, true)
}

fn escape_for_serialization(value: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '<' if !in_attribute => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Builds a document from `html`. Tags are lowercased, an end tag closes the
/// nearest open element of its name (or nothing), and a block start tag
/// closes an open `<p>`.
pub(super) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut open = vec![dom.root];
    let mut tokens = Tokenizer { src: html, pos: 0 };

    while let Some(token) = tokens.next_token()? {
        match token {
            Token::Text(text) => {
                let text = decode_html_character_references(text);
                if !text.is_empty() {
                    dom.create_text(innermost(&open)?, text);
                }
            }
            Token::End(tag) => close_element(&dom, &mut open, &tag),
            Token::Start {
                tag,
                attrs,
                self_closing,
            } => {
                if closes_paragraph(&tag) && open.len() > 1 && top_is_paragraph(&dom, &open) {
                    open.pop();
                }
                let node = dom.create_element(innermost(&open)?, tag.clone(), attrs);
                if is_raw_text_tag(&tag) && !self_closing {
                    let body = tokens.raw_text(&tag)?;
                    let body = match tag.as_str() {
                        "title" | "textarea" => decode_html_character_references(body),
                        _ => body.to_string(),
                    };
                    if !body.is_empty() {
                        dom.create_text(node, body);
                    }
                } else if !self_closing && !is_void_tag(&tag) {
                    open.push(node);
                }
            }
        }
    }

    Ok(dom)
}

fn innermost(open: &[NodeId]) -> Result<NodeId> {
    open.last()
        .copied()
        .ok_or_else(|| Error::HtmlParse("missing parent element".into()))
}

fn top_is_paragraph(dom: &Dom, open: &[NodeId]) -> bool {
    open.last()
        .and_then(|node| dom.tag_name(*node))
        .is_some_and(|name| name.eq_ignore_ascii_case("p"))
}

/// Pops the nearest open element named `tag` and everything above it.
fn close_element(dom: &Dom, open: &mut Vec<NodeId>, tag: &str) {
    let position = open.iter().skip(1).rposition(|node| {
        dom.tag_name(*node)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    });
    if let Some(position) = position {
        open.truncate(position + 1);
    }
}

enum Token<'a> {
    Start {
        tag: String,
        attrs: HashMap<String, String>,
        self_closing: bool,
    },
    End(String),
    Text(&'a str),
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or_default()
    }

    fn eat(&mut self, prefix: &str) -> bool {
        let found = self.rest().starts_with(prefix);
        if found {
            self.pos += prefix.len();
        }
        found
    }

    /// Advances to the first position where `stop` holds for the remaining
    /// input, or to the end, and returns what was skipped.
    fn until(&mut self, stop: impl Fn(&str) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .map(|(at, _)| at)
            .find(|at| stop(&rest[*at..]))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn take_while(&mut self, accept: fn(char) -> bool) -> &'a str {
        self.until(|rest| !rest.starts_with(accept))
    }

    fn skip_ws(&mut self) {
        self.take_while(|ch| ch.is_ascii_whitespace());
    }

    /// Next tag or text run. Comments and declarations are skipped.
    fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Ok(None);
            }
            if self.eat("<!--") {
                let end = self
                    .rest()
                    .find("-->")
                    .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
                self.pos += end + 3;
                continue;
            }
            if !starts_markup(rest) {
                return Ok(Some(Token::Text(self.until(starts_markup))));
            }
            if rest.starts_with("</") {
                return self.end_tag().map(|tag| Some(Token::End(tag)));
            }
            if rest.starts_with("<!") {
                self.declaration()?;
                continue;
            }
            return self.start_tag().map(Some);
        }
    }

    fn start_tag(&mut self) -> Result<Token<'a>> {
        self.eat("<");
        self.skip_ws();
        let tag = self.take_while(is_tag_char).to_ascii_lowercase();
        if tag.is_empty() {
            return Err(Error::HtmlParse("empty tag name".into()));
        }

        let mut attrs = HashMap::new();
        loop {
            self.skip_ws();
            let self_closing = if self.eat(">") {
                false
            } else if self.eat("/>") {
                true
            } else {
                match self.rest().chars().next() {
                    None => return Err(Error::HtmlParse("unclosed start tag".into())),
                    Some(ch) if !is_attr_name_char(ch) => {
                        // Junk is dropped up to the next attribute boundary.
                        self.until(ends_unquoted_value);
                    }
                    Some(_) => {
                        let name = self.take_while(is_attr_name_char).to_ascii_lowercase();
                        self.skip_ws();
                        let value = if self.eat("=") {
                            self.skip_ws();
                            self.attr_value()?
                        } else {
                            String::new()
                        };
                        attrs.entry(name).or_insert(value);
                    }
                }
                continue;
            };
            return Ok(Token::Start {
                tag,
                attrs,
                self_closing,
            });
        }
    }

    fn attr_value(&mut self) -> Result<String> {
        let quote = match self.rest().chars().next() {
            None => return Err(Error::HtmlParse("missing attribute value".into())),
            Some('\'') => "'",
            Some('"') => "\"",
            Some(_) => {
                let value = self.until(ends_unquoted_value);
                return Ok(decode_html_character_references(value));
            }
        };
        self.eat(quote);
        let value = self.until(|rest| rest.starts_with(quote));
        if !self.eat(quote) {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        Ok(decode_html_character_references(value))
    }

    fn end_tag(&mut self) -> Result<String> {
        self.eat("</");
        self.skip_ws();
        let tag = self.take_while(is_tag_char).to_ascii_lowercase();
        self.until(|rest| rest.starts_with('>'));
        if !self.eat(">") {
            return Err(Error::HtmlParse("unclosed end tag".into()));
        }
        Ok(tag)
    }

    /// Skips `<!...>`, where a quoted `>` does not close the tag.
    fn declaration(&mut self) -> Result<()> {
        self.eat("<!");
        let mut quote = None;
        let end = self.rest().char_indices().find_map(|(at, ch)| {
            match quote {
                Some(open) if ch == open => quote = None,
                Some(_) => {}
                None if ch == '\'' || ch == '"' => quote = Some(ch),
                None if ch == '>' => return Some(at),
                None => {}
            }
            None
        });
        let end = end.ok_or_else(|| Error::HtmlParse("unclosed declaration tag".into()))?;
        self.pos += end + 1;
        Ok(())
    }

    /// Body of a `<script>`-like element up to its end tag, which is consumed.
    fn raw_text(&mut self, tag: &str) -> Result<&'a str> {
        let body = self.until(|rest| closes_raw_text(rest, tag));
        if self.rest().is_empty() {
            return Err(Error::HtmlParse(format!("unclosed <{tag}>")));
        }
        self.end_tag()?;
        Ok(body)
    }
}

fn starts_markup(rest: &str) -> bool {
    rest.strip_prefix('<').is_some_and(|after| {
        after.starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '/' || ch == '!')
    })
}

fn ends_unquoted_value(rest: &str) -> bool {
    rest.starts_with(|ch: char| ch.is_ascii_whitespace() || ch == '>') || rest.starts_with("/>")
}

fn closes_raw_text(rest: &str, tag: &str) -> bool {
    let Some(after) = rest.strip_prefix("</") else {
        return false;
    };
    let after = after.trim_start_matches(|ch: char| ch.is_ascii_whitespace());
    match (after.get(..tag.len()), after.get(tag.len()..)) {
        (Some(name), Some(tail)) => {
            name.eq_ignore_ascii_case(tag)
                && !tail.starts_with(|ch: char| ch.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn closes_paragraph(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "div"
            | "dl"
            | "fieldset"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "title" | "textarea")
}

fn is_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn is_attr_name_char(ch: char) -> bool {
    is_tag_char(ch) || ch == ':'
}

pub(super) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_text() -> Result<()> {
        let dom = parse_html("<div id='a'><p>one <b>two</b></p></div>")?;
        let div = dom.by_id("a").ok_or_else(|| Error::SelectorNotFound("#a".into()))?;
        assert_eq!(dom.text_content(div), "one two");
        assert_eq!(dom.dump_node(div), "<div id=\"a\"><p>one <b>two</b></p></div>");
        Ok(())
    }

    #[test]
    fn decodes_character_references_in_text_and_attributes() -> Result<()> {
        let dom = parse_html("<p id='p' title='a&amp;b'>x &lt; y&nbsp;&#65;&#x42;</p>")?;
        let p = dom.by_id("p").ok_or_else(|| Error::SelectorNotFound("#p".into()))?;
        assert_eq!(dom.attr(p, "title").as_deref(), Some("a&b"));
        assert_eq!(dom.text_content(p), "x < y\u{00A0}AB");
        Ok(())
    }

    #[test]
    fn keeps_style_body_raw() -> Result<()> {
        let dom = parse_html("<head><style>.a > .b { color: red; }</style></head>")?;
        let style = dom
            .find_first_by_tag("style")
            .ok_or_else(|| Error::SelectorNotFound("style".into()))?;
        assert_eq!(dom.text_content(style), ".a > .b { color: red; }");
        Ok(())
    }

    #[test]
    fn stray_less_than_is_text() -> Result<()> {
        let dom = parse_html("<p id='p'>1 < 2</p>")?;
        let p = dom.by_id("p").ok_or_else(|| Error::SelectorNotFound("#p".into()))?;
        assert_eq!(dom.text_content(p), "1 < 2");
        Ok(())
    }

    #[test]
    fn unmatched_end_tag_is_ignored() -> Result<()> {
        let dom = parse_html("<div id='d'>a</span>b</div>")?;
        let d = dom.by_id("d").ok_or_else(|| Error::SelectorNotFound("#d".into()))?;
        assert_eq!(dom.text_content(d), "ab");
        Ok(())
    }

    #[test]
    fn skips_doctype_and_reads_unquoted_attributes() -> Result<()> {
        let dom = parse_html("<!DOCTYPE html><p id=x class=a/b data-k='>'>t</p>")?;
        let p = dom.by_id("x").ok_or_else(|| Error::SelectorNotFound("#x".into()))?;
        assert_eq!(dom.attr(p, "class").as_deref(), Some("a/b"));
        assert_eq!(dom.attr(p, "data-k").as_deref(), Some(">"));
        assert_eq!(dom.text_content(p), "t");
        Ok(())
    }

    #[test]
    fn title_body_is_decoded_up_to_any_case_end_tag() -> Result<()> {
        let dom = parse_html("<title>A &amp; <b>B</TITLE><p>after</p>")?;
        let title = dom
            .find_first_by_tag("title")
            .ok_or_else(|| Error::SelectorNotFound("title".into()))?;
        assert_eq!(dom.text_content(title), "A & <b>B");
        assert!(dom.find_first_by_tag("b").is_none());
        Ok(())
    }

    #[test]
    fn block_start_tag_closes_open_paragraph() -> Result<()> {
        let dom = parse_html("<p id='p'>one<div id='d'>two</div>")?;
        let div = dom.by_id("d").ok_or_else(|| Error::SelectorNotFound("#d".into()))?;
        assert_eq!(dom.parent(div), Some(dom.root));
        Ok(())
    }

    #[test]
    fn unclosed_comment_is_an_error() {
        let err = parse_html("<div><!-- nope").expect_err("comment never closes");
        assert_eq!(err, Error::HtmlParse("unclosed HTML comment".into()));
    }

    #[test]
    fn unescape_handles_hex_and_literal_escapes() {
        assert_eq!(unescape_string(r"a\.b"), "a.b");
        assert_eq!(unescape_string(r"\31 0"), "10");
        assert_eq!(unescape_string(r#"say \"hi\""#), "say \"hi\"");
    }
}
