use super::*;

/// Comma-separated alternatives, each a combinator chain.
pub(crate) type SelectorList = Vec<Vec<SelectorPart>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrSelector {
    pub(crate) key: String,
    pub(crate) op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
    Word(String),
    DashPrefix(String),
}

impl AttrSelector {
    pub(crate) fn matches(&self, attrs: &HashMap<String, String>) -> bool {
        let Some(actual) = attrs.get(&self.key) else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(value) => actual == value,
            AttrOp::Prefix(value) => !value.is_empty() && actual.starts_with(value.as_str()),
            AttrOp::Suffix(value) => !value.is_empty() && actual.ends_with(value.as_str()),
            AttrOp::Substring(value) => !value.is_empty() && actual.contains(value.as_str()),
            AttrOp::Word(value) => actual.split_whitespace().any(|word| word == value),
            AttrOp::DashPrefix(value) => {
                actual == value
                    || actual
                        .strip_prefix(value.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

/// `an+b` over 1-based sibling positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NthFormula {
    pub(crate) step: i64,
    pub(crate) offset: i64,
}

impl NthFormula {
    pub(crate) const FIRST: Self = Self { step: 0, offset: 1 };

    pub(crate) fn matches(self, position: usize) -> bool {
        let diff = position as i64 - self.offset;
        if self.step == 0 {
            return diff == 0;
        }
        diff % self.step == 0 && diff / self.step >= 0
    }

    /// Parses `odd`, `even`, a positive position, or an `an+b` expression.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let compact = raw
            .chars()
            .filter(|ch| !ch.is_ascii_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "odd" => return Some(Self { step: 2, offset: 1 }),
            "even" => return Some(Self { step: 2, offset: 0 }),
            _ => {}
        }

        let Some((step, offset)) = compact.split_once('n') else {
            if !compact.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let offset = compact.parse::<i64>().ok().filter(|value| *value > 0)?;
            return Some(Self { step: 0, offset });
        };
        let step = match step {
            "" | "+" => 1,
            "-" => -1,
            other => other.parse().ok()?,
        };
        let offset = match offset.as_bytes() {
            [] => 0,
            [b'+' | b'-', digits @ ..]
                if !digits.is_empty() && digits.iter().all(u8::is_ascii_digit) =>
            {
                offset.parse().ok()?
            }
            _ => return None,
        };
        Some(Self { step, offset })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorPseudoClass {
    /// `:nth-child` and its relatives. `:first-child` is `Nth` at [`NthFormula::FIRST`].
    Nth {
        formula: NthFormula,
        of_type: bool,
        from_end: bool,
    },
    Only {
        of_type: bool,
    },
    Empty,
    Not(SelectorList),
    /// `:is` and `:where`.
    Is(SelectorList),
    Has(SelectorList),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrSelector>,
    pub(crate) pseudo_classes: Vec<SelectorPseudoClass>,
}

impl SelectorStep {
    /// The id of a bare `#id` step.
    pub(crate) fn id_only(&self) -> Option<&str> {
        let bare = !self.universal
            && self.tag.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.pseudo_classes.is_empty();
        self.id.as_deref().filter(|_| bare)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to the part on the left; `None` for the first.
    pub(crate) combinator: Option<SelectorCombinator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SelectorToken {
    Compound(String),
    Combinator(SelectorCombinator),
}

pub(crate) fn parse_selector_groups(selector: &str) -> Result<SelectorList> {
    split_selector_groups(selector)?
        .iter()
        .map(|group| parse_selector_chain(group))
        .collect()
}

pub(crate) fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let selector = selector.trim();
    let reject = || Error::UnsupportedSelector(selector.into());

    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending = None;
    for token in tokenize_selector(selector)? {
        match token {
            SelectorToken::Combinator(combinator) => {
                if parts.is_empty() || pending.replace(combinator).is_some() {
                    return Err(reject());
                }
            }
            SelectorToken::Compound(raw) => {
                let combinator = (!parts.is_empty())
                    .then(|| pending.take().unwrap_or(SelectorCombinator::Descendant));
                parts.push(SelectorPart {
                    step: parse_selector_step(&raw)?,
                    combinator,
                });
            }
        }
    }

    if parts.is_empty() || pending.is_some() {
        return Err(reject());
    }
    Ok(parts)
}

/// Tracks `[...]`/`(...)` nesting and quoted strings while scanning a selector.
#[derive(Debug, Default)]
struct SelectorScanDepth {
    bracket: usize,
    paren: usize,
    quote: Option<char>,
    escaped: bool,
}

impl SelectorScanDepth {
    /// Feeds one character, returns `false` on an unbalanced closer.
    fn feed(&mut self, ch: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return true;
        }
        if ch == '\\' {
            self.escaped = true;
            return true;
        }
        if let Some(quote) = self.quote {
            if ch == quote {
                self.quote = None;
            }
            return true;
        }
        match ch {
            '"' | '\'' => self.quote = Some(ch),
            '[' => self.bracket += 1,
            ']' => match self.bracket.checked_sub(1) {
                Some(depth) => self.bracket = depth,
                None => return false,
            },
            '(' => self.paren += 1,
            ')' => match self.paren.checked_sub(1) {
                Some(depth) => self.paren = depth,
                None => return false,
            },
            _ => {}
        }
        true
    }

    fn at_top_level(&self) -> bool {
        self.bracket == 0 && self.paren == 0 && self.quote.is_none() && !self.escaped
    }
}

fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let reject = || Error::UnsupportedSelector(selector.into());
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = SelectorScanDepth::default();

    for ch in selector.chars() {
        if ch == ',' && depth.at_top_level() {
            groups.push(std::mem::take(&mut current));
            continue;
        }
        if !depth.feed(ch) {
            return Err(reject());
        }
        current.push(ch);
    }
    if !depth.at_top_level() {
        return Err(reject());
    }
    groups.push(current);

    groups
        .into_iter()
        .map(|group| match group.trim() {
            "" => Err(reject()),
            trimmed => Ok(trimmed.to_string()),
        })
        .collect()
}

fn tokenize_selector(selector: &str) -> Result<Vec<SelectorToken>> {
    fn flush(current: &mut String, tokens: &mut Vec<SelectorToken>) {
        if !current.is_empty() {
            tokens.push(SelectorToken::Compound(std::mem::take(current)));
        }
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = SelectorScanDepth::default();

    for ch in selector.chars() {
        if depth.at_top_level() {
            let combinator = match ch {
                '>' => Some(SelectorCombinator::Child),
                '+' => Some(SelectorCombinator::AdjacentSibling),
                '~' => Some(SelectorCombinator::GeneralSibling),
                _ => None,
            };
            if let Some(combinator) = combinator {
                flush(&mut current, &mut tokens);
                tokens.push(SelectorToken::Combinator(combinator));
                continue;
            }
            if ch.is_ascii_whitespace() {
                flush(&mut current, &mut tokens);
                continue;
            }
        }
        if !depth.feed(ch) {
            return Err(Error::UnsupportedSelector(selector.into()));
        }
        current.push(ch);
    }

    if !depth.at_top_level() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    flush(&mut current, &mut tokens);
    Ok(tokens)
}

/// Parses one compound selector such as `li.item[data-x]:first-child`.
pub(crate) fn parse_selector_step(part: &str) -> Result<SelectorStep> {
    let part = part.trim();
    let reject = || Error::UnsupportedSelector(part.into());
    if part.is_empty() {
        return Err(reject());
    }

    let mut cursor = StepCursor::new(part);
    let mut step = SelectorStep::default();
    while let Some(ch) = cursor.peek() {
        let at_start = cursor.pos == 0;
        if matches!(ch, '*' | '#' | '.' | '[' | ':') {
            cursor.bump();
        }
        match ch {
            '*' if at_start => step.universal = true,
            '#' => {
                let id = cursor.ident().ok_or_else(reject)?;
                if step.id.replace(id).is_some() {
                    return Err(reject());
                }
            }
            '.' => step.classes.push(cursor.ident().ok_or_else(reject)?),
            '[' => step.attrs.push(cursor.attr_selector().ok_or_else(reject)?),
            ':' => step
                .pseudo_classes
                .push(cursor.pseudo_class().ok_or_else(reject)?),
            _ if at_start => {
                step.tag = Some(cursor.ident().ok_or_else(reject)?.to_ascii_lowercase());
            }
            _ => return Err(reject()),
        }
    }
    Ok(step)
}

/// Byte-offset cursor over a single compound selector.
struct StepCursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> StepCursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        let found = self.peek() == Some(expected);
        if found {
            self.pos += expected.len_utf8();
        }
        found
    }

    fn skip_ws(&mut self) {
        self.take_while(|ch| ch.is_ascii_whitespace());
    }

    /// Consumes a non-empty run of characters accepted by `accept`.
    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> Option<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(&accept) {
            self.bump();
        }
        let (src, end) = (self.src, self.pos);
        (end > start).then(|| &src[start..end])
    }

    /// An identifier with CSS escapes resolved.
    fn ident(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.bump();
                self.bump()?;
            } else if is_ident_char(ch) {
                self.bump();
            } else {
                break;
            }
        }
        let (src, end) = (self.src, self.pos);
        (end > start).then(|| unescape_string(&src[start..end]))
    }

    /// Body of `[...]`, the opening bracket already consumed.
    fn attr_selector(&mut self) -> Option<AttrSelector> {
        self.skip_ws();
        let key = self
            .take_while(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':'))?
            .to_ascii_lowercase();
        self.skip_ws();
        if self.eat(']') {
            return Some(AttrSelector {
                key,
                op: AttrOp::Exists,
            });
        }

        let op: fn(String) -> AttrOp = match self.bump()? {
            '=' => AttrOp::Equals,
            modifier => {
                let op: fn(String) -> AttrOp = match modifier {
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    '~' => AttrOp::Word,
                    '|' => AttrOp::DashPrefix,
                    _ => return None,
                };
                if !self.eat('=') {
                    return None;
                }
                op
            }
        };
        self.skip_ws();
        let value = self.attr_value()?;
        self.skip_ws();
        self.eat(']').then(|| AttrSelector {
            key,
            op: op(value),
        })
    }

    fn attr_value(&mut self) -> Option<String> {
        let quote = self.peek().filter(|&ch| ch == '"' || ch == '\'');
        if quote.is_some() {
            self.bump();
        }
        let start = self.pos;
        loop {
            match (self.peek()?, quote) {
                ('\\', _) => {
                    self.bump();
                    self.bump()?;
                    continue;
                }
                (ch, Some(quote)) if ch == quote => break,
                (ch, None) if ch.is_ascii_whitespace() || ch == ']' => break,
                _ => {}
            }
            self.bump();
        }
        let raw = &self.src[start..self.pos];
        let value = unescape_string(raw);
        if quote.is_some() {
            self.bump();
        }
        Some(value)
    }

    /// A pseudo-class after its `:`.
    fn pseudo_class(&mut self) -> Option<SelectorPseudoClass> {
        let name = self
            .take_while(|ch| ch.is_ascii_alphanumeric() || ch == '-')?
            .to_ascii_lowercase();
        if !self.eat('(') {
            return simple_pseudo_class(&name);
        }

        let rest = self.rest();
        let close = find_closing_paren(rest)?;
        self.pos += close + 1;
        let arg = rest[..close].trim();
        if arg.is_empty() {
            return None;
        }

        let (of_type, from_end) = match name.as_str() {
            "not" => return parse_selector_groups(arg).ok().map(SelectorPseudoClass::Not),
            "is" | "where" => return parse_selector_groups(arg).ok().map(SelectorPseudoClass::Is),
            "has" => return parse_selector_groups(arg).ok().map(SelectorPseudoClass::Has),
            "nth-child" => (false, false),
            "nth-last-child" => (false, true),
            "nth-of-type" => (true, false),
            "nth-last-of-type" => (true, true),
            _ => return None,
        };
        Some(SelectorPseudoClass::Nth {
            formula: NthFormula::parse(arg)?,
            of_type,
            from_end,
        })
    }
}

fn simple_pseudo_class(name: &str) -> Option<SelectorPseudoClass> {
    let first = |of_type, from_end| SelectorPseudoClass::Nth {
        formula: NthFormula::FIRST,
        of_type,
        from_end,
    };
    Some(match name {
        "first-child" => first(false, false),
        "last-child" => first(false, true),
        "first-of-type" => first(true, false),
        "last-of-type" => first(true, true),
        "only-child" => SelectorPseudoClass::Only { of_type: false },
        "only-of-type" => SelectorPseudoClass::Only { of_type: true },
        "empty" => SelectorPseudoClass::Empty,
        _ => return None,
    })
}

/// Offset of the `)` closing an already consumed `(`.
fn find_closing_paren(body: &str) -> Option<usize> {
    let mut depth = SelectorScanDepth {
        paren: 1,
        ..SelectorScanDepth::default()
    };
    for (idx, ch) in body.char_indices() {
        if !depth.feed(ch) {
            return None;
        }
        if depth.paren == 0 {
            return Some(idx);
        }
    }
    None
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_child() -> SelectorPseudoClass {
        SelectorPseudoClass::Nth {
            formula: NthFormula::FIRST,
            of_type: false,
            from_end: false,
        }
    }

    #[test]
    fn parses_compound_step() -> Result<()> {
        let step = parse_selector_step("div#main.card.wide[data-role='list']:first-child")?;
        assert_eq!(step.tag.as_deref(), Some("div"));
        assert_eq!(step.id.as_deref(), Some("main"));
        assert_eq!(step.classes, vec!["card".to_string(), "wide".to_string()]);
        assert_eq!(
            step.attrs,
            vec![AttrSelector {
                key: "data-role".into(),
                op: AttrOp::Equals("list".into()),
            }]
        );
        assert_eq!(step.pseudo_classes, vec![first_child()]);
        Ok(())
    }

    #[test]
    fn parses_combinators_and_groups() -> Result<()> {
        let groups = parse_selector_groups("#a > p + span, ul li")?;
        assert_eq!(groups.len(), 2);
        let combinators = groups[0]
            .iter()
            .map(|part| part.combinator)
            .collect::<Vec<_>>();
        assert_eq!(
            combinators,
            vec![
                None,
                Some(SelectorCombinator::Child),
                Some(SelectorCombinator::AdjacentSibling),
            ]
        );
        assert_eq!(groups[1][1].combinator, Some(SelectorCombinator::Descendant));
        Ok(())
    }

    #[test]
    fn attribute_value_may_contain_comma_and_bracket() -> Result<()> {
        let groups = parse_selector_groups("[title='a, ]b']")?;
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0][0].step.attrs,
            vec![AttrSelector {
                key: "title".into(),
                op: AttrOp::Equals("a, ]b".into()),
            }]
        );
        Ok(())
    }

    #[test]
    fn parses_attribute_operators() -> Result<()> {
        let step = parse_selector_step("[a^=x][b$='y'][c*=\"z\"][d~=w][e|=en][f]")?;
        let ops = step.attrs.into_iter().map(|attr| attr.op).collect::<Vec<_>>();
        assert_eq!(
            ops,
            vec![
                AttrOp::Prefix("x".into()),
                AttrOp::Suffix("y".into()),
                AttrOp::Substring("z".into()),
                AttrOp::Word("w".into()),
                AttrOp::DashPrefix("en".into()),
                AttrOp::Exists,
            ]
        );
        Ok(())
    }

    #[test]
    fn parses_nth_forms() {
        let formula = |step, offset| Some(NthFormula { step, offset });
        assert_eq!(NthFormula::parse("odd"), formula(2, 1));
        assert_eq!(NthFormula::parse("3"), formula(0, 3));
        assert_eq!(NthFormula::parse("2n + 1"), formula(2, 1));
        assert_eq!(NthFormula::parse("-n+3"), formula(-1, 3));
        assert_eq!(NthFormula::parse("n"), formula(1, 0));
        for rejected in ["0", "+3", "2n+", "nn", "x"] {
            assert_eq!(NthFormula::parse(rejected), None, "{rejected:?}");
        }
    }

    #[test]
    fn nth_formula_matches_positions() {
        let odd = NthFormula { step: 2, offset: 1 };
        assert!(odd.matches(1) && odd.matches(3) && !odd.matches(2));
        let first_three = NthFormula {
            step: -1,
            offset: 3,
        };
        assert!(first_three.matches(1) && first_three.matches(3));
        assert!(!first_three.matches(4));
        assert!(NthFormula::FIRST.matches(1) && !NthFormula::FIRST.matches(2));
    }

    #[test]
    fn where_parses_like_is() -> Result<()> {
        let step = parse_selector_step("li:where(.a, .b):nth-last-of-type(2)")?;
        assert!(matches!(
            step.pseudo_classes.as_slice(),
            [
                SelectorPseudoClass::Is(groups),
                SelectorPseudoClass::Nth {
                    of_type: true,
                    from_end: true,
                    ..
                },
            ] if groups.len() == 2
        ));
        Ok(())
    }

    #[test]
    fn rejects_malformed_selectors() {
        let rejected = [
            "",
            "#",
            "div >",
            "> div",
            "a,,b",
            "[x",
            "p:hover",
            "a)",
            "**",
            ":not(.a)div",
            "::before",
        ];
        for selector in rejected {
            assert!(
                parse_selector_groups(selector).is_err(),
                "{selector:?} should be rejected"
            );
        }
    }

    #[test]
    fn escaped_identifier_is_unescaped() -> Result<()> {
        let step = parse_selector_step(r"#item\.1")?;
        assert_eq!(step.id.as_deref(), Some("item.1"));
        Ok(())
    }
}
