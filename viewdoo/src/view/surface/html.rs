//! Markup parser for the in-memory document.
//!
//! Handles elements, void elements, quoted, unquoted and boolean attributes,
//! text, comments and raw text elements like `<style>`. Tag and attribute names
//! are lowercased. Character references are kept as written.
use super::document::Node;
use super::Error;

const VOID: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT: [&str; 4] = ["script", "style", "textarea", "title"];

/// Elements that never have children.
pub fn is_void(tag: &str) -> bool {
    VOID.contains(&tag)
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

/// Parse markup, appending the nodes to `parent`.
pub fn parse(source: &str, parent: &Node) -> Result<(), Error> {
    let mut parser = Parser { source, pos: 0 };
    let mut stack = vec![parent.clone()];

    while parser.pos < source.len() {
        let rest = parser.rest();

        if let Some(comment) = rest.strip_prefix("<!--") {
            let end = comment
                .find("-->")
                .ok_or_else(|| Error::Markup("unterminated comment".into()))?;
            append(&stack, &Node::comment(&comment[..end]))?;
            parser.pos += 4 + end + 3;
        } else if rest.starts_with("<!") {
            // Doctype and friends.
            let end = rest
                .find('>')
                .ok_or_else(|| Error::Markup("unterminated declaration".into()))?;
            parser.pos += end + 1;
        } else if rest.starts_with("</") && rest[2..].starts_with(is_name_start) {
            parser.pos += 2;
            let tag = parser.name().to_lowercase();
            parser.skip_until('>')?;

            // Close the innermost matching element, ignore stray closing tags.
            if let Some(index) = stack
                .iter()
                .rposition(|node| node.tag().as_deref() == Some(tag.as_str()))
            {
                if index > 0 {
                    stack.truncate(index);
                }
            }
        } else if rest.starts_with('<') && rest[1..].starts_with(is_name_start) {
            parser.pos += 1;
            let (element, self_closing) = parser.element()?;
            append(&stack, &element)?;

            let tag = element.tag().unwrap_or_default();

            if RAW_TEXT.contains(&tag.as_str()) && !self_closing {
                let text = parser.raw_text(&tag);
                if !text.is_empty() {
                    element.append_child(&Node::text(text))?;
                }
            } else if !self_closing && !is_void(&tag) {
                stack.push(element);
            }
        } else {
            let text = parser.text();
            append(&stack, &Node::text(text))?;
        }
    }

    Ok(())
}

fn append(stack: &[Node], node: &Node) -> Result<(), Error> {
    match stack.last() {
        Some(parent) => parent.append_child(node),
        None => Err(Error::Markup("no parent node".into())),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.bump();
        }
    }

    fn skip_until(&mut self, end: char) -> Result<(), Error> {
        match self.rest().find(end) {
            Some(i) => {
                self.pos += i + end.len_utf8();
                Ok(())
            }
            None => Err(Error::Markup(format!("expected \"{}\"", end))),
        }
    }

    fn name(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    // Text up to the next tag.
    fn text(&mut self) -> &'a str {
        let rest = self.rest();
        let mut end = rest.len();

        for (i, _) in rest.match_indices('<').filter(|(i, _)| *i > 0) {
            let after = &rest[i + 1..];
            if after.starts_with(is_name_start) || after.starts_with('/') || after.starts_with('!') {
                end = i;
                break;
            }
        }

        self.pos += end;
        &rest[..end]
    }

    fn raw_text(&mut self, tag: &str) -> &'a str {
        let rest = self.rest();
        let close = format!("</{}", tag);
        let end = rest.find(&close).unwrap_or(rest.len());
        self.pos += end;
        let text = &rest[..end];
        if self.pos < self.source.len() {
            // Consume the closing tag, if it's well formed.
            let _ = self.skip_until('>');
        }
        text
    }

    // After `<`, up to and including `>`.
    fn element(&mut self) -> Result<(Node, bool), Error> {
        let element = Node::element(self.name());

        loop {
            self.skip_whitespace();

            match self.peek() {
                None => return Err(Error::Markup("unterminated tag".into())),

                Some('>') => {
                    self.bump();
                    return Ok((element, false));
                }

                Some('/') => {
                    self.bump();
                    if self.peek() == Some('>') {
                        self.bump();
                        return Ok((element, true));
                    }
                }

                Some(_) => {
                    let name = self.name().to_lowercase();
                    if name.is_empty() {
                        // `=` without a name.
                        self.bump();
                        continue;
                    }

                    self.skip_whitespace();
                    let value = if self.peek() == Some('=') {
                        self.bump();
                        self.skip_whitespace();
                        self.value()?
                    } else {
                        String::new()
                    };

                    if element.attribute(&name).is_none() {
                        element.set_attribute(&name, &value);
                    }
                }
            }
        }
    }

    fn value(&mut self) -> Result<String, Error> {
        match self.peek() {
            Some(quote) if quote == '"' || quote == '\'' => {
                self.bump();
                let rest = self.rest();
                let end = rest
                    .find(quote)
                    .ok_or_else(|| Error::Markup("unterminated attribute value".into()))?;
                self.pos += end + 1;
                Ok(rest[..end].to_string())
            }

            _ => {
                let rest = self.rest();
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                Ok(rest[..end].to_string())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parsed(source: &str) -> Result<String, Error> {
        let fragment = Node::fragment();
        parse(source, &fragment)?;
        Ok(fragment.inner_html())
    }

    #[test]
    fn test_parse() -> Result<(), Error> {
        assert_eq!(
            parsed(r#"<div class="foo"><span bar><em></em></span></div>"#)?,
            r#"<div class="foo"><span bar=""><em></em></span></div>"#
        );
        assert_eq!(
            parsed("<UL><Li id=a>1<li id='b'>2</UL>")?,
            r#"<ul><li id="a">1<li id="b">2</li></li></ul>"#
        );
        assert_eq!(parsed("a < b <!-- c --> d")?, "a < b <!-- c --> d");
        assert_eq!(parsed("<!DOCTYPE html><p>x</p>")?, "<p>x</p>");
        assert_eq!(parsed("<p>x</div></p>")?, "<p>x</p>");
        assert_eq!(
            parsed("<style>a > b { color: red; }</style><br><img src=x.png/>")?,
            r#"<style>a > b { color: red; }</style><br><img src="x.png/">"#
        );
        Ok(())
    }

    #[test]
    fn test_nodes() -> Result<(), Error> {
        let fragment = Node::fragment();
        parse("\n<div>\n  <p>one</p>\n</div>\n<span></span>", &fragment)?;

        let children = fragment.children();
        assert_eq!(children.len(), 4);
        assert!(!children[0].is_element());
        assert_eq!(children[1].tag().as_deref(), Some("div"));
        assert_eq!(children[3].tag().as_deref(), Some("span"));
        assert_eq!(children[1].text_content(), "\n  one\n");
        Ok(())
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(parsed("<div class=\"a"), Err(Error::Markup(_))));
        assert!(matches!(parsed("<div"), Err(Error::Markup(_))));
        assert!(matches!(parsed("<!-- open"), Err(Error::Markup(_))));
    }
}
