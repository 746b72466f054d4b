//! Reply and attachment composition.
//!
//! Message bodies are small HTML fragments. This module builds the fragments
//! the chat emits (quote blocks, image embeds, file links) and reads back the
//! few things it needs from received bodies: the reply preview and the quote
//! back-reference.
//!
//! ```text
//! <div class="chat-quote-block" data-reply-id="{timestamp}">   quote (optional)
//!   <span class="quote-sender">{sender}</span>
//!   <div class="quote-text">{preview}</div>
//! </div>
//! {typed text}<br/>{attachment}                                 body
//! ```
//!
//! Parsing is a small tag scanner, not a full HTML parser. It only has to
//! understand fragments this module produced, plus legacy plaintext.

use quill_core::FileUpload;
use quill_proto::{ChatMessage, Identity, MessageId, UploadedFile};

/// Characters of flattened text kept in a reply preview.
pub const PREVIEW_CHARS: usize = 100;

const QUOTE_CLASS: &str = "chat-quote-block";

/// What a reply banner (and the quote block) shows for the original message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPreview {
    /// Original contains an image. `thumbnail` is its absolute URL.
    Photo {
        /// Image URL, when the tag had one.
        thumbnail: Option<String>,
    },
    /// First characters of the original's text.
    Text(String),
    /// Original had neither text nor image.
    Attachment,
}

impl ReplyPreview {
    /// Build the preview for a decrypted message body.
    ///
    /// Quote blocks inside the original are ignored so replies to replies do
    /// not nest. Site-relative image URLs are resolved against `asset_base`.
    pub fn from_body(body: &str, asset_base: &str) -> Self {
        let scan = scan_body(body);

        if let Some(src) = scan.first_image {
            return Self::Photo { thumbnail: src.map(|src| resolve_asset_url(&src, asset_base)) };
        }

        let text = scan.text.trim();
        if text.is_empty() {
            return Self::Attachment;
        }

        let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
        if text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self::Text(preview)
    }

    /// HTML fragment for the banner and quote block.
    pub fn to_html(&self) -> String {
        match self {
            Self::Photo { thumbnail: Some(src) } => format!(
                r#"<img src="{}" class="reply-thumbnail" alt="Image" /> <span>Photo</span>"#,
                escape_attr(src)
            ),
            Self::Photo { thumbnail: None } => "<span>Photo</span>".to_string(),
            Self::Text(text) => escape_text(text),
            Self::Attachment => "Attachment".to_string(),
        }
    }
}

/// A pending reply: who and what is being quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Timestamp of the quoted message.
    pub reply_id: String,
    /// Author of the quoted message.
    pub sender: Identity,
    /// Preview of the quoted body.
    pub preview: ReplyPreview,
}

impl Quote {
    /// Quote `message` whose decrypted body is `body`.
    pub fn of(message: &ChatMessage, body: &str, asset_base: &str) -> Self {
        Self {
            reply_id: message.timestamp.clone(),
            sender: message.sender.clone(),
            preview: ReplyPreview::from_body(body, asset_base),
        }
    }

    /// Quote block prepended to the outgoing body.
    pub fn to_html(&self) -> String {
        format!(
            r#"<div class="{QUOTE_CLASS}" data-reply-id="{}"><span class="quote-sender">{}</span><div class="quote-text">{}</div></div>"#,
            escape_attr(&self.reply_id),
            escape_text(self.sender.as_str()),
            self.preview.to_html()
        )
    }
}

/// Kind of uploaded attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Embedded inline.
    Image,
    /// Linked.
    File,
}

/// An uploaded file waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Where the hosting service put it.
    pub url: String,
    /// Original file name.
    pub name: String,
    /// Embed or link.
    pub kind: AttachmentKind,
}

impl Attachment {
    /// Attachment for `file`, uploaded to `uploaded`.
    pub fn new(file: &FileUpload, uploaded: UploadedFile) -> Self {
        let kind = if file.is_image() { AttachmentKind::Image } else { AttachmentKind::File };
        Self { url: uploaded.url, name: file.name.clone(), kind }
    }

    /// Fragment appended to the message body.
    pub fn to_html(&self) -> String {
        match self.kind {
            AttachmentKind::Image => {
                format!(r#"<img src="{}" alt="Shared Image" />"#, escape_attr(&self.url))
            },
            AttachmentKind::File => format!(
                r#"<div class="file-attachment"><a href="{}" target="_blank">📎 {}</a></div>"#,
                escape_attr(&self.url),
                escape_text(&self.name)
            ),
        }
    }
}

/// Assemble the outgoing plaintext.
///
/// Returns `None` when there is nothing to send (blank text, no attachment).
pub fn compose_body(
    text: &str,
    attachment: Option<&Attachment>,
    quote: Option<&Quote>,
) -> Option<String> {
    let text = text.trim();
    if text.is_empty() && attachment.is_none() {
        return None;
    }

    let mut body = quote.map(Quote::to_html).unwrap_or_default();
    body.push_str(&escape_text(text));
    if let Some(attachment) = attachment {
        if !text.is_empty() {
            body.push_str("<br/>");
        }
        body.push_str(&attachment.to_html());
    }
    Some(body)
}

/// Result of following a quote back-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteTarget {
    /// Quoted message is loaded; scroll to it.
    Visible(MessageId),
    /// Quoted message is not in the current view.
    NotVisible,
}

/// Find the message a quote block points at.
///
/// History and pushed messages can carry timestamps of different precision,
/// so a back-reference one character longer than a loaded timestamp also
/// matches.
pub fn locate_quote<'a>(
    view: impl IntoIterator<Item = &'a ChatMessage> + Clone,
    reply_id: &str,
) -> QuoteTarget {
    let exact = view.clone().into_iter().find(|m| m.timestamp == reply_id);

    let shortened = || {
        let mut chars = reply_id.chars();
        chars.next_back()?;
        let prefix = chars.as_str();
        view.into_iter().find(|m| !prefix.is_empty() && m.timestamp == prefix)
    };

    match exact.or_else(shortened) {
        Some(message) => QuoteTarget::Visible(message.id()),
        None => QuoteTarget::NotVisible,
    }
}

/// Back-reference of the first quote block in `body`, if any.
pub fn quoted_reply_id(body: &str) -> Option<String> {
    tokenize(body).into_iter().find_map(|token| match token {
        Token::Open { name, attrs, .. } if name == "div" && has_class(attrs, QUOTE_CLASS) => {
            attr(attrs, "data-reply-id")
        },
        _ => None,
    })
}

/// Rewrite site-relative `src`/`href` values to absolute URLs for display.
pub fn resolve_asset_urls(html: &str, asset_base: &str) -> String {
    let base = asset_base.trim_end_matches('/');
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(value_start) = next_url_value(rest) {
        out.push_str(&rest[..value_start]);
        rest = &rest[value_start..];
        if is_site_relative(rest) {
            out.push_str(base);
        }
    }
    out.push_str(rest);
    out
}

fn next_url_value(html: &str) -> Option<usize> {
    ["src=\"", "href=\""]
        .iter()
        .filter_map(|pattern| html.find(pattern).map(|at| at + pattern.len()))
        .min()
}

fn resolve_asset_url(url: &str, asset_base: &str) -> String {
    if is_site_relative(url) {
        format!("{}{url}", asset_base.trim_end_matches('/'))
    } else {
        url.to_string()
    }
}

fn is_site_relative(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//")
}

/// Escape text content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;").replace('\'', "&#39;")
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Body with quote blocks removed: flattened text and the first image.
struct BodyScan {
    text: String,
    /// `Some(src)` once an `<img>` was seen; `src` is `None` without the
    /// attribute.
    first_image: Option<Option<String>>,
}

fn scan_body(body: &str) -> BodyScan {
    let mut scan = BodyScan { text: String::new(), first_image: None };
    let mut quote_depth = 0usize;

    for token in tokenize(body) {
        if quote_depth > 0 {
            match token {
                Token::Open { name, self_closing: false, .. } if !is_void(&name) => {
                    quote_depth += 1;
                },
                Token::Close => quote_depth -= 1,
                _ => {},
            }
            continue;
        }

        match token {
            Token::Open { name, attrs, self_closing } => {
                if name == "div" && !self_closing && has_class(attrs, QUOTE_CLASS) {
                    quote_depth = 1;
                } else if name == "img" && scan.first_image.is_none() {
                    scan.first_image = Some(attr(attrs, "src"));
                }
            },
            Token::Text(text) => scan.text.push_str(&decode_entities(text)),
            Token::Close => {},
        }
    }
    scan
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Open { name: String, attrs: &'a str, self_closing: bool },
    Close,
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(start) = find_tag_start(rest) else {
            tokens.push(Token::Text(rest));
            break;
        };
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
            rest = &rest[start..];
        }

        let Some(end) = rest.find('>') else {
            tokens.push(Token::Text(rest));
            break;
        };
        if let Some(token) = parse_tag(&rest[1..end]) {
            tokens.push(token);
        }
        rest = &rest[end + 1..];
    }
    tokens
}

/// Position of the next `<` that opens a tag (`<a`, `</a`, `<!--`).
fn find_tag_start(html: &str) -> Option<usize> {
    html.char_indices().find_map(|(i, c)| {
        let next = html[i + c.len_utf8()..].chars().next();
        (c == '<' && next.is_some_and(|n| n.is_ascii_alphabetic() || n == '/' || n == '!'))
            .then_some(i)
    })
}

fn parse_tag(inner: &str) -> Option<Token<'_>> {
    if inner.starts_with('/') {
        return Some(Token::Close);
    }
    if inner.starts_with('!') {
        return None;
    }

    let trimmed = inner.trim_end();
    let self_closing = trimmed.ends_with('/');
    let body = trimmed.trim_end_matches('/');
    let (name, attrs) = body.split_once(char::is_whitespace).unwrap_or((body, ""));

    Some(Token::Open { name: name.to_ascii_lowercase(), attrs, self_closing })
}

fn is_void(name: &str) -> bool {
    matches!(name, "img" | "br" | "hr" | "input" | "meta" | "link" | "source" | "wbr")
}

fn has_class(attrs: &str, class: &str) -> bool {
    attr(attrs, "class").is_some_and(|value| value.split_whitespace().any(|c| c == class))
}

/// Value of attribute `key`, entity-decoded.
fn attr(attrs: &str, key: &str) -> Option<String> {
    let mut rest = attrs;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }

        let name_end = rest.find(|c: char| c == '=' || c.is_whitespace()).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remaining) = match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let inner = &after_eq[1..];
                    let close = inner.find(quote).unwrap_or(inner.len());
                    (&inner[..close], inner.get(close + 1..).unwrap_or(""))
                },
                _ => {
                    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                },
            };
            rest = remaining;
            Some(value)
        } else {
            None
        };

        if name.eq_ignore_ascii_case(key) {
            return Some(decode_entities(value.unwrap_or("")));
        }
        if name.is_empty() {
            // Stray character (e.g. a lone `=`); skip it.
            rest = rest.get(1..).unwrap_or("");
        }
    }
}
