//! Markdown → ratatui `Text` renderer for AI replies.
//!
//! Converts `pulldown_cmark` events into styled `Line`/`Span` values:
//! headings, emphasis, inline code, fenced code blocks (syntect-highlighted,
//! shown indented), lists, blockquotes, and links. The highlight theme
//! follows the app theme so code stays readable on light terminals.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::core::config::Theme;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const CODE_INDENT: &str = "    ";

fn highlight_theme(theme: Theme) -> &'static str {
    match theme {
        Theme::Dark => "base16-ocean.dark",
        Theme::Light => "InspiredGitHub",
    }
}

/// Render markdown into owned styled text. `base_fg` is the reply body color.
pub fn render(content: &str, base_fg: Color, theme: Theme) -> Text<'static> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = Renderer::new(base_fg, theme);
    for event in Parser::new_ext(content, opts) {
        renderer.handle(event);
    }
    renderer.text
}

struct Renderer {
    text: Text<'static>,
    base_fg: Color,
    theme: Theme,
    /// Composed inline styles; `patch` keeps nested bold+italic working.
    styles: Vec<Style>,
    /// Prefix prepended to each new line (code indent, blockquote bar).
    prefix: Vec<Span<'static>>,
    /// List nesting: None = bullet, Some(n) = next ordered index.
    lists: Vec<Option<u64>>,
    highlighter: Option<HighlightLines<'static>>,
    in_code_block: bool,
    link_url: Option<String>,
    /// A blank line is owed before the next block element.
    pending_blank: bool,
}

impl Renderer {
    fn new(base_fg: Color, theme: Theme) -> Self {
        Self {
            text: Text::default(),
            base_fg,
            theme,
            styles: vec![],
            prefix: vec![],
            lists: vec![],
            highlighter: None,
            in_code_block: false,
            link_url: None,
            pending_blank: false,
        }
    }

    fn style(&self) -> Style {
        self.styles
            .last()
            .copied()
            .unwrap_or_else(|| Style::default().fg(self.base_fg))
    }

    fn push_style(&mut self, overlay: Style) {
        self.styles.push(self.style().patch(overlay));
    }

    fn new_line(&mut self, spans: Vec<Span<'static>>) {
        let mut all = self.prefix.clone();
        all.extend(spans);
        self.text.lines.push(Line::from(all));
    }

    fn append_span(&mut self, span: Span<'static>) {
        match self.text.lines.last_mut() {
            Some(line) => line.push_span(span),
            None => self.new_line(vec![span]),
        }
    }

    fn flush_blank(&mut self) {
        if self.pending_blank {
            self.text.lines.push(Line::default());
            self.pending_blank = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(t),
            Event::Code(c) => self.append_span(Span::styled(
                c.to_string(),
                Style::default().fg(Color::White).bg(Color::DarkGray),
            )),
            Event::SoftBreak => self.append_span(Span::raw(" ")),
            Event::HardBreak => self.new_line(vec![]),
            Event::Rule => {
                self.flush_blank();
                self.new_line(vec![Span::styled(
                    "─".repeat(30),
                    Style::default().fg(Color::DarkGray),
                )]);
                self.pending_blank = true;
            }
            // HTML, footnotes, math
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.flush_blank();
                self.new_line(vec![]);
            }
            Tag::Heading { level, .. } => {
                self.flush_blank();
                let style = heading_style(self.base_fg, level);
                self.new_line(vec![]);
                self.push_style(style);
            }
            Tag::BlockQuote(_) => {
                self.flush_blank();
                self.prefix
                    .push(Span::styled("┃ ", Style::default().fg(Color::DarkGray)));
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.flush_blank();
                self.in_code_block = true;
                self.prefix.push(Span::raw(CODE_INDENT));
                if let CodeBlockKind::Fenced(lang) = &kind
                    && !lang.is_empty()
                    && let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang)
                {
                    let theme = &THEME_SET.themes[highlight_theme(self.theme)];
                    self.highlighter = Some(HighlightLines::new(syntax, theme));
                }
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.flush_blank();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{indent}{n}. ");
                        *n += 1;
                        m
                    }
                    _ => format!("{indent}• "),
                };
                self.new_line(vec![Span::styled(
                    marker,
                    Style::default().fg(Color::DarkGray),
                )]);
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link_url = Some(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            // Tables, images, definitions
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.pending_blank = true,
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.pending_blank = true;
            }
            TagEnd::BlockQuote(_) => {
                self.prefix.pop();
                self.styles.pop();
                self.pending_blank = true;
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.highlighter = None;
                self.prefix.pop();
                self.pending_blank = true;
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.pending_blank = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link_url.take() {
                    self.append_span(Span::styled(
                        format!(" <{url}>"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, cow: CowStr<'_>) {
        // ratatui renders \t as zero-width
        let text = cow.replace('\t', "    ");

        if self.in_code_block {
            // Take the highlighter out so highlight_line and new_line don't
            // fight over &mut self
            if let Some(mut hl) = self.highlighter.take() {
                for line in LinesWithEndings::from(&text) {
                    let Ok(ranges) = hl.highlight_line(line, &SYNTAX_SET) else {
                        continue;
                    };
                    let spans: Vec<Span<'static>> = ranges
                        .into_iter()
                        .filter_map(|(style, fragment)| {
                            let content = fragment.trim_end_matches('\n').to_string();
                            if content.is_empty() {
                                return None;
                            }
                            let fg = Color::Rgb(
                                style.foreground.r,
                                style.foreground.g,
                                style.foreground.b,
                            );
                            Some(Span::styled(content, Style::default().fg(fg)))
                        })
                        .collect();
                    self.new_line(spans);
                }
                self.highlighter = Some(hl);
            } else {
                for line in text.lines() {
                    self.new_line(vec![Span::styled(
                        line.to_owned(),
                        Style::default().fg(self.base_fg),
                    )]);
                }
            }
            return;
        }

        let style = self.style();
        self.append_span(Span::styled(text, style));
    }
}

fn heading_style(base_fg: Color, level: HeadingLevel) -> Style {
    let base = Style::default().fg(base_fg).add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => base.add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => base,
        _ => base.add_modifier(Modifier::ITALIC),
    }
}
