use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, InputMode, Sender, ToastKind, MODEL_CATALOG};

/// Parse a line of reply text and convert **bold** and *italic* runs to
/// styled spans. Unmatched delimiters stay literal.
fn parse_inline_markup(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current_text = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '*' {
            current_text.push(c);
            continue;
        }

        // ** opens a bold run, a single * opens an italic run
        let bold = chars.peek() == Some(&'*');
        if bold {
            chars.next();
        }

        let mut inner = String::new();
        let mut found_close = false;

        for c in chars.by_ref() {
            if c == '*' {
                found_close = true;
                break;
            }
            inner.push(c);
        }
        if bold && found_close {
            // The bold run needs a second closing *
            if chars.peek() == Some(&'*') {
                chars.next();
            } else {
                current_text.push_str("**");
                current_text.push_str(&inner);
                current_text.push('*');
                continue;
            }
        }

        if found_close && !inner.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            let modifier = if bold { Modifier::BOLD } else { Modifier::ITALIC };
            spans.push(Span::styled(inner, Style::default().add_modifier(modifier)));
        } else {
            // No closing delimiter, treat as literal
            current_text.push_str(if bold { "**" } else { "*" });
            current_text.push_str(&inner);
            if found_close {
                current_text.push_str(if bold { "**" } else { "*" });
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }

    render_toasts(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let models = if app.selected_models.is_empty() {
        "default".to_string()
    } else {
        app.selected_models.join(", ")
    };

    let title = Line::from(vec![
        Span::styled(" 💬 LLMx ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}]", models), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let chat_text = if app.messages.is_empty() && !app.loading {
        Text::from(Span::styled(
            "Type a message and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.messages {
            match msg.sender {
                Sender::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                    lines.push(Line::default());
                }
                Sender::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Bot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    // Bot replies are trusted markup: render inline styles
                    for line in msg.text.lines() {
                        lines.push(parse_inline_markup(line));
                    }
                    lines.push(Line::default());
                }
            }
        }

        if app.loading {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Message ('m' for models) ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if app.show_model_picker {
        " j/k: move | Space: toggle | Enter/Esc: close "
    } else if app.input_mode == InputMode::Editing {
        " Enter: send | Esc: normal mode | Ctrl-C: quit "
    } else {
        " i: type | m: models | j/k: scroll | q: quit "
    };

    let footer = Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray)))
        .style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (MODEL_CATALOG.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Models (Space to toggle, Enter to close) ");

    let items: Vec<ListItem> = MODEL_CATALOG
        .iter()
        .map(|model| {
            let (mark, style) = if app.is_model_selected(model) {
                ("[x]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            } else {
                ("[ ]", Style::default())
            };
            ListItem::new(format!(" {} {} ", mark, model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

/// Toasts stack up from the bottom-right corner, above the footer.
fn render_toasts(app: &App, frame: &mut Frame, area: Rect) {
    for (i, toast) in app.toasts.iter().rev().enumerate() {
        let width = (toast.text.chars().count() as u16 + 2).min(area.width);
        let y = area.height.saturating_sub(2 + i as u16);
        if y == 0 {
            break;
        }
        let toast_area = Rect::new(area.width.saturating_sub(width), y, width, 1);

        let style = match toast.kind {
            ToastKind::Success => Style::default().bg(Color::Green).fg(Color::Black),
            ToastKind::Error => Style::default().bg(Color::Red).fg(Color::White),
        };

        frame.render_widget(Clear, toast_area);
        frame.render_widget(
            Paragraph::new(format!(" {} ", toast.text)).style(style),
            toast_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_bold_run_is_styled() {
        let line = parse_inline_markup("say **hello** now");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content.as_ref(), "hello");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_italic_run_is_styled() {
        let line = parse_inline_markup("an *emphasized* word");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content.as_ref(), "emphasized");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_unclosed_delimiter_stays_literal() {
        let line = parse_inline_markup("2 * 3 = 6");
        assert_eq!(line_text(&line), "2 * 3 = 6");
    }

    #[test]
    fn test_unclosed_bold_stays_literal() {
        let line = parse_inline_markup("**dangling");
        assert_eq!(line_text(&line), "**dangling");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let line = parse_inline_markup("nothing special");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content.as_ref(), "nothing special");
    }
}
