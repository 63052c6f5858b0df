use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use drafter_core::{MessageKind, ServerStatus};
use crate::app::{wrapped_lines, App, FocusPane, InputMode, QUICK_ACTIONS};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Conversation takes two thirds, document preview the rest
    let [chat_column, document_area] = Layout::horizontal([
        Constraint::Percentage(66),
        Constraint::Percentage(34),
    ])
    .areas(body_area);

    render_chat(app, frame, chat_column);
    render_document(app, frame, document_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = if app.state.is_loading() {
        ("● Writing".to_string(), Color::Yellow)
    } else {
        match app.state.server_status() {
            ServerStatus::Unknown => ("● Connecting".to_string(), Color::Gray),
            ServerStatus::Online { .. } => ("● Ready".to_string(), Color::Green),
            ServerStatus::Offline { .. } => ("● Offline".to_string(), Color::Red),
        }
    };

    let title = Line::from(vec![
        Span::styled(" Drafter ", Style::default().fg(Color::Magenta).bold()),
        Span::styled("AI-Powered Document Editor ", Style::default().fg(Color::Gray)),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  "),
        Span::styled(
            format!("Session: {}", app.session_id()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_header(kind: MessageKind, timestamp: &str) -> Line<'static> {
    let (label, color) = match kind {
        MessageKind::User => ("You", Color::Cyan),
        MessageKind::Ai => ("Drafter", Color::Yellow),
        MessageKind::Error => ("Error", Color::Red),
    };
    Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" · {}", timestamp), Style::default().fg(Color::DarkGray)),
    ])
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing and scroll calculations
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_focused = app.focus == FocusPane::Chat;
    let border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let chat_text = if app.state.messages().is_empty() && !app.state.is_loading() {
        let mut lines = vec![
            Line::from(Span::styled(
                "Start a conversation with Drafter to create and edit documents",
                Style::default().fg(Color::DarkGray),
            )),
            Line::default(),
        ];
        for (i, action) in QUICK_ACTIONS.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!(" {} ", i + 1),
                    Style::default().bg(Color::DarkGray).fg(Color::White),
                ),
                Span::styled(format!(" {}", action), Style::default().fg(Color::Magenta)),
            ]));
        }
        Text::from(lines)
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.state.messages() {
            lines.push(message_header(msg.kind, &msg.timestamp));
            let content_style = match msg.kind {
                MessageKind::Error => Style::default().fg(Color::Red),
                _ => Style::default(),
            };
            for line in msg.content.lines() {
                lines.push(Line::styled(line.to_string(), content_style));
            }
            if !msg.tools_used.is_empty() {
                let tools: Vec<Span> = msg
                    .tools_used
                    .iter()
                    .map(|tool| {
                        Span::styled(
                            format!(" 🔧 {} ", tool),
                            Style::default().fg(Color::Black).bg(Color::Magenta),
                        )
                    })
                    .flat_map(|chip| [chip, Span::raw(" ")])
                    .collect();
                lines.push(Line::from(tools));
            }
            lines.push(Line::default());
        }

        if app.state.is_loading() {
            lines.push(Line::from(Span::styled(
                "Drafter",
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
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if !app.can_edit() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let title = if app.can_edit() {
        " Message (Enter to send) "
    } else {
        " Waiting for Drafter... "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible; inner width excludes borders
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = if visible_text.is_empty() && !editing {
        Paragraph::new(Span::styled(
            "Type your message here...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    let input = input.block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing && app.can_edit() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_document(app: &mut App, frame: &mut Frame, area: Rect) {
    app.document_area = Some(area);

    let focused = app.focus == FocusPane::Document;
    let border_color = if focused { Color::Cyan } else { Color::Magenta };

    let document = app.state.document();
    let footer = if document.is_empty() {
        String::new()
    } else {
        format!(" {} characters ", document.char_count())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Document Preview ")
        .title_bottom(Line::from(footer).right_aligned());

    if document.is_empty() {
        let placeholder = Paragraph::new(vec![
            Line::default(),
            Line::from(Span::styled(
                "No document content yet",
                Style::default().fg(Color::Gray),
            ))
            .centered(),
            Line::from(Span::styled(
                "Start editing to see your document here",
                Style::default().fg(Color::DarkGray),
            ))
            .centered(),
        ])
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let paragraph = Paragraph::new(document.content().to_string())
        .wrap(Wrap { trim: false })
        .block(block);

    // Clamp scroll to the wrapped height of the document
    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let total_lines = document
        .content()
        .lines()
        .fold(0usize, |acc, line| acc.saturating_add(wrapped_lines(line, inner_width)));
    let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
    app.document_scroll = app
        .document_scroll
        .min(total_lines.saturating_sub(inner_height));

    frame.render_widget(paragraph.scroll((app.document_scroll, 0)), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => {
            let mut hints = vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
            ];
            if app.state.messages().is_empty() {
                hints.extend(vec![
                    Span::styled(" Alt+1-4 ", key_style),
                    Span::styled(" quick action ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" Ctrl+R ", key_style),
                Span::styled(" refresh ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" normal ", label_style),
            ]);
            hints
        }
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
            ];
            if app.state.messages().is_empty() {
                hints.extend(vec![
                    Span::styled(" 1-4 ", key_style),
                    Span::styled(" quick action ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" r ", key_style),
                Span::styled(" refresh ", label_style),
                Span::styled(" C ", key_style),
                Span::styled(" clear ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
