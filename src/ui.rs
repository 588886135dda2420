use chrono::{Local, TimeZone};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset as ChartDataset,
        Gauge, GraphType, List, ListItem, Paragraph, Wrap,
    },
};
use crate::app::{App, FocusPane, InputMode, Popup, Screen};
use docassist::api::MAX_FILES;
use docassist::chart::{self, ChartKind, ChartPayload, SeriesChart};
use docassist::input::TextInput;
use docassist::notify::{Level, Notification};
use docassist::state::ChatRole;
use docassist::suggestions::CAPTION;

const BRAND: Color = Color::Rgb(126, 105, 171);
const CHAT_PLACEHOLDER: &str = "Ask a question about your documents...";
const CHART_PROMPT_PLACEHOLDER: &str = "Describe the chart you want to see...";
const EMPTY_TITLE: &str = "How can I help you?";
const EMPTY_HINT: &str =
    "Upload documents and ask questions about them. I'll analyze them and provide insights.";

/// Convert **bold** spans to styled text; an unclosed marker stays literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    let closed = parts.len() % 2 == 1;
    let last = parts.len() - 1;

    let spans: Vec<Span<'static>> = parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 0 {
                Span::raw(part.to_string())
            } else if !closed && i == last {
                Span::raw(format!("**{}", part))
            } else {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            }
        })
        .collect();

    Line::from(spans)
}

/// Local wall-clock time of an epoch-ms timestamp as `HH:MM`
pub fn format_time(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

/// Rows a set of lines occupies once wrapped to `width` columns
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Centered rectangle of at most `width` x `height` inside `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

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

    match app.screen {
        Screen::Upload => render_upload_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    match app.popup {
        Some(Popup::AddFiles) => render_add_files(app, frame, area),
        Some(Popup::ChartPrompt) => render_chart_prompt(app, frame, area),
        None => {}
    }

    render_notifications(app.notifier.active(), frame, body_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(label, Style::default().fg(Color::White).bg(BRAND).bold())
        } else {
            Span::styled(label, Style::default().fg(Color::Gray))
        }
    };

    let uploaded = if app.uploaded_file_ids.is_empty() {
        String::new()
    } else {
        format!(" [{} uploaded]", app.uploaded_file_ids.len())
    };

    let title = Line::from(vec![
        Span::styled(" Document AI Assistant ", Style::default().fg(Color::Cyan).bold()),
        tab(" 1 Upload ", app.screen == Screen::Upload),
        Span::raw(" "),
        tab(" 2 Chat ", app.screen == Screen::Chat),
        Span::styled(uploaded, Style::default().fg(Color::Green)),
        Span::raw(" "),
        Span::styled(app.backend.display_name(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Upload => " UPLOAD ",
        Screen::Chat => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let pairs: Vec<[Span; 2]> = match (app.popup, app.screen, app.input_mode) {
        (Some(Popup::AddFiles), _, _) => vec![hint(" Enter ", " add "), hint(" Esc ", " cancel ")],
        (Some(Popup::ChartPrompt), _, _) => {
            vec![hint(" Enter ", " regenerate "), hint(" Esc ", " close ")]
        }
        (None, Screen::Upload, _) => {
            let mut hints = vec![hint(" a ", " add files ")];
            if !app.upload.files().is_empty() {
                hints.extend([
                    hint(" j/k ", " nav "),
                    hint(" d ", " remove "),
                    hint(" C ", " clear all "),
                    hint(" u ", " upload "),
                ]);
            }
            hints.extend([hint(" 2 ", " chat "), hint(" q ", " quit ")]);
            hints
        }
        (None, Screen::Chat, InputMode::Editing) => vec![
            hint(" Enter ", " send "),
            hint(" Shift+Enter ", " newline "),
            hint(" Esc ", " stop typing "),
        ],
        (None, Screen::Chat, InputMode::Normal) => {
            let mut hints = vec![hint(" i ", " type ")];
            if app.suggestions().is_visible() {
                hints.push(hint(" Tab ", " focus "));
            }
            match app.focus {
                FocusPane::Suggestions => hints.push(hint(" Enter ", " use question ")),
                _ => hints.push(hint(" j/k ", " scroll ")),
            }
            match app.attached_chart() {
                Some(ChartPayload::Series(_)) => hints.push(hint(" r ", " regenerate chart ")),
                Some(ChartPayload::Image(_)) => hints.push(hint(" o ", " open chart ")),
                None => {}
            }
            hints.extend([hint(" 1 ", " upload "), hint(" q ", " quit ")]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(pairs.into_iter().flatten())
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_upload_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [intro_area, list_area, progress_area, button_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(3),
        Constraint::Length(if app.upload.is_uploading() { 2 } else { 0 }),
        Constraint::Length(3),
    ])
    .areas(area);

    let intro = Paragraph::new(vec![
        Line::from(Span::styled("File Upload", Style::default().bold())),
        Line::from(Span::styled(
            "Upload up to 5 documents for analysis",
            Style::default().fg(Color::Gray),
        )),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("a", Style::default().fg(Color::Cyan).bold()),
            Span::raw(" to add files or folders. "),
            Span::styled("PDF, DOCX, PPTX, XLSX, TXT supported", Style::default().fg(Color::Gray)),
        ]),
    ])
    .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(Color::DarkGray)));
    frame.render_widget(intro, intro_area);

    app.files_area = Some(list_area);

    let files = app.upload.files();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if files.is_empty() { Color::DarkGray } else { Color::Cyan }))
        .title(format!(" {} ", app.upload.header()));

    if files.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No files selected",
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, list_area);
    } else {
        let items: Vec<ListItem> = files
            .iter()
            .map(|file| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!(" {} ", file.icon())),
                    Span::styled(file.name.clone(), Style::default().bold()),
                    Span::raw("  "),
                    Span::styled(
                        format!(" {} ", file.type_label()),
                        Style::default().bg(Color::DarkGray).fg(Color::White),
                    ),
                    Span::styled(format!(" {} KB", file.size_kb()), Style::default().fg(Color::Gray)),
                ]))
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

        frame.render_stateful_widget(list, list_area, &mut app.files_state);
    }

    if app.upload.is_uploading() {
        let percent = app.upload.percent();
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(BRAND).bg(Color::Black))
            .percent(percent as u16)
            .label(format!("Uploading... {}%", percent));
        frame.render_widget(gauge, progress_area);
    }

    let enabled = !app.upload.files().is_empty() && !app.upload.is_uploading();
    let button = Paragraph::new(Span::styled(
        format!(" {} ", app.upload.button_label()),
        if enabled {
            Style::default().fg(Color::White).bg(BRAND).bold()
        } else {
            Style::default().fg(Color::Gray)
        },
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    frame.render_widget(button, button_area);
}

fn message_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.chat.messages() {
        let (who, style) = match msg.role {
            ChatRole::User => ("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            ChatRole::Assistant => ("Assistant", Style::default().fg(BRAND).add_modifier(Modifier::BOLD)),
        };
        lines.push(Line::from(vec![
            Span::styled(who, style),
            Span::raw("  "),
            Span::styled(format_time(msg.timestamp), Style::default().fg(Color::DarkGray)),
        ]));
        match msg.role {
            ChatRole::User => lines.extend(msg.content.lines().map(|l| Line::from(l.to_string()))),
            ChatRole::Assistant => lines.extend(msg.content.lines().map(parse_markdown_line)),
        }
        lines.push(Line::default());
    }

    if app.chat.is_waiting() {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(BRAND).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let chart_height = match app.attached_chart() {
        Some(ChartPayload::Image(_)) => 6,
        Some(ChartPayload::Series(_)) => 16.min(area.height / 2),
        None => 0,
    };
    let suggestions = app.suggestions();
    let suggestions_height = if suggestions.is_visible() {
        suggestions.len() as u16 + 3
    } else {
        0
    };
    let input_lines = app.chat.input.value().split('\n').count().clamp(1, 5) as u16;

    let [chat_area, chart_area, suggestions_area, input_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(chart_height),
        Constraint::Length(suggestions_height),
        Constraint::Length(input_lines + 2),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);
    app.suggestions_area = (suggestions_height > 0).then_some(suggestions_area);
    app.input_area = Some(input_area);

    let messages_focused = app.focus == FocusPane::Messages && app.input_mode == InputMode::Normal;
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if messages_focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Document AI Assistant - Chat ");

    if app.chat.messages().is_empty() && !app.chat.is_waiting() {
        let inner_height = chat_area.height.saturating_sub(2);
        let top_pad = inner_height.saturating_sub(3) / 2;
        let mut lines: Vec<Line> = (0..top_pad).map(|_| Line::default()).collect();
        lines.push(Line::from(Span::styled(EMPTY_TITLE, Style::default().bold())));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(EMPTY_HINT, Style::default().fg(Color::Gray))));
        let placeholder = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(chat_block);
        frame.render_widget(placeholder, chat_area);
    } else {
        let lines = message_lines(app);
        let inner_width = chat_area.width.saturating_sub(2);
        let visible = chat_area.height.saturating_sub(2);
        let max_scroll = wrapped_height(&lines, inner_width).saturating_sub(visible);
        app.chat_scroll = if app.follow_chat { max_scroll } else { app.chat_scroll.min(max_scroll) };

        let chat = Paragraph::new(Text::from(lines))
            .block(chat_block)
            .wrap(Wrap { trim: false })
            .scroll((app.chat_scroll, 0));
        frame.render_widget(chat, chat_area);
    }

    if let Some(payload) = app.attached_chart() {
        render_chart(app, payload, frame, chart_area);
    }

    if suggestions_height > 0 {
        render_suggestions(app, frame, suggestions_area);
    }

    render_chat_input(app, frame, input_area);
}

fn render_chart(app: &App, payload: &ChartPayload, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BRAND))
        .title(" Chart Visualization ");

    match payload {
        ChartPayload::Image(url) => {
            let body = Paragraph::new(vec![
                Line::from(Span::styled("Image chart", Style::default().bold())),
                Line::from(Span::styled(url.clone(), Style::default().fg(Color::Cyan).underlined())),
                Line::from(Span::styled(
                    "Press o to open it in your image viewer",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .wrap(Wrap { trim: true })
            .block(block);
            frame.render_widget(body, area);
        }
        ChartPayload::Series(series) => {
            let inner = block.inner(area);
            frame.render_widget(block, area);

            let [plot_area, legend_area, prompt_area] = Layout::vertical([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(inner);

            if series.is_empty() {
                let empty = Paragraph::new(Span::styled(
                    "No chart data available",
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(Alignment::Center);
                frame.render_widget(empty, plot_area);
            } else {
                let keys = series_keys(series);
                match series.kind {
                    ChartKind::Bar => render_bar_chart(series, &keys, frame, plot_area),
                    ChartKind::Line => render_line_chart(series, &keys, frame, plot_area),
                }
                let legend: Vec<Span> = keys
                    .iter()
                    .flat_map(|(key, color)| {
                        [Span::styled("■ ", Style::default().fg(*color)), Span::raw(format!("{}  ", key))]
                    })
                    .collect();
                frame.render_widget(Paragraph::new(Line::from(legend)), legend_area);
            }

            let status = if app.chart_viewer.is_regenerating() {
                Span::styled("Regenerating...", Style::default().fg(Color::Yellow))
            } else if app.chart_viewer.prompt.value().is_empty() {
                Span::styled(CHART_PROMPT_PLACEHOLDER, Style::default().fg(Color::DarkGray))
            } else {
                Span::styled(app.chart_viewer.prompt.value().to_string(), Style::default().fg(Color::Cyan))
            };
            let prompt = Line::from(vec![
                Span::styled(" r ", Style::default().bg(Color::DarkGray).fg(Color::White)),
                Span::raw(" Regenerate: "),
                status,
            ]);
            frame.render_widget(Paragraph::new(prompt), prompt_area);
        }
    }
}

/// Distinct series keys in dataset order, each with its colour
fn series_keys(series: &SeriesChart) -> Vec<(String, Color)> {
    let mut keys: Vec<(String, Color)> = Vec::new();
    for (i, dataset) in series.data.datasets.iter().enumerate() {
        let key = chart::dataset_key(dataset, i);
        let color = rgb(chart::dataset_color(dataset, i, series.kind));
        match keys.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = color,
            None => keys.push((key, color)),
        }
    }
    keys
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}

fn render_bar_chart(series: &SeriesChart, keys: &[(String, Color)], frame: &mut Frame, area: Rect) {
    const GROUP_GAP: u16 = 2;
    let width = area.width as usize;
    let gap = GROUP_GAP as usize;

    // Only draw the bars and groups that fit in one row of the area
    let keys = &keys[..keys.len().min(width.max(1))];
    let per_group = keys.len().max(1);
    let max_groups = ((width + gap) / (per_group + gap)).max(1);
    let records: Vec<_> = chart::to_records(&series.data)
        .into_iter()
        .take(max_groups)
        .collect();

    let bars_total = (records.len() * per_group).max(1);
    let gaps = gap * records.len().saturating_sub(1);
    let bar_width = u16::try_from(width.saturating_sub(gaps) / bars_total)
        .unwrap_or(u16::MAX)
        .clamp(1, 7);

    let mut bar_chart = BarChart::default()
        .bar_width(bar_width)
        .bar_gap(0)
        .group_gap(GROUP_GAP);

    for record in &records {
        let bars: Vec<Bar> = keys
            .iter()
            .map(|(key, color)| match record.value(key) {
                Some(v) => Bar::default()
                    .value(v.max(0.0).round() as u64)
                    .text_value(format_value(v))
                    .style(Style::default().fg(*color))
                    .value_style(Style::default().fg(Color::Black).bg(*color)),
                None => Bar::default().value(0).text_value(String::new()),
            })
            .collect();
        bar_chart = bar_chart.data(
            BarGroup::default()
                .label(Line::from(record.name.clone()).centered())
                .bars(&bars),
        );
    }

    frame.render_widget(bar_chart, area);
}

fn render_line_chart(series: &SeriesChart, keys: &[(String, Color)], frame: &mut Frame, area: Rect) {
    let records = chart::to_records(&series.data);
    let points: Vec<Vec<(f64, f64)>> = keys
        .iter()
        .map(|(key, _)| {
            records
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.value(key).map(|v| (i as f64, v)))
                .collect()
        })
        .collect();

    let values = points.iter().flatten().map(|(_, v)| *v);
    let y_max = values.clone().fold(f64::MIN, f64::max).max(0.0);
    let y_min = values.fold(f64::MAX, f64::min).min(0.0);
    let y_max = if y_max <= y_min { y_min + 1.0 } else { y_max * 1.1 };
    let x_max = (records.len().saturating_sub(1)).max(1) as f64;

    let datasets: Vec<ChartDataset> = keys
        .iter()
        .zip(&points)
        .map(|((key, color), pts)| {
            ChartDataset::default()
                .name(key.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(*color))
                .data(pts)
        })
        .collect();

    let x_labels: Vec<Span> = match (records.first(), records.last()) {
        (Some(first), Some(last)) if records.len() > 1 => {
            vec![Span::raw(first.name.clone()), Span::raw(last.name.clone())]
        }
        (Some(only), _) => vec![Span::raw(only.name.clone())],
        _ => Vec::new(),
    };
    let y_labels = vec![
        Span::raw(format_value(y_min)),
        Span::raw(format_value(((y_min + y_max) / 2.0).round())),
        Span::raw(format_value(y_max.round())),
    ];

    let line_chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(y_labels),
        )
        .legend_position(None);

    frame.render_widget(line_chart, area);
}

fn render_suggestions(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Suggestions;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [caption_area, list_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(CAPTION, Style::default().fg(Color::Gray))),
        caption_area,
    );

    let items: Vec<ListItem> = app
        .suggestions()
        .items()
        .map(|text| ListItem::new(format!(" {} ", text)).style(Style::default().fg(BRAND)))
        .collect();

    let mut list = List::new(items).highlight_symbol("> ");
    if focused {
        list = list.highlight_style(
            Style::default()
                .bg(BRAND)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    }

    frame.render_stateful_widget(list, list_area, &mut app.suggestions_state);
}

/// Text box contents plus where to draw the caret, scrolled to keep the caret visible
fn input_view(input: &TextInput, area: Rect) -> (Vec<Line<'static>>, (u16, u16)) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (line, col) = input.cursor_line_col();

    let row_offset = line.saturating_sub(inner_height.saturating_sub(1));
    let col_offset = if inner_width == 0 || col < inner_width { 0 } else { col - inner_width + 1 };

    let lines = input
        .value()
        .split('\n')
        .skip(row_offset)
        .take(inner_height.max(1))
        .map(|l| Line::from(l.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let cursor = (
        area.x + 1 + (col - col_offset) as u16,
        area.y + 1 + (line - row_offset) as u16,
    );
    (lines, cursor)
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.popup.is_none();
    let border = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.chat.is_waiting() { " Waiting for reply... " } else { " Message (i to type) " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    if app.chat.input.value().is_empty() && !editing {
        let placeholder = Paragraph::new(Span::styled(CHAT_PLACEHOLDER, Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let (lines, cursor) = input_view(&app.chat.input, area);
    let input = Paragraph::new(lines).style(Style::default().fg(Color::Cyan)).block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position(cursor);
    }
}

fn render_text_popup(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    instructions: &str,
    input: &TextInput,
    placeholder: &str,
    status: Option<Span>,
) {
    let popup_area = centered(area, 70, 7);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" {} ", title));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [instructions_area, _, field_area, _, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new(instructions).style(Style::default().fg(Color::DarkGray)),
        instructions_area,
    );

    if input.value().is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray))),
            field_area,
        );
    }

    // Reuse the text box scroller on a borderless one-line field
    let field_box = Rect::new(field_area.x.saturating_sub(1), field_area.y.saturating_sub(1), field_area.width + 2, 3);
    let (lines, cursor) = input_view(input, field_box);
    if !input.value().is_empty() {
        frame.render_widget(Paragraph::new(lines).style(Style::default().fg(Color::Cyan)), field_area);
    }
    frame.set_cursor_position(cursor);

    if let Some(status) = status {
        frame.render_widget(Paragraph::new(status), status_area);
    }
}

fn render_add_files(app: &App, frame: &mut Frame, area: Rect) {
    let remaining = MAX_FILES.saturating_sub(app.upload.files().len());
    render_text_popup(
        frame,
        area,
        "Add Files",
        "File or folder paths, space separated (quote paths with spaces).",
        &app.path_input,
        "~/Documents/report.pdf",
        Some(Span::styled(
            format!("{} more file(s) can be added", remaining),
            Style::default().fg(Color::DarkGray),
        )),
    );
}

fn render_chart_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let status = app
        .chart_viewer
        .is_regenerating()
        .then(|| Span::styled("Regenerating...", Style::default().fg(Color::Yellow)));
    render_text_popup(
        frame,
        area,
        "Regenerate Chart",
        "Press Enter to regenerate, Esc to close.",
        &app.chart_viewer.prompt,
        CHART_PROMPT_PLACEHOLDER,
        status,
    );
}

fn render_notifications(items: &[Notification], frame: &mut Frame, area: Rect) {
    let width = 44.min(area.width);
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let mut y = area.y;

    // Newest first
    for item in items.iter().rev() {
        let (icon, color) = match item.level {
            Level::Success => ("✓", Color::Green),
            Level::Info => ("i", Color::Cyan),
            Level::Warning => ("!", Color::Yellow),
            Level::Error => ("✗", Color::Red),
        };

        let mut lines = vec![Line::from(vec![
            Span::styled(format!("{} ", icon), Style::default().fg(color).bold()),
            Span::styled(item.title.clone(), Style::default().bold()),
        ])];
        if let Some(description) = &item.description {
            lines.push(Line::from(Span::styled(description.clone(), Style::default().fg(Color::Gray))));
        }

        let text_rows: usize = lines.iter().map(|l| l.width().max(1).div_ceil(inner_width)).sum();
        let height = text_rows as u16 + 2;
        if y + height > area.y + area.height {
            break;
        }

        let toast_area = Rect::new(area.x + area.width - width, y, width, height);
        frame.render_widget(Clear, toast_area);
        let toast = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color)));
        frame.render_widget(toast, toast_area);

        y += height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docassist::backend::Backend;
    use docassist::chart::{ChartData, Dataset};
    use docassist::files::FileDescriptor;
    use docassist::mock::MockBackend;
    use docassist::state::{ChatMessage, ChatResponse, FollowUpQuestion};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;

    fn app() -> App {
        App::new(Backend::Mock(MockBackend::new(Duration::ZERO)))
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn exchange(app: &mut App, chart: Option<ChartPayload>) {
        app.chat.input.set("question");
        app.chat.submit(1_700_000_000_000).unwrap();
        app.chat.receive(
            Ok(ChatResponse {
                message: ChatMessage::assistant("a1", "Here is **the** answer", 1_700_000_060_000),
                follow_up_questions: Some(vec![FollowUpQuestion {
                    id: "q1".into(),
                    text: "Can you summarize the main findings?".into(),
                }]),
                chart_data: chart,
            }),
            &mut app.notifier,
        );
    }

    #[test]
    fn test_empty_chat_placeholder() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains(EMPTY_TITLE));
        assert!(screen.contains(CHAT_PLACEHOLDER));
    }

    #[test]
    fn test_waiting_shows_thinking() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        app.chat.input.set("hi");
        app.chat.submit(1).unwrap();
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Thinking."));
        assert!(!screen.contains(EMPTY_TITLE));
    }

    #[test]
    fn test_bar_chart_and_suggestions_under_reply() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        exchange(
            &mut app,
            Some(ChartPayload::Series(SeriesChart {
                kind: ChartKind::Bar,
                data: ChartData {
                    labels: vec!["Jan".into(), "Feb".into()],
                    datasets: vec![Dataset {
                        label: Some("Revenue".into()),
                        data: vec![12.0, 19.0],
                        ..Default::default()
                    }],
                },
            })),
        );
        let screen = draw(&mut app, 120, 50);
        assert!(screen.contains("Chart Visualization"));
        assert!(screen.contains("Jan"));
        assert!(screen.contains("Revenue"));
        assert!(screen.contains(CAPTION));
        assert!(screen.contains("Can you summarize the main findings?"));
        assert!(screen.contains("the answer"));
        assert!(!screen.contains("**"));
    }

    #[test]
    fn test_empty_series_message() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        exchange(&mut app, Some(ChartPayload::Series(SeriesChart::default())));
        let screen = draw(&mut app, 120, 50);
        assert!(screen.contains("No chart data available"));
    }

    #[test]
    fn test_line_chart_renders_labels() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        exchange(
            &mut app,
            Some(ChartPayload::Series(SeriesChart {
                kind: ChartKind::Line,
                data: ChartData {
                    labels: vec!["Q1".into(), "Q2".into(), "Q3".into()],
                    datasets: vec![Dataset { data: vec![1.0, 5.0, 3.0], ..Default::default() }],
                },
            })),
        );
        let screen = draw(&mut app, 120, 50);
        assert!(screen.contains("Q1"));
        assert!(screen.contains("Dataset 0"));
    }

    #[test]
    fn test_upload_screen_lists_files() {
        let mut app = app();
        app.upload.add_files(
            vec![FileDescriptor {
                path: "report.pdf".into(),
                name: "report.pdf".into(),
                size: 3072,
                mime: "application/pdf".into(),
            }],
            &mut app.notifier,
        );
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Files (1/5)"));
        assert!(screen.contains("report.pdf"));
        assert!(screen.contains("3 KB"));
        assert!(screen.contains("Upload 1 file"));
    }

    #[test]
    fn test_toast_is_drawn() {
        let mut app = app();
        app.notifier.warning("You can upload a maximum of 5 files.", Some("1 file(s) were not added.".into()));
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("maximum of 5 files"));
    }

    #[test]
    fn test_markdown_bold() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let open = parse_markdown_line("x **y");
        let text: String = open.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "x **y");
    }

    #[test]
    fn test_time_format_shape() {
        let t = format_time(1_700_000_000_000);
        assert_eq!(t.len(), 5);
        assert_eq!(&t[2..3], ":");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdef"), Line::default(), Line::from("ab")];
        assert_eq!(wrapped_height(&lines, 4), 2 + 1 + 1);
    }

    #[test]
    fn test_wrapped_height_saturates() {
        let lines = vec![Line::default(); 70_000];
        assert_eq!(wrapped_height(&lines, 80), u16::MAX);
    }

    #[test]
    fn test_wide_bar_chart_fits_area() {
        let labels: Vec<String> = (0..256).map(|i| format!("L{}", i)).collect();
        let datasets: Vec<Dataset> = (0..256)
            .map(|i| Dataset {
                label: Some(format!("S{}", i)),
                data: vec![(i % 20) as f64; 256],
                ..Default::default()
            })
            .collect();
        let series = SeriesChart {
            kind: ChartKind::Bar,
            data: ChartData { labels, datasets },
        };
        let keys = series_keys(&series);
        assert_eq!(keys.len(), 256);

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|frame| render_bar_chart(&series, &keys, frame, Rect::new(0, 0, 80, 20)))
            .unwrap();
    }
}
