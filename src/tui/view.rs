use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use super::app::{AgentField, AgentForm, App, CreateForm, Field, Mode, TagField, TagManager};
use super::keymap;
use crate::model::{Agent, Item, Tag};
use crate::state::View;

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    match app.state.view() {
        View::Items => render_items(frame, app, chunks[1]),
        View::Agents => render_agents(frame, app, chunks[1]),
    }
    render_footer(frame, app, chunks[2]);

    match &app.mode {
        Mode::Help => render_help(frame),
        Mode::TagPicker(picker) => {
            render_tag_picker(frame, app.state.tags(), picker.cursor, &picker.chosen)
        }
        Mode::Create(form) => render_create_dialog(frame, form, app.state.tags()),
        Mode::CreateAgent(form) => render_agent_dialog(frame, form),
        Mode::Tags(manager) => render_tag_manager(frame, manager, app.state.tags()),
        Mode::ConfirmDelete(target) => render_confirm(frame, &target.describe()),
        Mode::Export { path } => render_export(frame, path),
        Mode::Normal | Mode::Search => {}
    }
}

/// Rect of at most `width` x `height` centered in `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// `#RRGGBB` or `#RRGGBBAA`; alpha is ignored.
fn tag_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
    };
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(label, Style::default().fg(Color::Black).bg(Color::Cyan).bold())
        } else {
            Span::styled(label, Style::default().fg(Color::DarkGray))
        }
    };
    let view = app.state.view();
    let mut spans = vec![
        tab(" Items ", view == View::Items),
        Span::raw(" "),
        tab(" Agents ", view == View::Agents),
    ];

    if view == View::Items {
        let filter = app.state.filter();
        if let Some(t) = filter.item_type {
            spans.push(Span::styled(
                format!("  type:{t}"),
                Style::default().fg(Color::Yellow),
            ));
        }
        if !filter.tag_ids.is_empty() {
            let names: Vec<&str> = app
                .state
                .tags()
                .iter()
                .filter(|t| filter.tag_ids.contains(&t.id))
                .map(|t| t.name.as_str())
                .collect();
            spans.push(Span::styled(
                format!("  tags:{}", names.join("|")),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    if app.state.is_loading() {
        spans.push(Span::styled("  loading…", Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn mark(selected: bool) -> Span<'static> {
    if selected {
        Span::styled("[x] ", Style::default().fg(Color::Green))
    } else {
        Span::raw("[ ] ")
    }
}

fn item_row<'a>(item: &'a Item, selected: bool) -> ListItem<'a> {
    let mut spans = vec![
        mark(selected),
        Span::styled(
            format!("{:<9}", item.item_type),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(item.name.as_str()),
    ];
    for tag in &item.tags {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("#{}", tag.name),
            Style::default().fg(tag_color(&tag.color)),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn agent_row<'a>(agent: &'a Agent, selected: bool) -> ListItem<'a> {
    let mut spans = vec![
        mark(selected),
        Span::styled(
            format!("{:<9}", agent.mode),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(agent.name.as_str()),
    ];
    if let Some(model) = &agent.model {
        spans.push(Span::styled(
            format!("  {model}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn render_items(frame: &mut Frame, app: &mut App, area: Rect) {
    let selection = app.state.item_selection();
    let rows: Vec<ListItem> = app
        .state
        .filtered_items()
        .iter()
        .map(|item| item_row(item, selection.contains(&item.id)))
        .collect();
    let title = format!(
        " Items {}/{} ({} selected) ",
        app.state.filtered_items().len(),
        app.state.items().len(),
        selection.len()
    );
    let list = List::new(rows)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, area, &mut app.items_list);
}

fn render_agents(frame: &mut Frame, app: &mut App, area: Rect) {
    let selection = app.state.agent_selection();
    let rows: Vec<ListItem> = app
        .state
        .agents()
        .iter()
        .map(|agent| agent_row(agent, selection.contains(&agent.id)))
        .collect();
    let title = format!(
        " Agents {} ({} selected) ",
        app.state.agents().len(),
        selection.len()
    );
    let list = List::new(rows)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, area, &mut app.agents_list);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    if let Mode::Search = app.mode {
        let line = Line::from(vec![
            Span::styled("/", Style::default().fg(Color::Cyan)),
            Span::raw(app.state.filter().query.as_str()),
            Span::raw("_"),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }
    if let Some(status) = &app.status {
        let color = if status.is_error { Color::Red } else { Color::Green };
        frame.render_widget(
            Paragraph::new(status.text.as_str()).style(Style::default().fg(color)),
            area,
        );
        return;
    }
    frame.render_widget(
        Paragraph::new("?: help  Tab: switch view  q: quit")
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_help(frame: &mut Frame) {
    let rows: Vec<_> = keymap::help_rows().collect();
    let area = centered_rect(52, rows.len() as u16 + 4, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = rows
        .iter()
        .map(|s| {
            Line::from(vec![
                Span::styled(format!("{:>8}", s.label), Style::default().fg(Color::Cyan)),
                Span::raw(format!("  {}", s.description)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press ? or Esc to close",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Keys ")
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_confirm(frame: &mut Frame, question: &str) {
    let width = (question.chars().count() as u16 + 6).max(30);
    let area = centered_rect(width, 5, frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Confirm ")
        .border_style(Style::default().fg(Color::Yellow));
    let text = vec![
        Line::from(question),
        Line::from(""),
        Line::from(Span::styled("y/Enter: yes  n/Esc: no", Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_export(frame: &mut Frame, path: &str) {
    let area = centered_rect(64, 5, frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Export to ")
        .border_style(Style::default().fg(Color::Cyan));
    let text = vec![
        Line::from(format!("{path}_")),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: export  Ctrl-u: clear  Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn tag_lines<'a>(
    tags: &'a [Tag],
    cursor: usize,
    chosen: &std::collections::BTreeSet<String>,
    focused: bool,
) -> Vec<ListItem<'a>> {
    tags.iter()
        .enumerate()
        .map(|(i, tag)| {
            let style = if focused && i == cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                mark(chosen.contains(&tag.id)),
                Span::styled(tag.name.as_str(), Style::default().fg(tag_color(&tag.color))),
            ]))
            .style(style)
        })
        .collect()
}

fn render_tag_picker(
    frame: &mut Frame,
    tags: &[Tag],
    cursor: usize,
    chosen: &std::collections::BTreeSet<String>,
) {
    let term = frame.area();
    let height = (tags.len() as u16 + 3).min(term.height.saturating_sub(2));
    let area = centered_rect(40, height, term);
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Filter by tags ")
        .title_bottom(" Space: toggle  Enter: apply ")
        .border_style(Style::default().fg(Color::Cyan));
    let mut state = ListState::default().with_selected(Some(cursor));
    frame.render_stateful_widget(
        List::new(tag_lines(tags, cursor, chosen, true)).block(block),
        area,
        &mut state,
    );
}

fn field_label(label: &str, focused: bool) -> Paragraph<'_> {
    let style = if focused {
        Style::default().fg(Color::Cyan).bold()
    } else {
        Style::default()
    };
    Paragraph::new(label).style(style)
}

fn render_create_dialog(frame: &mut Frame, form: &CreateForm, tags: &[Tag]) {
    let term = frame.area();
    let width = 64.min(term.width.saturating_sub(4));
    let height = 20.min(term.height.saturating_sub(2));
    let area = centered_rect(width, height, term);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" New item ")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // name label
            Constraint::Length(1), // name input
            Constraint::Length(1), // type
            Constraint::Length(1), // tags label
            Constraint::Min(3),    // tag list
            Constraint::Length(1), // content summary
            Constraint::Length(1), // error
            Constraint::Length(1), // hint
        ])
        .split(inner);

    frame.render_widget(field_label("Name:", form.focused == Field::Name), chunks[0]);
    let cursor = if form.focused == Field::Name { "_" } else { "" };
    frame.render_widget(Paragraph::new(format!("  {}{cursor}", form.name)), chunks[1]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                "Type: ",
                if form.focused == Field::Type {
                    Style::default().fg(Color::Cyan).bold()
                } else {
                    Style::default()
                },
            ),
            Span::raw(format!("< {} >", form.item_type)),
        ])),
        chunks[2],
    );

    frame.render_widget(field_label("Tags:", form.focused == Field::Tags), chunks[3]);
    let mut state = ListState::default().with_selected(Some(form.tag_cursor));
    frame.render_stateful_widget(
        List::new(tag_lines(
            tags,
            form.tag_cursor,
            &form.tag_ids,
            form.focused == Field::Tags,
        )),
        chunks[4],
        &mut state,
    );

    let lines = form.content.lines().count();
    let summary = if lines == 0 {
        "Content: (empty, Ctrl-e to write)".to_string()
    } else {
        format!("Content: {lines} line(s)")
    };
    frame.render_widget(
        Paragraph::new(summary).style(Style::default().fg(Color::DarkGray)),
        chunks[5],
    );

    if let Some(err) = &form.error {
        frame.render_widget(
            Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red)),
            chunks[6],
        );
    }

    frame.render_widget(
        Paragraph::new("Tab: next field  Ctrl-e: edit content  Enter: create  Esc: cancel")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[7],
    );
}

fn render_tag_manager(frame: &mut Frame, manager: &TagManager, tags: &[Tag]) {
    let term = frame.area();
    let height = (tags.len() as u16 + 5).min(term.height.saturating_sub(2));
    let area = centered_rect(48, height, term);
    frame.render_widget(Clear, area);

    let hint = if manager.input.is_some() {
        " Tab: name/color  Enter: save  Esc: cancel "
    } else {
        " n: new  e: edit  d: delete  Esc: close "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Tags ")
        .title_bottom(hint)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let rows: Vec<ListItem> = tags
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            let mut spans = vec![
                Span::styled("■ ", Style::default().fg(tag_color(&tag.color))),
                Span::raw(tag.name.as_str()),
            ];
            if tag.is_system {
                spans.push(Span::styled(" (system)", Style::default().fg(Color::DarkGray)));
            }
            let style = if i == manager.cursor && manager.input.is_none() {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();
    let mut state = ListState::default().with_selected(Some(manager.cursor));
    frame.render_stateful_widget(List::new(rows), chunks[0], &mut state);

    if let Some(input) = &manager.input {
        let field = |label: &'static str, value: &str, focused: bool| {
            let style = if focused {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default()
            };
            let cursor = if focused { "_" } else { "" };
            [Span::styled(label, style), Span::raw(format!("{value}{cursor}  "))]
        };
        let mut spans = Vec::new();
        spans.extend(field("Name: ", &input.name, input.focused == TagField::Name));
        spans.extend(field("Color: ", &input.color, input.focused == TagField::Color));
        frame.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);
    }
}

fn render_agent_dialog(frame: &mut Frame, form: &AgentForm) {
    let term = frame.area();
    let area = centered_rect(56.min(term.width.saturating_sub(4)), 9, term);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" New agent ")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 7])
        .split(inner);

    frame.render_widget(field_label("Name:", form.focused == AgentField::Name), chunks[0]);
    let cursor = if form.focused == AgentField::Name { "_" } else { "" };
    frame.render_widget(Paragraph::new(format!("  {}{cursor}", form.name)), chunks[1]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                "Mode: ",
                if form.focused == AgentField::Mode {
                    Style::default().fg(Color::Cyan).bold()
                } else {
                    Style::default()
                },
            ),
            Span::raw(format!("< {} >", form.mode)),
        ])),
        chunks[2],
    );

    frame.render_widget(field_label("Model:", form.focused == AgentField::Model), chunks[3]);
    let cursor = if form.focused == AgentField::Model { "_" } else { "" };
    let model = if form.model.is_empty() && cursor.is_empty() {
        "(default)"
    } else {
        form.model.as_str()
    };
    frame.render_widget(Paragraph::new(format!("  {model}{cursor}")), chunks[4]);

    if let Some(err) = &form.error {
        frame.render_widget(
            Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red)),
            chunks[5],
        );
    }

    frame.render_widget(
        Paragraph::new("Tab: next field  Space: mode  Enter: create  Esc: cancel")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[6],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    use crate::model::ItemType;
    use crate::tui::app::tests::{add_item, test_app};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        let r = centered_rect(40, 20, area);
        assert_eq!((r.width, r.height), (20, 10));
        let r = centered_rect(10, 4, Rect::new(0, 0, 80, 24));
        assert_eq!((r.x, r.y), (35, 10));
    }

    #[test]
    fn tag_color_parses_hex() {
        assert_eq!(tag_color("#ff8000"), Color::Rgb(255, 128, 0));
        assert_eq!(tag_color("#ff800080"), Color::Rgb(255, 128, 0));
        assert_eq!(tag_color("nope"), Color::Gray);
    }

    #[test]
    fn renders_items_and_help() {
        let (mut app, _) = test_app();
        add_item(&mut app, "Review checklist", ItemType::Skill);
        let mut terminal = Terminal::new(TestBackend::new(80, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Review checklist"));
        assert!(text.contains("Items 1/1"));

        app.mode = Mode::Help;
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(buffer_text(&terminal).contains("Cycle type filter"));
    }

    #[test]
    fn renders_tag_manager_with_system_marker() {
        let (mut app, _) = test_app();
        app.open_tags();
        app.tags_new();
        let mut terminal = Terminal::new(TestBackend::new(80, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("(system)"));
        assert!(text.contains("Color: #6366f1"));
    }
}
