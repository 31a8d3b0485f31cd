mod export;
mod help;
mod state;

use crate::cli::{Cli, Session};
use crate::config::ConfigSource;
use crate::model::{AppEvent, InfoEvent, ViewMode};
use crate::orchestrator::{self, ControllerCtx, UiCommand};
use crate::render::{local_offset, status_badge, ListRender};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::canvas::{Canvas, Map, MapResolution, Points},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{push_wrapped_kv, FilterField, InputMode, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, session: Session) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let _ = event_tx.send(AppEvent::Info(InfoEvent::ConfigResolved {
        api_base_url: session.cfg.api_base_url.clone(),
        from_backend: session.cfg.source == ConfigSource::Backend,
    }));

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let app_name = session.cfg.app_name.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, app_name, event_rx, cmd_tx));

    let ctx = ControllerCtx {
        client: session.client,
        geocoder: session.geocoder,
        geocode_concurrency: args.geocode_concurrency,
        load_on_launch: true,
    };
    let res = orchestrator::run_controller(ctx, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

fn send(cmd_tx: &UnboundedSender<UiCommand>, cmd: Option<UiCommand>) {
    if let Some(cmd) = cmd {
        let _ = cmd_tx.send(cmd);
    }
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    app_name: String,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(app_name, args.criteria(), args.view, local_offset());
    state.export_targets = args.export_targets();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut visible_rows = 20usize;

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            let cmd = state.apply_event(ev);
            send(&cmd_tx, cmd);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| {
                    visible_rows = list_capacity(f.area());
                    draw(f.area(), f, &state)
                })
                .ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (k.modifiers, k.code) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
                match state.mode {
                    InputMode::Editing(_) => match k.code {
                        KeyCode::Enter => send(&cmd_tx, state.commit_edit()),
                        KeyCode::Esc => state.cancel_edit(),
                        KeyCode::Backspace => {
                            state.input.pop();
                        }
                        KeyCode::Char(ch) => state.input.push(ch),
                        _ => {}
                    },
                    InputMode::Help => state.mode = InputMode::Browse,
                    InputMode::Detail => match k.code {
                        KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => {
                            state.mode = InputMode::Browse;
                            state.detail_scroll = 0;
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            state.detail_scroll = state.detail_scroll.saturating_sub(1);
                        }
                        KeyCode::Down | KeyCode::Char('j') => state.detail_scroll += 1,
                        KeyCode::Char('n') => navigate(&mut state),
                        KeyCode::Char('q') => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break Ok(());
                        }
                        _ => {}
                    },
                    InputMode::Browse => match k.code {
                        KeyCode::Char('q') => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break Ok(());
                        }
                        KeyCode::Char('r') => {
                            let _ = cmd_tx.send(UiCommand::Reload);
                        }
                        KeyCode::Tab => send(&cmd_tx, state.toggle_view()),
                        KeyCode::Char('/') => state.begin_edit(FilterField::Search),
                        KeyCode::Char('c') => state.begin_edit(FilterField::City),
                        KeyCode::Char('t') => state.begin_edit(FilterField::Township),
                        KeyCode::Char('v') => state.begin_edit(FilterField::Village),
                        KeyCode::Char('s') => send(&cmd_tx, state.cycle_status()),
                        KeyCode::Char('d') => send(&cmd_tx, state.cycle_disaster_type()),
                        KeyCode::Char('x') => send(&cmd_tx, state.clear_filters()),
                        KeyCode::Char('?') => state.mode = InputMode::Help,
                        KeyCode::Up | KeyCode::Char('k') => state.select_prev(),
                        KeyCode::Down | KeyCode::Char('j') => state.select_next(visible_rows),
                        KeyCode::Enter => {
                            if state.selected_record().is_some() {
                                state.mode = InputMode::Detail;
                                state.detail_scroll = 0;
                            }
                        }
                        KeyCode::Char('n') => navigate(&mut state),
                        KeyCode::Char('e') => match export::export_filtered_json(&state) {
                            Ok(p) => {
                                state.last_exported_path = Some(p.to_string_lossy().to_string());
                                state.info = format!(
                                    "Exported JSON: {} (press 'y' to copy path)",
                                    p.display()
                                );
                            }
                            Err(e) => state.info = format!("JSON export failed: {e:#}"),
                        },
                        KeyCode::Char('E') => match export::export_filtered_csv(&state) {
                            Ok(p) => {
                                state.last_exported_path = Some(p.to_string_lossy().to_string());
                                state.info = format!(
                                    "Exported CSV: {} (press 'y' to copy path)",
                                    p.display()
                                );
                            }
                            Err(e) => state.info = format!("CSV export failed: {e:#}"),
                        },
                        KeyCode::Char('y') => match state.last_exported_path.clone() {
                            Some(path) => match export::copy_to_clipboard(&path) {
                                Ok(()) => state.info = format!("✓ Copied to clipboard: {path}"),
                                Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
                            },
                            None => {
                                state.info =
                                    "No exported file path to copy. Export a file first (e/E)"
                                        .into();
                            }
                        },
                        _ => {}
                    },
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn navigate(state: &mut UiState) {
    match state.navigate_selected() {
        Ok(url) => match export::copy_to_clipboard(&url) {
            Ok(()) => state.info = format!("✓ Copied to clipboard: {url}"),
            Err(e) => state.info = format!("{url} (clipboard failed: {e:#})"),
        },
        Err(reason) => state.info = reason,
    }
}

/// Rows available to the list body for a given terminal size.
fn list_capacity(area: Rect) -> usize {
    // tabs 3 + stats 3 + filters 3 + status 3 + list border 2 + header 1
    (area.height as usize).saturating_sub(15).max(1)
}

fn hex_color(hex: &str) -> Color {
    let h = hex.trim_start_matches('#');
    if h.len() != 6 {
        return Color::Gray;
    }
    match (
        u8::from_str_radix(&h[0..2], 16),
        u8::from_str_radix(&h[2..4], 16),
        u8::from_str_radix(&h[4..6], 16),
    ) {
        (Ok(r), Ok(g), Ok(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let tab = match state.view() {
        ViewMode::List => 0,
        ViewMode::Map => 1,
    };
    let tabs = Tabs::new(vec![Line::from("List"), Line::from("Map")])
        .select(tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(state.app_name.as_str()),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    draw_stats(chunks[1], f, state);
    draw_filters(chunks[2], f, state);

    match state.mode {
        InputMode::Help => help::draw_help(chunks[3], f),
        InputMode::Detail => draw_detail(chunks[3], f, state),
        _ => match state.view() {
            ViewMode::List => draw_list(chunks[3], f, state),
            ViewMode::Map => draw_map(chunks[3], f, state),
        },
    }

    draw_status(chunks[4], f, state);
}

fn draw_stats(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let s = state.store.stats();
    let cards = [
        ("待審核", s.pending, "#dc2626"),
        ("審核中", s.inspection, "#d97706"),
        ("已拒絕", s.rejected, "#ea580c"),
        ("已完成", s.approved_or_completed, "#059669"),
        ("總計", s.total, "#999999"),
    ];
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5].as_ref())
        .split(area);
    for (i, (label, value, color)) in cards.iter().enumerate() {
        let p = Paragraph::new(Line::from(vec![Span::styled(
            value.to_string(),
            Style::default()
                .fg(hex_color(color))
                .add_modifier(Modifier::BOLD),
        )]))
        .block(Block::default().borders(Borders::ALL).title(*label));
        f.render_widget(p, cols[i]);
    }
}

fn draw_filters(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let c = &state.criteria;
    let field = |key: &'static str, label: &'static str, value: &str, editing: bool| {
        let shown = if editing {
            format!("{}▏", state.input)
        } else if value.is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        };
        let value_style = if editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        vec![
            Span::styled(key, Style::default().fg(Color::Magenta)),
            Span::raw(format!(" {label}: ")),
            Span::styled(shown, value_style),
            Span::raw("  "),
        ]
    };
    let editing = |ff: FilterField| state.mode == InputMode::Editing(ff);

    let mut spans = Vec::new();
    spans.extend(field("/", "search", &c.search_term, editing(FilterField::Search)));
    spans.extend(field("c", "city", &c.city, editing(FilterField::City)));
    spans.extend(field("t", "township", &c.township, editing(FilterField::Township)));
    spans.extend(field("v", "village", &c.village, editing(FilterField::Village)));
    spans.extend(field("s", "status", &c.status, false));
    spans.extend(field("d", "disaster", &c.disaster_type, false));

    let title = match state.mode {
        InputMode::Editing(ff) => format!("Filters (editing {})", ff.label()),
        _ => "Filters".to_string(),
    };
    let p = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_list(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let title = format!("Applications ({})", state.filtered.len());
    let block = Block::default().borders(Borders::ALL).title(title);

    let rows = match &state.render {
        ListRender::Empty { message } => {
            let p = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("📭 {message}"),
                    Style::default().fg(Color::Gray),
                )),
            ])
            .block(block);
            f.render_widget(p, area);
            return;
        }
        ListRender::Rows { rows } => rows,
    };

    let max_items = (area.height as usize).saturating_sub(3).max(1);
    let scroll_offset = {
        let mut offset = state.scroll_offset.min(rows.len().saturating_sub(1));
        if state.selected < offset {
            offset = state.selected;
        } else if state.selected >= offset + max_items {
            offset = state.selected + 1 - max_items;
        }
        offset
    };

    let mut lines: Vec<Line> = vec![Line::from(Span::styled(
        "Status    Case no       Applicant     Type   Date        Location",
        Style::default().fg(Color::Gray),
    ))];
    for (idx, row) in rows.iter().enumerate().skip(scroll_offset).take(max_items) {
        let marker = if idx == state.selected { "> " } else { "  " };
        let base = if idx == state.selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, base),
            Span::styled(
                format!("{:<8}", row.badge.label),
                base.fg(hex_color(row.badge.color)),
            ),
            Span::styled(format!("{:<14}", row.case_no), base),
            Span::styled(format!("{:<12}", row.applicant_name), base),
            Span::styled(format!("{:<6}", row.disaster_type), base),
            Span::styled(format!("{:<12}", row.date), base),
            Span::styled(row.location.clone(), base),
        ]));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_map(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let overlay = &state.overlay;
    let progress = if overlay.is_finished() {
        format!(
            " Map: {} placed, {} failed ",
            overlay.markers().len(),
            overlay.failed()
        )
    } else {
        format!(
            " Map: {} placed, {} pending ",
            overlay.markers().len(),
            overlay.outstanding()
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            progress,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let vp = overlay.viewport();
    let selected_id = state.selected_record().map(|r| r.id.as_str());
    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(vp.lng)
        .y_bounds(vp.lat)
        .paint(|ctx| {
            ctx.draw(&Map {
                resolution: MapResolution::High,
                color: Color::DarkGray,
            });
            ctx.layer();
            for m in overlay.markers() {
                ctx.draw(&Points {
                    coords: &[(m.position.lng, m.position.lat)],
                    color: hex_color(m.color()),
                });
            }
            if let Some(m) = overlay
                .markers()
                .iter()
                .find(|m| Some(m.record_id.as_str()) == selected_id)
            {
                ctx.print(
                    m.position.lng,
                    m.position.lat,
                    Line::from(Span::styled(
                        m.title.clone(),
                        Style::default().fg(hex_color(m.color())),
                    )),
                );
            }
        });
    f.render_widget(canvas, area);
}

fn draw_detail(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(r) = state.selected_record() else {
        return;
    };
    let badge = status_badge(&r.status);
    let date = match &state.render {
        ListRender::Rows { rows } => rows
            .get(state.selected)
            .map(|d| d.date.clone())
            .unwrap_or_default(),
        ListRender::Empty { .. } => String::new(),
    };

    let mut lines: Vec<Line<'static>> = vec![Line::from(vec![
        Span::styled(
            badge.label.clone(),
            Style::default()
                .fg(hex_color(badge.color))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(crate::map::marker_title(r)),
    ])];
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    push_wrapped_kv(&mut lines, "Date", &date, area.width);
    push_wrapped_kv(&mut lines, "Disaster", &crate::render::disaster_type_label(r.disaster_type.as_deref()), area.width);
    push_wrapped_kv(&mut lines, "ID number", &opt(&r.id_number), area.width);
    push_wrapped_kv(&mut lines, "Phone", &opt(&r.phone), area.width);
    push_wrapped_kv(&mut lines, "Address", &opt(&r.address), area.width);
    push_wrapped_kv(&mut lines, "Damage location", &opt(&r.damage_location), area.width);
    push_wrapped_kv(&mut lines, "Damage", &opt(&r.damage_description), area.width);
    push_wrapped_kv(&mut lines, "Subsidy", &opt(&r.subsidy_type), area.width);
    push_wrapped_kv(&mut lines, "Requested", &opt(&r.requested_amount), area.width);
    push_wrapped_kv(&mut lines, "Review notes", &opt(&r.review_notes), area.width);
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Full record:",
        Style::default().fg(Color::Gray),
    )));
    let json = serde_json::to_string_pretty(r).unwrap_or_else(|e| format!("<unserializable: {e}>"));
    lines.extend(json.lines().map(|l| Line::from(l.to_string())));

    let p = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Review (Esc back, n navigate, ↑/↓ scroll)"),
        )
        .wrap(Wrap { trim: false })
        .scroll((state.detail_scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = Vec::new();
    if state.loading {
        spans.push(Span::styled("⟳ ", Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::raw(state.info.clone()));
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Status (? help)"))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
