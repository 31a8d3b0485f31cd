use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn keybind(key: &str, pad: usize, action: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(action.to_string()),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        keybind("tab", 9, "Toggle list / map view"),
        keybind("r", 11, "Reload applications"),
        keybind("?", 11, "Show this help (any key closes)"),
        Line::from(""),
        Line::from("Filters:"),
        keybind("/", 11, "Search case no, name, address, phone"),
        keybind("c", 11, "City"),
        keybind("t", 11, "Township"),
        keybind("v", 11, "Village"),
        keybind("s", 11, "Cycle status"),
        keybind("d", 11, "Cycle disaster type"),
        keybind("x", 11, "Clear all filters"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Enter", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Esc", Style::default().fg(Color::Magenta)),
            Span::raw("  Apply / cancel while typing"),
        ]),
        Line::from(""),
        Line::from("Applications:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate"),
        ]),
        keybind("Enter", 7, "Review selected application"),
        keybind("n", 11, "Copy Google Maps link for the selected address"),
        keybind("e", 11, "Export filtered list as JSON"),
        keybind("E", 11, "Export filtered list as CSV"),
        keybind("y", 11, "Copy exported path to clipboard"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
