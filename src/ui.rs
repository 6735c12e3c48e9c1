use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use floorrush::{
    game::{Phase, ViewState},
    layout::{self as floors, LAYOUT_COUNT},
    util::{fastest, mean, std_dev},
};

use crate::App;

const BUTTON_WIDTH: u16 = 10;
const BUTTON_HEIGHT: u16 = 3;
const COLUMN_GAP: u16 = 4;
const ACTION_WIDTH: u16 = 20;
const VERTICAL_MARGIN: u16 = 1;

/// Screen areas shared by rendering and mouse hit testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub status: Rect,
    pub body: Rect,
    pub action: Rect,
    pub legend: Rect,
}

pub fn regions(area: Rect, phase: Phase) -> Regions {
    // the floor grid needs every line it can get
    let action_height = if phase == Phase::Active {
        0
    } else {
        BUTTON_HEIGHT
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(action_height),
            Constraint::Length(1),
        ])
        .split(area);

    Regions {
        status: chunks[0],
        body: chunks[1],
        action: centered_width(chunks[2], ACTION_WIDTH),
        legend: chunks[3],
    }
}

fn centered_width(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

fn centered_lines(area: Rect, lines: u16) -> Rect {
    let height = lines.min(area.height);
    Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    }
}

/// Button rectangles for a layout, two per row, clipped to `body`
pub fn floor_buttons(body: Rect, layout: &floors::Layout) -> Vec<(u8, Rect)> {
    let grid_width = BUTTON_WIDTH * 2 + COLUMN_GAP;
    let grid_height = (layout.floors().len() as u16 / 2) * BUTTON_HEIGHT;
    let left = body.x + body.width.saturating_sub(grid_width) / 2;
    let top = body.y + body.height.saturating_sub(grid_height) / 2;

    layout
        .rows()
        .enumerate()
        .flat_map(|(row, (l, r))| {
            let y = top + row as u16 * BUTTON_HEIGHT;
            [
                (l, Rect::new(left, y, BUTTON_WIDTH, BUTTON_HEIGHT)),
                (
                    r,
                    Rect::new(left + BUTTON_WIDTH + COLUMN_GAP, y, BUTTON_WIDTH, BUTTON_HEIGHT),
                ),
            ]
        })
        .map(|(floor, rect)| (floor, rect.intersection(body)))
        .filter(|(_, rect)| !rect.is_empty())
        .collect()
}

/// Floor whose button covers the terminal cell, if any
pub fn floor_at(area: Rect, view: &ViewState, column: u16, row: u16) -> Option<u8> {
    let layout = view.current_layout.as_ref()?;
    let body = regions(area, view.phase).body;
    floor_buttons(body, layout)
        .into_iter()
        .find(|(_, rect)| rect.contains(Position::new(column, row)))
        .map(|(floor, _)| floor)
}

pub fn action_at(area: Rect, phase: Phase, column: u16, row: u16) -> bool {
    phase != Phase::Active && regions(area, phase).action.contains(Position::new(column, row))
}

fn render_button(label: &str, rect: Rect, style: Style, buf: &mut Buffer) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(style);

    Paragraph::new(Span::styled(
        label.to_string(),
        style.add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(block)
    .render(rect, buf);
}

fn results_lines(elapsed: &[f64]) -> Vec<Line<'static>> {
    let red_bold = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let fastest_pattern = fastest(elapsed).map(|(idx, _)| idx);

    let mut lines = vec![
        Line::from(Span::styled("Final Results", red_bold)),
        Line::default(),
    ];

    lines.extend(elapsed.iter().enumerate().map(|(idx, time)| {
        let style = if Some(idx) == fastest_pattern {
            bold.fg(Color::Green)
        } else {
            bold
        };
        Line::from(Span::styled(
            format!("Pattern {} : {:.3} sec", idx + 1, time),
            style,
        ))
    }));

    if let (Some(avg), Some(sd)) = (mean(elapsed), std_dev(elapsed)) {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("{avg:.3} sec avg   {sd:.3} sd"),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = self.game.view();
        let regions = regions(area, view.phase);

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let green_style = Style::default().fg(Color::Green);
        let blue_style = Style::default().fg(Color::Blue);

        if view.phase != Phase::Finished {
            Paragraph::new(Span::styled(
                format!("Pattern {}/{}", view.layout_index + 1, LAYOUT_COUNT),
                dim_style.patch(bold_style),
            ))
            .alignment(Alignment::Center)
            .render(regions.status, buf);
        }

        let legend = match view.phase {
            Phase::Idle if view.transition_pending => "",
            Phase::Idle => "(enter) start / (esc)ape",
            Phase::AwaitingConfirm => "(enter) start game / (esc)ape",
            Phase::Active => "click the floor or ←↑↓→ + (enter) / (esc)ape",
            Phase::Finished => "(r)estart / (esc)ape",
        };

        match view.phase {
            Phase::Idle => {
                if view.transition_pending {
                    let recorded = view.last_elapsed().unwrap_or_default();
                    let next = if view.elapsed.len() >= LAYOUT_COUNT {
                        "results coming up"
                    } else {
                        "next pattern coming up"
                    };
                    Paragraph::new(vec![
                        Line::from(Span::styled(
                            format!("Pattern {} : {:.3} sec", view.elapsed.len(), recorded),
                            green_style.patch(bold_style),
                        )),
                        Line::from(Span::styled(next, italic_style)),
                    ])
                    .alignment(Alignment::Center)
                    .render(centered_lines(regions.body, 2), buf);
                } else {
                    render_button("Start", regions.action, green_style, buf);
                }
            }
            Phase::AwaitingConfirm => {
                if let Some(floor) = view.target_floor {
                    Paragraph::new(Span::styled(
                        format!("Floor {floor}"),
                        Style::default().fg(Color::Red).patch(bold_style),
                    ))
                    .alignment(Alignment::Center)
                    .render(centered_lines(regions.body, 1), buf);
                }
                render_button("Start Game", regions.action, blue_style, buf);
            }
            Phase::Active => {
                if let Some(layout) = view.current_layout.as_ref() {
                    for (floor, rect) in floor_buttons(regions.body, layout) {
                        let style = if layout.position(floor) == Some(self.selected) {
                            Style::default().fg(Color::Yellow)
                        } else {
                            Style::default().fg(Color::Gray)
                        };
                        render_button(&floor.to_string(), rect, style, buf);
                    }
                }
            }
            Phase::Finished => {
                let lines = results_lines(&view.elapsed);
                let height = lines.len() as u16;
                Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .render(centered_lines(regions.body, height), buf);
                render_button("Restart", regions.action, blue_style, buf);
            }
        }

        Paragraph::new(Span::styled(legend, italic_style))
            .alignment(Alignment::Center)
            .render(regions.legend, buf);
    }
}
