//! Display List
//!
//! Recording surface. The commands can be serialized and replayed on
//! another surface, possibly in another process.

use serde::{Deserialize, Serialize};
use vellum_dom::Rect;

use crate::surface::{BackgroundPaint, BorderSegment, DecorationLine, MarkerPaint, Radii, Surface, TextRun};

/// One recorded surface call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaintCommand {
    Background(BackgroundPaint),
    Border(BorderSegment),
    Text(TextRun),
    Decoration(DecorationLine),
    Image { url: String, rect: Rect },
    Marker(MarkerPaint),
    PushClip { rect: Rect, radii: Radii },
    PopClip,
}

impl PaintCommand {
    /// Area the command draws into; `None` for clip commands
    pub fn rect(&self) -> Option<Rect> {
        match self {
            PaintCommand::Background(b) => Some(b.rect),
            PaintCommand::Border(b) => Some(b.band()),
            PaintCommand::Text(t) => Some(t.rect),
            PaintCommand::Decoration(d) => Some(d.rect),
            PaintCommand::Image { rect, .. } => Some(*rect),
            PaintCommand::Marker(m) => Some(m.rect),
            PaintCommand::PushClip { .. } | PaintCommand::PopClip => None,
        }
    }

    /// Send the command to another surface
    pub fn replay(&self, surface: &mut dyn Surface) {
        match self {
            PaintCommand::Background(b) => surface.fill_background(b),
            PaintCommand::Border(b) => surface.draw_border_segment(b),
            PaintCommand::Text(t) => surface.draw_text(t),
            PaintCommand::Decoration(d) => surface.draw_decoration(d),
            PaintCommand::Image { url, rect } => surface.draw_image(url, *rect),
            PaintCommand::Marker(m) => surface.draw_list_marker(m),
            PaintCommand::PushClip { rect, radii } => surface.push_clip(*rect, *radii),
            PaintCommand::PopClip => surface.pop_clip(),
        }
    }
}

/// Ordered paint commands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    commands: Vec<PaintCommand>,
    /// Bounding box of everything drawn
    bounds: Option<Rect>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.bounds = None;
    }

    /// Text of every run in paint order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            PaintCommand::Text(run) => Some(run.text.as_str()),
            _ => None,
        })
    }

    /// Replay every command on `surface`
    pub fn replay(&self, surface: &mut dyn Surface) {
        for command in &self.commands {
            command.replay(surface);
        }
    }

    fn push(&mut self, command: PaintCommand) {
        if let Some(rect) = command.rect().filter(|r| !r.is_empty()) {
            self.bounds = Some(self.bounds.map_or(rect, |b| b.union(&rect)));
        }
        self.commands.push(command);
    }
}

impl Surface for DisplayList {
    fn fill_background(&mut self, background: &BackgroundPaint) {
        self.push(PaintCommand::Background(background.clone()));
    }

    fn draw_border_segment(&mut self, segment: &BorderSegment) {
        self.push(PaintCommand::Border(*segment));
    }

    fn draw_text(&mut self, run: &TextRun) {
        self.push(PaintCommand::Text(run.clone()));
    }

    fn draw_decoration(&mut self, line: &DecorationLine) {
        self.push(PaintCommand::Decoration(*line));
    }

    fn draw_image(&mut self, url: &str, rect: Rect) {
        self.push(PaintCommand::Image { url: url.to_string(), rect });
    }

    fn draw_list_marker(&mut self, marker: &MarkerPaint) {
        self.push(PaintCommand::Marker(marker.clone()));
    }

    fn push_clip(&mut self, rect: Rect, radii: Radii) {
        self.push(PaintCommand::PushClip { rect, radii });
    }

    fn pop_clip(&mut self) {
        self.push(PaintCommand::PopClip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_css::{Color, DecorationStyle};
    use vellum_layout::FontHandle;

    use crate::surface::DecorationKind;

    #[test]
    fn test_bounds_track_drawing() {
        let mut list = DisplayList::new();
        list.push_clip(Rect::new(0.0, 0.0, 1000.0, 1000.0), [0.0; 4]);
        list.draw_image("a.png", Rect::new(10.0, 10.0, 20.0, 20.0));
        list.draw_text(&TextRun {
            text: "hi".into(),
            font: FontHandle(0),
            rect: Rect::new(40.0, 5.0, 16.0, 16.0),
            baseline: 17.8,
            color: Color::BLACK,
        });
        list.pop_clip();
        assert_eq!(list.len(), 4);
        assert_eq!(list.bounds(), Some(Rect::new(10.0, 5.0, 46.0, 25.0)));
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["hi"]);
    }

    #[test]
    fn test_replay_reproduces_commands() {
        let mut list = DisplayList::new();
        list.draw_decoration(&DecorationLine {
            kind: DecorationKind::Underline,
            rect: Rect::new(0.0, 10.0, 30.0, 1.0),
            style: DecorationStyle::Solid,
            color: Color::BLACK,
        });
        list.draw_image("x.png", Rect::new(1.0, 2.0, 3.0, 4.0));
        let mut copy = DisplayList::new();
        list.replay(&mut copy);
        assert_eq!(copy, list);
    }
}
