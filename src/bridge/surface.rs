// Rendering surface glue: size sync and editor caret status.

/// Margin the surface keeps around the graph canvas, in pixels.
pub const GRAPH_MARGIN: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphSize {
    pub width: f32,
    pub height: f32,
}

impl GraphSize {
    /// Canvas size for a surface of the given size, never negative.
    pub fn for_surface(width: f32, height: f32) -> Self {
        Self { width: (width - GRAPH_MARGIN).max(0.0), height: (height - GRAPH_MARGIN).max(0.0) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    SizeChanged { width: f32, height: f32 },
    // The size event fires before the surface is ready, so size again here
    NavigationCompleted { width: f32, height: f32 },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SurfaceState {
    pub loaded: bool,
    pub graph_size: Option<GraphSize>,
}

/// Fold a surface event into the state; returns the new canvas size when it
/// changed.
///
/// Size changes before the surface is ready are ignored.
pub fn on_surface_event(state: &mut SurfaceState, event: SurfaceEvent) -> Option<GraphSize> {
    let (width, height) = match event {
        SurfaceEvent::SizeChanged { width, height } => {
            if !state.loaded {
                return None;
            }
            (width, height)
        }
        SurfaceEvent::NavigationCompleted { width, height } => {
            state.loaded = true;
            (width, height)
        }
    };
    let size = GraphSize::for_surface(width, height);
    if state.graph_size == Some(size) {
        return None;
    }
    state.graph_size = Some(size);
    Some(size)
}

/// Status bar text for a caret at a 0-based character offset.
pub fn caret_position_string(text: &str, char_offset: usize) -> String {
    let mut line = 1;
    let mut column = 1;
    for c in text.chars().take(char_offset) {
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    format!("Line: {} Column: {}", line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_size_subtracts_margin_and_clamps() {
        assert_eq!(GraphSize::for_surface(820.0, 600.0), GraphSize { width: 800.0, height: 580.0 });
        assert_eq!(GraphSize::for_surface(10.0, 600.5), GraphSize { width: 0.0, height: 580.5 });
    }

    #[test]
    fn size_changes_wait_for_navigation() {
        let mut state = SurfaceState::default();
        assert!(on_surface_event(&mut state, SurfaceEvent::SizeChanged { width: 500.0, height: 400.0 }).is_none());
        assert_eq!(state.graph_size, None);
        assert_eq!(
            on_surface_event(&mut state, SurfaceEvent::NavigationCompleted { width: 500.0, height: 400.0 }),
            Some(GraphSize { width: 480.0, height: 380.0 })
        );
        assert!(on_surface_event(&mut state, SurfaceEvent::SizeChanged { width: 500.0, height: 400.0 }).is_none());
        assert_eq!(
            on_surface_event(&mut state, SurfaceEvent::SizeChanged { width: 620.0, height: 400.0 }),
            Some(GraphSize { width: 600.0, height: 380.0 })
        );
        assert_eq!(state.graph_size, Some(GraphSize { width: 600.0, height: 380.0 }));
    }

    #[test]
    fn caret_counts_lines_and_columns_from_one() {
        let text = "MATCH (n)\nRETURN n";
        assert_eq!(caret_position_string(text, 0), "Line: 1 Column: 1");
        assert_eq!(caret_position_string(text, 9), "Line: 1 Column: 10");
        assert_eq!(caret_position_string(text, 10), "Line: 2 Column: 1");
        assert_eq!(caret_position_string(text, 100), "Line: 2 Column: 9");
    }
}
