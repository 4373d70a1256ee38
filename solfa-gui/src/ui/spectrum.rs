//! # Spectrum Widget
//!
//! Real-time magnitude-spectrum bar chart. Gives the user visual
//! confirmation that the microphone hears something even while no
//! confident pitch is being published.

use iced::widget::canvas::{self, Geometry, Path};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Size, Theme};

/// Small epsilon value to prevent log(0) errors in magnitude scaling.
const EPSILON: f32 = 1e-12;

/// Fraction of the spectrum bins shown. Voices and most instruments live
/// well below Nyquist; the top bins are visual noise.
const SHOWN_FRACTION: f32 = 0.25;

/// Spectrum widget for displaying frequency magnitudes.
pub struct Spectrum {
    /// Magnitude spectrum data of the last analyzed frame.
    data: Vec<f32>,
}

impl Spectrum {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn view(self) -> Element<'static, super::super::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for Spectrum {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let shown = ((self.data.len() as f32 * SHOWN_FRACTION) as usize).min(self.data.len());
        if !bounds.width.is_finite() || !bounds.height.is_finite() || shown == 0 {
            return vec![frame.into_geometry()];
        }
        let data = &self.data[..shown];

        let max_magnitude = data.iter().fold(0.0f32, |max, &val| val.max(max));
        if max_magnitude <= 0.0 {
            return vec![frame.into_geometry()];
        }

        // Log scaling keeps quiet partials visible next to the peak.
        let log_max = (max_magnitude + EPSILON).ln();
        let bar_width = (bounds.width / shown as f32).max(1.0);

        for (i, &magnitude) in data.iter().enumerate() {
            let log_magnitude = (magnitude + EPSILON).ln();
            let height = (log_magnitude / log_max * bounds.height).max(0.0);

            if height.is_finite() && height > 0.0 {
                let bar = Path::rectangle(
                    Point::new(i as f32 * bar_width, bounds.height - height),
                    Size::new(bar_width, height),
                );
                frame.fill(&bar, Color::from_rgb8(0x98, 0x34, 0xDB));
            }
        }

        vec![frame.into_geometry()]
    }
}
