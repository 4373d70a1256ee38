//! # Main Display Module
//!
//! This module contains the main display components and layout logic
//! for the Solfa application.

use iced::widget::{Space, button, column, container, row, text};
use iced::{Alignment, Element, Length};

use solfa_core::tuning::NOTE_NAMES;

use super::spectrum;

/// Creates the complete main application view
pub fn create_main_view(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    let title = text("Solfa").size(28);

    let main_content = column![
        title,
        Space::with_height(20),
        create_detection_panel(data),
        Space::with_height(10),
        create_spectrum_panel(data),
        Space::with_height(10),
        create_root_panel(data),
        Space::with_height(10),
        create_controls(data),
    ]
    .spacing(10)
    .padding(20)
    .width(Length::Fill);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Creates the detection readout panel: syllable, note, and pitch.
fn create_detection_panel(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    let syllable = if data.syllable.is_empty() {
        "--".to_string()
    } else {
        data.syllable.clone()
    };
    let note = if data.note.is_empty() {
        "--".to_string()
    } else {
        data.note.clone()
    };
    let pitch = if data.pitch_display.is_empty() {
        "0.00 Hz".to_string()
    } else {
        format!("{} Hz", data.pitch_display)
    };

    let readout = row![
        text(syllable).size(64),
        Space::with_width(20),
        column![text(note).size(28), text(pitch).size(20)].spacing(5),
    ]
    .align_y(Alignment::Center);

    container(
        column![text("Detection").size(18), Space::with_height(10), readout]
            .spacing(5)
            .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fixed(160.0))
    .into()
}

/// Creates the spectrum panel.
fn create_spectrum_panel(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    let spectrum_content = container(spectrum::Spectrum::new(data.spectrum.clone()).view())
        .width(Length::Fill)
        .height(Length::Fill);

    container(
        column![
            text("Spectrum").size(18),
            Space::with_height(10),
            spectrum_content
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fixed(200.0))
    .into()
}

/// Creates the root-note selector: one button per chromatic pitch class.
fn create_root_panel(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    let mut buttons = row![].spacing(8);
    for &name in NOTE_NAMES.iter() {
        buttons = buttons.push(make_root_button(name, data.root == name));
    }

    container(
        column![
            text("Root note (do)").size(18),
            Space::with_height(10),
            buttons
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .into()
}

/// Creates a single root selector button, highlighted when selected.
fn make_root_button(name: &'static str, selected: bool) -> Element<'static, crate::Message> {
    let mut root_button = button(text(name).size(14))
        .padding([6, 10])
        .width(Length::Fixed(44.0));

    if selected {
        root_button = root_button.style(|_theme, _status| {
            use iced::widget::button;
            button::Style {
                background: Some(iced::Background::Color(iced::Color::from_rgb(0.2, 0.5, 0.8))),
                text_color: iced::Color::WHITE,
                ..button::Style::default()
            }
        });
    }

    root_button
        .on_press(crate::Message::RootSelected(name))
        .into()
}

/// Creates the start/stop control row, with the capture error when one
/// needs surfacing.
fn create_controls(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    let (label, color) = if data.active {
        ("Stop", iced::Color::from_rgb(0.8, 0.2, 0.2))
    } else {
        ("Start", iced::Color::from_rgb(0.2, 0.7, 0.3))
    };

    let toggle = button(text(label).size(18))
        .padding([12, 20])
        .style(move |_theme, _status| {
            use iced::widget::button;
            button::Style {
                background: Some(iced::Background::Color(color)),
                text_color: iced::Color::WHITE,
                ..button::Style::default()
            }
        })
        .on_press(crate::Message::ToggleDetection);

    let mut controls = row![toggle].spacing(15).align_y(Alignment::Center);
    if let Some(error) = &data.capture_error {
        controls = controls.push(text(error.clone()).size(16));
    }
    controls.into()
}
