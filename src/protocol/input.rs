//! Input event payloads pushed on a user's model stream.
//!
//! Current servers send tagged [`InputEvent`]s; older deployments send the
//! flat [`LegacyInputEvent`] shape. Both decode from a reply payload with
//! [`Reply::payload_as`](super::Reply::payload_as).

use serde::{Deserialize, Serialize};

/// Identifier of an input source, unique per client and device.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputSource {
    /// Numeric source identifier.
    Number(i64),
    /// Textual source identifier.
    Text(String),
}

/// Mouse button of a [`InputEvent::Mouse`] event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
}

/// Pointer position in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Column, `0.0..=28.0`.
    pub x: f64,
    /// Row, `0.0..=14.0`.
    pub y: f64,
}

/// State of one gamepad button.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GamepadButton {
    /// Whether the button is pressed.
    pub pressed: bool,
    /// Analog value between `0.0` and `1.0`.
    pub value: f64,
}

/// An input event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputEvent {
    /// Keyboard event.
    Key {
        /// Originating device.
        source: InputSource,
        /// Whether the key went down.
        down: bool,
        /// Key name, following the browser `KeyboardEvent.key` values.
        key: String,
    },
    /// Mouse event.
    Mouse {
        /// Originating device.
        source: InputSource,
        /// Whether the button went down.
        down: bool,
        /// The button.
        button: MouseButton,
        /// Pointer position.
        pos: Position,
    },
    /// Gamepad snapshot, modelled after the Web Gamepad API.
    Gamepad {
        /// Originating device.
        source: InputSource,
        /// Button states.
        buttons: Vec<GamepadButton>,
        /// Axes between `-1.0` and `1.0`.
        axes: Vec<f64>,
    },
}

impl InputEvent {
    /// Returns the originating device of the event.
    #[must_use]
    pub fn source(&self) -> &InputSource {
        match self {
            Self::Key { source, .. } | Self::Mouse { source, .. } | Self::Gamepad { source, .. } => {
                source
            }
        }
    }
}

/// Input event in the flat format of older servers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyInputEvent {
    /// Originating device.
    pub src: i64,
    /// Whether the key or button went down.
    pub dwn: bool,
    /// Key code, for keyboard events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<i64>,
    /// Button index, for controller events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btn: Option<i64>,
}

impl LegacyInputEvent {
    /// Returns `true` for keyboard events.
    #[must_use]
    pub fn is_key(&self) -> bool { self.key.is_some() }

    /// Returns `true` for controller events.
    #[must_use]
    pub fn is_controller(&self) -> bool { self.btn.is_some() }
}

#[cfg(test)]
mod tests {
    use rmpv::Value;

    use super::*;
    use crate::protocol::Reply;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::from(k), v))
                .collect(),
        )
    }

    #[test]
    fn decodes_tagged_key_event() {
        let payload = map(vec![
            ("type", Value::from("key")),
            ("source", Value::from(3)),
            ("down", Value::from(true)),
            ("key", Value::from("ArrowUp")),
        ]);
        let event: InputEvent = Reply::new(200, payload)
            .payload_as()
            .expect("key event payload");
        assert_eq!(
            event,
            InputEvent::Key {
                source: InputSource::Number(3),
                down: true,
                key: "ArrowUp".to_owned(),
            }
        );
    }

    #[test]
    fn decodes_mouse_event_with_text_source() {
        let payload = map(vec![
            ("type", Value::from("mouse")),
            ("source", Value::from("pad-1")),
            ("down", Value::from(false)),
            ("button", Value::from("left")),
            ("pos", map(vec![("x", Value::from(3.5)), ("y", Value::from(7.0))])),
        ]);
        let event: InputEvent = Reply::new(200, payload)
            .payload_as()
            .expect("mouse event payload");
        assert_eq!(event.source(), &InputSource::Text("pad-1".to_owned()));
        assert!(matches!(
            event,
            InputEvent::Mouse {
                button: MouseButton::Left,
                ..
            }
        ));
    }

    #[test]
    fn legacy_events_classify_by_field() {
        let payload = map(vec![
            ("src", Value::from(1)),
            ("dwn", Value::from(true)),
            ("btn", Value::from(4)),
        ]);
        let event: LegacyInputEvent = Reply::new(200, payload)
            .payload_as()
            .expect("legacy payload");
        assert!(event.is_controller());
        assert!(!event.is_key());
    }
}
