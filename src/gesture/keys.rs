use crate::input::KeyInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Close,
    ZoomIn,
    ZoomOut,
    RotateRight,
    RotateLeft,
    Reset,
    Next,
    Previous,
}

/// Viewer shortcut for a key press, if it has one.
pub fn command_for(key: KeyInput) -> Option<KeyCommand> {
    Some(match key {
        KeyInput::Escape => KeyCommand::Close,
        KeyInput::ArrowRight => KeyCommand::Next,
        KeyInput::ArrowLeft => KeyCommand::Previous,
        KeyInput::Char('+' | '=') => KeyCommand::ZoomIn,
        KeyInput::Char('-') => KeyCommand::ZoomOut,
        KeyInput::Char('r') => KeyCommand::RotateRight,
        KeyInput::Char('R') => KeyCommand::RotateLeft,
        KeyInput::Char('0') => KeyCommand::Reset,
        KeyInput::Char(_) => return None,
    })
}
