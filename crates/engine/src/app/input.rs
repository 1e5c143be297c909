/// Normalized player intent for one fixed tick. Produced by the input
/// collector before each tick and consumed by the physics step; nothing here
/// persists across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Command {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub action: bool,
}

/// One tick's worth of input: the movement command plus edge-triggered
/// session controls. Sampling never fails; with no device events this is
/// simply all-false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    command: Command,
    pause_pressed: bool,
    quit_requested: bool,
}

impl InputSnapshot {
    pub(crate) fn new(command: Command, pause_pressed: bool, quit_requested: bool) -> Self {
        Self {
            command,
            pause_pressed,
            quit_requested,
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// True only on the tick where the pause key went down.
    pub fn pause_pressed(&self) -> bool {
        self.pause_pressed
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Builder for tests and headless drivers.
    pub fn with_command(command: Command) -> Self {
        Self {
            command,
            pause_pressed: false,
            quit_requested: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Action,
}

const ACTION_COUNT: usize = 4;

/// Level-triggered key states. Held keys repeat into every tick's command;
/// edge detection for pause/quit lives in the collector, not here.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn command(&self) -> Command {
        Command {
            left: self.is_down(InputAction::MoveLeft),
            right: self.is_down(InputAction::MoveRight),
            jump: self.is_down(InputAction::Jump),
            action: self.is_down(InputAction::Action),
        }
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Action => 3,
        }
    }
}
